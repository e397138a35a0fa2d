use std::fmt;

use serde::Serialize;

/// Canonical on-disk key of a deposit, independent of its stage.
///
/// Only the identity resolver constructs these; everything else treats the
/// value as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FolderIdentity(String);

impl FolderIdentity {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FolderIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Identity resolver
//!
//! Derives the Folder Identity of a deposit from its depositor's display
//! name and the deposit id: `<normalized-name>-<deposit_id>`. The id suffix
//! keeps two depositors whose names normalize alike from sharing a folder.

use tracing::debug;

use crate::error::CurationError;
use crate::models::deposit::{DepositId, DepositorRecord};
use crate::models::identity::FolderIdentity;
use crate::provider::{MetadataSource, ProviderError};

/// Upper bound on the name token, keeps folder names far from NAME_MAX.
pub const MAX_TOKEN_LENGTH: usize = 100;

const SEPARATOR: char = '-';

/// A resolved deposit: the identity plus the record it was derived from.
#[derive(Debug, Clone)]
pub struct ResolvedDeposit {
    pub identity: FolderIdentity,
    pub record: DepositorRecord,
}

/// Fold a display name into a filesystem-safe token.
///
/// ASCII letters are lowercased and digits kept. Whitespace, `-`, `_` and
/// `.` act as separators; runs of them collapse into a single `-` and are
/// trimmed at both ends. Anything else is dropped. May return an empty
/// string.
pub fn normalize_name(name: &str) -> String {
    let mut token = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !token.is_empty() {
                token.push(SEPARATOR);
            }
            pending_separator = false;
            token.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || matches!(c, '-' | '_' | '.') {
            pending_separator = true;
        }
    }

    truncate_token(token)
}

fn truncate_token(mut token: String) -> String {
    if token.len() <= MAX_TOKEN_LENGTH {
        return token;
    }
    // Token is pure ASCII, so byte offsets are char boundaries.
    token.truncate(MAX_TOKEN_LENGTH);
    if let Some(cut) = token.rfind(SEPARATOR) {
        token.truncate(cut);
    }
    token
}

/// Folder Identity for an already fetched record.
pub fn identity_for(record: &DepositorRecord) -> Result<FolderIdentity, CurationError> {
    let token = normalize_name(&record.depositor_name);
    if token.is_empty() {
        return Err(CurationError::MetadataIncomplete {
            deposit_id: record.deposit_id.to_string(),
            reason: if record.depositor_name.trim().is_empty() {
                "depositor name is empty".to_string()
            } else {
                format!(
                    "depositor name '{}' has no usable characters",
                    record.depositor_name
                )
            },
        });
    }

    Ok(FolderIdentity::new(format!(
        "{token}{SEPARATOR}{}",
        record.deposit_id
    )))
}

/// Fetch the depositor record and derive the identity from it.
pub fn resolve_deposit(
    id: &DepositId,
    source: &dyn MetadataSource,
) -> Result<ResolvedDeposit, CurationError> {
    let record = source.fetch_depositor(id)?;
    if &record.deposit_id != id {
        return Err(ProviderError::Malformed(format!(
            "asked for deposit {id}, provider returned {}",
            record.deposit_id
        ))
        .into());
    }

    let identity = identity_for(&record)?;
    debug!(deposit = %id, %identity, "resolved folder identity");
    Ok(ResolvedDeposit { identity, record })
}

pub fn resolve(id: &DepositId, source: &dyn MetadataSource) -> Result<FolderIdentity, CurationError> {
    resolve_deposit(id, source).map(|resolved| resolved.identity)
}

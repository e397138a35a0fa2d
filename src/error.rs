//! Error taxonomy for the curation core.
//!
//! Only [`CurationError::Configuration`] is fatal for a batch. Every other
//! variant is recorded against the deposit being processed and the batch
//! moves on to the next identifier.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum CurationError {
    /// Missing or unusable configuration; aborts before any deposit is touched.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The deposit is unknown to the provider, or its folder is in no stage.
    #[error("not found: {0}")]
    NotFound(String),

    /// A safe folder name cannot be derived from the provider's record.
    #[error("metadata incomplete for deposit {deposit_id}: {reason}")]
    MetadataIncomplete { deposit_id: String, reason: String },

    #[error("invalid transition from stage '{stage}': {reason}")]
    InvalidTransition { stage: String, reason: String },

    /// The same folder exists under more than one stage directory.
    #[error(
        "folder '{identity}' exists in several stages ({}); inspect manually",
        .stages.join(", ")
    )]
    AmbiguousState {
        identity: String,
        stages: Vec<String>,
    },

    #[error("destination already occupied: {}", .path.display())]
    Collision { identity: String, path: PathBuf },

    #[error("metadata provider: {0}")]
    Provider(ProviderError),

    /// Writing a generated artifact (manifest, agreement link) failed.
    #[error("artifact: {0:#}")]
    Artifact(anyhow::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl CurationError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        CurationError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CurationError::Configuration(_) => ErrorKind::Configuration,
            CurationError::NotFound(_) => ErrorKind::NotFound,
            CurationError::MetadataIncomplete { .. } => ErrorKind::MetadataIncomplete,
            CurationError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            CurationError::AmbiguousState { .. } => ErrorKind::AmbiguousState,
            CurationError::Collision { .. } => ErrorKind::Collision,
            CurationError::Provider(_) => ErrorKind::Provider,
            CurationError::Artifact(_) => ErrorKind::Artifact,
            CurationError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Whether this error must abort the whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CurationError::Configuration(_))
    }
}

impl From<ProviderError> for CurationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(what) => CurationError::NotFound(what),
            other => CurationError::Provider(other),
        }
    }
}

/// Stable label for an error, used in logs and batch summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    MetadataIncomplete,
    InvalidTransition,
    AmbiguousState,
    Collision,
    Provider,
    Artifact,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MetadataIncomplete => "metadata_incomplete",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::AmbiguousState => "ambiguous_state",
            ErrorKind::Collision => "collision",
            ErrorKind::Provider => "provider",
            ErrorKind::Artifact => "artifact",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_is_fatal() {
        assert!(CurationError::Configuration("x".into()).is_fatal());
        assert!(!CurationError::NotFound("x".into()).is_fatal());
        assert!(!CurationError::Collision {
            identity: "a-1".into(),
            path: PathBuf::from("/tmp/a-1"),
        }
        .is_fatal());
    }

    #[test]
    fn test_provider_not_found_maps_to_not_found() {
        let err: CurationError = ProviderError::NotFound("deposit 42".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: CurationError = ProviderError::RateLimited("slow down".into()).into();
        assert_eq!(err.kind(), ErrorKind::Provider);
    }

    #[test]
    fn test_ambiguous_state_message_lists_stages() {
        let err = CurationError::AmbiguousState {
            identity: "jane-doe-1".into(),
            stages: vec!["intake".into(), "review".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("jane-doe-1"));
        assert!(msg.contains("intake, review"));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(ErrorKind::AmbiguousState.as_str(), "ambiguous_state");
    }
}

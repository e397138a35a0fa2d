//! Metadata provider boundary
//!
//! The remote repository owns every deposit attribute. Providers translate
//! whatever the remote returns into typed [`DepositorRecord`] values before
//! anything reaches the curation core; no retries happen here.

pub mod figshare;
pub mod file;

use std::io::Write;

use thiserror::Error;

use crate::config::ProviderConfig;
use crate::error::CurationError;
use crate::models::deposit::{DepositFile, DepositId, DepositSummary, DepositorRecord};

pub use figshare::FigshareSource;
pub use file::JsonFileSource;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Connection failures, timeouts and unexpected HTTP statuses.
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The remote answered but the payload could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("unsupported by this provider: {0}")]
    Unsupported(String),
}

/// DOI reservation state of a deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoiStatus {
    Reserved(String),
    NotReserved,
}

/// Read access to the remote repository.
pub trait MetadataSource {
    /// Depositor and deposit attributes for one deposit.
    fn fetch_depositor(&self, id: &DepositId) -> Result<DepositorRecord, ProviderError>;

    /// Deposits awaiting curation, oldest first.
    fn list_pending(&self) -> Result<Vec<DepositSummary>, ProviderError>;

    fn doi_status(&self, id: &DepositId) -> Result<DoiStatus, ProviderError>;

    /// Reserve a DOI unless one is already reserved; returns the DOI either way.
    fn reserve_doi(&self, id: &DepositId) -> Result<String, ProviderError>;

    /// Files attached to a deposit, in the provider's order.
    fn list_files(&self, id: &DepositId) -> Result<Vec<DepositFile>, ProviderError>;

    /// Stream one file's content into `out`; returns the number of bytes.
    fn download_file(&self, file: &DepositFile, out: &mut dyn Write) -> Result<u64, ProviderError>;
}

/// Build the provider named in the configuration.
pub fn from_config(config: &ProviderConfig) -> Result<Box<dyn MetadataSource>, CurationError> {
    match config {
        ProviderConfig::Figshare(figshare) => Ok(Box::new(FigshareSource::new(figshare)?)),
        ProviderConfig::File(file) => Ok(Box::new(JsonFileSource::load(&file.path)?)),
    }
}

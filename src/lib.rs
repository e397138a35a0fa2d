pub mod batch;
pub mod commands;
pub mod completions;
pub mod config;
pub mod error;
pub mod fs;
pub mod identity;
pub mod layout;
pub mod logging;
pub mod models;
pub mod provider;
pub mod survey;
pub mod transition;
pub mod validation;
pub mod workflow;

pub use error::{CurationError, ErrorKind};

//! Helpers shared by the batch commands.
//!
//! - Loading configuration, logging and the [`Curator`] for one invocation
//! - Printing per-deposit outcomes and the batch summary

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::batch::{BatchAborted, BatchReport, Outcome};
use crate::config::{resolve_config_path, Config};
use crate::error::CurationError;
use crate::logging::{self, LogGuard};
use crate::workflow::Curator;

/// Everything a command needs, built once per invocation.
pub struct CommandContext {
    pub curator: Curator,
    _log: LogGuard,
}

impl CommandContext {
    /// Read the config, start logging, then validate the stage layout.
    ///
    /// Any failure here is a configuration error: no deposit has been
    /// touched yet.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(config_path)?;
        let config = Config::load(&path)?;
        let log = logging::init(config.curation.log_directory.as_deref())
            .context("Failed to start logging")?;
        info!(config = %path.display(), run_id = %log.run_id, "configuration loaded");

        let curator = Curator::from_config(config)?;
        Ok(Self { curator, _log: log })
    }
}

/// Print one line per deposit, then the summary.
///
/// `describe` renders failures; commands use it to add hints for error kinds
/// that mean something specific to them.
pub fn print_report<F>(report: &BatchReport, describe: F)
where
    F: Fn(&CurationError) -> String,
{
    print_outcomes(report, &describe);
    print_summary(report);
}

/// Print a batch result, aborted or not, and pass the report on.
///
/// An aborted batch still prints what ran before the fatal error, then the
/// error line and the summary, and returns the fatal error.
pub fn finish_batch<F>(result: Result<BatchReport, BatchAborted>, describe: F) -> Result<BatchReport>
where
    F: Fn(&CurationError) -> String,
{
    match result {
        Ok(report) => {
            print_report(&report, describe);
            Ok(report)
        }
        Err(aborted) => {
            print_outcomes(&aborted.report, &describe);
            println!(
                "{} {}  {} batch aborted: {}",
                "✗".red().bold(),
                aborted.deposit_id,
                format!("[{}]", aborted.error.kind()).dimmed(),
                aborted.error
            );
            print_summary(&aborted.report);
            Err(aborted.error.into())
        }
    }
}

fn print_outcomes<F>(report: &BatchReport, describe: &F)
where
    F: Fn(&CurationError) -> String,
{
    for entry in &report.outcomes {
        match &entry.outcome {
            Outcome::Succeeded(detail) => {
                println!("{} {}  {}", "✓".green().bold(), entry.deposit_id, detail);
            }
            Outcome::Failed(err) => {
                println!(
                    "{} {}  {} {}",
                    "✗".red().bold(),
                    entry.deposit_id,
                    format!("[{}]", err.kind()).dimmed(),
                    describe(err)
                );
            }
        }
    }
}

pub fn print_summary(report: &BatchReport) {
    let failed = if report.failed() > 0 {
        report.failed().to_string().red().bold()
    } else {
        report.failed().to_string().normal()
    };
    println!(
        "\n{} attempted, {} succeeded, {} failed",
        report.attempted(),
        report.succeeded().to_string().green(),
        failed
    );
}

/// Default failure rendering.
pub fn describe_error(err: &CurationError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::run_batch;
    use crate::error::ErrorKind;
    use crate::models::deposit::DepositId;

    #[test]
    fn test_finish_batch_returns_fatal_error_after_printing() {
        let ids: Vec<DepositId> = ["1", "2"]
            .iter()
            .map(|r| DepositId::parse(r).unwrap())
            .collect();
        let result = run_batch(&ids, |id| match id.as_str() {
            "1" => Ok("done".to_string()),
            _ => Err(CurationError::Configuration("stage dir vanished".into())),
        });

        let err = finish_batch(result, describe_error).unwrap_err();
        let cause = err.downcast_ref::<CurationError>().unwrap();
        assert_eq!(cause.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_finish_batch_passes_report_through() {
        let ids = vec![DepositId::parse("1").unwrap()];
        let report = finish_batch(run_batch(&ids, |_| Ok("done".to_string())), describe_error)
            .unwrap();
        assert_eq!(report.succeeded(), 1);
    }
}

//! Batch driver
//!
//! Runs one operation over an ordered list of deposit ids, strictly one after
//! another. A per-deposit failure is recorded and the batch moves on; only a
//! fatal (configuration) error stops it.

use thiserror::Error;
use tracing::{info, info_span, warn};

use crate::error::{CurationError, ErrorKind};
use crate::models::deposit::DepositId;

#[derive(Debug)]
pub enum Outcome {
    /// Human-readable detail of what was done.
    Succeeded(String),
    Failed(CurationError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }
}

#[derive(Debug)]
pub struct DepositOutcome {
    pub deposit_id: DepositId,
    pub outcome: Outcome,
}

/// Per-deposit results in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<DepositOutcome>,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&DepositId, &CurationError)> {
        self.outcomes.iter().filter_map(|o| match &o.outcome {
            Outcome::Failed(err) => Some((&o.deposit_id, err)),
            Outcome::Succeeded(_) => None,
        })
    }

    /// Failure count for one error kind.
    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        self.failures().filter(|(_, e)| e.kind() == kind).count()
    }
}

/// A fatal error stopped the batch.
///
/// `report` holds the deposits processed before `deposit_id`, so the
/// summary can still be printed.
#[derive(Debug, Error)]
#[error("batch aborted at deposit {deposit_id}: {error}")]
pub struct BatchAborted {
    pub report: BatchReport,
    pub deposit_id: DepositId,
    #[source]
    pub error: CurationError,
}

/// Apply `op` to every id in order.
///
/// Returns `Err` only for a fatal error; deposits after it are not attempted.
pub fn run_batch<F>(ids: &[DepositId], mut op: F) -> Result<BatchReport, BatchAborted>
where
    F: FnMut(&DepositId) -> Result<String, CurationError>,
{
    let mut report = BatchReport::default();

    for id in ids {
        let span = info_span!("deposit", id = %id);
        let _guard = span.enter();

        let outcome = match op(id) {
            Ok(detail) => {
                info!(%detail, "done");
                Outcome::Succeeded(detail)
            }
            Err(err) if err.is_fatal() => {
                warn!(error = %err, "aborting batch");
                return Err(BatchAborted {
                    report,
                    deposit_id: id.clone(),
                    error: err,
                });
            }
            Err(err) => {
                warn!(kind = %err.kind(), error = %err, "failed");
                Outcome::Failed(err)
            }
        };

        report.outcomes.push(DepositOutcome {
            deposit_id: id.clone(),
            outcome,
        });
    }

    info!(
        attempted = report.attempted(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<DepositId> {
        raw.iter().map(|r| DepositId::parse(r).unwrap()).collect()
    }

    #[test]
    fn test_failures_do_not_stop_the_batch() {
        let mut seen = Vec::new();
        let report = run_batch(&ids(&["1", "2", "3"]), |id| {
            seen.push(id.to_string());
            if id.as_str() == "2" {
                Err(CurationError::NotFound("deposit 2".into()))
            } else {
                Ok(format!("handled {id}"))
            }
        })
        .unwrap();

        assert_eq!(seen, vec!["1", "2", "3"]);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.count_kind(ErrorKind::NotFound), 1);
        let failed: Vec<&str> = report.failures().map(|(id, _)| id.as_str()).collect();
        assert_eq!(failed, vec!["2"]);
    }

    #[test]
    fn test_fatal_error_aborts() {
        let mut calls = 0;
        let result = run_batch(&ids(&["1", "2", "3"]), |_| {
            calls += 1;
            Err(CurationError::Configuration("stage dir vanished".into()))
        });

        let aborted = result.unwrap_err();
        assert!(aborted.error.is_fatal());
        assert_eq!(aborted.deposit_id.as_str(), "1");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_fatal_error_keeps_earlier_outcomes() {
        let result = run_batch(&ids(&["1", "2", "3", "4"]), |id| match id.as_str() {
            "1" => Ok("moved".to_string()),
            "2" => Err(CurationError::NotFound("deposit 2".into())),
            _ => Err(CurationError::Configuration("stage dir vanished".into())),
        });

        let aborted = result.unwrap_err();
        assert_eq!(aborted.deposit_id.as_str(), "3");
        assert_eq!(aborted.report.attempted(), 2);
        assert_eq!(aborted.report.succeeded(), 1);
        assert_eq!(aborted.report.failed(), 1);
        assert!(aborted.to_string().contains("deposit 3"));
    }

    #[test]
    fn test_empty_batch() {
        let report = run_batch(&[], |_| Ok(String::new())).unwrap();
        assert_eq!(report.attempted(), 0);
        assert_eq!(report.failed(), 0);
    }
}

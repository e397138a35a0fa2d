//! `curator intake`: scaffold deposit folders in the first stage.

use anyhow::Result;
use colored::Colorize;

use super::common::{describe_error, finish_batch};
use crate::batch::{run_batch, BatchReport};
use crate::models::deposit::DepositId;
use crate::workflow::{Curator, IntakeOutcome};

/// With `retrieve`, each deposit's files are downloaded right after its
/// folder is in place. Folders already in a later stage are left alone.
pub fn execute(curator: &Curator, ids: &[DepositId], retrieve: bool) -> Result<BatchReport> {
    println!(
        "{} intake of {} deposit(s) into '{}'",
        "→".cyan().bold(),
        ids.len(),
        curator.layout().first()
    );

    let first = curator.layout().first().name();
    let result = run_batch(ids, |id| {
        let (detail, later_stage) = match curator.intake(id)? {
            IntakeOutcome::Created { path, .. } => (format!("created {}", path.display()), false),
            IntakeOutcome::Completed { path, added, .. } => (
                format!("completed {} (added {})", path.display(), added.join(", ")),
                false,
            ),
            IntakeOutcome::AlreadyPresent { stage, path, .. } => (
                format!("already in stage '{stage}', left as is ({})", path.display()),
                stage != first,
            ),
        };
        // Curation past the first stage owns the data folder.
        if !retrieve || later_stage {
            return Ok(detail);
        }
        let report = curator.retrieve(id)?;
        Ok(format!("{detail}; {}", super::retrieve::describe(&report)))
    });
    finish_batch(result, describe_error)
}

//! `curator move`: batch stage transitions.

use anyhow::Result;
use colored::Colorize;

use super::common::finish_batch;
use crate::batch::{run_batch, BatchReport};
use crate::error::CurationError;
use crate::models::deposit::DepositId;
use crate::models::stage::Direction;
use crate::workflow::Curator;

pub fn execute(
    curator: &Curator,
    ids: &[DepositId],
    direction: Direction,
    from: Option<&str>,
) -> Result<BatchReport> {
    let from = from.map(|name| curator.stage(name)).transpose()?;

    match from {
        Some(stage) => println!(
            "{} {} {} deposit(s) from '{}'",
            "→".cyan().bold(),
            direction,
            ids.len(),
            stage
        ),
        None => println!("{} {} {} deposit(s)", "→".cyan().bold(), direction, ids.len()),
    }

    let result = run_batch(ids, |id| {
        curator
            .move_deposit(id, direction, from)
            .map(|moved| format!("{} → {}  {}", moved.from, moved.to, moved.path.display()))
    });
    finish_batch(result, describe_move_failure)
}

/// A missing folder on `move` usually means an earlier run already did it.
pub fn describe_move_failure(err: &CurationError) -> String {
    match err {
        CurationError::NotFound(what) => format!("not found (already moved?): {what}"),
        other => other.to_string(),
    }
}

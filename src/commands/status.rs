//! `curator status`: where deposits are and what their folders carry.

use anyhow::Result;

use super::common::{describe_error, finish_batch};
use crate::batch::{run_batch, BatchReport};
use crate::models::deposit::DepositId;
use crate::workflow::{Curator, DepositStatus};

pub fn execute(curator: &Curator, ids: &[DepositId]) -> Result<BatchReport> {
    finish_batch(
        run_batch(ids, |id| curator.status(id).map(|status| render(&status))),
        describe_error,
    )
}

fn render(status: &DepositStatus) -> String {
    let (Some(stage), Some(path)) = (&status.stage, &status.path) else {
        return format!("{}: not in any stage", status.identity);
    };

    let mut out = format!("{}: stage '{}' at {}", status.identity, stage, path.display());
    match &status.manifest_stage {
        Some(recorded) if status.is_out_of_sync() => {
            out.push_str(&format!("\n    manifest says '{recorded}' (out of sync)"));
        }
        Some(_) => {}
        None => out.push_str("\n    no manifest"),
    }
    if status.readmes.is_empty() {
        out.push_str("\n    no README found");
    }
    for readme in &status.readmes {
        out.push_str(&format!("\n    README: {}", readme.display()));
    }
    out
}

//! `curator retrieve`: download deposit files into the data folder.

use anyhow::Result;
use colored::Colorize;

use super::common::{describe_error, finish_batch};
use crate::batch::{run_batch, BatchReport};
use crate::models::deposit::DepositId;
use crate::workflow::{Curator, RetrieveReport};

pub fn execute(curator: &Curator, ids: &[DepositId]) -> Result<BatchReport> {
    println!(
        "{} retrieving files of {} deposit(s)",
        "→".cyan().bold(),
        ids.len()
    );

    let result = run_batch(ids, |id| curator.retrieve(id).map(|report| describe(&report)));
    finish_batch(result, describe_error)
}

pub(super) fn describe(report: &RetrieveReport) -> String {
    let mut line = format!(
        "{} downloaded, {} skipped, {} failed into {}",
        report.downloaded.len(),
        report.skipped.len(),
        report.failed.len(),
        report.path.display()
    );
    for (name, reason) in &report.failed {
        line.push_str(&format!("\n    {} {name}: {reason}", "!".yellow()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::identity::FolderIdentity;
    use std::path::PathBuf;

    #[test]
    fn test_describe_lists_failures() {
        let report = RetrieveReport {
            identity: FolderIdentity::new("jane-doe-1001".to_string()),
            path: PathBuf::from("/stages/1.ToDo/jane-doe-1001/DATA"),
            downloaded: vec!["cores.csv".to_string()],
            skipped: vec!["README.txt".to_string()],
            failed: vec![("gone.csv".to_string(), "not found: gone.csv".to_string())],
        };
        let line = describe(&report);
        assert!(line.starts_with("1 downloaded, 1 skipped, 1 failed into /stages/"));
        assert!(line.contains("gone.csv: not found: gone.csv"));
    }
}

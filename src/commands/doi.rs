//! `curator doi`: report or reserve DOIs.

use anyhow::Result;

use super::common::{describe_error, finish_batch};
use crate::batch::{run_batch, BatchReport};
use crate::models::deposit::DepositId;
use crate::provider::DoiStatus;
use crate::workflow::Curator;

pub fn execute(curator: &Curator, ids: &[DepositId], reserve: bool) -> Result<BatchReport> {
    let result = run_batch(ids, |id| {
        curator.doi(id, reserve).map(|status| match status {
            DoiStatus::Reserved(doi) => format!("DOI {doi}"),
            DoiStatus::NotReserved => "no DOI reserved (use --reserve)".to_string(),
        })
    });
    finish_batch(result, describe_error)
}

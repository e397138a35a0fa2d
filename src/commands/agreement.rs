//! `curator agreement`: deposit-agreement survey links.

use anyhow::Result;

use super::common::{describe_error, finish_batch};
use crate::batch::{run_batch, BatchReport};
use crate::models::deposit::DepositId;
use crate::survey::SurveyLink;
use crate::workflow::Curator;

pub fn execute(curator: &Curator, ids: &[DepositId]) -> Result<BatchReport> {
    let link = SurveyLink::from_config(curator.config().survey.as_ref())?;

    let result = run_batch(ids, |id| {
        curator.agreement(id, &link).map(|agreement| match agreement.saved_to {
            Some(path) => format!("{}\n    saved to {}", agreement.url, path.display()),
            None => format!("{}\n    no deposit folder, link not saved", agreement.url),
        })
    });
    finish_batch(result, describe_error)
}

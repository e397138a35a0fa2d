//! Figshare API payloads and their conversion into typed records.
//!
//! Only the fields curator reads are declared; everything else in the
//! responses is ignored.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::models::deposit::{CurationStatus, DepositId, DepositSummary, DepositorRecord};
use crate::provider::ProviderError;

/// Entry of `institution/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Review {
    pub id: u64,
    pub article_id: u64,
    pub account_id: u64,
    #[serde(default)]
    pub status: String,
    pub created_date: String,
    pub modified_date: String,
}

/// Body of `institution/review/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReviewDetails {
    pub account_id: u64,
    #[serde(default)]
    pub status: String,
    pub created_date: String,
    pub modified_date: String,
    pub item: ReviewItem,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ReviewItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub doi: Option<String>,
}

/// Body of `institution/users/{account_id}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InstitutionUser {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// The subset of `articles/{id}` and `articles/{id}/reserve_doi` we need.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ArticleDoi {
    #[serde(default)]
    pub doi: Option<String>,
}

impl ArticleDoi {
    /// Figshare reports "no DOI" as an empty string.
    pub fn reserved(&self) -> Option<&str> {
        self.doi.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }
}

/// Figshare timestamps come with and without a zone suffix; both are UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ProviderError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| ProviderError::Malformed(format!("bad timestamp '{raw}': {e}")))
}

/// Most recently modified review of `id`, if any.
pub(crate) fn latest_review(reviews: Vec<Review>, id: &DepositId) -> Result<Option<Review>, ProviderError> {
    let mut latest: Option<(DateTime<Utc>, Review)> = None;
    for review in reviews {
        if review.article_id.to_string() != id.as_str() {
            continue;
        }
        let modified = parse_timestamp(&review.modified_date)?;
        let newer = latest
            .as_ref()
            .map(|(ts, _)| modified > *ts)
            .unwrap_or(true);
        if newer {
            latest = Some((modified, review));
        }
    }
    Ok(latest.map(|(_, review)| review))
}

pub(crate) fn assemble_record(
    id: &DepositId,
    details: ReviewDetails,
    user: InstitutionUser,
) -> Result<DepositorRecord, ProviderError> {
    let depositor_name = format!("{} {}", user.first_name.trim(), user.last_name.trim())
        .trim()
        .to_string();

    Ok(DepositorRecord {
        deposit_id: id.clone(),
        depositor_name,
        email: user.email.filter(|e| !e.trim().is_empty()),
        title: details.item.title,
        account_id: details.account_id,
        created: parse_timestamp(&details.created_date)?,
        modified: parse_timestamp(&details.modified_date)?,
        status: CurationStatus::from_provider(&details.status),
        doi: details.item.doi.filter(|d| !d.trim().is_empty()),
    })
}

pub(crate) fn summarize(review: &Review) -> Result<DepositSummary, ProviderError> {
    let deposit_id = DepositId::parse(&review.article_id.to_string())
        .map_err(|e| ProviderError::Malformed(e.to_string()))?;
    Ok(DepositSummary {
        deposit_id,
        account_id: review.account_id,
        title: None,
        status: CurationStatus::from_provider(&review.status),
        created: parse_timestamp(&review.created_date)?,
    })
}

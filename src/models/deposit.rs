use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::validate_id;

/// Provider-assigned identifier of a deposit.
///
/// Accepts both JSON numbers and strings on input, always serializes as a
/// string. Validated on construction so it is safe inside a folder name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawDepositId", into = "String")]
pub struct DepositId(String);

impl DepositId {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let id = raw.trim();
        validate_id(id)?;
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DepositId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::parse(s)
    }
}

impl From<DepositId> for String {
    fn from(id: DepositId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDepositId {
    Number(u64),
    Text(String),
}

impl TryFrom<RawDepositId> for DepositId {
    type Error = anyhow::Error;

    fn try_from(raw: RawDepositId) -> anyhow::Result<Self> {
        match raw {
            RawDepositId::Number(n) => DepositId::parse(&n.to_string()),
            RawDepositId::Text(s) => DepositId::parse(&s),
        }
    }
}

/// Curation review status as reported by the remote repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurationStatus {
    Pending,
    Approved,
    Rejected,
    Closed,
    #[serde(other)]
    Unknown,
}

impl CurationStatus {
    /// Lenient mapping from the provider's free-form status string.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => CurationStatus::Pending,
            "approved" => CurationStatus::Approved,
            "rejected" => CurationStatus::Rejected,
            "closed" => CurationStatus::Closed,
            _ => CurationStatus::Unknown,
        }
    }
}

impl fmt::Display for CurationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CurationStatus::Pending => "pending",
            CurationStatus::Approved => "approved",
            CurationStatus::Rejected => "rejected",
            CurationStatus::Closed => "closed",
            CurationStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Depositor and deposit attributes, read-only and owned by the provider.
///
/// Lives for one invocation only; nothing here is persisted except the
/// fields copied into the curation manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositorRecord {
    pub deposit_id: DepositId,
    /// Depositor's display (legal) name.
    pub depositor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub title: String,
    pub account_id: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub status: CurationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

impl DepositorRecord {
    pub fn name_parts(&self) -> DepositorName {
        DepositorName::from_display_name(&self.depositor_name)
    }

    pub fn summary(&self) -> DepositSummary {
        DepositSummary {
            deposit_id: self.deposit_id.clone(),
            account_id: self.account_id,
            title: Some(self.title.clone()),
            status: self.status,
            created: self.created,
        }
    }
}

/// Short listing entry returned by `list_pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositSummary {
    pub deposit_id: DepositId,
    pub account_id: u64,
    /// Not every listing endpoint returns titles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: CurationStatus,
    pub created: DateTime<Utc>,
}

/// One file attached to a deposit, as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositFile {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub download_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_md5: Option<String>,
    /// Link-only entries point at content hosted elsewhere.
    #[serde(default)]
    pub is_link_only: bool,
}

/// First name / surname split of a depositor's display name.
///
/// The last whitespace-separated word is the surname; everything before it
/// is the first name. A single-word name has an empty first name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositorName {
    pub first_name: String,
    pub surname: String,
}

impl DepositorName {
    pub fn from_display_name(name: &str) -> Self {
        let words: Vec<&str> = name.split_whitespace().collect();
        match words.split_last() {
            Some((last, rest)) => Self {
                first_name: rest.join(" "),
                surname: (*last).to_string(),
            },
            None => Self {
                first_name: String::new(),
                surname: String::new(),
            },
        }
    }
}

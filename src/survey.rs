//! Deposit-agreement survey links.
//!
//! The survey form is pre-filled from query parameters, so a link is a pure
//! function of the depositor record and the configured base URL.

use std::collections::BTreeMap;

use reqwest::Url;

use crate::config::SurveyConfig;
use crate::error::CurationError;
use crate::models::deposit::DepositorRecord;

#[derive(Debug, Clone)]
pub struct SurveyLink {
    base_url: Url,
    extra: BTreeMap<String, String>,
}

impl SurveyLink {
    pub fn new(base_url: &str, extra: BTreeMap<String, String>) -> Result<Self, CurationError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CurationError::Configuration(format!("survey.base_url '{base_url}' is invalid: {e}"))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(CurationError::Configuration(format!(
                "survey.base_url must be http(s), got '{}'",
                base_url.scheme()
            )));
        }
        Ok(Self { base_url, extra })
    }

    /// Build from the optional `[survey]` section; absent means unusable.
    pub fn from_config(config: Option<&SurveyConfig>) -> Result<Self, CurationError> {
        let config = config.ok_or_else(|| {
            CurationError::Configuration("no [survey] section in the config".to_string())
        })?;
        Self::new(&config.base_url, config.extra.clone())
    }

    /// Pre-filled survey URL for one depositor.
    ///
    /// Parameters already present on the base URL are kept; the depositor
    /// fields come next, then the configured extras.
    pub fn generate_url(&self, record: &DepositorRecord) -> Url {
        let name = record.name_parts();
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("article_id", record.deposit_id.as_str())
                .append_pair("first_name", &name.first_name)
                .append_pair("last_name", &name.surname)
                .append_pair("email", record.email.as_deref().unwrap_or(""))
                .append_pair("title", &record.title);
            for (key, value) in &self.extra {
                query.append_pair(key, value);
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::deposit::{CurationStatus, DepositId};
    use chrono::{TimeZone, Utc};

    fn record() -> DepositorRecord {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        DepositorRecord {
            deposit_id: DepositId::parse("1001").unwrap(),
            depositor_name: "Jane A. Doe".to_string(),
            email: Some("jane@example.edu".to_string()),
            title: "Soil cores & roots".to_string(),
            account_id: 7,
            created: ts,
            modified: ts,
            status: CurationStatus::Pending,
            doi: None,
        }
    }

    #[test]
    fn test_generate_url_encodes_fields() {
        let link = SurveyLink::new("https://survey.example.edu/form/SV_1", BTreeMap::new()).unwrap();
        let url = link.generate_url(&record());

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("article_id".to_string(), "1001".to_string()),
                ("first_name".to_string(), "Jane A.".to_string()),
                ("last_name".to_string(), "Doe".to_string()),
                ("email".to_string(), "jane@example.edu".to_string()),
                ("title".to_string(), "Soil cores & roots".to_string()),
            ]
        );
        assert!(url.as_str().contains("title=Soil+cores+%26+roots"));
    }

    #[test]
    fn test_generate_url_keeps_base_query_and_extras() {
        let mut extra = BTreeMap::new();
        extra.insert("Q_lang".to_string(), "EN".to_string());
        let link = SurveyLink::new("https://survey.example.edu/form?src=curator", extra).unwrap();

        let url = link.generate_url(&record());
        let query = url.query().unwrap();
        assert!(query.starts_with("src=curator&article_id=1001"));
        assert!(query.ends_with("Q_lang=EN"));
    }

    #[test]
    fn test_generate_url_is_pure() {
        let link = SurveyLink::new("https://survey.example.edu/form", BTreeMap::new()).unwrap();
        assert_eq!(link.generate_url(&record()), link.generate_url(&record()));
    }

    #[test]
    fn test_invalid_or_missing_config() {
        assert!(SurveyLink::new("not a url", BTreeMap::new())
            .unwrap_err()
            .is_fatal());
        assert!(SurveyLink::new("ftp://example.edu/form", BTreeMap::new()).is_err());
        assert!(SurveyLink::from_config(None).unwrap_err().is_fatal());
    }
}

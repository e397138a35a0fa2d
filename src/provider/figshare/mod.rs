//! Figshare institutional API provider.
//!
//! A deposit is resolved in three calls: the curation reviews for the
//! article, the details of its most recent review, and the institution user
//! record of the depositing account.

mod client;
mod types;

use std::io::{self, Write};

use reqwest::blocking::{Client, Response};
use reqwest::header::AUTHORIZATION;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use client::{classify_status, create_download_client, create_http_client, read_json, transport_error};
use types::{assemble_record, latest_review, summarize, ArticleDoi, InstitutionUser, Review, ReviewDetails};

use super::{DoiStatus, MetadataSource, ProviderError};
use crate::config::FigshareConfig;
use crate::error::CurationError;
use crate::models::deposit::{DepositFile, DepositId, DepositSummary, DepositorRecord};

pub const PRODUCTION_BASE_URL: &str = "https://api.figshare.com/v2/account/";
pub const STAGING_BASE_URL: &str = "https://api.figsh.com/v2/account/";

/// The API caps page sizes at 1000.
const PAGE_LIMIT: &str = "1000";

pub struct FigshareSource {
    client: Client,
    downloads: Client,
    base_url: Url,
    token: Option<String>,
}

impl FigshareSource {
    pub fn new(config: &FigshareConfig) -> Result<Self, CurationError> {
        let base = if config.staging {
            STAGING_BASE_URL
        } else {
            PRODUCTION_BASE_URL
        };
        let base_url = Url::parse(base)
            .map_err(|e| CurationError::Configuration(format!("bad API base URL: {e}")))?;
        let client = create_http_client(config.timeout_secs).map_err(|e| {
            CurationError::Configuration(format!("failed to create HTTP client: {e}"))
        })?;
        let downloads = create_download_client().map_err(|e| {
            CurationError::Configuration(format!("failed to create download client: {e}"))
        })?;

        Ok(Self {
            client,
            downloads,
            base_url,
            token: config.token(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint below the account root, or below
    /// `account/institution/` when `institute` is set.
    fn endpoint(&self, link: &str, institute: bool) -> Result<Url, ProviderError> {
        let path = if institute {
            format!("institution/{link}")
        } else {
            link.to_string()
        };
        self.base_url
            .join(&path)
            .map_err(|e| ProviderError::Malformed(format!("bad endpoint '{path}': {e}")))
    }

    fn get<T: DeserializeOwned>(&self, url: Url, context: &str) -> Result<T, ProviderError> {
        debug!(%url, "GET");
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }
        let response = request.send().map_err(|e| transport_error(e, context))?;
        read_json(response, context)
    }

    fn post<T: DeserializeOwned>(&self, url: Url, context: &str) -> Result<T, ProviderError> {
        debug!(%url, "POST");
        let mut request = self.client.post(url);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }
        let response = request.send().map_err(|e| transport_error(e, context))?;
        read_json(response, context)
    }

    fn send_download(
        &self,
        url: &str,
        with_token: bool,
        context: &str,
    ) -> Result<Response, ProviderError> {
        let mut request = self.downloads.get(url);
        if with_token {
            if let Some(token) = &self.token {
                request = request.header(AUTHORIZATION, format!("token {token}"));
            }
        }
        request.send().map_err(|e| transport_error(e, context))
    }

    fn reviews(&self, filter: (&str, &str)) -> Result<Vec<Review>, ProviderError> {
        let mut url = self.endpoint("reviews", true)?;
        url.query_pairs_mut()
            .append_pair(filter.0, filter.1)
            .append_pair("offset", "0")
            .append_pair("limit", PAGE_LIMIT);
        self.get(url, "list curation reviews")
    }
}

impl MetadataSource for FigshareSource {
    fn fetch_depositor(&self, id: &DepositId) -> Result<DepositorRecord, ProviderError> {
        let reviews = self.reviews(("article_id", id.as_str()))?;
        let review = latest_review(reviews, id)?
            .ok_or_else(|| ProviderError::NotFound(format!("no curation review for deposit {id}")))?;

        let details: ReviewDetails = self.get(
            self.endpoint(&format!("review/{}", review.id), true)?,
            &format!("review {}", review.id),
        )?;
        let user: InstitutionUser = self.get(
            self.endpoint(&format!("users/{}", details.account_id), true)?,
            &format!("account {}", details.account_id),
        )?;

        assemble_record(id, details, user)
    }

    fn list_pending(&self) -> Result<Vec<DepositSummary>, ProviderError> {
        let reviews = self.reviews(("status", "pending"))?;
        let mut pending = reviews
            .iter()
            .map(summarize)
            .collect::<Result<Vec<_>, _>>()?;
        pending.sort_by_key(|s| s.created);
        Ok(pending)
    }

    fn doi_status(&self, id: &DepositId) -> Result<DoiStatus, ProviderError> {
        let article: ArticleDoi = self.get(
            self.endpoint(&format!("articles/{id}"), false)?,
            &format!("deposit {id}"),
        )?;
        Ok(match article.reserved() {
            Some(doi) => DoiStatus::Reserved(doi.to_string()),
            None => DoiStatus::NotReserved,
        })
    }

    fn reserve_doi(&self, id: &DepositId) -> Result<String, ProviderError> {
        if let DoiStatus::Reserved(doi) = self.doi_status(id)? {
            info!(deposit = %id, %doi, "DOI already reserved");
            return Ok(doi);
        }

        let minted: ArticleDoi = self.post(
            self.endpoint(&format!("articles/{id}/reserve_doi"), false)?,
            &format!("reserve DOI for {id}"),
        )?;
        let doi = minted
            .reserved()
            .ok_or_else(|| ProviderError::Malformed(format!("no DOI returned for {id}")))?
            .to_string();
        info!(deposit = %id, %doi, "DOI minted");
        Ok(doi)
    }

    fn list_files(&self, id: &DepositId) -> Result<Vec<DepositFile>, ProviderError> {
        let mut url = self.endpoint(&format!("articles/{id}/files"), false)?;
        url.query_pairs_mut()
            .append_pair("page", "1")
            .append_pair("page_size", PAGE_LIMIT);
        self.get(url, &format!("files of deposit {id}"))
    }

    /// Private files need the token; public ones may reject it, so an HTTP
    /// error with the token is retried once without it.
    fn download_file(&self, file: &DepositFile, out: &mut dyn Write) -> Result<u64, ProviderError> {
        let context = format!("download of '{}'", file.name);
        let mut response = self.send_download(&file.download_url, true, &context)?;
        if !response.status().is_success() && self.token.is_some() {
            warn!(file = %file.name, status = %response.status(), "retrying without token");
            response = self.send_download(&file.download_url, false, &context)?;
        }
        classify_status(response.status(), &context)?;

        io::copy(&mut response, out)
            .map_err(|e| ProviderError::Transient(format!("{context}: {e}")))
    }
}

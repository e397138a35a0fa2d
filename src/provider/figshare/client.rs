//! HTTP plumbing for the Figshare provider.
//!
//! Provides a client with connect/total timeouts and size-limited JSON
//! decoding, and maps transport failures onto [`ProviderError`].

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::time::Duration;

use crate::provider::ProviderError;

pub(crate) const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub(crate) const HTTP_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Curation listings are paged at 1000 entries, a few MB at most.
pub(crate) const MAX_RESPONSE_SIZE: u64 = 16 * 1024 * 1024;

/// Create an HTTP client so a stuck API call cannot block a batch forever.
pub(crate) fn create_http_client(timeout_secs: Option<u64>) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(
            timeout_secs.unwrap_or(HTTP_REQUEST_TIMEOUT_SECS),
        ))
        .user_agent(concat!("curator/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Map an HTTP status onto the provider error taxonomy.
pub(crate) fn classify_status(status: StatusCode, context: &str) -> Result<(), ProviderError> {
    if status.is_success() {
        return Ok(());
    }
    let detail = format!(
        "{}: HTTP {} - {}",
        context,
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown error")
    );
    Err(match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound(detail),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(detail),
        _ => ProviderError::Transient(detail),
    })
}

pub(crate) fn transport_error(err: reqwest::Error, context: &str) -> ProviderError {
    if err.is_decode() {
        ProviderError::Malformed(format!("{context}: {err}"))
    } else {
        ProviderError::Transient(format!("{context}: {err}"))
    }
}

/// Client for file downloads: same connect timeout, but no limit on the
/// total transfer time since deposits can hold very large files.
pub(crate) fn create_download_client() -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(Option::<Duration>::None)
        .user_agent(concat!("curator/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Check the status, then decode a JSON body of bounded size.
pub(crate) fn read_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, ProviderError> {
    classify_status(response.status(), context)?;

    if let Some(content_length) = response.content_length() {
        if content_length > MAX_RESPONSE_SIZE {
            return Err(ProviderError::Malformed(format!(
                "{context}: Content-Length {content_length} bytes exceeds {MAX_RESPONSE_SIZE} bytes"
            )));
        }
    }

    let mut body = Vec::new();
    response
        .take(MAX_RESPONSE_SIZE + 1)
        .read_to_end(&mut body)
        .map_err(|e| ProviderError::Transient(format!("{context}: failed to read body: {e}")))?;
    if body.len() as u64 > MAX_RESPONSE_SIZE {
        return Err(ProviderError::Malformed(format!(
            "{context}: response exceeds {MAX_RESPONSE_SIZE} bytes"
        )));
    }

    serde_json::from_slice(&body).map_err(|e| ProviderError::Malformed(format!("{context}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status_success() {
        assert!(classify_status(StatusCode::OK, "list").is_ok());
        assert!(classify_status(StatusCode::CREATED, "reserve").is_ok());
    }

    #[test]
    fn test_classify_status_maps_failures() {
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "review 1"),
            Err(ProviderError::NotFound(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "review 1"),
            Err(ProviderError::RateLimited(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "review 1"),
            Err(ProviderError::Transient(_))
        ));
    }

    #[test]
    fn test_classify_status_message_has_context() {
        let err = classify_status(StatusCode::FORBIDDEN, "user 7").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("user 7"));
        assert!(msg.contains("403"));
    }

    #[test]
    fn test_create_http_client() {
        assert!(create_http_client(None).is_ok());
        assert!(create_http_client(Some(5)).is_ok());
        assert!(create_download_client().is_ok());
    }
}

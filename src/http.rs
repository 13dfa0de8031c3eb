//! HTTP access for the fetchers.
//!
//! The fetchers depend on the [`HttpFetch`] trait rather than on `reqwest`
//! directly:
//! - [`ReqwestFetcher`]: the real client, browser-like headers and a per-request timeout
//! - [`OfflineFetcher`]: refuses every request, so a run degrades to the fallback set
//!
//! Every source gets exactly one attempt per run. There is no retry layer.

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const BROWSER_ACCEPT_LANGUAGE: &str = "ja-JP,ja;q=0.9,en;q=0.8";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Why a source produced no records.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request timed out")]
    Timeout,
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("parse failure: {0}")]
    Parse(String),
    #[error("extraction rules: {0}")]
    Rules(String),
    #[error("network disabled")]
    Offline,
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if let Some(status) = e.status() {
            SourceError::Status(status.as_u16())
        } else {
            SourceError::Unreachable(e.to_string())
        }
    }
}

/// A single GET returning the response body as text.
pub trait HttpFetch {
    async fn get_text(&self, url: &str) -> Result<String, SourceError>;
}

/// `reqwest`-backed [`HttpFetch`].
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE));
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl HttpFetch for ReqwestFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), "Fetched body");
        Ok(body)
    }
}

/// [`HttpFetch`] that never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

impl HttpFetch for OfflineFetcher {
    async fn get_text(&self, _url: &str) -> Result<String, SourceError> {
        Err(SourceError::Offline)
    }
}

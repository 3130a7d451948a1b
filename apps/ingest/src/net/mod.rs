//! HTTP access for the loaders.
//!
//! Every loader goes through the [`Fetcher`] trait so the pipeline can be
//! driven by [`fake::FakeFetcher`] in tests and by [`HttpFetcher`] in the
//! binary.

pub mod fake;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const CLIENT_NAME: &str = concat!("tech_radar_ingest/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub bearer: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer: None,
        }
    }

    #[must_use]
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

/// Status and body of a completed request. Non-2xx answers are responses,
/// not errors; the loaders decide what they mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub const fn is_forbidden(&self) -> bool {
        self.status == 403
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// `reqwest`-backed fetcher used by the binary.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| FetchError::Transport {
                url: String::new(),
                reason: format!("could not build http client: {error}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = reqwest::Url::parse(&request.url).map_err(|error| FetchError::InvalidUrl {
            url: request.url.clone(),
            reason: error.to_string(),
        })?;

        let mut builder = self.client.get(url).header(USER_AGENT, CLIENT_NAME);
        if let Some(token) = &request.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let transport = |error: reqwest::Error| FetchError::Transport {
            url: request.url.clone(),
            reason: error.to_string(),
        };
        let response = builder.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;

        log::debug!("GET {} -> {status} ({} bytes)", request.url, body.len());
        Ok(FetchResponse { status, body })
    }
}

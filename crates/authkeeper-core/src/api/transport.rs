//! Network seam for the API client.
//!
//! Everything above this module works with `ApiRequest`/`ApiResponse`; only
//! `HttpTransport` knows about reqwest. Tests substitute their own `Transport`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::{ApiError, ApiRequest, ApiResponse};

/// Sends a request and returns whatever the server answered.
///
/// Non-success statuses are still `Ok`; only a missing response
/// (connect failure, timeout, unreadable body) is an `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport with a cookie jar.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: Self::parse_base_url(base_url)?,
        })
    }

    /// Base URLs are treated as directories so relative paths append to them
    fn parse_base_url(base_url: &str) -> Result<Url, ApiError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        Url::parse(&normalized)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid API base URL {}: {}", base_url, e)))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join `url` onto the base URL. Absolute URLs must share the base URL's
    /// origin: the session cookie and CSRF token are only ever sent there.
    pub fn resolve(&self, url: &str) -> Result<Url, ApiError> {
        if let Ok(absolute) = Url::parse(url) {
            if absolute.origin() != self.base_url.origin() {
                return Err(ApiError::InvalidRequest(format!(
                    "Refusing to send session request to {} (API is {})",
                    absolute,
                    self.base_url.origin().ascii_serialization()
                )));
            }
            return Ok(absolute);
        }
        self.base_url
            .join(url.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid request URL {}: {}", url, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.resolve(&request.url)?;
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

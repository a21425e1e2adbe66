use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{ApiError, ApiRequest, Transport, CSRF_PATH};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to fetch CSRF token: {0}")]
pub struct TokenFetchError(#[from] pub ApiError);

/// Produces an anti-forgery token for a single mutating request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn acquire(&self) -> Result<String, TokenFetchError>;
}

#[derive(Debug, Deserialize)]
struct CsrfResponse {
    csrf_token: String,
}

/// Fetches a fresh token from the server on every call.
///
/// Token lifetime is controlled by server-side session rotation, so nothing
/// is cached here.
#[derive(Clone)]
pub struct CsrfTokenAcquirer {
    transport: Arc<dyn Transport>,
}

impl CsrfTokenAcquirer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TokenSource for CsrfTokenAcquirer {
    async fn acquire(&self) -> Result<String, TokenFetchError> {
        let response = self
            .transport
            .send(ApiRequest::get(CSRF_PATH))
            .await?
            .error_for_status()?;
        let parsed: CsrfResponse = response.json()?;
        debug!("Acquired CSRF token");
        Ok(parsed.csrf_token)
    }
}

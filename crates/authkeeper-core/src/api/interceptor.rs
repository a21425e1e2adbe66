use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use tracing::{error, warn};

use super::{ApiError, ApiRequest, ApiResponse, TokenSource, CSRF_HEADER};

/// Coarse failure classes reported to logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    NotAuthenticated,
    Forbidden,
    ServerError,
    Network,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureClass::NotAuthenticated => "not authenticated",
            FailureClass::Forbidden => "forbidden",
            FailureClass::ServerError => "server error",
            FailureClass::Network => "network error",
        };
        f.write_str(label)
    }
}

impl FailureClass {
    pub fn classify(outcome: &Result<ApiResponse, ApiError>) -> Option<Self> {
        match outcome {
            Ok(response) => match response.status.as_u16() {
                401 => Some(FailureClass::NotAuthenticated),
                403 => Some(FailureClass::Forbidden),
                500..=599 => Some(FailureClass::ServerError),
                _ => None,
            },
            Err(ApiError::Network(_)) => Some(FailureClass::Network),
            Err(_) => None,
        }
    }
}

/// Wraps every outgoing request.
///
/// Mutating requests get a freshly acquired anti-forgery token. Token
/// acquisition is fail-open: if it fails the request is sent without the
/// header and the server decides whether to accept it.
#[derive(Clone)]
pub struct Interceptor {
    tokens: Arc<dyn TokenSource>,
}

impl Interceptor {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self { tokens }
    }

    pub async fn prepare(&self, mut request: ApiRequest) -> ApiRequest {
        if request.is_safe() {
            return request;
        }

        match self.tokens.acquire().await {
            Ok(token) => match HeaderValue::from_str(&token) {
                Ok(value) => {
                    request
                        .headers
                        .insert(HeaderName::from_static(CSRF_HEADER), value);
                }
                Err(e) => {
                    warn!(url = %request.url, error = %e, "CSRF token is not a valid header value, sending without it");
                }
            },
            Err(e) => {
                warn!(method = %request.method, url = %request.url, error = %e, "Failed to fetch CSRF token, sending without it");
            }
        }
        request
    }

    /// Log failed responses by class. Nothing is retried or swallowed here.
    pub fn inspect(
        &self,
        method: &Method,
        url: &str,
        outcome: &Result<ApiResponse, ApiError>,
    ) -> Option<FailureClass> {
        let class = FailureClass::classify(outcome)?;
        match outcome {
            Ok(response) => match class {
                FailureClass::ServerError => {
                    error!(method = %method, url = url, status = %response.status, class = %class, "Request failed");
                }
                _ => {
                    warn!(method = %method, url = url, status = %response.status, class = %class, "Request failed");
                }
            },
            Err(e) => {
                warn!(method = %method, url = url, error = %e, class = %class, "Request failed");
            }
        }
        Some(class)
    }
}

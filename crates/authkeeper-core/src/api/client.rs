//! API client for the authentication endpoints.
//!
//! Every request goes through the `Interceptor`, so mutating calls
//! (login, logout, anything non-GET) carry a freshly acquired CSRF token.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use crate::config::Config;
use crate::models::AuthenticatedUser;

use super::{
    ApiError, ApiRequest, ApiResponse, CsrfTokenAcquirer, HttpTransport, Interceptor,
    TokenSource, Transport, LOGIN_PATH, LOGOUT_PATH, USER_PATH,
};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Clone is cheap - transport and token source are shared.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    interceptor: Interceptor,
}

impl ApiClient {
    /// Create a client talking HTTP to the configured server
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Create a client over any transport, acquiring CSRF tokens through it
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let tokens = Arc::new(CsrfTokenAcquirer::new(Arc::clone(&transport)));
        Self::with_token_source(transport, tokens)
    }

    pub fn with_token_source(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            transport,
            interceptor: Interceptor::new(tokens),
        }
    }

    /// Send a request through the interceptor; non-success statuses become errors
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let request = self.interceptor.prepare(request).await;
        let method = request.method.clone();
        let url = request.url.clone();

        let outcome = self.transport.send(request).await;
        self.interceptor.inspect(&method, &url, &outcome);
        outcome?.error_for_status()
    }

    /// Exchange credentials for a server session
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { username, password })?;
        self.execute(request).await?.json()
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.execute(ApiRequest::post(LOGOUT_PATH)).await?;
        Ok(())
    }

    /// Ask the server who the current session belongs to
    pub async fn current_user(&self) -> Result<AuthenticatedUser, ApiError> {
        self.execute(ApiRequest::new(Method::GET, USER_PATH)).await?.json()
    }
}

use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Network error: {0}")]
    Network(String),

    /// A protected request was rejected with 401/403 mid-session
    #[error("Session expired - please sign in again")]
    SessionExpired,

    #[error(transparent)]
    Request(#[from] ApiError),
}

impl AuthError {
    /// 4xx means the server looked at the credentials and said no;
    /// anything else means it never got a fair chance to.
    pub fn from_login_failure(err: ApiError) -> Self {
        if err.is_client_error() {
            AuthError::InvalidCredentials
        } else {
            AuthError::Network(err.to_string())
        }
    }

    /// Text shown to the user in the published snapshot
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid credentials".to_string(),
            AuthError::Network(_) => "Unable to reach the server".to_string(),
            AuthError::SessionExpired => "Session expired".to_string(),
            AuthError::Request(e) => e.to_string(),
        }
    }
}

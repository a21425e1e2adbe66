//! REST API client module for the authentication endpoints.
//!
//! This module provides:
//! - `ApiRequest` / `ApiResponse`: transport-neutral request descriptors
//! - `Transport`: the seam to the network, with the reqwest-backed `HttpTransport`
//! - `CsrfTokenAcquirer`: fetches a fresh anti-forgery token per mutating call
//! - `Interceptor`: attaches the token and classifies failed responses
//! - `ApiClient`: login, logout, whoami and arbitrary protected requests
//!
//! The server keeps the session in a cookie; every state-changing request must
//! also carry an `X-CSRFToken` header obtained from `GET auth/csrf/`.

pub mod client;
pub mod csrf;
pub mod error;
pub mod interceptor;
pub mod request;
pub mod transport;

pub use client::ApiClient;
pub use csrf::{CsrfTokenAcquirer, TokenFetchError, TokenSource};
pub use error::ApiError;
pub use interceptor::{FailureClass, Interceptor};
pub use request::{ApiRequest, ApiResponse};
pub use transport::{HttpTransport, Transport};

pub use reqwest::{Method, StatusCode};

/// Anti-forgery token endpoint
pub const CSRF_PATH: &str = "auth/csrf/";

/// Credential exchange endpoint
pub const LOGIN_PATH: &str = "auth/login/";

/// Server-side session teardown endpoint
pub const LOGOUT_PATH: &str = "auth/logout/";

/// Whoami endpoint
pub const USER_PATH: &str = "auth/user/";

/// Header carrying the anti-forgery token on mutating requests (`X-CSRFToken`)
pub const CSRF_HEADER: &str = "x-csrftoken";

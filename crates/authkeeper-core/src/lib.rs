//! authkeeper-core - client-side session tracking for a cookie-session API.
//!
//! This crate tracks whether the user is signed in, performs login and
//! logout, attaches anti-forgery tokens to mutating requests and gives every
//! observer the same view of the current user.
//!
//! The usual entry point is `AuthManager`, built from a `Config` and a
//! `KeyValueStore` for the durable half of the session cache.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod publisher;
pub mod storage;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse, HttpTransport, Transport};
pub use auth::{AuthDebugInfo, AuthError, AuthManager};
pub use cache::SessionCache;
pub use config::Config;
pub use models::{AuthFlag, AuthSnapshot, AuthenticatedUser, SessionState};
pub use publisher::StatePublisher;
pub use storage::{FileStore, KeyValueStore, MemoryStore};

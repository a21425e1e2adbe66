//! Authentication coordination.
//!
//! This module provides:
//! - `AuthManager`: login, logout, current-user lookups and protected requests,
//!   keeping the `SessionCache` consistent with what the server reports
//! - `InFlight`: at most one pending lookup per key, shared by every caller
//! - `AuthError`: the failures surfaced to the UI layer

pub mod error;
pub mod inflight;
pub mod manager;

pub use error::AuthError;
pub use inflight::{InFlight, Joined};
pub use manager::{AuthDebugInfo, AuthManager};

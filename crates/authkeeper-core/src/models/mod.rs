//! Data models for authentication state.
//!
//! This module contains the value types shared by the cache, the API client
//! and the auth manager:
//!
//! - `AuthenticatedUser`: the user record returned by login and whoami
//! - `SessionState`, `AuthFlag`: the tri-state session view and its persisted projection
//! - `AuthSnapshot`: the `{user, loading, error}` triple published to observers

pub mod session;
pub mod snapshot;
pub mod user;

pub use session::{AuthFlag, SessionState};
pub use snapshot::AuthSnapshot;
pub use user::AuthenticatedUser;

use serde::Serialize;

use super::AuthenticatedUser;

/// What observers see: the current user, whether an auth operation is
/// outstanding, and the last user-facing error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthSnapshot {
    pub user: Option<AuthenticatedUser>,
    pub loading: bool,
    pub error: Option<String>,
}

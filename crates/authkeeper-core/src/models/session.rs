use std::fmt;
use std::str::FromStr;

use super::AuthenticatedUser;

/// Tri-state view of the current session.
///
/// Only `Authenticated` carries a user, so a positive state without a user
/// record cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Never checked, or explicitly invalidated
    #[default]
    Unknown,
    Authenticated(AuthenticatedUser),
    Unauthenticated,
}

impl SessionState {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    /// True once the server has given a definitive answer either way
    pub fn is_resolved(&self) -> bool {
        !matches!(self, SessionState::Unknown)
    }

    /// Persisted projection; `Unknown` is never stored
    pub fn flag(&self) -> Option<AuthFlag> {
        match self {
            SessionState::Unknown => None,
            SessionState::Authenticated(_) => Some(AuthFlag::Authenticated),
            SessionState::Unauthenticated => Some(AuthFlag::Unauthenticated),
        }
    }
}

impl From<Option<AuthenticatedUser>> for SessionState {
    fn from(user: Option<AuthenticatedUser>) -> Self {
        match user {
            Some(user) => SessionState::Authenticated(user),
            None => SessionState::Unauthenticated,
        }
    }
}

/// Durable flag written next to the persisted user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlag {
    Authenticated,
    Unauthenticated,
}

impl AuthFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFlag::Authenticated => "authenticated",
            AuthFlag::Unauthenticated => "unauthenticated",
        }
    }
}

impl fmt::Display for AuthFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "authenticated" => Ok(AuthFlag::Authenticated),
            "unauthenticated" => Ok(AuthFlag::Unauthenticated),
            other => Err(format!("unrecognized auth flag: {}", other)),
        }
    }
}

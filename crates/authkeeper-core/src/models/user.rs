use serde::{Deserialize, Serialize};

/// User record as reported by the server's login and whoami endpoints.
///
/// Replaced wholesale on every login or refetch, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthenticatedUser {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "is_staff", default, skip_serializing_if = "Option::is_none")]
    pub is_privileged: Option<bool>,
}

impl AuthenticatedUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            is_privileged: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Staff flag, treating a missing value as unprivileged
    pub fn is_privileged(&self) -> bool {
        self.is_privileged.unwrap_or(false)
    }

    pub fn display_name(&self) -> String {
        match self.email.as_deref() {
            Some(email) if !email.is_empty() => format!("{} <{}>", self.username, email),
            _ => self.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_login_response_with_extra_fields() {
        let json = r#"{"detail": "Successfully logged in", "username": "alice"}"#;
        let user: AuthenticatedUser = serde_json::from_str(json).unwrap();
        assert_eq!(user, AuthenticatedUser::new("alice"));
        assert!(!user.is_privileged());
    }

    #[test]
    fn test_parses_staff_flag() {
        let json = r#"{"username": "root", "email": "root@example.com", "is_staff": true}"#;
        let user: AuthenticatedUser = serde_json::from_str(json).unwrap();
        assert!(user.is_privileged());
        assert_eq!(user.email.as_deref(), Some("root@example.com"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(AuthenticatedUser::new("bob").display_name(), "bob");
        assert_eq!(
            AuthenticatedUser::new("bob").with_email("bob@example.com").display_name(),
            "bob <bob@example.com>"
        );
        assert_eq!(AuthenticatedUser::new("bob").with_email("").display_name(), "bob");
    }
}

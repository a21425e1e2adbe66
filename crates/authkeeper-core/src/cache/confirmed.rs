use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// When the server last gave a definitive answer about the session.
///
/// Stored under its own key next to the flag, as an RFC 3339 timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub at: DateTime<Utc>,
}

impl Confirmation {
    pub fn now() -> Self {
        Self { at: Utc::now() }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let at = DateTime::parse_from_rfc3339(raw.trim())
            .with_context(|| format!("Invalid confirmation timestamp: {:?}", raw))?
            .with_timezone(&Utc);
        Ok(Self { at })
    }

    pub fn to_stored(&self) -> String {
        self.at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Whole minutes since confirmation; a timestamp in the future counts as zero
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.at).num_minutes().max(0)
    }

    pub fn age_display(&self) -> String {
        match self.age_minutes() {
            0 => "just now".to_string(),
            m if m < 60 => format!("{}m ago", m),
            m if m < 48 * 60 => format!("{}h ago", m / 60),
            m => format!("{}d ago", m / (24 * 60)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn minutes_ago(minutes: i64) -> Confirmation {
        Confirmation {
            at: Utc::now() - Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_stored_form_parses_back() {
        let stamp = Confirmation::parse("2026-03-01T12:30:00Z").unwrap();
        assert_eq!(stamp.to_stored(), "2026-03-01T12:30:00Z");
        assert!(Confirmation::parse("yesterday").is_err());
    }

    #[test]
    fn test_age_display() {
        assert_eq!(Confirmation::now().age_display(), "just now");
        assert_eq!(minutes_ago(-10).age_display(), "just now");
        assert_eq!(minutes_ago(5).age_display(), "5m ago");
        assert_eq!(minutes_ago(150).age_display(), "2h ago");
        assert_eq!(minutes_ago(3 * 24 * 60 + 5).age_display(), "3d ago");
    }
}

//! Client configuration management.
//!
//! This module handles loading the client configuration, which
//! includes the API base URL, the prefix for persisted keys and where the
//! durable session state lives.
//!
//! Configuration is stored at `~/.config/authkeeper/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/state directory paths
const APP_NAME: &str = "authkeeper";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Server used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment override for the API base URL
pub const API_URL_ENV: &str = "AUTHKEEPER_API_URL";

/// Environment override for the durable state directory
pub const STATE_DIR_ENV: &str = "AUTHKEEPER_STATE_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    /// Prefix for the persisted user and flag keys
    pub storage_prefix: String,
    pub request_timeout_secs: u64,
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_prefix: APP_NAME.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            state_dir: None,
        }
    }
}

impl Config {
    /// Load from the config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.state_dir = Some(PathBuf::from(dir.trim()));
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the durable session keys
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.state_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn user_key(&self) -> String {
        format!("{}_auth_user", self.storage_prefix)
    }

    pub fn flag_key(&self) -> String {
        format!("{}_auth_state", self.storage_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.user_key(), "authkeeper_auth_user");
        assert_eq!(config.flag_key(), "authkeeper_auth_state");
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"storage_prefix": "czesci"}"#).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.user_key(), "czesci_auth_user");
        assert_eq!(config.flag_key(), "czesci_auth_state");
    }

    #[test]
    fn test_explicit_state_dir_wins() {
        let config = Config {
            state_dir: Some(PathBuf::from("/tmp/authkeeper-test")),
            ..Config::default()
        };
        assert_eq!(config.state_dir().unwrap(), PathBuf::from("/tmp/authkeeper-test"));
    }
}

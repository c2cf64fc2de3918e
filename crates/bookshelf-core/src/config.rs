//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend URL, request timeout, where credentials are
//! kept, and the last email used to sign in.
//!
//! Configuration is stored at `~/.config/bookshelf/config.json`.
//! `BOOKSHELF_API_URL` overrides the configured backend URL.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::auth::{CredentialStore, FileCredentialStore, KeyringCredentialStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "bookshelf";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the backend URL
pub const API_URL_ENV: &str = "BOOKSHELF_API_URL";

/// Backend URL used when neither the environment nor the config sets one.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// `credentials.json` in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    pub last_email: Option<String>,
}

/// Resolved settings for the HTTP gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Gateway settings, with `BOOKSHELF_API_URL` taking precedence.
    pub fn api_settings(&self) -> ApiSettings {
        self.api_settings_with(std::env::var(API_URL_ENV).ok())
    }

    fn api_settings_with(&self, env_url: Option<String>) -> ApiSettings {
        let base_url = env_url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let timeout = Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        ApiSettings { base_url, timeout }
    }

    /// Build the configured credential store.
    pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
        Ok(match self.credential_backend {
            CredentialBackend::File => Arc::new(FileCredentialStore::new(self.cache_dir()?)),
            CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Config::default().api_settings_with(None);
        assert_eq!(settings.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_env_overrides_config_url() {
        let config = Config {
            api_base_url: Some("https://books.example.com/api".to_string()),
            request_timeout_secs: Some(5),
            ..Default::default()
        };
        let settings = config.api_settings_with(Some("http://127.0.0.1:9000/api".to_string()));
        assert_eq!(settings.base_url, "http://127.0.0.1:9000/api");
        assert_eq!(settings.timeout, Duration::from_secs(5));

        let settings = config.api_settings_with(Some("  ".to_string()));
        assert_eq!(settings.base_url, "https://books.example.com/api");
    }

    #[test]
    fn test_config_parses_backend() {
        let config: Config =
            serde_json::from_str(r#"{"credential_backend": "keyring", "last_email": "a@b.c"}"#)
                .unwrap();
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
        assert_eq!(config.last_email.as_deref(), Some("a@b.c"));

        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.credential_backend, CredentialBackend::File);
    }
}

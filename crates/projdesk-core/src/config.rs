//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, the token storage backend, token expiry
//! horizons and the last used username.
//!
//! Configuration is stored at `~/.config/projdesk/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::TokenTtl;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "projdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// API base URL used when neither the environment nor the config file set one
pub const DEFAULT_API_BASE_URL: &str = "http://192.168.1.14:8000";

/// Environment variable overriding the configured API base URL
pub const API_URL_ENV: &str = "PROJDESK_API_URL";

const DEFAULT_ACCESS_TTL_DAYS: i64 = 1;
const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

/// Where the access/refresh token pair is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    /// OS credential store (Keychain, Credential Manager, Secret Service)
    #[default]
    Keyring,
    /// JSON file in the cache directory with per-entry expiry
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub token_storage: TokenStorage,
    pub access_token_ttl_days: i64,
    pub refresh_token_ttl_days: i64,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            token_storage: TokenStorage::default(),
            access_token_ttl_days: DEFAULT_ACCESS_TTL_DAYS,
            refresh_token_ttl_days: DEFAULT_REFRESH_TTL_DAYS,
            last_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = serde_json::from_str(&contents).context("Failed to parse config file")?;
            debug!(path = %path.display(), "Config loaded");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
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

    /// Resolve the API base URL: environment first, then config, then default.
    pub fn api_base_url(&self) -> String {
        let env_url = std::env::var(API_URL_ENV).ok();
        Self::resolve_base_url(env_url.as_deref(), self.api_base_url.as_deref())
    }

    fn resolve_base_url(env_url: Option<&str>, configured: Option<&str>) -> String {
        let url = env_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| configured.map(str::trim).filter(|s| !s.is_empty()))
            .unwrap_or(DEFAULT_API_BASE_URL);
        url.trim_end_matches('/').to_string()
    }

    pub fn token_ttl(&self) -> TokenTtl {
        TokenTtl::days(
            self.access_token_ttl_days.max(1),
            self.refresh_token_ttl_days.max(1),
        )
    }
}

//! Client configuration management.
//!
//! Configuration is loaded from `~/.config/learnhub/config.json`, then
//! overridden by environment variables (`LEARNHUB_BASE_URL`,
//! `LEARNHUB_TIMEOUT_MS`, `LEARNHUB_CREDENTIALS_MODE`). A `.env` file is
//! honored if present.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "learnhub";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default request timeout in milliseconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default API root used when no configuration is present.
const DEFAULT_BASE_URL: &str = "https://api.learnhub.io";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root for all relative request paths.
    pub base_url: String,
    /// Request timeout applied by the transport.
    pub timeout_ms: u64,
    /// Whether cross-origin cookies are sent alongside the bearer header.
    pub credentials_mode: bool,
    /// Directory holding the persisted credential and cache entries.
    /// Defaults to the platform cache dir when absent.
    pub storage_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            credentials_mode: true,
            storage_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration: defaults, then the config file, then env overrides.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("LEARNHUB_BASE_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(ms) = std::env::var("LEARNHUB_TIMEOUT_MS") {
            if let Ok(parsed) = ms.parse::<u64>() {
                self.timeout_ms = parsed;
            }
        }
        if let Ok(mode) = std::env::var("LEARNHUB_CREDENTIALS_MODE") {
            self.credentials_mode = matches!(mode.as_str(), "1" | "true" | "include");
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

    /// Directory for the persisted session and cache records.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.storage_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Join a relative request path onto the configured base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

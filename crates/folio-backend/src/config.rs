use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::graphql::ErrorPolicy;

const APP_NAME: &str = "folio";
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the GraphQL endpoint
pub const ENDPOINT_ENV: &str = "FOLIO_GRAPHQL_ENDPOINT";
/// Environment variable enabling request diagnostics
pub const DEBUG_ENV: &str = "FOLIO_GRAPHQL_DEBUG";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Base URL the navigator resolves redirect paths against
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_refresh_cookie_name")]
    pub refresh_cookie_name: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_sec: u64,
    /// Logs every request and response at debug level, credentials redacted
    #[serde(default)]
    pub debug: bool,
    /// Concurrent auth failures share one refresh call instead of each issuing their own
    #[serde(default = "default_single_flight")]
    pub single_flight: bool,
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

fn default_endpoint() -> String {
    "http://localhost:3000/graphql".to_string()
}

fn default_site_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_refresh_cookie_name() -> String {
    "refreshToken".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_single_flight() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            site_url: default_site_url(),
            login_path: default_login_path(),
            refresh_cookie_name: default_refresh_cookie_name(),
            request_timeout_sec: default_request_timeout(),
            debug: false,
            single_flight: default_single_flight(),
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a default configuration for `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Loads the configuration from the config directory and the environment
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Result<Self> {
        let config_file = Self::config_dir()?.join(CONFIG_FILE);
        let config = Self::load_from(&config_file)?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Loads the configuration from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).context("Failed to read config file")?;
        Ok(serde_json::from_str(&data).unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid config file {}: {}", path.display(), e);
            Self::default()
        }))
    }

    /// Applies environment overrides read through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(debug) = lookup(DEBUG_ENV) {
            self.debug = matches!(debug.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// Saves the configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json).context("Failed to write config file")?;
        Ok(())
    }

    /// Returns the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join(APP_NAME))
    }
}

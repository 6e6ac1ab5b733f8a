//! Logging setup and header redaction for diagnostic output

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, AUTHORIZATION, COOKIE, SET_COOKIE};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const REDACTED: &str = "[redacted]";

/// Installs the global tracing subscriber
///
/// Reads the filter from `RUST_LOG` and falls back to `info`. Fails if a
/// subscriber is already installed.
pub fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to install tracing subscriber")
}

/// Returns the headers as name/value pairs with credentials masked
pub fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if is_sensitive(name) || value.is_sensitive() {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

fn is_sensitive(name: &reqwest::header::HeaderName) -> bool {
    name == AUTHORIZATION || name == COOKIE || name == SET_COOKIE
}

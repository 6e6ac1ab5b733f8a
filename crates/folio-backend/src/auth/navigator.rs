use crate::config::ClientConfig;

/// Sends the user somewhere else, typically the login page
///
/// Server-side hosts inject [`NoopNavigator`]; interactive hosts inject a
/// navigator that can actually move the user.
pub trait Navigator: Send + Sync {
    fn redirect_to(&self, path: &str);
}

/// Navigator for contexts with no user to redirect
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to(&self, path: &str) {
        tracing::debug!("Redirect to {} skipped outside interactive context", path);
    }
}

/// Opens site pages in the system browser
#[derive(Debug, Clone)]
pub struct BrowserNavigator {
    site_url: String,
}

impl BrowserNavigator {
    /// Creates a navigator resolving paths against `site_url`
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
        }
    }

    /// Creates a navigator for the configured site
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.site_url.clone())
    }

    /// Returns the absolute URL for `path`
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.site_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Navigator for BrowserNavigator {
    fn redirect_to(&self, path: &str) {
        let url = self.url_for(path);
        tracing::info!("Opening {}", url);
        if let Err(e) = open::that(&url) {
            tracing::error!("Failed to open {}: {}", url, e);
        }
    }
}

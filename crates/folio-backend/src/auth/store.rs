use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;

const SERVICE_NAME: &str = "folio";
const TOKEN_FILE: &str = "credentials.json";

/// Token pair returned by login, registration and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub token_type: String,
}

impl CredentialPair {
    /// Converts to the persisted form, anchoring the expiry at `issued_at`
    pub fn into_stored(self, issued_at: DateTime<Utc>) -> StoredCredentials {
        StoredCredentials {
            expires_at: issued_at + Duration::seconds(self.expires_in),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
        }
    }
}

/// Credentials as persisted by host stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
}

impl StoredCredentials {
    /// Checks if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Checks if the access token exists and is not expired
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }
}

/// Token store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No credentials stored")]
    NoCredentials,
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Where the host keeps the session's tokens
///
/// The refresh flow only needs to read the refresh token and write the new
/// access token. Hosts that can also rotate the refresh token override
/// [`CredentialStore::write_tokens`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Reads the refresh token, if one is present
    async fn read_refresh_token(&self) -> Option<String>;

    /// Persists a new access token
    async fn write_access_token(&self, access_token: &str) -> Result<()>;

    /// Persists a freshly issued pair
    async fn write_tokens(&self, pair: &CredentialPair) -> Result<()> {
        self.write_access_token(&pair.access_token).await
    }

    /// Removes all stored credentials
    async fn clear(&self) -> Result<()>;
}

/// In-process credential store
///
/// Keeps the tokens in memory for the lifetime of the session and records
/// every access token written, oldest first.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    refresh_token: RwLock<Option<String>>,
    access_writes: RwLock<Vec<String>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `refresh_token`
    pub fn with_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: RwLock::new(Some(refresh_token.into())),
            access_writes: RwLock::default(),
        }
    }

    /// Returns every access token written so far
    pub fn access_token_writes(&self) -> Vec<String> {
        self.access_writes
            .read()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    /// Returns the most recently written access token
    pub fn access_token(&self) -> Option<String> {
        self.access_token_writes().pop()
    }

    fn lock_error() -> anyhow::Error {
        anyhow::anyhow!("Credential store lock poisoned")
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn read_refresh_token(&self) -> Option<String> {
        self.refresh_token.read().ok().and_then(|t| t.clone())
    }

    async fn write_access_token(&self, access_token: &str) -> Result<()> {
        self.access_writes
            .write()
            .map_err(|_| Self::lock_error())?
            .push(access_token.to_string());
        Ok(())
    }

    async fn write_tokens(&self, pair: &CredentialPair) -> Result<()> {
        *self.refresh_token.write().map_err(|_| Self::lock_error())? =
            Some(pair.refresh_token.clone());
        self.write_access_token(&pair.access_token).await
    }

    async fn clear(&self) -> Result<()> {
        *self.refresh_token.write().map_err(|_| Self::lock_error())? = None;
        Ok(())
    }
}

/// Credential store backed by the cookies of one incoming HTTP request
///
/// Used by server-rendered loaders: the refresh token comes from the request's
/// `Cookie` header, and writes become `Set-Cookie` values the host attaches to
/// its response.
#[derive(Debug)]
pub struct CookieCredentialStore {
    refresh_cookie: String,
    access_cookie: String,
    refresh_token: RwLock<Option<String>>,
    pending: RwLock<Vec<String>>,
}

impl CookieCredentialStore {
    /// Name of the cookie carrying the access token
    pub const ACCESS_COOKIE: &'static str = "accessToken";
    /// Cookie lifetime for an access token written without its pair
    pub const ACCESS_COOKIE_MAX_AGE: i64 = 15 * 60;
    /// Cookie lifetime for a rotated refresh token
    pub const REFRESH_COOKIE_MAX_AGE_DAYS: i64 = 30;

    /// Builds a store from a raw `Cookie` header value
    pub fn from_cookie_header(header: &str, refresh_cookie: impl Into<String>) -> Self {
        let refresh_cookie = refresh_cookie.into();
        let refresh_token = parse_cookie(header, &refresh_cookie);
        Self {
            refresh_cookie,
            access_cookie: Self::ACCESS_COOKIE.to_string(),
            refresh_token: RwLock::new(refresh_token),
            pending: RwLock::default(),
        }
    }

    /// Drains the `Set-Cookie` values produced by writes so far
    pub fn take_set_cookie_headers(&self) -> Vec<String> {
        self.pending
            .write()
            .map(|mut p| std::mem::take(&mut *p))
            .unwrap_or_default()
    }

    fn push(&self, cookie: String) -> Result<()> {
        self.pending
            .write()
            .map_err(|_| anyhow::anyhow!("Cookie store lock poisoned"))?
            .push(cookie);
        Ok(())
    }
}

/// Extracts and percent-decodes a cookie value from a `Cookie` header
fn parse_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| urlencoding::decode(value.trim_matches('"')).ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn set_cookie(name: &str, value: &str, max_age: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Lax",
        name,
        urlencoding::encode(value),
        max_age
    )
}

#[async_trait]
impl CredentialStore for CookieCredentialStore {
    async fn read_refresh_token(&self) -> Option<String> {
        self.refresh_token.read().ok().and_then(|t| t.clone())
    }

    async fn write_access_token(&self, access_token: &str) -> Result<()> {
        self.push(set_cookie(
            &self.access_cookie,
            access_token,
            Self::ACCESS_COOKIE_MAX_AGE,
        ))
    }

    async fn write_tokens(&self, pair: &CredentialPair) -> Result<()> {
        self.push(set_cookie(&self.access_cookie, &pair.access_token, pair.expires_in))?;
        if !pair.refresh_token.is_empty() {
            self.push(set_cookie(
                &self.refresh_cookie,
                &pair.refresh_token,
                Duration::days(Self::REFRESH_COOKIE_MAX_AGE_DAYS).num_seconds(),
            ))?;
            if let Ok(mut current) = self.refresh_token.write() {
                *current = Some(pair.refresh_token.clone());
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.push(set_cookie(&self.access_cookie, "", 0))?;
        self.push(set_cookie(&self.refresh_cookie, "", 0))?;
        if let Ok(mut current) = self.refresh_token.write() {
            *current = None;
        }
        Ok(())
    }
}

/// Credential storage on disk with optional keyring backup
///
/// Always writes a JSON file in the config directory and mirrors it to the
/// OS keyring when one is available.
pub struct FileTokenStore {
    keyring_entry: Option<keyring::Entry>,
    fallback_path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store in the default config directory
    pub fn new() -> Result<Self> {
        let config_dir = crate::config::ClientConfig::config_dir()?;
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        let fallback_path = config_dir.join(TOKEN_FILE);

        // Try to create a keyring entry
        let keyring_entry = keyring::Entry::new(SERVICE_NAME, "credentials").ok();

        Ok(Self {
            keyring_entry,
            fallback_path,
        })
    }

    /// Creates a store at a custom path without keyring mirroring
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            keyring_entry: None,
            fallback_path: path,
        }
    }

    /// Saves the credentials
    pub fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        let data =
            serde_json::to_string(credentials).context("Failed to serialize credentials")?;

        std::fs::write(&self.fallback_path, &data).context("Failed to write credentials file")?;

        // Also try keyring as a secondary store
        if let Some(ref entry) = self.keyring_entry {
            if let Err(e) = entry.set_password(&data) {
                tracing::warn!("Failed to mirror credentials to keyring: {}", e);
            }
        }

        Ok(())
    }

    /// Loads the stored credentials
    pub fn load(&self) -> Result<StoredCredentials, StoreError> {
        // Try file storage first (more reliable)
        if self.fallback_path.exists() {
            let data = std::fs::read_to_string(&self.fallback_path)
                .map_err(|e| StoreError::Storage(e.into()))?;
            return serde_json::from_str(&data).map_err(|e| StoreError::Storage(e.into()));
        }

        if let Some(ref entry) = self.keyring_entry {
            if let Ok(data) = entry.get_password() {
                return serde_json::from_str(&data).map_err(|e| StoreError::Storage(e.into()));
            }
        }

        Err(StoreError::NoCredentials)
    }

    /// Deletes the stored credentials
    pub fn delete(&self) -> Result<()> {
        if self.fallback_path.exists() {
            std::fs::remove_file(&self.fallback_path)
                .context("Failed to delete credentials file")?;
        }

        if let Some(ref entry) = self.keyring_entry {
            match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => tracing::warn!("Failed to delete keyring credentials: {}", e),
            }
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileTokenStore {
    async fn read_refresh_token(&self) -> Option<String> {
        match self.load() {
            Ok(credentials) if !credentials.refresh_token.is_empty() => {
                Some(credentials.refresh_token)
            }
            Ok(_) | Err(StoreError::NoCredentials) => None,
            Err(e) => {
                tracing::warn!("Failed to read stored credentials: {}", e);
                None
            }
        }
    }

    async fn write_access_token(&self, access_token: &str) -> Result<()> {
        let mut credentials = match self.load() {
            Ok(credentials) => credentials,
            Err(StoreError::NoCredentials) => StoredCredentials {
                access_token: String::new(),
                refresh_token: String::new(),
                expires_at: Utc::now(),
                token_type: "Bearer".to_string(),
            },
            Err(StoreError::Storage(e)) => return Err(e),
        };
        credentials.access_token = access_token.to_string();
        self.save(&credentials)
    }

    async fn write_tokens(&self, pair: &CredentialPair) -> Result<()> {
        self.save(&pair.clone().into_stored(Utc::now()))
    }

    async fn clear(&self) -> Result<()> {
        self.delete()
    }
}

//! Token refresh and the single permitted retry.
//!
//! [`RefreshCoordinator::refresh_and_retry`] runs at most one refresh call and
//! at most one retried send per failed request. Refresh failures are logged
//! and masked: callers always get the original auth failure back.

use serde_json::json;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::navigator::Navigator;
use super::store::{CredentialPair, CredentialStore};
use crate::graphql::http::{HttpClient, ReqwestClient};
use crate::graphql::transport::GraphQLTransport;
use crate::graphql::types::{ApiError, GraphQLRequest, GraphQLResponse};

/// Mutation exchanging a refresh token for a new credential pair
pub const REFRESH_MUTATION: &str = "mutation RefreshToken($refreshToken: String!) { \
     refreshToken(refreshToken: $refreshToken) { accessToken refreshToken expiresIn tokenType } }";

/// Callback notified with every freshly issued credential pair
pub type TokenCallback = Arc<dyn Fn(&CredentialPair) + Send + Sync>;

/// Why a refresh did not produce a usable access token
///
/// Never returned to callers.
#[derive(Debug, thiserror::Error)]
enum RefreshError {
    #[error("refresh call failed: {0}")]
    Transport(ApiError),
    #[error("refresh token rejected: {0}")]
    Rejected(ApiError),
    #[error("no usable refresh token or access token")]
    MissingToken,
}

impl RefreshError {
    /// Classifies a refresh reply carrying GraphQL errors
    ///
    /// Server-side failures (5xx) are transient and keep the session.
    fn from_envelope(status: u16, response: GraphQLResponse) -> Self {
        let failure = ApiError::GraphQL(response);
        if status >= 500 {
            Self::Transport(failure)
        } else {
            Self::Rejected(failure)
        }
    }
}

impl From<ApiError> for RefreshError {
    fn from(e: ApiError) -> Self {
        let rejected = matches!(&e, ApiError::Http { status, .. } if (400..500).contains(status));
        if rejected {
            Self::Rejected(e)
        } else {
            Self::Transport(e)
        }
    }
}

/// Obtains new access tokens and replays failed requests once
pub struct RefreshCoordinator<H: HttpClient = ReqwestClient> {
    transport: Arc<GraphQLTransport<H>>,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    access_token: RwLock<Option<String>>,
    refresh_lock: Mutex<()>,
    single_flight: bool,
    on_refresh: Option<TokenCallback>,
}

impl<H: HttpClient> RefreshCoordinator<H> {
    /// Creates a coordinator sharing `transport` with the client
    pub fn new(
        transport: Arc<GraphQLTransport<H>>,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            navigator,
            login_path: login_path.into(),
            access_token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            single_flight: true,
            on_refresh: None,
        }
    }

    /// Enables or disables sharing one refresh between concurrent callers
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Registers a callback for newly issued tokens
    pub fn set_on_refresh(&mut self, callback: TokenCallback) {
        self.on_refresh = Some(callback);
    }

    /// Returns the credential store
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Gets the current access token
    pub async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    /// Sets the current access token
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    /// Refreshes the access token and replays `original` once
    ///
    /// Returns the original failure when no refresh token exists (after
    /// redirecting to the login page) or when the refresh does not succeed.
    /// Otherwise returns whatever the retried send yields.
    pub async fn refresh_and_retry(
        &self,
        original: &GraphQLRequest,
        failure: ApiError,
    ) -> Result<GraphQLResponse, ApiError> {
        let Some(refresh_token) = self.store.read_refresh_token().await else {
            tracing::info!("No refresh token available, redirecting to {}", self.login_path);
            self.navigator.redirect_to(&self.login_path);
            return Err(failure);
        };

        let access_token = match self
            .refreshed_access_token(original.bearer(), refresh_token)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Token refresh failed, returning original error: {}", e);
                return Err(failure);
            }
        };

        let retry = original.with_bearer(&access_token);
        self.transport.send(&retry).await?.into_result()
    }

    /// Returns an access token newer than `stale`
    async fn refreshed_access_token(
        &self,
        stale: Option<&str>,
        refresh_token: String,
    ) -> Result<String, RefreshError> {
        if !self.single_flight {
            return self.refresh(&refresh_token).await;
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the guard
        if let Some(current) = self.access_token().await {
            if stale != Some(current.as_str()) {
                tracing::debug!("Reusing access token refreshed by a concurrent request");
                return Ok(current);
            }
        }

        // A rejected refresh by that caller may have cleared the store
        let Some(refresh_token) = self.store.read_refresh_token().await else {
            return Err(RefreshError::MissingToken);
        };
        self.refresh(&refresh_token).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError> {
        tracing::info!("Access token rejected, attempting refresh...");

        let pair = match self.request_credentials(refresh_token).await {
            Ok(pair) => pair,
            Err(e) => {
                if matches!(e, RefreshError::Rejected(_)) {
                    self.discard_session().await;
                }
                return Err(e);
            }
        };

        if let Err(e) = self.store.write_tokens(&pair).await {
            tracing::warn!("Failed to persist refreshed tokens: {:#}", e);
        }
        self.set_access_token(Some(pair.access_token.clone())).await;

        if let Some(callback) = &self.on_refresh {
            callback(&pair);
        }

        tracing::info!("Token refreshed successfully");
        Ok(pair.access_token)
    }

    async fn request_credentials(&self, refresh_token: &str) -> Result<CredentialPair, RefreshError> {
        let request =
            GraphQLRequest::new(REFRESH_MUTATION, json!({ "refreshToken": refresh_token }));
        let (status, response) = self.transport.exchange(&request).await?;
        if response.has_errors() {
            return Err(RefreshError::from_envelope(status, response));
        }

        response
            .data
            .as_ref()
            .and_then(|data| data.get("refreshToken"))
            .and_then(|value| serde_json::from_value::<CredentialPair>(value.clone()).ok())
            .filter(|pair| !pair.access_token.is_empty())
            .ok_or(RefreshError::MissingToken)
    }

    /// Drops credentials after the server rejected the refresh token
    async fn discard_session(&self) {
        tracing::info!("Refresh token rejected, clearing stored credentials");
        self.set_access_token(None).await;
        if let Err(e) = self.store.clear().await {
            tracing::warn!("Failed to clear stored credentials: {:#}", e);
        }
    }
}

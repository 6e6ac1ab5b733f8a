use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::classify::{AuthErrorClassifier, SignatureClassifier};
use super::http::{HttpClient, ReqwestClient};
use super::transport::GraphQLTransport;
use super::types::{ApiError, CancelSignal, GraphQLRequest, GraphQLResponse};
use crate::auth::{CredentialPair, CredentialStore, Navigator, RefreshCoordinator, StoredCredentials};
use crate::config::ClientConfig;

/// GraphQL client that refreshes expired credentials transparently
///
/// One instance per session. Each call is sent once; if it fails with an auth
/// error the client refreshes the access token and replays the call exactly
/// once. Generic over the HTTP client implementation for testability.
pub struct AuthenticatedClient<H: HttpClient = ReqwestClient> {
    transport: Arc<GraphQLTransport<H>>,
    classifier: Arc<dyn AuthErrorClassifier>,
    coordinator: RefreshCoordinator<H>,
}

impl AuthenticatedClient<ReqwestClient> {
    /// Creates a client with the default HTTP implementation
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> anyhow::Result<Self> {
        let http = ReqwestClient::with_timeout(Duration::from_secs(config.request_timeout_sec))?;
        Ok(Self::with_http_client(config, http, store, navigator))
    }
}

impl<H: HttpClient> AuthenticatedClient<H> {
    /// Creates a client with a custom HTTP implementation
    pub fn with_http_client(
        config: &ClientConfig,
        http: H,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let transport =
            Arc::new(GraphQLTransport::new(http, config.endpoint.clone()).with_debug(config.debug));
        let coordinator =
            RefreshCoordinator::new(transport.clone(), store, navigator, config.login_path.clone())
                .with_single_flight(config.single_flight);

        Self {
            transport,
            classifier: Arc::new(SignatureClassifier::new(config.error_policy)),
            coordinator,
        }
    }

    /// Replaces the auth error classifier
    pub fn with_classifier(mut self, classifier: impl AuthErrorClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Registers a callback notified with every refreshed credential pair
    pub fn on_token_refreshed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CredentialPair) + Send + Sync + 'static,
    {
        self.coordinator.set_on_refresh(Arc::new(callback));
        self
    }

    /// Sets the access token for subsequent requests
    pub async fn set_access_token(&self, token: impl Into<String>) {
        self.coordinator.set_access_token(Some(token.into())).await;
    }

    /// Gets the current access token
    pub async fn access_token(&self) -> Option<String> {
        self.coordinator.access_token().await
    }

    /// Resumes a session from persisted credentials
    ///
    /// Returns false if the stored access token is already expired. The
    /// token is still installed so the first call takes the refresh path.
    pub async fn restore_session(&self, credentials: &StoredCredentials) -> bool {
        if credentials.access_token.is_empty() {
            return false;
        }
        self.set_access_token(credentials.access_token.clone()).await;
        let valid = credentials.is_valid();
        if !valid {
            tracing::info!("Restored access token is expired, next request will refresh it");
        }
        valid
    }

    /// Clears authentication state (logout)
    pub async fn clear_session(&self) -> anyhow::Result<()> {
        self.coordinator.set_access_token(None).await;
        self.coordinator.store().clear().await
    }

    /// Builds a request carrying the current access token
    pub async fn request(&self, query: &str, variables: Value) -> GraphQLRequest {
        let request = GraphQLRequest::new(query, variables);
        match self.access_token().await {
            Some(token) => request.with_bearer(&token),
            None => request,
        }
    }

    /// Executes a query or mutation
    ///
    /// A response with a non-empty `errors` array is returned as
    /// `ApiError::GraphQL`.
    pub async fn execute(&self, query: &str, variables: Value) -> Result<GraphQLResponse, ApiError> {
        let request = self.request(query, variables).await;
        self.execute_request(request).await
    }

    /// Executes a query or mutation that aborts when `signal` is set
    pub async fn execute_with_signal(
        &self,
        query: &str,
        variables: Value,
        signal: CancelSignal,
    ) -> Result<GraphQLResponse, ApiError> {
        let request = self.request(query, variables).await.with_signal(signal);
        self.execute_request(request).await
    }

    /// Executes a prepared request, refreshing and retrying once on auth errors
    pub async fn execute_request(
        &self,
        request: GraphQLRequest,
    ) -> Result<GraphQLResponse, ApiError> {
        let failure = match self
            .transport
            .send(&request)
            .await
            .and_then(GraphQLResponse::into_result)
        {
            Ok(response) => return Ok(response),
            Err(failure) => failure,
        };

        if !self.classifier.is_auth_error(&failure) {
            return Err(failure);
        }

        self.coordinator.refresh_and_retry(&request, failure).await
    }

    /// Executes a query and deserializes its `data` into `T`
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, ApiError> {
        let response = self.execute(query, variables).await?;
        serde_json::from_value(response.data.unwrap_or(Value::Null))
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

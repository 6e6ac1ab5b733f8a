use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;

use super::http::{HttpClient, HttpResponse, ReqwestClient};
use super::types::{ApiError, CancelSignal, GraphQLRequest, GraphQLResponse};
use crate::logging::redacted_headers;

/// Sends single GraphQL requests to a fixed endpoint
///
/// Stateless: no retries and no knowledge of credentials beyond the headers
/// already on the request. Generic over the HTTP client implementation for
/// testability.
pub struct GraphQLTransport<H: HttpClient = ReqwestClient> {
    http: H,
    endpoint: String,
    debug: bool,
}

impl<H: HttpClient> GraphQLTransport<H> {
    /// Creates a transport posting to `endpoint`
    pub fn new(http: H, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            debug: false,
        }
    }

    /// Enables request/response diagnostics at debug level
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sends the request once
    ///
    /// Fails with `ApiError::Network` when the call cannot complete, including
    /// when the request's cancellation signal fires first.
    pub async fn send(&self, request: &GraphQLRequest) -> Result<GraphQLResponse, ApiError> {
        self.exchange(request).await.map(|(_, response)| response)
    }

    /// Sends the request once and returns the HTTP status with the envelope
    pub async fn exchange(
        &self,
        request: &GraphQLRequest,
    ) -> Result<(u16, GraphQLResponse), ApiError> {
        let body = serde_json::to_string(&request.body())
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request: {e}")))?;

        let mut headers = request.headers.clone();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if self.debug {
            tracing::debug!(
                url = %self.endpoint,
                headers = ?redacted_headers(&headers),
                "Sending GraphQL request"
            );
        }

        let call = self.http.post_json(&self.endpoint, &headers, body);
        let result = match request.signal.clone() {
            Some(mut signal) => {
                tokio::select! {
                    biased;
                    () = cancelled(&mut signal) => {
                        return Err(ApiError::Network("Request aborted".to_string()));
                    }
                    result = call => result,
                }
            }
            None => call.await,
        };

        let response = result.map_err(|e| ApiError::Network(format!("{e:#}")))?;

        if self.debug {
            tracing::debug!(
                url = %self.endpoint,
                status = response.status,
                bytes = response.body.len(),
                "Received GraphQL response"
            );
        }

        Ok((response.status, parse_envelope(&response)?))
    }
}

/// Resolves once the signal is set. Never resolves if the sender is gone.
async fn cancelled(signal: &mut CancelSignal) {
    if signal.wait_for(|aborted| *aborted).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Best-effort parse of a response body into a GraphQL envelope
///
/// Any status is accepted as long as the body is a JSON object carrying
/// `data` or `errors`.
fn parse_envelope(response: &HttpResponse) -> Result<GraphQLResponse, ApiError> {
    let envelope = response
        .json::<Value>()
        .ok()
        .filter(|v| {
            v.as_object()
                .is_some_and(|o| o.contains_key("data") || o.contains_key("errors"))
        })
        .and_then(|v| serde_json::from_value::<GraphQLResponse>(v).ok());

    match envelope {
        Some(envelope) => Ok(envelope),
        None if response.is_success() => Err(ApiError::InvalidResponse(truncate(&response.body))),
        None => Err(ApiError::Http {
            status: response.status,
            body: truncate(&response.body),
        }),
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 512;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

/// Cancellation signal attached to a request
///
/// The request is aborted once the sender publishes `true`.
pub type CancelSignal = watch::Receiver<bool>;

/// A GraphQL request envelope
///
/// Envelopes are not mutated once built. A retry derives a new envelope via
/// [`GraphQLRequest::with_bearer`].
#[derive(Debug, Clone)]
pub struct GraphQLRequest {
    pub query: String,
    pub variables: Value,
    pub headers: HeaderMap,
    pub signal: Option<CancelSignal>,
}

/// JSON body sent to the endpoint
#[derive(Debug, Serialize)]
pub(crate) struct RequestBody<'a> {
    pub query: &'a str,
    pub variables: &'a Value,
}

impl GraphQLRequest {
    /// Creates a request with no headers and no cancellation signal
    pub fn new(query: impl Into<String>, variables: Value) -> Self {
        Self {
            query: query.into(),
            variables,
            headers: HeaderMap::new(),
            signal: None,
        }
    }

    /// Attaches a cancellation signal
    pub fn with_signal(mut self, signal: CancelSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Returns a copy of this request carrying `Authorization: Bearer <token>`
    ///
    /// Query, variables, other headers and the signal are shared with the original.
    pub fn with_bearer(&self, token: &str) -> Self {
        let mut next = self.clone();
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                next.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!("Access token is not a valid header value, sending without it");
                next.headers.remove(AUTHORIZATION);
            }
        }
        next
    }

    /// Returns the bearer token currently attached, if any
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    pub(crate) fn body(&self) -> RequestBody<'_> {
        RequestBody {
            query: &self.query,
            variables: &self.variables,
        }
    }
}

/// A GraphQL response envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLErrorEntry>>,
}

impl GraphQLResponse {
    /// Returns the error entries, empty when there are none
    pub fn error_entries(&self) -> &[GraphQLErrorEntry] {
        self.errors.as_deref().unwrap_or_default()
    }

    /// Returns true if the `errors` array is present and non-empty
    pub fn has_errors(&self) -> bool {
        !self.error_entries().is_empty()
    }

    /// Turns a response carrying errors into `ApiError::GraphQL`
    pub fn into_result(self) -> Result<Self, ApiError> {
        if self.has_errors() {
            Err(ApiError::GraphQL(self))
        } else {
            Ok(self)
        }
    }
}

/// A single entry of the `errors` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLErrorEntry {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQLErrorEntry {
    /// Creates an entry with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }

    /// Returns `extensions.code` when it is a string
    pub fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(Value::as_str)
    }
}

/// Source location of a GraphQL error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// Errors surfaced by the GraphQL transport and client
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The call could not complete (DNS, connect, timeout, abort)
    #[error("Network error: {0}")]
    Network(String),
    /// Non-2xx status without a GraphQL envelope in the body
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    /// 2xx status without a GraphQL envelope in the body
    #[error("Invalid GraphQL response: {0}")]
    InvalidResponse(String),
    /// Well-formed response with a populated `errors` array
    #[error("{}", join_messages(.0))]
    GraphQL(GraphQLResponse),
    /// `data` could not be deserialized into the requested type
    #[error("Failed to decode response data: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns the GraphQL response for `ApiError::GraphQL`
    pub fn response(&self) -> Option<&GraphQLResponse> {
        match self {
            Self::GraphQL(response) => Some(response),
            _ => None,
        }
    }
}

fn join_messages(response: &GraphQLResponse) -> String {
    response
        .error_entries()
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

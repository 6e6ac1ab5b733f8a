//! GraphQL transport and the authenticated client
//!
//! [`AuthenticatedClient`] is the entry point: it sends documents through
//! [`GraphQLTransport`] and hands auth failures to the refresh coordinator.

mod classify;
mod client;
pub mod http;
pub(crate) mod transport;
pub(crate) mod types;

pub use classify::{
    AuthErrorClassifier, ErrorPolicy, SignatureClassifier, DEFAULT_ERROR_CODES,
    DEFAULT_MESSAGE_SIGNATURES,
};
pub use client::AuthenticatedClient;
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use transport::GraphQLTransport;
pub use types::{ApiError, CancelSignal, GraphQLErrorEntry, GraphQLRequest, GraphQLResponse, Location};

//! Authenticated GraphQL client for the folio site
//!
//! Requests that fail with an expired or invalid access token are refreshed
//! with the session's refresh token and replayed once. Hosts plug in where
//! tokens live ([`auth::CredentialStore`]) and how the user is sent to the
//! login page ([`auth::Navigator`]).

pub mod auth;
pub mod config;
pub mod graphql;
pub mod logging;

#[cfg(test)]
mod testutil;

pub use auth::{CredentialStore, Navigator};
pub use config::ClientConfig;
pub use graphql::{ApiError, AuthenticatedClient, GraphQLResponse};

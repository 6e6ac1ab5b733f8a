//! Test fixtures
//!
//! Canned GraphQL documents and payloads for the refresh scenarios.

use serde_json::{json, Value};

use crate::graphql::{ApiError, GraphQLErrorEntry, GraphQLResponse};

/// Query used throughout the refresh scenarios
pub const GET_CURRENT_USER: &str = "query GetCurrentUser { me { id name } }";

/// Successful `GetCurrentUser` payload
pub fn user_payload(id: &str, name: &str) -> Value {
    json!({ "data": { "me": { "id": id, "name": name } } })
}

/// Successful refresh mutation payload
pub fn refresh_payload(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "data": {
            "refreshToken": {
                "accessToken": access_token,
                "refreshToken": refresh_token,
                "expiresIn": 900,
                "tokenType": "Bearer"
            }
        }
    })
}

/// Payload whose only error carries `message`
pub fn error_payload(message: &str) -> Value {
    json!({ "errors": [{ "message": message }], "data": null })
}

/// GraphQL failure whose only error carries `message`
pub fn auth_failure(message: &str) -> ApiError {
    ApiError::GraphQL(GraphQLResponse {
        data: None,
        errors: Some(vec![GraphQLErrorEntry::new(message)]),
    })
}

//! Common test utilities for integration tests

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use folio_backend::auth::Navigator;
use folio_backend::ClientConfig;
use wiremock::MockServer;

pub const GET_CURRENT_USER: &str = "query GetCurrentUser { me { id name } }";

/// Navigator that records every redirect
#[derive(Debug, Default, Clone)]
pub struct RecordingNavigator {
    redirects: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to(&self, path: &str) {
        self.redirects.lock().unwrap().push(path.to_string());
    }
}

/// Creates a config pointing at the mock server's GraphQL endpoint
pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(format!("{}/graphql", server.uri()))
}

pub fn user_payload(id: &str, name: &str) -> Value {
    json!({ "data": { "me": { "id": id, "name": name } } })
}

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

pub fn error_payload(message: &str) -> Value {
    json!({ "errors": [{ "message": message }], "data": null })
}

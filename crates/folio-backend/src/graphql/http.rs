//! HTTP client abstraction for the GraphQL endpoint
//!
//! This module provides a trait-based HTTP client that can be easily mocked for testing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Trait for making HTTP requests
///
/// This abstraction allows easy mocking of HTTP calls in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Makes a POST request with a JSON body and returns the raw response
    ///
    /// Only fails when the request could not complete. Error statuses are
    /// returned as a normal `HttpResponse`.
    async fn post_json(&self, url: &str, headers: &HeaderMap, body: String)
        -> Result<HttpResponse>;
}

/// Response from an HTTP request
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Returns true if status is in 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserializes the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).context("Failed to parse JSON response")
    }
}

/// Production HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client whose requests time out after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: String,
    ) -> Result<HttpResponse> {
        let response = self
            .inner
            .post(url)
            .headers(headers.clone())
            .body(body)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok(HttpResponse { status, body })
    }
}

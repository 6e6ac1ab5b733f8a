//! Mock implementations for testing
//!
//! This module re-exports mock implementations from their respective modules
//! for convenient access in tests.

// Re-export HTTP mocks
pub use crate::graphql::http::mock::{MockHttpClient, RecordedRequest};

// Re-export navigator mocks
pub use crate::auth::navigator::mock::RecordingNavigator;

// In-memory credential store is part of the public API
pub use crate::auth::store::MemoryCredentialStore;

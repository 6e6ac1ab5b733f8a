//! Test utilities for the folio backend
//!
//! This module provides mocks and fixtures for testing.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

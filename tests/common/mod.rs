//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - A scripted in-process jobs API
//! - Queue and job fixtures
//! - Custom assertion macros

#[macro_use]
pub mod assertions;
pub mod fixtures;
pub mod mock_api;

// Re-export commonly used utilities
pub use fixtures::*;
pub use mock_api::*;

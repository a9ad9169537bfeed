//! Integration tests
//!
//! End-to-end behaviour of the offline queue against a scripted backend, the
//! SQLite store, and the HTTP client against a mock server.

mod http_client_test;
mod reconciliation_test;

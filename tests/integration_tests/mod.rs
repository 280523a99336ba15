//! Integration tests module
//!
//! End-to-end tests that run the harvester against a wiremock server standing
//! in for the publisher, with journals in a temporary directory.

pub mod error_scenarios;
pub mod fixtures;

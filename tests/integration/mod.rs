//! Integration test suite for app-updater
//!
//! End-to-end tests against a local HTTP server standing in for GitHub.
//! Every test works inside its own temporary installation root.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: the binary's exit codes, output, and launch behaviour
//! - **update_flow**: library-level update cycles driven from a config file

mod cli;
mod common;
mod update_flow;

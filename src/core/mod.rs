//! Core types shared across the updater.
//!
//! Currently this is the error model: the [`UpdaterError`] enum and the
//! [`ErrorContext`] wrapper used by the binary to print actionable messages.

pub mod error;

pub use error::{ErrorContext, UpdaterError, user_friendly_error};

//! Error handling for the updater.
//!
//! Failures are modelled as a single [`UpdaterError`] enum carried inside
//! [`anyhow::Error`], so callers can attach context with `.context(...)` and
//! the binary can still recover the typed error at the top level.
//!
//! # Error Types
//!
//! - [`UpdaterError`] - Enum of every failure the updater reports
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Example
//!
//! ```rust,no_run
//! use app_updater::core::{UpdaterError, user_friendly_error};
//!
//! let error = anyhow::Error::new(UpdaterError::RemoteVersionUnavailable {
//!     url: "https://example.com/VERSION".to_string(),
//! });
//! user_friendly_error(error).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Every failure the updater can report.
///
/// Only [`UpdaterError::RemoteVersionUnavailable`] is produced deliberately as a
/// controlled outcome; the other variants abort a run that is already past the
/// version check.
#[derive(Error, Debug, Clone)]
pub enum UpdaterError {
    /// The remote version marker could not be fetched.
    #[error("Cannot get remote version from {url}")]
    RemoteVersionUnavailable {
        /// Version endpoint that was queried.
        url: String,
    },

    /// The archive download failed or returned an error status.
    #[error("Failed to download archive from {url}: {reason}")]
    DownloadFailed {
        /// Archive endpoint.
        url: String,
        /// Transport or status error.
        reason: String,
    },

    /// The downloaded file is not a readable zip archive.
    #[error("Invalid archive {path}: {reason}")]
    InvalidArchive {
        /// Location of the downloaded archive.
        path: String,
        /// Parser error.
        reason: String,
    },

    /// An archive entry would be written outside the installation root.
    #[error("Archive entry escapes the installation root: {entry}")]
    UnsafeArchiveEntry {
        /// Full entry name as stored in the archive.
        entry: String,
    },

    /// Swapping a staged tree into place failed.
    #[error("Failed to swap {staged} into {root}")]
    SwapFailed {
        /// Installation root.
        root: String,
        /// Staged tree that was to replace it.
        staged: String,
    },

    /// The updated application could not be started.
    #[error("Failed to launch {program}: {reason}")]
    LaunchFailed {
        /// Program handed to the interpreter.
        program: String,
        /// Spawn error.
        reason: String,
    },

    /// The configuration file is invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong.
        message: String,
    },

    /// A filesystem operation failed.
    #[error("File system error: {operation} ({path})")]
    FileSystemError {
        /// Operation that failed.
        operation: String,
        /// Path involved.
        path: String,
    },

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Message shown to the user.
        message: String,
    },
}

/// An [`UpdaterError`] with an optional suggestion and extra details.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error.
    pub error: UpdaterError,
    /// What the user can do about it.
    pub suggestion: Option<String>,
    /// Additional explanation.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error without suggestion or details.
    #[must_use]
    pub const fn new(error: UpdaterError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details, and suggestion to stderr.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for display.
///
/// Typed [`UpdaterError`]s anywhere in the chain get a tailored suggestion.
/// Other errors are reported with their full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let typed = error
        .downcast_ref::<UpdaterError>()
        .or_else(|| error.chain().find_map(|e| e.downcast_ref::<UpdaterError>()));
    if let Some(updater_error) = typed {
        return create_error_context(updater_error.clone());
    }

    let permission_denied = error
        .chain()
        .filter_map(|e| e.downcast_ref::<std::io::Error>())
        .any(|e| e.kind() == std::io::ErrorKind::PermissionDenied);
    if permission_denied {
        return ErrorContext::new(UpdaterError::FileSystemError {
            operation: "permission denied".to_string(),
            path: error.to_string(),
        })
        .with_details(format_chain(&error))
        .with_suggestion("Run the updater as a user that owns the installation root");
    }

    ErrorContext::new(UpdaterError::Other {
        message: format_chain(&error),
    })
}

/// The error followed by a numbered "Caused by" list.
fn format_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

fn create_error_context(error: UpdaterError) -> ErrorContext {
    match error {
        e @ UpdaterError::RemoteVersionUnavailable { .. } => ErrorContext::new(e)
            .with_suggestion("Check network connectivity and that the repository and branch exist")
            .with_details("Nothing was changed on disk"),

        e @ UpdaterError::DownloadFailed { .. } => ErrorContext::new(e)
            .with_suggestion("Retry later; the installation tree was not modified")
            .with_details("The archive is downloaded completely before the installation is touched"),

        e @ (UpdaterError::InvalidArchive { .. } | UpdaterError::UnsafeArchiveEntry { .. }) => {
            ErrorContext::new(e)
                .with_suggestion("Verify the archive URL points at a zip of the repository branch")
        }

        e @ UpdaterError::SwapFailed { .. } => ErrorContext::new(e)
            .with_suggestion("Move the '.previous' directory back into place by hand if the root is missing"),

        e @ UpdaterError::LaunchFailed { .. } => ErrorContext::new(e)
            .with_suggestion("Check that the interpreter exists and the entry file is present")
            .with_details("The update itself completed and the new version was recorded"),

        e @ UpdaterError::ConfigError { .. } => ErrorContext::new(e)
            .with_suggestion("Fix the configuration file or remove it to use built-in defaults"),

        e @ UpdaterError::FileSystemError { .. } => ErrorContext::new(e)
            .with_suggestion("Check permissions on the installation root"),

        e @ UpdaterError::Other { .. } => ErrorContext::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_display() {
        let error = UpdaterError::RemoteVersionUnavailable {
            url: "https://example.com/VERSION".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot get remote version from https://example.com/VERSION");

        let error = UpdaterError::DownloadFailed {
            url: "https://example.com/a.zip".to_string(),
            reason: "HTTP 404".to_string(),
        };
        assert!(error.to_string().contains("HTTP 404"));
    }

    #[test]
    fn test_user_friendly_error_finds_typed_error_under_context() {
        let error: anyhow::Result<()> = Err(UpdaterError::LaunchFailed {
            program: "/opt/app/app.py".to_string(),
            reason: "No such file or directory".to_string(),
        }
        .into());
        let error = error.context("Failed to relaunch application").unwrap_err();

        let ctx = user_friendly_error(error);
        assert!(matches!(ctx.error, UpdaterError::LaunchFailed { .. }));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_user_friendly_error_generic_includes_chain() {
        let error = anyhow::anyhow!("root cause").context("outer operation");
        let ctx = user_friendly_error(error);

        let rendered = ctx.to_string();
        assert!(rendered.contains("outer operation"));
        assert!(rendered.contains("Caused by:"));
        assert!(rendered.contains("root cause"));
    }

    #[test]
    fn test_permission_denied_keeps_path_context() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error = anyhow::Error::new(io).context("Failed to create /opt/smartfarm/x");

        let ctx = user_friendly_error(error);
        assert!(matches!(ctx.error, UpdaterError::FileSystemError { .. }));
        assert!(ctx.error.to_string().contains("/opt/smartfarm/x"));

        let details = ctx.details.unwrap();
        assert!(details.contains("Failed to create /opt/smartfarm/x"));
        assert!(details.contains("Permission denied"));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_error_context_display_format() {
        let ctx = ErrorContext::new(UpdaterError::ConfigError {
            message: "self_file must be a plain file name".to_string(),
        })
        .with_suggestion("fix it")
        .with_details("more");

        assert_eq!(
            ctx.to_string(),
            "Configuration error: self_file must be a plain file name\nDetails: more\nSuggestion: fix it"
        );
    }
}

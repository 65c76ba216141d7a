//! Test utilities for the updater.
//!
//! Shared by unit tests and, through the `test-utils` feature, by the
//! integration suite:
//! - [`init_test_logging`] for opt-in tracing output
//! - [`ArchiveBuilder`] for branch-archive fixtures
//!
//! # Example
//!
//! ```rust,no_run
//! use app_updater::test_utils::ArchiveBuilder;
//!
//! let bytes = ArchiveBuilder::new("repo-main/")
//!     .file("app.py", b"print('hi')")
//!     .file("extra/config.txt", b"Y")
//!     .build()
//!     .unwrap();
//! ```

use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`. With neither, tests run
/// without a subscriber.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

enum Entry {
    Dir(String),
    File(String, Vec<u8>),
}

/// Builds zip archives shaped like GitHub branch archives.
///
/// Paths given to [`dir`](Self::dir) and [`file`](Self::file) are relative to
/// the inner prefix; [`raw_file`](Self::raw_file) takes the full entry name.
/// The prefix directory entry itself is always written first.
pub struct ArchiveBuilder {
    prefix: String,
    entries: Vec<Entry>,
}

impl ArchiveBuilder {
    /// Archive whose entries live under `prefix` (e.g. `repo-main/`).
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: Vec::new(),
        }
    }

    /// Add a directory entry under the prefix.
    pub fn dir(mut self, relative: &str) -> Self {
        self.entries.push(Entry::Dir(format!("{}{}", self.prefix, relative)));
        self
    }

    /// Add a file under the prefix.
    pub fn file(mut self, relative: &str, contents: &[u8]) -> Self {
        self.entries.push(Entry::File(format!("{}{}", self.prefix, relative), contents.to_vec()));
        self
    }

    /// Add a file with an arbitrary entry name.
    pub fn raw_file(mut self, name: &str, contents: &[u8]) -> Self {
        self.entries.push(Entry::File(name.to_string(), contents.to_vec()));
        self
    }

    /// Serialize the archive.
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        if !self.prefix.is_empty() {
            zip.add_directory(self.prefix.clone(), options)?;
        }

        for entry in &self.entries {
            match entry {
                Entry::Dir(name) => zip.add_directory(name.clone(), options)?,
                Entry::File(name, contents) => {
                    zip.start_file(name.clone(), options)?;
                    zip.write_all(contents)?;
                }
            }
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Serialize the archive to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.build()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write archive to {}", path.display()))
    }
}

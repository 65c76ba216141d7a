//! Persistent state of an installation.
//!
//! The only state the updater keeps is the installed version marker and the
//! installation root it belongs to. [`VersionStore`] abstracts both so the
//! orchestration can be exercised against [`MemoryVersionStore`] without
//! touching real paths.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::constants::FALLBACK_VERSION;
use crate::utils::fs::atomic_write;

/// Access to the installed version marker of one installation root.
pub trait VersionStore: Send + Sync {
    /// Root directory of the installation.
    fn install_root(&self) -> &Path;

    /// Installed version, trimmed.
    ///
    /// Never fails: a missing or unreadable marker reads as `"0.0.0"`.
    fn installed_version(&self) -> String;

    /// Replace the recorded version with `version`.
    fn record_version(&self, version: &str) -> Result<()>;
}

/// Version marker stored as a plain text file inside the installation root.
#[derive(Debug, Clone)]
pub struct FileVersionStore {
    root: PathBuf,
    version_path: PathBuf,
}

impl FileVersionStore {
    /// Store for `root`, with the marker at `root/version_file`.
    pub fn new(root: impl Into<PathBuf>, version_file: &str) -> Self {
        let root = root.into();
        let version_path = root.join(version_file);
        Self {
            root,
            version_path,
        }
    }

    /// Full path of the marker file.
    pub fn version_path(&self) -> &Path {
        &self.version_path
    }
}

impl VersionStore for FileVersionStore {
    fn install_root(&self) -> &Path {
        &self.root
    }

    fn installed_version(&self) -> String {
        match std::fs::read_to_string(&self.version_path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                debug!(
                    "Cannot read {} ({}), assuming {}",
                    self.version_path.display(),
                    e,
                    FALLBACK_VERSION
                );
                FALLBACK_VERSION.to_string()
            }
        }
    }

    fn record_version(&self, version: &str) -> Result<()> {
        atomic_write(&self.version_path, version.as_bytes()).with_context(|| {
            format!("Failed to record version in {}", self.version_path.display())
        })?;
        debug!("Recorded version {} in {}", version, self.version_path.display());
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    root: PathBuf,
    version: Mutex<Option<String>>,
}

impl MemoryVersionStore {
    /// Store for `root` with an optional initial version.
    pub fn new(root: impl Into<PathBuf>, version: Option<&str>) -> Self {
        Self {
            root: root.into(),
            version: Mutex::new(version.map(str::to_string)),
        }
    }

    /// The raw recorded value, `None` if nothing was ever recorded.
    pub fn recorded(&self) -> Option<String> {
        self.version.lock().ok().and_then(|v| v.clone())
    }
}

impl VersionStore for MemoryVersionStore {
    fn install_root(&self) -> &Path {
        &self.root
    }

    fn installed_version(&self) -> String {
        self.recorded()
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| FALLBACK_VERSION.to_string())
    }

    fn record_version(&self, version: &str) -> Result<()> {
        let mut guard =
            self.version.lock().map_err(|_| anyhow::anyhow!("Version store lock poisoned"))?;
        *guard = Some(version.to_string());
        Ok(())
    }
}

//! Replacement of the installation tree with the contents of an archive.
//!
//! Three policies are available:
//!
//! - [`ReplacePolicy::InPlace`] (default): keep the root directory, remove
//!   every immediate child except the updater's own file, then extract with
//!   that file excluded. Individual removal failures are logged and skipped.
//! - [`ReplacePolicy::Wipe`]: delete the root, recreate it empty, extract
//!   everything. The updater is expected to be part of the archive.
//! - [`ReplacePolicy::Staged`]: extract into `<root>.staging`, then swap
//!   directories with two renames and delete the previous tree. The running
//!   updater is never modified in place.
//!
//! Every policy ends by marking the entry file and the updater executable
//! when they exist.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::{PREVIOUS_SUFFIX, STAGING_SUFFIX};
use crate::core::UpdaterError;
use crate::upgrade::archive::{ArchiveExtractor, ExtractSummary};
use crate::utils::fs::{ensure_dir, remove_dir_all, remove_path, set_executable};

/// Strategy used to replace the installation tree.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ReplacePolicy {
    /// Selective in-place replace that preserves the updater's own file.
    #[default]
    InPlace,
    /// Delete and recreate the whole root.
    Wipe,
    /// Extract beside the root and swap directories.
    Staged,
}

/// What a replace did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaceReport {
    /// Extraction result.
    pub extract: ExtractSummary,
    /// Paths that could not be removed during cleanup.
    pub removal_failures: Vec<PathBuf>,
    /// Files that were marked executable.
    pub marked_executable: Vec<PathBuf>,
}

/// Replaces one installation root from branch archives.
#[derive(Debug, Clone)]
pub struct TreeReplacer {
    root: PathBuf,
    inner_prefix: String,
    self_file: String,
    entry_file: String,
    policy: ReplacePolicy,
}

impl TreeReplacer {
    /// Replacer for `root`.
    ///
    /// `self_file` is the updater's own file name in the root, `entry_file` the
    /// main application file relative to the root.
    pub fn new(
        root: impl Into<PathBuf>,
        inner_prefix: impl Into<String>,
        self_file: impl Into<String>,
        entry_file: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            inner_prefix: inner_prefix.into(),
            self_file: self_file.into(),
            entry_file: entry_file.into(),
            policy: ReplacePolicy::default(),
        }
    }

    /// Select the replace policy.
    pub fn policy(mut self, policy: ReplacePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the installation tree with the contents of `archive`.
    pub fn replace(&self, archive: &Path) -> Result<ReplaceReport> {
        info!("Replacing {} using {:?} policy", self.root.display(), self.policy);

        let mut report = match self.policy {
            ReplacePolicy::InPlace => self.replace_in_place(archive)?,
            ReplacePolicy::Wipe => self.wipe_and_recreate(archive)?,
            ReplacePolicy::Staged => self.staged_swap(archive)?,
        };

        report.marked_executable = self.mark_executables()?;
        Ok(report)
    }

    fn replace_in_place(&self, archive: &Path) -> Result<ReplaceReport> {
        ensure_dir(&self.root)?;

        let mut removal_failures = Vec::new();
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to list {}", self.root.display()))?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry in {}: {}", self.root.display(), e);
                    continue;
                }
            };

            if entry.file_name() == self.self_file.as_str() {
                debug!("Preserving {}", entry.path().display());
                continue;
            }

            let path = entry.path();
            if let Err(e) = remove_path(&path) {
                warn!("Failed to remove {}: {:#}", path.display(), e);
                removal_failures.push(path);
            }
        }

        let extract = ArchiveExtractor::new(&self.inner_prefix)
            .exclude(&self.self_file)
            .extract(archive, &self.root)?;

        Ok(ReplaceReport {
            extract,
            removal_failures,
            marked_executable: Vec::new(),
        })
    }

    fn wipe_and_recreate(&self, archive: &Path) -> Result<ReplaceReport> {
        remove_dir_all(&self.root)?;
        ensure_dir(&self.root)?;

        let extract = ArchiveExtractor::new(&self.inner_prefix).extract(archive, &self.root)?;

        Ok(ReplaceReport {
            extract,
            ..ReplaceReport::default()
        })
    }

    fn staged_swap(&self, archive: &Path) -> Result<ReplaceReport> {
        let staging = self.sibling(STAGING_SUFFIX);
        let previous = self.sibling(PREVIOUS_SUFFIX);

        // A run interrupted between the two renames leaves only `.previous`
        if !self.root.exists() && previous.is_dir() {
            warn!(
                "Restoring {} from interrupted swap at {}",
                self.root.display(),
                previous.display()
            );
            fs::rename(&previous, &self.root).with_context(|| {
                format!("Failed to restore {} from {}", self.root.display(), previous.display())
            })?;
        }

        // Leftovers from an interrupted run
        remove_dir_all(&staging)?;
        remove_dir_all(&previous)?;

        ensure_dir(&staging)?;
        let extract = ArchiveExtractor::new(&self.inner_prefix).extract(archive, &staging)?;

        let current_self = self.root.join(&self.self_file);
        let staged_self = staging.join(&self.self_file);
        if current_self.is_file() && !staged_self.exists() {
            debug!("Carrying {} into staged tree", current_self.display());
            fs::copy(&current_self, &staged_self).with_context(|| {
                format!("Failed to copy {} into staged tree", current_self.display())
            })?;
        }

        let swap_error = || UpdaterError::SwapFailed {
            root: self.root.display().to_string(),
            staged: staging.display().to_string(),
        };

        let had_root = self.root.exists();
        if had_root {
            fs::rename(&self.root, &previous).with_context(swap_error)?;
        }
        fs::rename(&staging, &self.root).with_context(swap_error)?;

        let mut removal_failures = Vec::new();
        if had_root && let Err(e) = remove_dir_all(&previous) {
            warn!("Failed to remove previous tree {}: {:#}", previous.display(), e);
            removal_failures.push(previous);
        }

        Ok(ReplaceReport {
            extract,
            removal_failures,
            marked_executable: Vec::new(),
        })
    }

    fn mark_executables(&self) -> Result<Vec<PathBuf>> {
        let mut marked = Vec::new();
        for name in [&self.entry_file, &self.self_file] {
            let path = self.root.join(name);
            if path.is_file() {
                set_executable(&path)?;
                marked.push(path);
            } else {
                debug!("{} not present, not marking executable", path.display());
            }
        }
        Ok(marked)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "install".to_string());
        self.root.with_file_name(format!("{name}.{suffix}"))
    }
}

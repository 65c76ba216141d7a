//! Extraction of branch archives.
//!
//! Every entry of a branch archive lives under a single directory named
//! `<repository>-<branch>/`. Extraction strips exactly that prefix, skips
//! directory entries and anything outside the prefix, and writes file bytes
//! verbatim to the matching path under the destination.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};
use zip::ZipArchive;

use crate::core::UpdaterError;
use crate::utils::fs::ensure_parent_dir;

/// What an extraction did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Relative paths written, in archive order.
    pub written: Vec<PathBuf>,
    /// Relative paths skipped because they matched the excluded file.
    pub excluded: Vec<PathBuf>,
    /// Entries ignored because they are outside the inner prefix.
    pub outside_prefix: usize,
}

/// Extracts the files under an inner prefix of a zip archive.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    inner_prefix: String,
    exclude: Option<PathBuf>,
}

impl ArchiveExtractor {
    /// Extractor for entries under `inner_prefix` (e.g. `repo-main/`).
    pub fn new(inner_prefix: impl Into<String>) -> Self {
        Self {
            inner_prefix: inner_prefix.into(),
            exclude: None,
        }
    }

    /// Never write the entry whose relative path equals `relative`.
    pub fn exclude(mut self, relative: impl Into<PathBuf>) -> Self {
        self.exclude = Some(relative.into());
        self
    }

    /// Extract `archive` into `dest`.
    ///
    /// Parent directories are created as needed and existing files are
    /// overwritten. Nothing is removed.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable archive, on an entry whose relative path would
    /// leave `dest`, and on any write error.
    pub fn extract(&self, archive: &Path, dest: &Path) -> Result<ExtractSummary> {
        let file = fs::File::open(archive)
            .with_context(|| format!("Failed to open archive {}", archive.display()))?;
        let mut zip = ZipArchive::new(file).map_err(|e| UpdaterError::InvalidArchive {
            path: archive.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut summary = ExtractSummary::default();

        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(|e| UpdaterError::InvalidArchive {
                path: archive.display().to_string(),
                reason: e.to_string(),
            })?;

            if entry.is_dir() {
                continue;
            }

            let name = entry.name().to_string();
            let Some(relative) = self.relative_path(&name)? else {
                trace!("Ignoring entry outside prefix: {}", name);
                summary.outside_prefix += 1;
                continue;
            };

            if self.exclude.as_deref() == Some(relative.as_path()) {
                debug!("Skipping excluded entry {}", name);
                summary.excluded.push(relative);
                continue;
            }

            let out_path = dest.join(&relative);
            ensure_parent_dir(&out_path)?;

            let mut out = fs::File::create(&out_path)
                .with_context(|| format!("Failed to create {}", out_path.display()))?;
            io::copy(&mut entry, &mut out)
                .with_context(|| format!("Failed to extract {} to {}", name, out_path.display()))?;

            trace!("Extracted {}", relative.display());
            summary.written.push(relative);
        }

        debug!(
            "Extracted {} files into {} ({} excluded, {} outside prefix)",
            summary.written.len(),
            dest.display(),
            summary.excluded.len(),
            summary.outside_prefix
        );
        Ok(summary)
    }

    /// Map an entry name to its installation-relative path.
    ///
    /// Returns `None` for entries outside the prefix and for the prefix
    /// directory itself.
    fn relative_path(&self, name: &str) -> Result<Option<PathBuf>> {
        let Some(rest) = name.strip_prefix(&self.inner_prefix) else {
            return Ok(None);
        };
        if rest.is_empty() {
            return Ok(None);
        }

        let mut relative = PathBuf::new();
        for component in Path::new(rest).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(UpdaterError::UnsafeArchiveEntry {
                        entry: name.to_string(),
                    }
                    .into());
                }
            }
        }

        if relative.as_os_str().is_empty() {
            return Ok(None);
        }
        Ok(Some(relative))
    }
}

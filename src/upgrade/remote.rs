//! Network side of an update: the version marker and the branch archive.
//!
//! The two calls have deliberately different failure policies. A failed
//! version check is swallowed into `None` so the caller can exit in a
//! controlled way; a failed download is an error that aborts the update
//! before the installation tree is touched.

use anyhow::{Context, Result};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::config::UpdaterConfig;
use crate::constants::{ARCHIVE_DOWNLOAD_TIMEOUT, DOWNLOAD_CHUNK_SIZE, VERSION_CHECK_TIMEOUT};
use crate::core::UpdaterError;
use crate::utils::progress::ProgressBar;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// An archive downloaded to a temporary file.
///
/// The file is deleted when this value is dropped.
#[derive(Debug)]
pub struct DownloadedArchive {
    file: NamedTempFile,
    size: u64,
    sha256: String,
}

impl DownloadedArchive {
    /// Location of the temporary archive.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes written.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Digest of the downloaded bytes as `sha256:<hex>`, for diagnostics only.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }
}

/// HTTP endpoints serving the version marker and the archive.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    version_url: String,
    archive_url: String,
    version_timeout: Duration,
    download_timeout: Duration,
    show_progress: bool,
}

impl RemoteSource {
    /// Source with the default timeouts and no progress bar.
    pub fn new(version_url: impl Into<String>, archive_url: impl Into<String>) -> Self {
        Self {
            version_url: version_url.into(),
            archive_url: archive_url.into(),
            version_timeout: VERSION_CHECK_TIMEOUT,
            download_timeout: ARCHIVE_DOWNLOAD_TIMEOUT,
            show_progress: false,
        }
    }

    /// Source for the URLs and timeouts in `config`.
    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self {
            version_url: config.version_url(),
            archive_url: config.archive_url(),
            version_timeout: config.version_timeout(),
            download_timeout: config.download_timeout(),
            show_progress: false,
        }
    }

    /// Draw a progress bar while downloading.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Override both timeouts.
    pub fn timeouts(mut self, version: Duration, download: Duration) -> Self {
        self.version_timeout = version;
        self.download_timeout = download;
        self
    }

    /// Version marker URL.
    pub fn version_url(&self) -> &str {
        &self.version_url
    }

    /// Archive URL.
    pub fn archive_url(&self) -> &str {
        &self.archive_url
    }

    /// Fetch the remote version marker.
    ///
    /// Returns the trimmed body, or `None` when the request fails for any
    /// reason (transport error, timeout, non-success status, empty body).
    /// Failures are logged, never raised.
    pub async fn fetch_version(&self) -> Option<String> {
        match self.try_fetch_version().await {
            Ok(version) if !version.is_empty() => {
                debug!("Remote version: {}", version);
                Some(version)
            }
            Ok(_) => {
                warn!("Remote version at {} is empty", self.version_url);
                None
            }
            Err(e) => {
                warn!("Fetch remote version failed: {:#}", e);
                None
            }
        }
    }

    async fn try_fetch_version(&self) -> Result<String> {
        debug!("Fetching remote version from {}", self.version_url);

        let client = reqwest::Client::builder()
            .timeout(self.version_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .get(&self.version_url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.version_url))?
            .error_for_status()
            .context("Version endpoint returned an error status")?;

        let body = response.text().await.context("Failed to read version body")?;
        Ok(body.trim().to_string())
    }

    /// Download the archive into a fresh temporary file.
    ///
    /// The body is streamed and written in slices of at most
    /// [`DOWNLOAD_CHUNK_SIZE`] bytes, so memory use does not grow with the
    /// archive size.
    ///
    /// # Errors
    ///
    /// Any transport error or non-success status yields
    /// [`UpdaterError::DownloadFailed`].
    pub async fn download_archive(&self) -> Result<DownloadedArchive> {
        let download_error = |reason: String| UpdaterError::DownloadFailed {
            url: self.archive_url.clone(),
            reason,
        };

        info!("Downloading archive from {}", self.archive_url);

        let client = reqwest::Client::builder()
            .connect_timeout(self.download_timeout)
            .read_timeout(self.download_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .get(&self.archive_url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| download_error(e.to_string()))?;

        let temp = tempfile::Builder::new()
            .prefix("app-updater-")
            .suffix(".zip")
            .tempfile()
            .context("Failed to create temporary archive file")?;
        let handle = temp.reopen().context("Failed to open temporary archive file")?;
        let mut writer =
            BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, tokio::fs::File::from_std(handle));

        let progress = ProgressBar::new_download(response.content_length(), self.show_progress);
        progress.set_message("Downloading");

        let mut hasher = Sha256::new();
        let mut size = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| download_error(e.to_string()))?;
            for slice in chunk.chunks(DOWNLOAD_CHUNK_SIZE) {
                writer.write_all(slice).await.context("Failed to write archive chunk")?;
                hasher.update(slice);
                size += slice.len() as u64;
                progress.inc(slice.len() as u64);
            }
        }

        writer.flush().await.context("Failed to flush archive")?;
        writer.into_inner().sync_all().await.context("Failed to sync archive to disk")?;
        progress.finish_and_clear();

        let sha256 = format!("sha256:{:x}", hasher.finalize());
        debug!("Archive saved to {} ({} bytes, {})", temp.path().display(), size, sha256);

        Ok(DownloadedArchive {
            file: temp,
            size,
            sha256,
        })
    }
}

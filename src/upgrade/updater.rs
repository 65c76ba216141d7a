//! Top-level update cycle.
//!
//! [`Updater`] ties the pieces together: fetch the remote marker, compare it
//! with the installed one, and if they differ download the archive, replace
//! the tree, record the new version, and start the application.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::UpdaterConfig;
use crate::core::UpdaterError;
use crate::upgrade::launcher::{LaunchOutcome, LaunchRequest, Launcher, ProcessLauncher};
use crate::upgrade::remote::RemoteSource;
use crate::upgrade::replace::TreeReplacer;
use crate::upgrade::store::{FileVersionStore, VersionStore};

/// Result of comparing the remote and installed versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCheck {
    /// Version published on the tracked branch.
    pub remote: String,
    /// Version recorded in the installation root.
    pub local: String,
    /// Whether the two differ.
    pub needs_update: bool,
}

/// What one run of the updater did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Installed and remote versions are equal. Nothing was touched.
    UpToDate {
        /// The shared version.
        version: String,
    },
    /// An update exists but the run was check-only.
    UpdateAvailable {
        /// Installed version.
        from: String,
        /// Remote version.
        to: String,
    },
    /// The tree was replaced and the new version recorded.
    Updated {
        /// Previously installed version.
        from: String,
        /// Newly installed version.
        to: String,
        /// How the relaunch went, `None` when launching was disabled.
        launch: Option<LaunchOutcome>,
    },
}

/// Whether an installation at `local` should move to `remote`.
///
/// Versions are opaque: any difference triggers an update, including a
/// remote version that sorts lower than the local one.
pub fn needs_update(remote: &str, local: &str) -> bool {
    remote != local
}

/// Drives one update cycle against an installation root.
pub struct Updater<S: VersionStore = FileVersionStore, L: Launcher = ProcessLauncher> {
    config: UpdaterConfig,
    remote: RemoteSource,
    store: S,
    launcher: L,
    force: bool,
    launch: bool,
    check_only: bool,
}

impl Updater {
    /// Updater for `config` using the file-backed store and real processes.
    pub fn from_config(config: UpdaterConfig) -> Self {
        let store = FileVersionStore::new(&config.install_root, &config.version_file);
        Self::with_parts(config, store, ProcessLauncher)
    }
}

impl<S: VersionStore, L: Launcher> Updater<S, L> {
    /// Updater with injected storage and launcher.
    pub fn with_parts(config: UpdaterConfig, store: S, launcher: L) -> Self {
        let remote = RemoteSource::from_config(&config);
        Self {
            config,
            remote,
            store,
            launcher,
            force: false,
            launch: true,
            check_only: false,
        }
    }

    /// Update even when the versions are equal.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Start the application after a successful update.
    pub fn launch(mut self, launch: bool) -> Self {
        self.launch = launch;
        self
    }

    /// Stop after the version comparison.
    pub fn check_only(mut self, check_only: bool) -> Self {
        self.check_only = check_only;
        self
    }

    /// Draw a progress bar during the download.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.remote = self.remote.show_progress(show);
        self
    }

    /// The version store in use.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The launcher in use.
    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Fetch the remote version and compare it with the installed one.
    ///
    /// # Errors
    ///
    /// [`UpdaterError::RemoteVersionUnavailable`] when the marker cannot be
    /// fetched. Nothing on disk is touched either way.
    pub async fn check(&self) -> Result<VersionCheck> {
        let remote = self.remote.fetch_version().await.ok_or_else(|| {
            UpdaterError::RemoteVersionUnavailable {
                url: self.remote.version_url().to_string(),
            }
        })?;
        let local = self.store.installed_version();
        let needs_update = needs_update(&remote, &local);

        debug!("Remote {} / local {} (update needed: {})", remote, local, needs_update);
        Ok(VersionCheck {
            remote,
            local,
            needs_update,
        })
    }

    /// Run a full cycle: check, and update when needed.
    pub async fn run(&self) -> Result<UpdateOutcome> {
        let check = self.check().await?;

        if !check.needs_update && !self.force {
            info!("Already up to date: {}", check.local);
            return Ok(UpdateOutcome::UpToDate {
                version: check.local,
            });
        }

        if self.check_only {
            return Ok(UpdateOutcome::UpdateAvailable {
                from: check.local,
                to: check.remote,
            });
        }

        self.apply(&check).await
    }

    /// Download, replace, record, and relaunch for an already computed check.
    ///
    /// The installation tree is only touched once the archive is completely
    /// on disk.
    pub async fn apply(&self, check: &VersionCheck) -> Result<UpdateOutcome> {
        info!(
            "Updating {} from {} to {}",
            self.config.install_root.display(),
            check.local,
            check.remote
        );

        let archive = self.remote.download_archive().await?;
        info!("Downloaded {} bytes ({})", archive.size(), archive.sha256());

        let replacer = TreeReplacer::new(
            &self.config.install_root,
            self.config.inner_prefix(),
            &self.config.self_file,
            &self.config.entry_file,
        )
        .policy(self.config.replace_policy);
        let archive_path = archive.path().to_path_buf();

        let report = tokio::task::spawn_blocking(move || replacer.replace(&archive_path))
            .await
            .context("Replace task panicked")??;
        drop(archive);

        debug!(
            "Replaced tree: {} files written, {} removal failures",
            report.extract.written.len(),
            report.removal_failures.len()
        );

        self.store
            .record_version(&check.remote)
            .with_context(|| format!("Failed to record version {}", check.remote))?;

        let launch = if self.launch {
            Some(self.relaunch().await?)
        } else {
            debug!("Launch disabled, not starting application");
            None
        };

        Ok(UpdateOutcome::Updated {
            from: check.local.clone(),
            to: check.remote.clone(),
            launch,
        })
    }

    /// Start `<interpreter> <root>/<entry>` from the installation root.
    pub async fn relaunch(&self) -> Result<LaunchOutcome> {
        let request = LaunchRequest {
            interpreter: self.config.interpreter.clone(),
            program: self.config.entry_path(),
            working_dir: self.config.install_root.clone(),
            mode: self.config.launch_mode,
        };
        self.launcher.launch(&request).await
    }
}

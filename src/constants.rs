//! Global constants used throughout the updater.
//!
//! Remote locations, on-disk layout defaults, and the timeouts that bound the
//! two network calls. Everything here can be overridden through
//! [`UpdaterConfig`](crate::config::UpdaterConfig) except the chunk size and
//! the fallback version.

use std::time::Duration;

/// GitHub account that owns the deployed repository.
pub const DEFAULT_ACCOUNT: &str = "cpfain";

/// Repository holding the application sources and the `VERSION` marker.
pub const DEFAULT_REPOSITORY: &str = "smartfarm-pi-code-v1";

/// Branch tracked by the updater.
pub const DEFAULT_BRANCH: &str = "main";

/// Installation root of the deployed application.
pub const DEFAULT_INSTALL_ROOT: &str = "/opt/smartfarm";

/// Version marker file, relative to the installation root and to the
/// repository root.
pub const VERSION_FILE_NAME: &str = "VERSION";

/// Main application entry file, relative to the installation root.
pub const ENTRY_FILE_NAME: &str = "app.py";

/// File name of the updater itself inside the installation root.
///
/// The in-place replace policy never removes or overwrites this file.
pub const UPDATER_FILE_NAME: &str = "app-updater";

/// Interpreter used to start the main entry file.
pub const DEFAULT_INTERPRETER: &str = "/usr/bin/python3";

/// Version reported when the local marker is missing or unreadable.
pub const FALLBACK_VERSION: &str = "0.0.0";

/// Host serving raw repository files (the `VERSION` marker).
pub const RAW_CONTENT_HOST: &str = "https://raw.githubusercontent.com";

/// Host serving branch archives.
pub const CODELOAD_HOST: &str = "https://codeload.github.com";

/// Timeout for the remote version check (10 seconds).
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the archive download (30 seconds).
///
/// Applied to connecting and to each read of the body, so a slow but steady
/// transfer of a large archive is not cut off.
pub const ARCHIVE_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest slice of the archive body written to disk in one call (1 MiB).
pub const DOWNLOAD_CHUNK_SIZE: usize = 1 << 20;

/// Mode applied to the entry file and the updater after extraction.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "APP_UPDATER_CONFIG";

/// Environment variable that hides progress bars when set.
pub const NO_PROGRESS_ENV: &str = "APP_UPDATER_NO_PROGRESS";

/// Suffix of the sibling directory used by the staged replace policy.
pub const STAGING_SUFFIX: &str = "staging";

/// Suffix of the sibling directory holding the swapped-out tree.
pub const PREVIOUS_SUFFIX: &str = "previous";

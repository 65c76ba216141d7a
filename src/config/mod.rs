//! Updater configuration.
//!
//! All settings have built-in defaults matching the deployed device layout, so
//! the updater runs without any configuration file. A TOML file can override
//! any subset of fields.
//!
//! # Location
//!
//! 1. `--config <path>` (or the `APP_UPDATER_CONFIG` environment variable)
//! 2. `~/.app-updater/config.toml`
//!
//! A missing file is not an error; defaults are used.
//!
//! # Example
//!
//! ```toml
//! account = "cpfain"
//! repository = "smartfarm-pi-code-v1"
//! branch = "main"
//! install_root = "/opt/smartfarm"
//! entry_file = "app.py"
//! interpreter = "/usr/bin/python3"
//! replace_policy = "in-place"
//! launch_mode = "wait"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::constants::{
    ARCHIVE_DOWNLOAD_TIMEOUT, CODELOAD_HOST, DEFAULT_ACCOUNT, DEFAULT_BRANCH,
    DEFAULT_INSTALL_ROOT, DEFAULT_INTERPRETER, DEFAULT_REPOSITORY, ENTRY_FILE_NAME,
    RAW_CONTENT_HOST, UPDATER_FILE_NAME, VERSION_CHECK_TIMEOUT, VERSION_FILE_NAME,
};
use crate::core::UpdaterError;
use crate::upgrade::{LaunchMode, ReplacePolicy};

/// Settings controlling where the updater looks and what it replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// GitHub account owning the repository.
    #[serde(default = "default_account")]
    pub account: String,

    /// Repository name. Also the first half of the archive's inner prefix.
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Tracked branch. Also the second half of the archive's inner prefix.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Installation root. A leading `~` is expanded when loading from file.
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,

    /// Version marker path relative to the installation root.
    #[serde(default = "default_version_file")]
    pub version_file: String,

    /// Main application entry file relative to the installation root.
    #[serde(default = "default_entry_file")]
    pub entry_file: String,

    /// The updater's own file name inside the installation root.
    ///
    /// Must be a plain file name: the in-place policy compares it against the
    /// root's immediate children.
    #[serde(default = "default_self_file")]
    pub self_file: String,

    /// Interpreter that runs the entry file. A bare name is looked up on `PATH`.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Overrides the derived raw `VERSION` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_url: Option<String>,

    /// Overrides the derived branch archive URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,

    /// Timeout for the version check in seconds.
    #[serde(default = "default_version_timeout_secs")]
    pub version_timeout_secs: u64,

    /// Connect and read timeout for the archive download in seconds.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// How the installation tree is replaced.
    #[serde(default)]
    pub replace_policy: ReplacePolicy,

    /// Whether to wait for the relaunched application.
    #[serde(default)]
    pub launch_mode: LaunchMode,
}

fn default_account() -> String {
    DEFAULT_ACCOUNT.to_string()
}

fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_install_root() -> PathBuf {
    PathBuf::from(DEFAULT_INSTALL_ROOT)
}

fn default_version_file() -> String {
    VERSION_FILE_NAME.to_string()
}

fn default_entry_file() -> String {
    ENTRY_FILE_NAME.to_string()
}

fn default_self_file() -> String {
    UPDATER_FILE_NAME.to_string()
}

fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_string()
}

fn default_version_timeout_secs() -> u64 {
    VERSION_CHECK_TIMEOUT.as_secs()
}

fn default_download_timeout_secs() -> u64 {
    ARCHIVE_DOWNLOAD_TIMEOUT.as_secs()
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            account: default_account(),
            repository: default_repository(),
            branch: default_branch(),
            install_root: default_install_root(),
            version_file: default_version_file(),
            entry_file: default_entry_file(),
            self_file: default_self_file(),
            interpreter: default_interpreter(),
            version_url: None,
            archive_url: None,
            version_timeout_secs: default_version_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            replace_policy: ReplacePolicy::default(),
            launch_mode: LaunchMode::default(),
        }
    }
}

impl UpdaterConfig {
    /// Load configuration from `path`, or from the default location.
    ///
    /// Returns the defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read, is not valid TOML, or
    /// does not pass [`validate`](Self::validate).
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        config.install_root = expand_home(&config.install_root);
        config.validate()?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Default configuration file location: `~/.app-updater/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(".app-updater").join("config.toml"))
    }

    /// Check invariants the replace step relies on.
    pub fn validate(&self) -> Result<()> {
        let config_error = |message: String| -> anyhow::Error {
            UpdaterError::ConfigError {
                message,
            }
            .into()
        };

        for (field, value) in [
            ("account", &self.account),
            ("repository", &self.repository),
            ("branch", &self.branch),
            ("entry_file", &self.entry_file),
            ("version_file", &self.version_file),
        ] {
            if value.trim().is_empty() {
                return Err(config_error(format!("{field} must not be empty")));
            }
        }

        if !is_plain_file_name(&self.self_file) {
            return Err(config_error(format!(
                "self_file must be a plain file name, got '{}'",
                self.self_file
            )));
        }

        for (field, value) in
            [("entry_file", &self.entry_file), ("version_file", &self.version_file)]
        {
            if !is_relative_inside(value) {
                return Err(config_error(format!(
                    "{field} must be a relative path inside the installation root, got '{value}'"
                )));
            }
        }

        if self.version_timeout_secs == 0 || self.download_timeout_secs == 0 {
            return Err(config_error("timeouts must be greater than zero".to_string()));
        }

        Ok(())
    }

    /// URL of the raw `VERSION` marker on the tracked branch.
    pub fn version_url(&self) -> String {
        self.version_url.clone().unwrap_or_else(|| {
            format!(
                "{RAW_CONTENT_HOST}/{}/{}/{}/{VERSION_FILE_NAME}",
                self.account, self.repository, self.branch
            )
        })
    }

    /// URL of the zip archive of the tracked branch.
    pub fn archive_url(&self) -> String {
        self.archive_url.clone().unwrap_or_else(|| {
            format!(
                "{CODELOAD_HOST}/{}/{}/zip/refs/heads/{}",
                self.account, self.repository, self.branch
            )
        })
    }

    /// Leading directory of every archive entry: `<repository>-<branch>/`.
    pub fn inner_prefix(&self) -> String {
        format!("{}-{}/", self.repository, self.branch)
    }

    /// Absolute path of the version marker.
    pub fn version_path(&self) -> PathBuf {
        self.install_root.join(&self.version_file)
    }

    /// Absolute path of the main entry file.
    pub fn entry_path(&self) -> PathBuf {
        self.install_root.join(&self.entry_file)
    }

    /// Version check timeout.
    pub fn version_timeout(&self) -> Duration {
        Duration::from_secs(self.version_timeout_secs)
    }

    /// Archive download timeout.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn is_relative_inside(path: &str) -> bool {
    Path::new(path).components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

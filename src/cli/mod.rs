//! Command-line interface for the updater.
//!
//! The binary runs a single update cycle per invocation:
//!
//! ```bash
//! app-updater                       # update if needed, then launch the app
//! app-updater --check               # only report whether an update exists
//! app-updater --force --no-launch   # reinstall without starting the app
//! app-updater --policy staged       # swap a staged tree into place
//! ```
//!
//! # Global Options
//!
//! - `--config <PATH>` - Configuration file (also `APP_UPDATER_CONFIG`)
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all logging and the progress bar
//! - `--no-progress` - Hide the download progress bar
//!
//! # Exit Codes
//!
//! `0` when the installation is up to date or was updated, `1` on any
//! failure, including an unreachable version marker. Mapping to the exit code
//! happens in `main`.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::UpdaterConfig;
use crate::constants::CONFIG_PATH_ENV;
use crate::core::UpdaterError;
use crate::upgrade::{LaunchMode, LaunchOutcome, ReplacePolicy, UpdateOutcome, Updater};

/// Runtime settings derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can build one directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// `EnvFilter` directive, or `None` to disable logging.
    pub log_level: Option<String>,
    /// Hide the progress bar.
    pub no_progress: bool,
}

impl CliConfig {
    /// Install the global tracing subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured level. Logs go to
    /// stderr so stdout only carries the user-facing lines.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &self.log_level {
            EnvFilter::new(level)
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Keep an application tree in sync with a GitHub branch.
#[derive(Parser, Debug)]
#[command(
    name = "app-updater",
    about = "Update a deployed application from its GitHub branch and relaunch it",
    version,
    long_about = "Compares the installed VERSION with the one on the tracked branch, \
                  replaces the installation tree from the branch archive when they differ, \
                  and starts the application."
)]
pub struct Cli {
    /// Path to the configuration file.
    ///
    /// Defaults to `~/.app-updater/config.toml`; built-in defaults apply when
    /// the file does not exist.
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Only report whether an update is available.
    #[arg(long)]
    check: bool,

    /// Update even when the installed version matches the remote one.
    #[arg(short, long)]
    force: bool,

    /// Do not start the application after updating.
    #[arg(long)]
    no_launch: bool,

    /// How to replace the installation tree (overrides the config file).
    #[arg(long, value_enum)]
    policy: Option<ReplacePolicy>,

    /// Start the application without waiting for it to exit.
    #[arg(long)]
    detach: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress logging and the progress bar. Mutually exclusive with `--verbose`.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Hide the download progress bar.
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    /// Set up logging and run one update cycle.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress || self.quiet,
        }
    }

    /// Run one update cycle with an already prepared [`CliConfig`].
    pub async fn execute_with_config(self, cli_config: CliConfig) -> Result<()> {
        let mut config = UpdaterConfig::load_with_optional(self.config.clone()).await?;
        self.apply_overrides(&mut config);
        debug!("Effective configuration: {:?}", config);

        let install_root = config.install_root.clone();
        let show_progress = !cli_config.no_progress && std::io::stderr().is_terminal();
        // Launch is driven from here so the update line prints before the app runs
        let updater = Updater::from_config(config)
            .force(self.force)
            .launch(false)
            .show_progress(show_progress);

        let check = match updater.check().await {
            Ok(check) => check,
            Err(e) => {
                if matches!(
                    e.downcast_ref::<UpdaterError>(),
                    Some(UpdaterError::RemoteVersionUnavailable { .. })
                ) {
                    println!("{}", "Cannot get remote version".red());
                }
                return Err(e);
            }
        };
        if !check.needs_update && !self.force {
            println!("{} {}", "Already up to date:".green(), check.local);
            return Ok(());
        }

        println!("{} {} → {}", "New version found:".cyan(), check.local, check.remote.bold());
        if self.check {
            println!("Run `app-updater` without --check to install it");
            return Ok(());
        }

        println!("{}", "Downloading latest code...".cyan());
        let outcome = updater.apply(&check).await?;
        if matches!(outcome, UpdateOutcome::Updated { .. }) {
            println!("{} {}", "Code updated at".green(), install_root.display());
        }

        if !self.no_launch {
            let launch = updater.relaunch().await?;
            report_launch(launch);
        }
        Ok(())
    }

    fn apply_overrides(&self, config: &mut UpdaterConfig) {
        if let Some(policy) = self.policy {
            config.replace_policy = policy;
        }
        if self.detach {
            config.launch_mode = LaunchMode::Detach;
        }
    }
}

fn report_launch(launch: LaunchOutcome) {
    match launch {
        LaunchOutcome::Exited {
            code: Some(code),
        } => debug!("Application exited with code {}", code),
        LaunchOutcome::Exited {
            code: None,
        } => debug!("Application terminated by signal"),
        LaunchOutcome::Detached {
            pid,
        } => {
            let pid = pid.map_or_else(|| "unknown".to_string(), |p| p.to_string());
            println!("Application started in background (pid {pid})");
        }
    }
}

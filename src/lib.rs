//! app-updater
//!
//! Keeps a deployed application tree in sync with a branch of a GitHub
//! repository. The branch publishes a plain-text `VERSION` marker; when it
//! differs from the installed marker, the branch archive is downloaded, the
//! tree replaced while preserving the updater's own file, the new version
//! recorded, and the application relaunched.
//!
//! # Modules
//!
//! - [`cli`] - Command-line parsing, logging setup, user-facing output
//! - [`config`] - `~/.app-updater/config.toml` and built-in defaults
//! - [`constants`] - Default locations and timeouts
//! - [`core`] - Error types and user-friendly error rendering
//! - [`upgrade`] - Version check, download, replace, and relaunch
//! - [`utils`] - Filesystem helpers and the progress bar
//!
//! # Example
//!
//! ```rust,no_run
//! use app_updater::config::UpdaterConfig;
//! use app_updater::upgrade::{UpdateOutcome, Updater};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = UpdaterConfig::load_with_optional(None).await?;
//! match Updater::from_config(config).run().await? {
//!     UpdateOutcome::UpToDate { version } => println!("up to date: {version}"),
//!     outcome => println!("{outcome:?}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod upgrade;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

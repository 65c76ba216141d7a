//! app-updater entry point
//!
//! Runs one update cycle for the configured installation root and maps any
//! failure to exit status 1 after printing it with a suggestion.

use anyhow::Result;
use app_updater::cli;
use app_updater::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}

//! Download progress indicator.
//!
//! A thin wrapper over `indicatif` that renders byte counts on stderr while
//! the archive downloads. The bar is hidden when progress is disabled, either
//! by the caller (`--quiet`) or through the `APP_UPDATER_NO_PROGRESS`
//! environment variable, so scripted runs get clean output.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};

use crate::constants::NO_PROGRESS_ENV;

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

/// Progress bar measured in bytes.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Create a download bar.
    ///
    /// `len` is the expected body size; when unknown the bar degrades to a
    /// byte counter. Passing `enabled = false` yields a hidden bar.
    pub fn new_download(len: Option<u64>, enabled: bool) -> Self {
        if !enabled || is_progress_disabled() {
            return Self::hidden();
        }

        let bar = match len {
            Some(len) => {
                let bar = IndicatifBar::new(len);
                bar.set_style(bytes_style());
                bar
            }
            None => {
                let bar = IndicatifBar::new_spinner();
                bar.set_style(counter_style());
                bar
            }
        };
        Self { inner: bar }
    }

    /// A bar that draws nothing.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Set the message shown next to the bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Advance by `delta` bytes.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Bytes counted so far.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Remove the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn bytes_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("=>-")
}

fn counter_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{spinner} {msg} {bytes}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
}

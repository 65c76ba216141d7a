//! Utility modules shared by the updater.
//!
//! - [`fs`]: directory creation, atomic writes, tolerant removal, executable bit
//! - [`progress`]: download progress bar

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, remove_path, set_executable};
pub use progress::ProgressBar;

//! Update cycle for a deployed application tree.
//!
//! The updater keeps one installation root in sync with a branch of a GitHub
//! repository. The branch publishes a plain-text `VERSION` marker; whenever it
//! differs from the installed marker, the branch archive is downloaded and the
//! tree replaced.
//!
//! # Architecture Overview
//!
//! - **[`Updater`]**: orchestrates one cycle and reports an [`UpdateOutcome`]
//! - **[`remote::RemoteSource`]**: fetches the marker and streams the archive
//! - **[`archive::ArchiveExtractor`]**: strips the archive's inner prefix
//! - **[`replace::TreeReplacer`]**: applies a [`ReplacePolicy`] to the root
//! - **[`VersionStore`]**: reads and records the installed marker
//! - **[`Launcher`]**: starts the application afterwards
//!
//! ## Update Process Flow
//!
//! ```text
//! 1. Version Check
//!    ├── Fetch remote VERSION (10s timeout, failure => exit 1)
//!    └── Read local VERSION ("0.0.0" when missing)
//!
//! 2. Download (only when the versions differ)
//!    └── Stream archive to a temporary file in 1 MiB slices
//!
//! 3. Replace
//!    ├── in-place: clear root except the updater, extract without it
//!    ├── wipe: recreate root, extract everything
//!    └── staged: extract beside root, swap by rename
//!
//! 4. Post-Update
//!    ├── Mark entry file and updater executable
//!    ├── Write VERSION atomically
//!    └── Launch <interpreter> <root>/<entry>
//! ```
//!
//! # Safety Mechanisms
//!
//! - The tree is not touched until the archive is completely downloaded.
//! - The updater's own file is preserved by the in-place policy and carried
//!   across the staged swap.
//! - Archive entries that would escape the root are rejected.
//!
//! There is no rollback: a failure halfway through a replace leaves the tree
//! partially updated, and the next run repairs it because the version marker
//! is written last.

/// Zip extraction under the archive's inner prefix.
pub mod archive;
/// Starting the application after an update.
pub mod launcher;
/// Version marker and archive download.
pub mod remote;
/// Replace policies for the installation tree.
pub mod replace;
/// Installed version persistence.
pub mod store;
/// Orchestration of one update cycle.
pub mod updater;


pub use launcher::{LaunchMode, LaunchOutcome, LaunchRequest, Launcher, ProcessLauncher, RecordingLauncher};
pub use remote::{DownloadedArchive, RemoteSource};
pub use replace::{ReplacePolicy, ReplaceReport, TreeReplacer};
pub use store::{FileVersionStore, MemoryVersionStore, VersionStore};
pub use updater::{UpdateOutcome, Updater, VersionCheck, needs_update};

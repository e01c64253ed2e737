//! # self-updater
//!
//! Self-update support for applications that publish their builds as
//! releases.
//!
//! An [`Updater`] asks a [`ReleaseSource`] for the latest [`Release`],
//! compares its identifier with the installed one and streams each asset of
//! a newer release into a [`WriteTarget`]. Targets are abortable:
//!
//! - [`DelayedFile`] stages bytes in a temporary file and only replaces the
//!   destination when it is closed without having been aborted.
//! - [`AbortBuffer`] collects bytes in memory.
//!
//! [`GitHubSource`] reads releases from the GitHub releases API, and
//! [`UpdateMonitor`] repeats the check on an interval.

pub mod config;
pub mod error;
pub mod event;
pub mod monitor;
pub mod source;
pub mod updater;
pub mod writers;

pub use config::{ReleaseChannel, UpdaterConfig};
pub use error::{Error, Result};
pub use event::{create_event_channel, UpdateEvent, UpdateEventsChannel, UpdateEventsSender};
pub use monitor::UpdateMonitor;
pub use source::{Asset, GitHubAsset, GitHubRelease, GitHubSource, Release, ReleaseSource};
pub use updater::Updater;
pub use writers::{
    is_aborted_error, AbortBuffer, AbortWrite, DelayedFile, FileBuffer, WriteAborted, WriteTarget,
};

//! Update event system.

use tokio::sync::broadcast;

/// Events emitted while checking for and applying updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    /// A check against the release source started.
    CheckStarted,

    /// The application runs the latest release.
    UpToDate,

    /// A newer release is available.
    UpdateAvailable {
        /// Release name.
        name: String,
        /// Release identifier.
        identifier: String,
    },

    /// No write target was given for an asset.
    AssetSkipped {
        /// Asset name.
        name: String,
    },

    /// An asset was written and committed to its target.
    AssetWritten {
        /// Asset name.
        name: String,
    },

    /// All assets of a release were applied.
    UpdateComplete {
        /// Identifier of the applied release.
        identifier: String,
    },

    /// A check or update failed.
    UpdateFailed {
        /// Error message.
        message: String,
    },
}

/// Channel for receiving update events.
pub type UpdateEventsChannel = broadcast::Receiver<UpdateEvent>;

/// Sender for update events.
pub type UpdateEventsSender = broadcast::Sender<UpdateEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (UpdateEventsSender, UpdateEventsChannel) {
    broadcast::channel(256)
}

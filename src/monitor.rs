//! Periodic update checks.

use crate::source::{Release, ReleaseSource};
use crate::updater::Updater;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Checks a release source on an interval until shutdown is requested.
pub struct UpdateMonitor<S: ReleaseSource> {
    /// Driver used for each check.
    updater: Updater<S>,
    /// How often to check for updates.
    check_interval: Duration,
    /// Apply updates instead of only reporting them.
    auto_apply: bool,
    /// Set to `true` to stop the monitor.
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: ReleaseSource> UpdateMonitor<S> {
    /// Create a new update monitor.
    #[must_use]
    pub fn new(
        updater: Updater<S>,
        check_interval_hours: u64,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            updater,
            check_interval: Duration::from_secs(check_interval_hours.saturating_mul(3600)),
            auto_apply: false,
            shutdown_rx,
        }
    }

    /// Apply available updates as they are found.
    #[must_use]
    pub fn with_auto_apply(mut self, auto_apply: bool) -> Self {
        self.auto_apply = auto_apply;
        self
    }

    /// Override the check interval.
    #[must_use]
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// Get the check interval.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Get the underlying updater.
    #[must_use]
    pub fn updater(&self) -> &Updater<S> {
        &self.updater
    }

    /// Check immediately, then once per interval, until the shutdown
    /// receiver reads `true` or its sender is dropped.
    ///
    /// Failed checks and updates are logged and retried on the next tick.
    pub async fn run(&mut self) {
        info!(
            "Update monitor started, checking every {:?}",
            self.check_interval
        );

        loop {
            self.tick().await;

            tokio::select! {
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        break;
                    }
                }
                () = tokio::time::sleep(self.check_interval) => {}
            }
        }

        info!("Update monitor stopped");
    }

    async fn tick(&mut self) {
        match self.updater.check().await {
            Ok(None) => debug!("No update available"),
            Ok(Some(release)) if self.auto_apply => {
                if let Err(e) = self.updater.update(Some(release)).await {
                    warn!("Automatic update failed: {e}");
                }
            }
            Ok(Some(release)) => {
                info!(
                    "Update {} available, not applying automatically",
                    release.name()
                );
            }
            Err(e) => warn!("Update check failed: {e}"),
        }
    }
}

//! Update driver.
//!
//! The [`Updater`] asks a [`ReleaseSource`] for the latest release, compares
//! it with the installed release and writes the release's assets to the
//! targets chosen by the caller.
//!
//! ```no_run
//! use self_updater::{DelayedFile, GitHubSource, Release, Updater, WriteTarget};
//!
//! # async fn run() -> self_updater::Result<()> {
//! let source = GitHubSource::new("hverr", "status-dashboard")?;
//! let exe = std::env::current_exe()?;
//!
//! let mut updater = Updater::new(
//!     source,
//!     "789611aec3d4b90512577b5dad9cf1adb6b20dcc",
//!     move |_asset| Ok(Some(WriteTarget::from(DelayedFile::new(&exe)))),
//! );
//!
//! match updater.check().await? {
//!     None => println!("No updates available."),
//!     Some(release) => {
//!         println!("Updating to {} - {}", release.name(), release.identifier());
//!         updater.update(Some(release)).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::event::{UpdateEvent, UpdateEventsSender};
use crate::source::{Asset, Release, ReleaseSource};
use crate::writers::{AbortWrite, WriteTarget};
use tracing::{debug, info, warn};

/// Asset type of a release source.
pub type AssetOf<S> = <<S as ReleaseSource>::Release as Release>::Asset;

/// Maps an asset to the target it is written to; `None` skips the asset.
pub type WriterForAsset<A> = Box<dyn FnMut(&A) -> Result<Option<WriteTarget>> + Send>;

/// Checks for and applies updates from a release source.
pub struct Updater<S: ReleaseSource> {
    source: S,
    current_identifier: String,
    writer_for_asset: WriterForAsset<AssetOf<S>>,
    events: Option<UpdateEventsSender>,
}

impl<S: ReleaseSource> Updater<S> {
    /// Create an updater.
    ///
    /// `current_identifier` identifies the installed release. When an update
    /// is applied, `writer_for_asset` is called for each asset of the release
    /// and the asset is written to the returned target.
    pub fn new<F>(source: S, current_identifier: impl Into<String>, writer_for_asset: F) -> Self
    where
        F: FnMut(&AssetOf<S>) -> Result<Option<WriteTarget>> + Send + 'static,
    {
        Self {
            source,
            current_identifier: current_identifier.into(),
            writer_for_asset: Box::new(writer_for_asset),
            events: None,
        }
    }

    /// Emit progress on `events`.
    #[must_use]
    pub fn with_events(mut self, events: UpdateEventsSender) -> Self {
        self.events = Some(events);
        self
    }

    /// The release source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Identifier of the installed release.
    #[must_use]
    pub fn current_identifier(&self) -> &str {
        &self.current_identifier
    }

    /// Replace the identifier of the installed release.
    pub fn set_current_identifier(&mut self, identifier: impl Into<String>) {
        self.current_identifier = identifier.into();
    }

    /// Check for updates.
    ///
    /// Returns the latest release when it differs from the installed one, or
    /// `None` when the application is up to date.
    ///
    /// # Errors
    ///
    /// Returns the source's query error, or [`Error::NoReleaseInfo`] when the
    /// source knows no release.
    pub async fn check(&mut self) -> Result<Option<S::Release>> {
        self.emit(UpdateEvent::CheckStarted);
        let result = self.check_latest().await;
        if let Err(e) = &result {
            self.emit(UpdateEvent::UpdateFailed {
                message: e.to_string(),
            });
        }
        result
    }

    async fn check_latest(&mut self) -> Result<Option<S::Release>> {
        self.source.query().await?;

        let latest = self.source.latest_release().ok_or(Error::NoReleaseInfo)?;
        if latest.identifier() == self.current_identifier {
            info!("Already running the latest release {}", latest.name());
            self.emit(UpdateEvent::UpToDate);
            return Ok(None);
        }

        info!(
            "Update available: {} ({})",
            latest.name(),
            latest.identifier()
        );
        let latest = latest.clone();
        self.emit(UpdateEvent::UpdateAvailable {
            name: latest.name().to_string(),
            identifier: latest.identifier().to_string(),
        });
        Ok(Some(latest))
    }

    /// Update the application.
    ///
    /// Must run inside a tokio runtime: committed targets are finished on the
    /// blocking thread pool.
    ///
    /// Without a release, checks for the latest one first. Assets are written
    /// in order; the first failure stops the update. A target whose asset
    /// failed is aborted and discarded; assets committed before the failure
    /// stay in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyUpToDate`] when no release was given and none
    /// is newer, or the first error from choosing a target, writing an asset,
    /// or committing a target.
    pub async fn update(&mut self, release: Option<S::Release>) -> Result<()> {
        let release = match release {
            Some(release) => release,
            None => self.check().await?.ok_or(Error::AlreadyUpToDate)?,
        };

        info!("Updating to {} ({})", release.name(), release.identifier());
        if let Err(e) = self.apply(&release).await {
            warn!("Update to {} failed: {e}", release.name());
            self.emit(UpdateEvent::UpdateFailed {
                message: e.to_string(),
            });
            return Err(e);
        }

        self.current_identifier = release.identifier().to_string();
        self.emit(UpdateEvent::UpdateComplete {
            identifier: release.identifier().to_string(),
        });
        info!("Update to {} complete", release.name());
        Ok(())
    }

    async fn apply(&mut self, release: &S::Release) -> Result<()> {
        for asset in release.assets() {
            let Some(mut target) = (self.writer_for_asset)(asset)? else {
                debug!("No target for asset {}, skipping", asset.name());
                self.emit(UpdateEvent::AssetSkipped {
                    name: asset.name().to_string(),
                });
                continue;
            };

            debug!("Writing asset {}", asset.name());
            if let Err(e) = asset.write_to(&mut target).await {
                target.abort();
                return Err(e);
            }
            // Committing copies the whole staged file.
            tokio::task::spawn_blocking(move || target.finish())
                .await
                .map_err(std::io::Error::other)??;

            self.emit(UpdateEvent::AssetWritten {
                name: asset.name().to_string(),
            });
        }
        Ok(())
    }

    fn emit(&self, event: UpdateEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

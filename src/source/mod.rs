//! Release sources.
//!
//! A release source knows the published releases of an application and can
//! stream their assets into a write target. [`github::GitHubSource`] is the
//! provided implementation.

pub mod github;

pub use github::{GitHubAsset, GitHubRelease, GitHubSource};

use crate::error::Result;
use crate::writers::AbortWrite;
use std::future::Future;

/// A remote source of application releases.
pub trait ReleaseSource {
    /// Release type published by this source.
    type Release: Release;

    /// Refresh the known releases from the remote source.
    fn query(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// The most recent release, or `None` if nothing was queried yet.
    fn latest_release(&self) -> Option<&Self::Release>;
}

/// An application release.
pub trait Release: Clone + Send + Sync {
    /// Asset type attached to this release.
    type Asset: Asset;

    /// Version name of this release.
    fn name(&self) -> &str;

    /// Human-readable information about this release.
    fn information(&self) -> &str;

    /// Identifier used to compare releases.
    fn identifier(&self) -> &str;

    /// Downloadable files, in publication order.
    fn assets(&self) -> &[Self::Asset];
}

/// A downloadable file belonging to a release.
pub trait Asset: Send + Sync {
    /// File name of the asset.
    fn name(&self) -> &str;

    /// Stream the asset's bytes into `target`.
    fn write_to(&self, target: &mut dyn AbortWrite) -> impl Future<Output = Result<()>> + Send;
}

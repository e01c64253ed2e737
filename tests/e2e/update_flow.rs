//! Full update runs: GitHub source, update driver and delayed file targets.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{MockGitHub, TAG_SHA};
use self_updater::{
    create_event_channel, AbortBuffer, Asset, DelayedFile, Error, GitHubAsset, Release,
    ReleaseChannel, UpdateEvent, Updater, WriteTarget,
};
use serde_json::json;
use std::fs;

const OLD_SHA: &str = "789611aec3d4b90512577b5dad9cf1adb6b20dcc";

async fn github_with_release(asset_body: Option<&[u8]>) -> MockGitHub {
    let github = MockGitHub::start().await;
    github
        .mount_releases(json!([github.release_json(1, "v1.0.0", "example.zip", false)]))
        .await;
    github.mount_reference("v1.0.0", TAG_SHA).await;
    match asset_body {
        Some(body) => github.mount_asset("example.zip", body).await,
        None => github.mount_asset_status("example.zip", 500).await,
    }
    github
}

#[tokio::test]
async fn test_update_installs_asset() {
    let github = github_with_release(Some(b"Hello World!")).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("app");
    fs::write(&dest, b"old binary").unwrap();

    let target_path = dest.clone();
    let mut updater = Updater::new(
        github.source(ReleaseChannel::Stable),
        OLD_SHA,
        move |_: &GitHubAsset| Ok(Some(WriteTarget::from(DelayedFile::new(&target_path)))),
    );

    let release = updater.check().await.unwrap().expect("update available");
    assert_eq!(release.identifier(), TAG_SHA);

    updater.update(Some(release)).await.unwrap();
    assert_eq!(fs::read(&dest).unwrap(), b"Hello World!");
    assert_eq!(updater.current_identifier(), TAG_SHA);

    // Nothing left to do once the release is installed
    assert!(updater.check().await.unwrap().is_none());
}

#[tokio::test]
async fn test_up_to_date() {
    let github = github_with_release(Some(b"Hello World!")).await;
    let buffer = AbortBuffer::default();
    let target = buffer.clone();

    let mut updater = Updater::new(
        github.source(ReleaseChannel::Stable),
        TAG_SHA,
        move |_: &GitHubAsset| Ok(Some(WriteTarget::from(target.clone()))),
    );

    assert!(updater.check().await.unwrap().is_none());
    let err = updater.update(None).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyUpToDate));
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn test_failed_download_keeps_installed_file() {
    let github = github_with_release(None).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("app");
    fs::write(&dest, b"old binary").unwrap();

    let target_path = dest.clone();
    let mut updater = Updater::new(
        github.source(ReleaseChannel::Stable),
        OLD_SHA,
        move |_: &GitHubAsset| Ok(Some(WriteTarget::from(DelayedFile::new(&target_path)))),
    );

    let err = updater.update(None).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { .. }), "got {err:?}");
    assert_eq!(fs::read(&dest).unwrap(), b"old binary");
    assert_eq!(updater.current_identifier(), OLD_SHA);

    // Only the installed file is left in the directory
    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_assets_can_be_skipped() {
    let github = github_with_release(Some(b"Hello World!")).await;
    let (events_tx, mut events_rx) = create_event_channel();

    let mut updater = Updater::new(
        github.source(ReleaseChannel::Stable),
        OLD_SHA,
        |asset: &GitHubAsset| {
            assert_eq!(asset.name(), "example.zip");
            Ok(None)
        },
    )
    .with_events(events_tx);

    updater.update(None).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            UpdateEvent::CheckStarted,
            UpdateEvent::UpdateAvailable {
                name: "v1.0.0".to_string(),
                identifier: TAG_SHA.to_string(),
            },
            UpdateEvent::AssetSkipped {
                name: "example.zip".to_string(),
            },
            UpdateEvent::UpdateComplete {
                identifier: TAG_SHA.to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_dropped_download_discards_staged_bytes() {
    let github = MockGitHub::start().await;
    let release = github
        .release_with_truncated_asset("v1.0.0", "example.zip", b"half a binary", 4096)
        .await;
    github.mount_releases(json!([release])).await;
    github.mount_reference("v1.0.0", TAG_SHA).await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("app");
    fs::write(&dest, b"old binary").unwrap();

    let target_path = dest.clone();
    let mut updater = Updater::new(
        github.source(ReleaseChannel::Stable),
        OLD_SHA,
        move |_: &GitHubAsset| Ok(Some(WriteTarget::from(DelayedFile::new(&target_path)))),
    );

    let err = updater.update(None).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)), "got {err:?}");
    assert_eq!(fs::read(&dest).unwrap(), b"old binary");
    assert_eq!(updater.current_identifier(), OLD_SHA);

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

//! GitHub release source against the mock API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{MockGitHub, TAG_SHA};
use self_updater::{
    is_aborted_error, AbortBuffer, Asset, Error, Release, ReleaseChannel, ReleaseSource,
};
use serde_json::json;

#[tokio::test]
async fn test_query_valid_releases() {
    let github = MockGitHub::start().await;
    github
        .mount_releases(json!([github.release_json(1, "v1.0.0", "example.zip", false)]))
        .await;
    github.mount_reference("v1.0.0", TAG_SHA).await;

    let mut source = github.source(ReleaseChannel::Stable);
    source.query().await.unwrap();

    let release = source.latest_release().expect("latest release");
    assert_eq!(release.name(), "v1.0.0");
    assert_eq!(release.information(), "Description of the release");
    assert_eq!(release.identifier(), TAG_SHA);
    assert_eq!(release.title(), "Release v1.0.0");
    assert!(release.published_at().is_some());
    assert_eq!(release.assets().len(), 1);
    assert_eq!(release.assets()[0].name(), "example.zip");
    assert_eq!(release.assets()[0].size(), 1024);
    assert_eq!(
        release.assets()[0].content_type(),
        Some("application/zip")
    );
}

#[tokio::test]
async fn test_query_invalid_releases_json() {
    let github = MockGitHub::start().await;
    github.mount_releases_raw("invalid json").await;

    let mut source = github.source(ReleaseChannel::Stable);
    let err = source.query().await.unwrap_err();

    assert!(matches!(err, Error::InvalidResponse(_)), "got {err:?}");
    assert!(source.latest_release().is_none());
}

#[tokio::test]
async fn test_query_invalid_reference_json() {
    let github = MockGitHub::start().await;
    github
        .mount_releases(json!([github.release_json(1, "v1.0.0", "example.zip", false)]))
        .await;
    github.mount_reference_raw("v1.0.0", "invalid json").await;

    let mut source = github.source(ReleaseChannel::Stable);
    assert!(source.query().await.is_err());
    assert!(source.latest_release().is_none());
}

#[tokio::test]
async fn test_query_missing_sha() {
    let github = MockGitHub::start().await;
    github
        .mount_releases(json!([github.release_json(1, "v1.0.0", "example.zip", false)]))
        .await;
    github
        .mount_reference_raw("v1.0.0", r#"{"ref": "refs/tags/v1.0.0"}"#)
        .await;

    let mut source = github.source(ReleaseChannel::Stable);
    let err = source.query().await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_query_release_without_tag() {
    let github = MockGitHub::start().await;
    github
        .mount_releases(json!([{ "id": 42, "draft": false, "assets": [] }]))
        .await;

    let mut source = github.source(ReleaseChannel::Stable);
    let err = source.query().await.unwrap_err();
    assert!(matches!(err, Error::MissingTag(ref id) if id == "42"), "got {err:?}");
}

#[tokio::test]
async fn test_query_not_found() {
    let github = MockGitHub::start().await;

    let mut source = github.source(ReleaseChannel::Stable);
    let err = source.query().await.unwrap_err();

    assert!(
        matches!(err, Error::HttpStatus { status, .. } if status == reqwest::StatusCode::NOT_FOUND),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_query_empty_release_list() {
    let github = MockGitHub::start().await;
    github.mount_releases(json!([])).await;

    let mut source = github.source(ReleaseChannel::Stable);
    source.query().await.unwrap();

    assert!(source.latest_release().is_none());
    assert!(source.releases().is_empty());
}

#[tokio::test]
async fn test_channels_filter_releases() {
    let github = MockGitHub::start().await;
    let mut draft = github.release_json(3, "v2.0.0", "example.zip", false);
    draft["draft"] = json!(true);

    github
        .mount_releases(json!([
            draft,
            github.release_json(2, "v1.1.0-beta.1", "example.zip", true),
            github.release_json(1, "v1.0.0", "example.zip", false),
        ]))
        .await;
    github
        .mount_reference("v1.1.0-beta.1", "1111111111111111111111111111111111111111")
        .await;
    github.mount_reference("v1.0.0", TAG_SHA).await;

    let mut stable = github.source(ReleaseChannel::Stable);
    stable.query().await.unwrap();
    assert_eq!(stable.releases().len(), 1);
    assert_eq!(stable.latest_release().unwrap().name(), "v1.0.0");

    let mut beta = github.source(ReleaseChannel::Beta);
    beta.query().await.unwrap();
    assert_eq!(beta.releases().len(), 2);
    assert_eq!(beta.latest_release().unwrap().name(), "v1.1.0-beta.1");
    assert!(beta.latest_release().unwrap().is_prerelease());
}

#[tokio::test]
async fn test_asset_download() {
    let github = MockGitHub::start().await;
    github
        .mount_releases(json!([github.release_json(1, "v1.0.0", "example.zip", false)]))
        .await;
    github.mount_reference("v1.0.0", TAG_SHA).await;
    github.mount_asset("example.zip", b"Hello World!").await;

    let mut source = github.source(ReleaseChannel::Stable);
    source.query().await.unwrap();
    let asset = &source.latest_release().unwrap().assets()[0];

    let mut buffer = AbortBuffer::default();
    asset.write_to(&mut buffer).await.unwrap();
    assert_eq!(buffer.contents(), b"Hello World!");
}

#[tokio::test]
async fn test_asset_download_server_error() {
    let github = MockGitHub::start().await;
    github
        .mount_releases(json!([github.release_json(1, "v1.0.0", "example.zip", false)]))
        .await;
    github.mount_reference("v1.0.0", TAG_SHA).await;
    github.mount_asset_status("example.zip", 500).await;

    let mut source = github.source(ReleaseChannel::Stable);
    source.query().await.unwrap();
    let asset = &source.latest_release().unwrap().assets()[0];

    let mut buffer = AbortBuffer::default();
    let err = asset.write_to(&mut buffer).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { .. }), "got {err:?}");
    assert!(err.to_string().contains("Internal Server Error"));
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn test_asset_download_into_aborted_target() {
    let github = MockGitHub::start().await;
    github
        .mount_releases(json!([github.release_json(1, "v1.0.0", "example.zip", false)]))
        .await;
    github.mount_reference("v1.0.0", TAG_SHA).await;
    github.mount_asset("example.zip", b"Hello World!").await;

    let mut source = github.source(ReleaseChannel::Stable);
    source.query().await.unwrap();
    let asset = &source.latest_release().unwrap().assets()[0];

    let mut buffer = AbortBuffer::default();
    buffer.abort();
    let err = asset.write_to(&mut buffer).await.unwrap_err();

    match err {
        Error::Io(e) => assert!(is_aborted_error(&e)),
        other => panic!("expected an aborted write, got {other:?}"),
    }
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn test_asset_download_connection_dropped() {
    let github = MockGitHub::start().await;
    let release = github
        .release_with_truncated_asset("v1.0.0", "example.zip", b"Hello", 1024)
        .await;
    github.mount_releases(json!([release])).await;
    github.mount_reference("v1.0.0", TAG_SHA).await;

    let mut source = github.source(ReleaseChannel::Stable);
    source.query().await.unwrap();
    let asset = &source.latest_release().unwrap().assets()[0];

    let mut buffer = AbortBuffer::default();
    let err = asset.write_to(&mut buffer).await.unwrap_err();

    assert!(matches!(err, Error::Network(_)), "got {err:?}");
    assert!(buffer.len() < 1024);
}

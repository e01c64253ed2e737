//! Releases hosted on GitHub.
//!
//! Releases are listed through the REST API. Each release is identified by
//! the SHA its tag points at, resolved with an extra `git/refs/tags` request,
//! so re-tagging a release is seen as a new release.

use super::{Asset, Release, ReleaseSource};
use crate::config::{ReleaseChannel, UpdaterConfig, DEFAULT_API_URL};
use crate::error::{Error, Result};
use crate::writers::AbortWrite;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response};
use semver::Version;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::pin::pin;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT_VALUE: &str = concat!("self-updater/", env!("CARGO_PKG_VERSION"));
const GITHUB_JSON: &str = "application/vnd.github+json";
const OCTET_STREAM: &str = "application/octet-stream";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An application hosted on GitHub.
#[derive(Debug, Clone)]
pub struct GitHubSource {
    owner: String,
    repo: String,
    api_url: String,
    channel: ReleaseChannel,
    client: Client,
    releases: Option<Vec<GitHubRelease>>,
}

impl GitHubSource {
    /// Create a source for `owner/repo` with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(owner, repo, build_client(DEFAULT_TIMEOUT)?))
    }

    /// Create a source for `owner/repo` using `client` for every request.
    #[must_use]
    pub fn with_client(owner: impl Into<String>, repo: impl Into<String>, client: Client) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            api_url: DEFAULT_API_URL.to_string(),
            channel: ReleaseChannel::default(),
            client,
            releases: None,
        }
    }

    /// Create a source from the updater configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository is malformed or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        let (owner, repo) = config.owner_and_repo()?;
        let client = build_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_client(owner, repo, client)
            .with_api_url(&config.api_url)
            .with_channel(config.channel))
    }

    /// Use another API endpoint (GitHub Enterprise, or a mock server).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl AsRef<str>) -> Self {
        self.api_url = api_url.as_ref().trim_end_matches('/').to_string();
        self
    }

    /// Track another release channel.
    #[must_use]
    pub fn with_channel(mut self, channel: ReleaseChannel) -> Self {
        self.channel = channel;
        self
    }

    /// The repository owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name.
    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// The tracked release channel.
    #[must_use]
    pub fn channel(&self) -> ReleaseChannel {
        self.channel
    }

    /// Releases found by the last successful query, newest first.
    #[must_use]
    pub fn releases(&self) -> &[GitHubRelease] {
        self.releases.as_deref().unwrap_or_default()
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{path}", self.api_url, self.owner, self.repo)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await
            .map_err(Error::from_reqwest)?;

        check_status(response, url)?
            .json()
            .await
            .map_err(Error::from_reqwest)
    }

    /// Resolve the SHA the release's tag points at.
    async fn query_reference(&self, release: &GitHubRelease) -> Result<String> {
        let tag = release
            .tag_name
            .as_deref()
            .ok_or_else(|| Error::MissingTag(release.id.to_string()))?;

        let url = self.repo_url(&format!("git/refs/tags/{tag}"));
        let reference: ReferencePayload = self.get_json(&url).await?;

        reference
            .object
            .and_then(|object| object.sha)
            .ok_or_else(|| Error::InvalidResponse(format!("reference for tag {tag} has no SHA")))
    }
}

impl ReleaseSource for GitHubSource {
    type Release = GitHubRelease;

    async fn query(&mut self) -> Result<()> {
        let url = self.repo_url("releases");
        debug!("Querying releases from {url}");

        let payloads: Vec<ReleasePayload> = self.get_json(&url).await?;

        let mut releases = Vec::with_capacity(payloads.len());
        for payload in payloads {
            if payload.draft {
                continue;
            }

            let mut release = GitHubRelease::from_payload(payload, &self.client);
            if self.channel == ReleaseChannel::Stable && release.is_prerelease() {
                debug!("Skipping prerelease {}", release.name());
                continue;
            }

            release.identifier = Some(self.query_reference(&release).await?);
            releases.push(release);
        }

        info!(
            "Found {} releases for {}/{}",
            releases.len(),
            self.owner,
            self.repo
        );
        self.releases = Some(releases);
        Ok(())
    }

    fn latest_release(&self) -> Option<&GitHubRelease> {
        self.releases.as_ref()?.first()
    }
}

/// A release published on GitHub.
#[derive(Debug, Clone)]
pub struct GitHubRelease {
    id: u64,
    tag_name: Option<String>,
    title: Option<String>,
    body: Option<String>,
    prerelease: bool,
    published_at: Option<DateTime<Utc>>,
    identifier: Option<String>,
    assets: Vec<GitHubAsset>,
}

impl GitHubRelease {
    fn from_payload(payload: ReleasePayload, client: &Client) -> Self {
        Self {
            id: payload.id,
            tag_name: payload.tag_name,
            title: payload.name,
            body: payload.body,
            prerelease: payload.prerelease,
            published_at: payload.published_at,
            identifier: None,
            assets: payload
                .assets
                .into_iter()
                .map(|asset| GitHubAsset::from_payload(asset, client))
                .collect(),
        }
    }

    /// The release title, which may differ from the tag.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// The tag parsed as a semantic version, with an optional leading `v`.
    #[must_use]
    pub fn version(&self) -> Option<Version> {
        let tag = self.tag_name.as_deref()?;
        Version::parse(tag.strip_prefix('v').unwrap_or(tag)).ok()
    }

    /// When the release was published.
    #[must_use]
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    /// Whether the release is marked as a prerelease or carries a pre-release version.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.prerelease || self.version().is_some_and(|v| !v.pre.is_empty())
    }
}

impl Release for GitHubRelease {
    type Asset = GitHubAsset;

    fn name(&self) -> &str {
        self.tag_name.as_deref().unwrap_or_default()
    }

    fn information(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    fn identifier(&self) -> &str {
        self.identifier.as_deref().unwrap_or_default()
    }

    fn assets(&self) -> &[GitHubAsset] {
        &self.assets
    }
}

/// A file attached to a GitHub release.
#[derive(Debug, Clone)]
pub struct GitHubAsset {
    name: Option<String>,
    url: Option<String>,
    size: u64,
    content_type: Option<String>,
    client: Client,
}

impl GitHubAsset {
    fn from_payload(payload: AssetPayload, client: &Client) -> Self {
        Self {
            name: payload.name,
            url: payload.url,
            size: payload.size,
            content_type: payload.content_type,
            client: client.clone(),
        }
    }

    /// Size in bytes as reported by GitHub.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// MIME type as reported by GitHub.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl Asset for GitHubAsset {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    async fn write_to(&self, target: &mut dyn AbortWrite) -> Result<()> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| Error::MissingDownloadUrl(self.name().to_string()))?;
        debug!("Downloading asset {} from {url}", self.name());

        let response = self
            .client
            .get(url)
            .header(ACCEPT, OCTET_STREAM)
            .send()
            .await
            .map_err(Error::from_reqwest)?;
        let response = check_status(response, url)?;

        let mut stream = pin!(response.bytes_stream());
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk: Bytes = chunk.map_err(Error::from_reqwest)?;
            target.write_all(&chunk)?;
            written += chunk.len();
        }
        target.flush()?;

        debug!("Downloaded {written} bytes for asset {}", self.name());
        Ok(())
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(Error::Network)
}

fn check_status(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::HttpStatus {
            status,
            url: url.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    #[serde(default)]
    id: u64,
    tag_name: Option<String>,
    name: Option<String>,
    body: Option<String>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assets: Vec<AssetPayload>,
}

#[derive(Debug, Deserialize)]
struct AssetPayload {
    name: Option<String>,
    url: Option<String>,
    #[serde(default)]
    size: u64,
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReferencePayload {
    object: Option<GitObject>,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: Option<String>,
}

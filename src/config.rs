//! Configuration for self-updater.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Which releases are considered update candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    /// Stable releases only.
    #[default]
    Stable,
    /// Beta releases (includes stable).
    Beta,
}

/// Updater configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// GitHub repository in `owner/name` form.
    #[serde(default)]
    pub repo: String,

    /// GitHub API endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Release channel.
    #[serde(default)]
    pub channel: ReleaseChannel,

    /// Identifier of the installed release.
    #[serde(default)]
    pub current_identifier: Option<String>,

    /// Where the selected asset is installed (defaults to the running executable).
    #[serde(default)]
    pub destination: Option<PathBuf>,

    /// Name of the asset to install (defaults to the first asset).
    #[serde(default)]
    pub asset: Option<String>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Check interval in hours for the update monitor.
    #[serde(default = "default_check_interval")]
    pub check_interval_hours: u64,

    /// Apply updates found by the monitor instead of only reporting them.
    #[serde(default)]
    pub auto_apply: bool,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            api_url: default_api_url(),
            channel: ReleaseChannel::default(),
            current_identifier: None,
            destination: None,
            asset: None,
            timeout_secs: default_timeout_secs(),
            check_interval_hours: default_check_interval(),
            auto_apply: false,
            log_level: default_log_level(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_check_interval() -> u64 {
    1 // 1 hour
}

fn default_log_level() -> String {
    "info".to_string()
}

impl UpdaterConfig {
    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "self-updater")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("self-updater.toml"))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Split `repo` into owner and repository name.
    ///
    /// # Errors
    ///
    /// Returns an error unless `repo` has the form `owner/name`.
    pub fn owner_and_repo(&self) -> Result<(&str, &str)> {
        match self.repo.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok((owner, name))
            }
            _ => Err(Error::Config(format!(
                "repository must be given as owner/name, got {:?}",
                self.repo
            ))),
        }
    }
}

//! Command-line interface definition.

use clap::{Parser, Subcommand, ValueEnum};
use self_updater::config::{ReleaseChannel, UpdaterConfig};
use std::path::PathBuf;

/// Check for and install new releases of an application published on GitHub.
#[derive(Parser, Debug)]
#[command(name = "self-updater")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// GitHub repository in owner/name form.
    #[arg(long, global = true, env = "SELF_UPDATER_REPO")]
    pub repo: Option<String>,

    /// GitHub API endpoint.
    #[arg(long, global = true, env = "SELF_UPDATER_API_URL")]
    pub api_url: Option<String>,

    /// Release channel to track.
    #[arg(long, global = true, value_enum, env = "SELF_UPDATER_CHANNEL")]
    pub channel: Option<CliReleaseChannel>,

    /// Identifier (tag SHA) of the installed release.
    #[arg(long, global = true, env = "SELF_UPDATER_CURRENT")]
    pub current: Option<String>,

    /// HTTP request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Log level.
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report whether a newer release is available.
    Check,

    /// Install the latest release.
    Update {
        /// Install destination (defaults to the running executable).
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Asset to install (defaults to the first asset of the release).
        #[arg(long)]
        asset: Option<String>,

        /// Download into memory without installing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Check periodically until interrupted.
    Watch {
        /// Hours between checks.
        #[arg(long)]
        interval_hours: Option<u64>,

        /// Install new releases as they are found.
        #[arg(long)]
        auto_apply: bool,

        /// Install destination (defaults to the running executable).
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Asset to install; required with --auto-apply.
        #[arg(long)]
        asset: Option<String>,
    },
}

/// What the binary was asked to do, once options are folded into the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Report only.
    Check,
    /// Install, or download only when `dry_run` is set.
    Update {
        /// Keep the download in memory.
        dry_run: bool,
    },
    /// Run the update monitor.
    Watch,
}

/// Release channel CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliReleaseChannel {
    /// Stable releases only.
    Stable,
    /// Beta releases.
    Beta,
}

impl Cli {
    /// Convert CLI arguments into an `UpdaterConfig` and the requested mode.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn into_config(self) -> color_eyre::Result<(UpdaterConfig, Mode)> {
        // Start with default config or load from file
        let mut config = if let Some(ref path) = self.config {
            UpdaterConfig::from_file(path)?
        } else {
            UpdaterConfig::default()
        };

        // Override with CLI arguments
        if let Some(repo) = self.repo {
            config.repo = repo;
        }
        if let Some(api_url) = self.api_url {
            config.api_url = api_url;
        }
        if let Some(channel) = self.channel {
            config.channel = channel.into();
        }
        if let Some(current) = self.current {
            config.current_identifier = Some(current);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        config.log_level = self.log_level;

        let mode = match self.command {
            Command::Check => Mode::Check,
            Command::Update {
                dest,
                asset,
                dry_run,
            } => {
                config.destination = dest.or(config.destination);
                config.asset = asset.or(config.asset);
                Mode::Update { dry_run }
            }
            Command::Watch {
                interval_hours,
                auto_apply,
                dest,
                asset,
            } => {
                if let Some(hours) = interval_hours {
                    config.check_interval_hours = hours;
                }
                config.auto_apply |= auto_apply;
                config.destination = dest.or(config.destination);
                config.asset = asset.or(config.asset);
                Mode::Watch
            }
        };

        Ok((config, mode))
    }
}

impl From<CliReleaseChannel> for ReleaseChannel {
    fn from(c: CliReleaseChannel) -> Self {
        match c {
            CliReleaseChannel::Stable => ReleaseChannel::Stable,
            CliReleaseChannel::Beta => ReleaseChannel::Beta,
        }
    }
}

//! self-updater CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Mode};
use color_eyre::eyre::{bail, eyre};
use self_updater::updater::WriterForAsset;
use self_updater::{
    create_event_channel, AbortBuffer, Asset, DelayedFile, GitHubAsset, GitHubSource, Release,
    UpdateEventsChannel, UpdateMonitor, Updater, UpdaterConfig, WriteTarget,
};
use std::path::PathBuf;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();
    let config_path = cli.config.clone();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    info!("self-updater v{}", env!("CARGO_PKG_VERSION"));

    // Build configuration
    let (config, mode) = cli.into_config()?;
    let source = GitHubSource::from_config(&config)?;

    match mode {
        Mode::Check => check(source, &config).await,
        Mode::Update { dry_run: true } => dry_run(source, &config).await,
        Mode::Update { dry_run: false } => update(source, config, config_path).await,
        Mode::Watch => run_monitor(source, &config).await,
    }
}

fn current_identifier(config: &UpdaterConfig) -> String {
    config.current_identifier.clone().unwrap_or_default()
}

fn destination(config: &UpdaterConfig) -> color_eyre::Result<PathBuf> {
    match &config.destination {
        Some(path) => Ok(path.clone()),
        None => Ok(std::env::current_exe()?),
    }
}

/// Write the asset named `wanted` (or the first asset offered) to a target
/// built by `make_target`; every other asset is skipped.
fn select_asset<F>(
    wanted: Option<String>,
    mut make_target: F,
) -> impl FnMut(&GitHubAsset) -> self_updater::Result<Option<WriteTarget>> + Send + 'static
where
    F: FnMut() -> WriteTarget + Send + 'static,
{
    let mut taken = false;
    move |asset: &GitHubAsset| {
        let matches = wanted
            .as_deref()
            .map_or(true, |name| asset.name() == name);
        if taken || !matches {
            return Ok(None);
        }
        taken = true;
        Ok(Some(make_target()))
    }
}

fn ensure_asset(release: &impl Release, wanted: Option<&str>) -> color_eyre::Result<()> {
    let found = release
        .assets()
        .iter()
        .any(|asset| wanted.map_or(true, |name| asset.name() == name));
    if found {
        return Ok(());
    }
    match wanted {
        Some(name) => bail!("release {} has no asset named {name:?}", release.name()),
        None => bail!("release {} has no assets", release.name()),
    }
}

async fn check(source: GitHubSource, config: &UpdaterConfig) -> color_eyre::Result<()> {
    let mut updater = Updater::new(source, current_identifier(config), |_: &GitHubAsset| {
        Ok(None)
    });

    match updater.check().await? {
        None => println!("No updates available."),
        Some(release) => {
            println!(
                "Update available: {} - {}",
                release.name(),
                release.identifier()
            );
            if !release.information().is_empty() {
                println!("\n{}", release.information());
            }
        }
    }
    Ok(())
}

async fn dry_run(source: GitHubSource, config: &UpdaterConfig) -> color_eyre::Result<()> {
    let buffer = AbortBuffer::default();
    let target = buffer.clone();
    let mut updater = Updater::new(
        source,
        current_identifier(config),
        select_asset(config.asset.clone(), move || {
            WriteTarget::from(target.clone())
        }),
    );

    let Some(release) = updater.check().await? else {
        println!("No updates available.");
        return Ok(());
    };
    ensure_asset(&release, config.asset.as_deref())?;

    let name = release.name().to_string();
    updater.update(Some(release)).await?;
    println!(
        "Downloaded {} bytes of {name} (dry run, nothing installed)",
        buffer.len()
    );
    Ok(())
}

async fn update(
    source: GitHubSource,
    mut config: UpdaterConfig,
    config_path: Option<PathBuf>,
) -> color_eyre::Result<()> {
    let dest = destination(&config)?;
    info!("Installing to {}", dest.display());

    let target_path = dest.clone();
    let mut updater = Updater::new(
        source,
        current_identifier(&config),
        select_asset(config.asset.clone(), move || {
            WriteTarget::from(DelayedFile::new(&target_path))
        }),
    );

    let Some(release) = updater.check().await? else {
        println!("No updates available.");
        return Ok(());
    };
    ensure_asset(&release, config.asset.as_deref())?;

    let name = release.name().to_string();
    updater.update(Some(release)).await?;
    println!("Updated {} to {name}", dest.display());

    // Remember the installed release for the next check
    if let Some(path) = config_path {
        config.current_identifier = Some(updater.current_identifier().to_string());
        config.to_file(&path)?;
        info!("Recorded installed release in {}", path.display());
    }
    Ok(())
}

async fn run_monitor(source: GitHubSource, config: &UpdaterConfig) -> color_eyre::Result<()> {
    let writer: WriterForAsset<GitHubAsset> = if config.auto_apply {
        let wanted = config
            .asset
            .clone()
            .ok_or_else(|| eyre!("watch --auto-apply needs an asset name (--asset)"))?;
        let dest = destination(config)?;
        info!("Installing {wanted} to {} when updates are found", dest.display());

        Box::new(
            move |asset: &GitHubAsset| -> self_updater::Result<Option<WriteTarget>> {
                Ok((asset.name() == wanted).then(|| WriteTarget::from(DelayedFile::new(&dest))))
            },
        )
    } else {
        Box::new(|_: &GitHubAsset| -> self_updater::Result<Option<WriteTarget>> { Ok(None) })
    };

    let (events_tx, events_rx) = create_event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let updater = Updater::new(source, current_identifier(config), writer).with_events(events_tx);
    let mut monitor = UpdateMonitor::new(updater, config.check_interval_hours, shutdown_rx)
        .with_auto_apply(config.auto_apply);

    tokio::spawn(log_events(events_rx));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, initiating shutdown");
            let _ = shutdown_tx.send(true);
        }
    });

    monitor.run().await;
    info!("Goodbye!");
    Ok(())
}

async fn log_events(mut events: UpdateEventsChannel) {
    loop {
        match events.recv().await {
            Ok(event) => info!(?event, "Update event"),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("Missed {missed} update events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

//! Envmon Dashboard CLI
//!
//! Feeds reading and annotation snapshots from files into the dashboard and
//! prints the resulting device view.

use anyhow::Context;
use clap::{Parser, Subcommand};
use envmon_dashboard::{
    config::Config,
    core::DashboardView,
    feed::{decode_snapshot, snapshot_feed, FeedPublisher, RawAnnotation, RawReading},
    Dashboard, VERSION,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "envmon")]
#[command(version = VERSION)]
#[command(about = "Live environmental sensor dashboard", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply one snapshot from each file and print the view
    Show {
        /// JSON array of readings
        #[arg(long)]
        readings: PathBuf,

        /// JSON array of annotations
        #[arg(long)]
        annotations: Option<PathBuf>,

        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stream line-delimited snapshots through live subscriptions
    Replay {
        /// One JSON array of readings per line
        #[arg(long)]
        readings: PathBuf,

        /// One JSON array of annotations per line
        #[arg(long)]
        annotations: Option<PathBuf>,

        /// Delay between snapshots from the same file
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Print each view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match loaded {
        Ok(config) => {
            init_logging(&config.log_level);
            config
        }
        Err(e) => {
            let config = Config::default();
            init_logging(&config.log_level);
            tracing::warn!("Could not load configuration, using defaults: {e}");
            config
        }
    };

    match cli.command {
        Commands::Show {
            readings,
            annotations,
            json,
        } => cmd_show(&config, &readings, annotations.as_deref(), json),
        Commands::Replay {
            readings,
            annotations,
            interval_ms,
            json,
        } => cmd_replay(
            &config,
            readings,
            annotations,
            Duration::from_millis(interval_ms),
            json,
        ),
        Commands::Config => cmd_config(&config, cli.config.as_deref()),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_snapshot<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    decode_snapshot(&content).with_context(|| format!("Invalid snapshot in {}", path.display()))
}

fn print_view(view: &DashboardView, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
    } else {
        println!("{view}");
    }
    Ok(())
}

fn cmd_show(
    config: &Config,
    readings: &Path,
    annotations: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let dashboard = Dashboard::new(config)?;

    dashboard.apply_readings(read_snapshot::<RawReading>(readings)?);
    if let Some(path) = annotations {
        dashboard.apply_annotations(read_snapshot::<RawAnnotation>(path)?);
    }

    print_view(&dashboard.view(), json)
}

fn cmd_replay(
    config: &Config,
    readings: PathBuf,
    annotations: Option<PathBuf>,
    interval: Duration,
    json: bool,
) -> anyhow::Result<()> {
    let dashboard = Arc::new(Dashboard::new(config)?);

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut watcher = dashboard.watch();

    let (reading_tx, reading_rx) = snapshot_feed::<RawReading>(dashboard.feed_capacity());
    let reading_subscription = dashboard.subscribe_readings(reading_rx)?;
    let mut sources = vec![spawn_source(readings, reading_tx, interval, running.clone())?];

    let annotation_subscription = match annotations {
        Some(path) => {
            let (annotation_tx, annotation_rx) =
                snapshot_feed::<RawAnnotation>(dashboard.feed_capacity());
            let subscription = dashboard.subscribe_annotations(annotation_rx)?;
            sources.push(spawn_source(path, annotation_tx, interval, running.clone())?);
            Some(subscription)
        }
        None => None,
    };

    println!("Replaying snapshots. Press Ctrl+C to stop");
    println!();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async {
        while running.load(Ordering::SeqCst) {
            match tokio::time::timeout(Duration::from_millis(200), watcher.changed()).await {
                Ok(Some(view)) => print_view(&view, json)?,
                Ok(None) => break,
                Err(_) => {
                    let annotations_done = annotation_subscription
                        .as_ref()
                        .map_or(true, |s| !s.is_active());
                    if !reading_subscription.is_active() && annotations_done {
                        break;
                    }
                }
            }
        }
        anyhow::Ok(())
    })?;

    running.store(false, Ordering::SeqCst);
    reading_subscription.unsubscribe();
    if let Some(subscription) = annotation_subscription {
        subscription.unsubscribe();
    }
    for source in sources {
        if source.join().is_err() {
            tracing::error!("Snapshot source thread panicked");
        }
    }

    println!();
    println!("{}", dashboard.stats().summary());
    Ok(())
}

/// Publish one snapshot per non-empty line of `path`.
fn spawn_source<T>(
    path: PathBuf,
    publisher: FeedPublisher<T>,
    interval: Duration,
    running: Arc<AtomicBool>,
) -> anyhow::Result<JoinHandle<()>>
where
    T: DeserializeOwned + Send + 'static,
{
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Could not read {}", path.display()))?;

    let handle = thread::Builder::new()
        .name(format!("source-{}", path.display()))
        .spawn(move || {
            for (index, line) in content.lines().enumerate() {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if line.trim().is_empty() {
                    continue;
                }
                match decode_snapshot::<T>(line) {
                    Ok(snapshot) => {
                        if publisher.publish(snapshot).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            file = %path.display(),
                            line = index + 1,
                            "Skipping snapshot: {e}"
                        );
                    }
                }
                thread::sleep(interval);
            }
        })?;

    Ok(handle)
}

fn cmd_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}

//! Seeds a store and drives the data generator against it, logging every
//! change notification and the store status after each tick.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use kts_engine::{GeneratorOptions, Provider, ProviderConfig, Request, ResourceKind};

#[derive(Parser, Debug)]
#[clap(about = "Artist/album provider demo")]
struct CliArgs {
    /// TOML config file.
    #[clap(long)]
    config: Option<PathBuf>,

    /// SQLite database file. In-memory when neither this nor the config sets one.
    #[clap(long)]
    db: Option<PathBuf>,

    /// Seconds between generator ticks.
    #[clap(long)]
    interval: Option<u64>,

    /// Number of ticks to run.
    #[clap(long, default_value_t = 10)]
    ticks: u32,
}

fn load_config(args: &CliArgs) -> Result<ProviderConfig> {
    let mut config = match &args.config {
        Some(path) => ProviderConfig::load(path)
            .with_context(|| format!("Failed to load config file: {:?}", path))?,
        None => ProviderConfig::default(),
    };
    if let Some(db) = &args.db {
        config.database_path = Some(db.clone());
    }
    if let Some(interval) = args.interval {
        config.generator.interval_secs = interval;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    info!(
        "starting kts-demo: store={}, interval={}s, ticks={}",
        config
            .database_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "memory".into()),
        config.generator.interval_secs,
        args.ticks
    );

    let provider = Provider::open(&config)?;
    let mut events = provider.subscribe();
    let observer = thread::spawn(move || {
        loop {
            match events.blocking_recv() {
                Ok(event) => info!("data changed on {}: {:?}", event.channel, event.kinds),
                Err(RecvError::Lagged(skipped)) => warn!("observer lagged, {skipped} events skipped"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    provider.seed()?;

    let options = GeneratorOptions::from(&config.generator);
    let interval = Duration::from_secs(config.generator.interval_secs);
    let mut rng = rand::thread_rng();
    for tick in 1..=args.ticks {
        thread::sleep(interval);
        let report = provider.generate(options, &mut rng)?;
        if let Some(moved) = &report.moved {
            info!("tick {tick}: moved album {} from {} to {}", moved.album, moved.from, moved.to);
        }
        if let Some(counts) = provider.resolve(Request::query(ResourceKind::Status)).status() {
            info!(
                "tick {tick}: {} artists, {} albums, {} history rows",
                counts.artists, counts.albums, counts.history
            );
        }
    }

    drop(provider);
    if observer.join().is_err() {
        warn!("observer thread panicked");
    }
    Ok(())
}

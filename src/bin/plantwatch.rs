//! plantwatch command-line client.
//!
//! Operates on a persistent data directory and prints JSON to stdout. Logs go
//! to stderr, filtered by `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use plantwatch::storage::{open_database, PersistentConfig};
use plantwatch::{MonitorConfig, NotificationId, PlantId, PlantMonitor, PlantProfile, SensorSample};

#[derive(Parser, Debug)]
#[command(author, version, about = "Plant sensor threshold monitor", long_about = None)]
struct Cli {
    /// Data directory holding the write-ahead log and snapshot
    #[arg(long, short = 'd', env = "PLANTWATCH_DATA_DIR", default_value = "./plantwatch.data")]
    data_dir: PathBuf,

    /// Skip fsync after each write
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add or replace a plant profile from a JSON file
    ProfileAdd {
        /// Path to the profile JSON
        file: PathBuf,
    },
    /// Make a plant the active plant
    Activate {
        /// Plant id
        plant_id: u64,
    },
    /// Evaluate one reading against the active plant
    Ingest(IngestArgs),
    /// Record a clean midpoint reading, resetting the violation streak
    Reset,
    /// Show the latest readings
    Readings {
        /// Maximum number of readings
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show sensor statistics over a trailing window
    Stats {
        /// Window length in hours, at least 1
        #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(1..))]
        hours: u32,
    },
    /// List notifications
    Notifications {
        /// Maximum number of notifications
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },
    /// Mark a notification read and show it
    Read {
        /// Notification id
        id: Uuid,
    },
    /// Snapshot the stores and truncate the write-ahead log
    Compact,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Soil moisture, percent
    soil_moisture: f64,
    /// Temperature, degrees Celsius
    #[arg(allow_negative_numbers = true)]
    temperature: f64,
    /// Relative humidity, percent
    humidity: f64,
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let stores = open_database(
        &cli.data_dir,
        Some(PersistentConfig {
            sync_on_write: !cli.no_sync,
            ..PersistentConfig::default()
        }),
    )
    .with_context(|| format!("failed to open {}", cli.data_dir.display()))?;

    let monitor = PlantMonitor::new(
        stores.profiles.clone(),
        stores.readings.clone(),
        stores.notifications.clone(),
        MonitorConfig::default(),
    )?;

    match cli.command {
        Command::ProfileAdd { file } => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
            let profile: PlantProfile =
                serde_json::from_str(&raw).with_context(|| format!("invalid profile JSON in {}", file.display()))?;
            monitor.register_profile(profile.clone())?;
            print_json(&profile)?;
        }
        Command::Activate { plant_id } => {
            monitor.activate(PlantId::new(plant_id))?;
            print_json(&monitor.active_profile()?)?;
        }
        Command::Ingest(args) => {
            let result = monitor.evaluate_active(SensorSample::new(
                args.soil_moisture,
                args.temperature,
                args.humidity,
            ));
            print_json(&result)?;
        }
        Command::Reset => print_json(&monitor.reset_violations()?)?,
        Command::Readings { limit } => print_json(&monitor.latest_readings(limit)?)?,
        Command::Stats { hours } => {
            let window = chrono::Duration::try_hours(i64::from(hours)).context("window is too large")?;
            print_json(&monitor.sensor_statistics(window)?)?;
        }
        Command::Notifications { limit, unread } => print_json(&monitor.notifications(limit, unread)?)?,
        Command::Read { id } => {
            let id = NotificationId::from_uuid(id);
            monitor.mark_notification_read(id)?;
            print_json(&monitor.notification_view(id)?)?;
        }
        Command::Compact => {
            let result = stores.compact()?;
            info!(records = result.records, "compaction finished");
        }
    }

    if let Some(result) = stores.compact_if_needed()? {
        info!(records = result.records, "write-ahead log compacted");
    }
    Ok(())
}

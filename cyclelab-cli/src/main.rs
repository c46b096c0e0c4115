//! CycleLab CLI: snapshot updates and table/correlation queries.
//!
//! Commands:
//! - `update`: fetch every supported asset into today's snapshot
//! - `table`: aligned multi-asset table at daily, weekly or monthly resolution
//! - `correlation`: sliding monthly-window correlation between two assets
//! - `snapshots`: list stored snapshots and their assets
//! - `assets`: list supported asset keys

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cyclelab_core::data::LogProgress;
use cyclelab_service::{AssetService, ServiceConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cyclelab",
    about = "Asset snapshots, resampled tables and sliding correlations"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./cyclelab.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot base directory (overrides config and CYCLELAB_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every supported asset and write today's snapshot.
    Update {
        /// Treat this date (YYYY-MM-DD) as today.
        #[arg(long)]
        as_of: Option<String>,

        /// Print the per-asset summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print an aligned table for one or more assets.
    Table {
        /// Asset keys (e.g., sp500 gold bitcoin).
        #[arg(required = true)]
        assets: Vec<String>,

        /// daily, weekly or monthly.
        #[arg(long, default_value = "daily")]
        resolution: String,

        /// Print JSON records instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the sliding correlation between two assets.
    Correlation {
        asset1: String,
        asset2: String,

        /// Window length: 1개월, 3개월 or 6개월.
        #[arg(long, default_value = "1개월")]
        period: String,

        /// Treat this date (YYYY-MM-DD) as today.
        #[arg(long)]
        as_of: Option<String>,

        /// Print JSON instead of aligned text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List snapshots and the assets each one holds.
    Snapshots,
    /// List supported asset keys.
    Assets,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let service = AssetService::from_config(&config)?;
    match cli.command {
        Commands::Update { as_of, json } => run_update(&service, as_of, json),
        Commands::Table {
            assets,
            resolution,
            json,
        } => run_table(&service, &assets, &resolution, json),
        Commands::Correlation {
            asset1,
            asset2,
            period,
            as_of,
            json,
        } => run_correlation(&service, &asset1, &asset2, &period, as_of, json),
        Commands::Snapshots => run_snapshots(&service),
        Commands::Assets => {
            for key in AssetService::supported_assets() {
                println!("{key}");
            }
            Ok(())
        }
    }
}

fn parse_as_of(as_of: Option<String>) -> Result<NaiveDate> {
    match as_of {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("--as-of '{s}' is not a YYYY-MM-DD date")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn run_update(service: &AssetService, as_of: Option<String>, json: bool) -> Result<()> {
    let today = parse_as_of(as_of)?;
    let summary = service.update_all_assets_as_of(today, &LogProgress);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if summary.succeeded() == 0 {
        bail!("no asset was written to snapshot {}", summary.snapshot);
    }
    Ok(())
}

fn run_table(service: &AssetService, assets: &[String], resolution: &str, json: bool) -> Result<()> {
    if json {
        let records = service.get_table(assets, resolution)?;
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let table = service.table(assets, resolution)?;
    if table.is_empty() {
        println!("(no rows)");
        return Ok(());
    }
    println!("{}", table.to_dataframe()?);
    Ok(())
}

fn run_correlation(
    service: &AssetService,
    asset1: &str,
    asset2: &str,
    period: &str,
    as_of: Option<String>,
    json: bool,
) -> Result<()> {
    let today = parse_as_of(as_of)?;
    let points = service.get_sliding_correlation_as_of(asset1, asset2, period, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    println!("{asset1} vs {asset2} ({period} windows)");
    println!("{:<12} {:>12}", "Window End", "Correlation");
    println!("{}", "-".repeat(25));
    for p in &points {
        println!("{:<12} {:>12.4}", p.date.to_string(), p.correlation);
    }
    if points.is_empty() {
        println!("(no complete windows)");
    }
    Ok(())
}

fn run_snapshots(service: &AssetService) -> Result<()> {
    let store = service.store();
    let keys = service.snapshots()?;
    if keys.is_empty() {
        println!("No snapshots in {}", store.base_dir().display());
        return Ok(());
    }

    println!("Snapshots: {}", store.base_dir().display());
    println!();
    println!("{:<10} {:<13} {:<25} {:>8}", "Snapshot", "Asset", "Date Range", "Rows");
    println!("{}", "-".repeat(59));
    for key in &keys {
        for asset in store.list_assets(key)? {
            let (range, rows) = match store.read_meta(key, asset) {
                Some(meta) => (
                    match (meta.start_date, meta.end_date) {
                        (Some(start), Some(end)) => format!("{start} to {end}"),
                        _ => "(empty)".into(),
                    },
                    meta.row_count.to_string(),
                ),
                None => ("(no meta)".into(), "-".into()),
            };
            println!("{:<10} {:<13} {:<25} {:>8}", key.as_str(), asset.as_str(), range, rows);
        }
    }
    Ok(())
}

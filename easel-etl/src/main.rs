//! easel-etl - Catalog batch loader
//!
//! Reads the episode date list, the materials CSV and the tags CSV,
//! reconciles them by normalized title and rebuilds the catalog database.
//! Exits non-zero if a source is unusable or the load transaction fails;
//! in that case nothing from the run is persisted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use easel_common::config::EaselConfig;
use easel_common::db::init_database;
use easel_etl::batch::{run_batch, BatchSources};
use tracing::info;

/// Command-line arguments for easel-etl
#[derive(Parser, Debug)]
#[command(name = "easel-etl")]
#[command(about = "Reconcile catalog sources and load them into the database")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "EASEL_DATABASE")]
    database: Option<PathBuf>,

    /// Directory that relative source paths are resolved against
    #[arg(long, env = "EASEL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Episode date list
    #[arg(long)]
    dates: Option<PathBuf>,

    /// Materials CSV
    #[arg(long)]
    materials: Option<PathBuf>,

    /// Tags CSV
    #[arg(long)]
    tags: Option<PathBuf>,

    /// Reconcile and report without writing to the database
    #[arg(long)]
    dry_run: bool,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    report_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = EaselConfig::load(args.config.as_deref()).context("Failed to load config")?;
    apply_overrides(&mut config, &args);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Starting easel-etl v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path.display());

    let sources = BatchSources::from(&config.sources);
    info!("Dates: {}", sources.dates.display());
    info!("Materials: {}", sources.materials.display());
    info!("Tags: {}", sources.tags.display());

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;

    let report = run_batch(&pool, &sources, args.dry_run)
        .await
        .context("ETL process failed")?;

    pool.close().await;

    if args.report_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let Some(load) = &report.load {
        info!(
            "Loaded {} episodes ({} without a broadcast date skipped)",
            load.episodes_written, load.episodes_skipped_undated
        );
    }
    info!(
        "Run {} finished with {} warnings",
        report.run_id,
        report.warning_count()
    );

    Ok(())
}

/// CLI/env values override the config file
fn apply_overrides(config: &mut EaselConfig, args: &Args) {
    if let Some(database) = &args.database {
        config.database_path = database.clone();
    }
    if let Some(data_dir) = &args.data_dir {
        config.sources.data_dir = data_dir.clone();
    }
    if let Some(dates) = &args.dates {
        config.sources.dates_file = dates.clone();
    }
    if let Some(materials) = &args.materials {
        config.sources.materials_file = materials.clone();
    }
    if let Some(tags) = &args.tags {
        config.sources.tags_file = tags.clone();
    }
}

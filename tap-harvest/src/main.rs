//! tap-harvest - geotagged photo harvester
//!
//! Three entry points:
//! - `near`: one radius search around a coordinate
//! - `cities`: radius search around each configured (or built-in) city
//! - `category`: files in a Commons category
//!
//! Downloads land in the output folder; accepted records go to a JSON manifest.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tap_common::config::{self, TomlConfig};
use tap_harvest::models::locations_or_default;
use tap_harvest::services::{
    CommonsClient, ExtractionContext, HarvestOrchestrator, HarvestParams, QueryOutcome,
    SearchQuery, YearRange,
};
use tracing::{info, warn};

/// Year range applied by `cities` when none is configured
const CITIES_START_YEAR: i32 = 1900;
const CITIES_END_YEAR: i32 = 2025;

/// Command-line arguments for tap-harvest
#[derive(Parser, Debug)]
#[command(name = "tap-harvest")]
#[command(about = "Harvest geotagged, dated photos from Wikimedia Commons")]
#[command(version)]
struct Args {
    /// Path to tap.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Folder receiving downloaded images
    #[arg(short, long, global = true)]
    output_folder: Option<PathBuf>,

    /// Manifest file to write
    #[arg(short, long, global = true)]
    manifest: Option<PathBuf>,

    /// Earliest capture year to keep (inclusive)
    #[arg(long, global = true)]
    start_year: Option<i32>,

    /// Latest capture year to keep (inclusive)
    #[arg(long, global = true)]
    end_year: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Photos within a radius of one coordinate
    Near {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long)]
        radius_km: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Photos around each configured city (built-in world cities if none)
    Cities {
        #[arg(long)]
        radius_km: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Photos in a Commons category, e.g. `Cape_Town`
    Category {
        name: String,
        #[arg(long)]
        limit: Option<u32>,
        /// Fallback latitude for pages without coordinates
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,
        /// Fallback longitude for pages without coordinates
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,
    },
}

impl Command {
    /// Manifest name used by each mode when none is configured
    fn default_manifest(&self) -> &'static str {
        match self {
            Command::Near { .. } => "images_metadata_world.json",
            Command::Cities { .. } => "images_metadata_global.json",
            Command::Category { .. } => config::DEFAULT_MANIFEST_PATH,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::locate_config_file(args.config.as_deref());
    let toml_config = config::load_toml_config(config_path.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level)),
        )
        .init();

    info!(
        "Starting tap-harvest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Configuration: {}", config::config_source(config_path.as_deref()));

    let output_folder = config::resolve_output_folder(args.output_folder.as_deref(), &toml_config);
    config::ensure_output_folder(&output_folder)
        .with_context(|| format!("Failed to prepare {}", output_folder.display()))?;
    info!("Output folder: {}", output_folder.display());

    let manifest_path = args
        .manifest
        .clone()
        .or_else(|| toml_config.manifest_path.clone())
        .unwrap_or_else(|| PathBuf::from(args.command.default_manifest()));

    let client = CommonsClient::from_config(&toml_config).context("Failed to create client")?;
    let mut orchestrator = HarvestOrchestrator::new(
        Arc::new(client),
        output_folder,
        Duration::from_millis(toml_config.query_delay_ms),
    );

    let outcome = run(&args, &toml_config, &mut orchestrator).await?;
    finish(outcome, &orchestrator, &manifest_path)
}

async fn run(
    args: &Args,
    toml_config: &TomlConfig,
    orchestrator: &mut HarvestOrchestrator,
) -> Result<QueryOutcome> {
    let defaults = &toml_config.harvest;
    let year_range = YearRange::new(
        args.start_year.or(defaults.start_year),
        args.end_year.or(defaults.end_year),
    );

    let outcome = match &args.command {
        Command::Near {
            lat,
            lon,
            radius_km,
            limit,
        } => {
            let query = SearchQuery::Geo {
                lat: *lat,
                lon: *lon,
                radius_km: radius_km.unwrap_or(defaults.radius_km),
                limit: limit.unwrap_or(defaults.limit),
            };
            let ctx = ExtractionContext {
                query_center: Some((*lat, *lon)),
                year_range,
                city: None,
            };
            orchestrator
                .run_query(&query, &ctx)
                .await
                .context("Search failed")?
        }
        Command::Cities { radius_km, limit } => {
            let year_range = YearRange::new(
                year_range.start.or(Some(CITIES_START_YEAR)),
                year_range.end.or(Some(CITIES_END_YEAR)),
            );
            let params = HarvestParams {
                radius_km: radius_km.unwrap_or(defaults.radius_km),
                limit: limit.unwrap_or(defaults.limit),
                year_range,
            };
            let locations = locations_or_default(&toml_config.locations);
            orchestrator.run_locations(&locations, &params).await
        }
        Command::Category {
            name,
            limit,
            lat,
            lon,
        } => {
            let query = SearchQuery::Category {
                name: name.clone(),
                limit: limit.unwrap_or(defaults.limit),
            };
            let ctx = ExtractionContext {
                query_center: (*lat).zip(*lon),
                year_range,
                city: None,
            };
            orchestrator
                .run_query(&query, &ctx)
                .await
                .context("Category listing failed")?
        }
    };

    Ok(outcome)
}

fn finish(
    outcome: QueryOutcome,
    orchestrator: &HarvestOrchestrator,
    manifest_path: &Path,
) -> Result<()> {
    let QueryOutcome {
        mut records,
        report,
    } = outcome;

    for failure in &report.failed_locations {
        warn!("Location {} failed: {}", failure.location, failure.error);
    }
    for (reason, count) in &report.rejections {
        info!("Rejected ({}): {}", reason, count);
    }
    if report.licence_defaulted > 0 {
        warn!(
            "{} records credited with the default licence label; verify before publishing",
            report.licence_defaulted
        );
    }
    info!("{}", report.display_string());

    orchestrator
        .write_manifest(&mut records, manifest_path)
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

    println!(
        "{} images saved to {}",
        records.len(),
        manifest_path.display()
    );
    Ok(())
}

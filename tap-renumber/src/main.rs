//! tap-renumber - renumber harvested images to image<N>.<ext>
//!
//! Reads the manifest, renames each file in storage, rewrites `filename`, and
//! writes the manifest back.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tap_common::config;
use tap_renumber::{renumber_manifest, MissingFilePolicy};
use tracing::{info, warn};

/// Command-line arguments for tap-renumber
#[derive(Parser, Debug)]
#[command(name = "tap-renumber")]
#[command(about = "Renumber harvested images and update the manifest")]
#[command(version)]
struct Args {
    /// Path to tap.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Folder holding the harvested images
    #[arg(short, long)]
    output_folder: Option<PathBuf>,

    /// Manifest to rewrite
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Handling of manifest entries whose file is missing: keep, rewrite or fail
    #[arg(long, default_value_t = MissingFilePolicy::Keep)]
    on_missing: MissingFilePolicy,
}

fn main() -> Result<()> {
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

    info!("Starting tap-renumber v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config::config_source(config_path.as_deref()));

    let output_folder = config::resolve_output_folder(args.output_folder.as_deref(), &toml_config);
    let manifest_path = config::resolve_manifest_path(args.manifest.as_deref(), &toml_config);
    info!(
        "Renumbering {} against {} (on missing: {})",
        manifest_path.display(),
        output_folder.display(),
        args.on_missing
    );

    let report = renumber_manifest(&manifest_path, &output_folder, args.on_missing)
        .with_context(|| format!("Failed to renumber {}", manifest_path.display()))?;

    if !report.missing.is_empty() {
        warn!("{} file(s) were missing from storage", report.missing.len());
    }

    println!(
        "{} files renamed, {} already numbered; metadata updated in {}",
        report.renamed,
        report.unchanged,
        manifest_path.display()
    );
    Ok(())
}

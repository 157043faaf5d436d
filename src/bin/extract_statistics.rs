//! Extract feature statistics
//!
//! Fits speaker-independent and speaker-dependent scalers over the feature
//! files of one phase and writes them to `<featdir>/<label>/scaler.json`.
//!
//! Usage:
//!     cargo run --release --features cli --bin extract_statistics -- \
//!         --phase train --conf conf/mlfb_vqvae_22050.yml \
//!         --scpdir data/scp --featdir data/feature

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crank::scp::{open_featsscp, open_scpdir};
use crank::stats::extract_statistics;
use crank::{Config, FeatureDir};

/// Extract feature statistics
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of CPUs (accepted for compatibility, extraction is sequential)
    #[arg(long = "n_jobs", default_value_t = -1, allow_negative_numbers = true)]
    n_jobs: i32,

    /// Phase name (train, dev, eval, ...)
    #[arg(long)]
    phase: String,

    /// YAML configuration file
    #[arg(long)]
    conf: PathBuf,

    /// scp directory
    #[arg(long)]
    scpdir: PathBuf,

    /// Output feature directory
    #[arg(long)]
    featdir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    tracing::debug!("n_jobs={} (sequential)", args.n_jobs);

    let conf = Config::from_file(&args.conf)?;
    let scp = open_scpdir(&args.scpdir, &args.phase)?;
    let featdir = FeatureDir::new(&args.featdir, &conf.feature.label);
    let feats = open_featsscp(featdir.feats_scp(&args.phase))?;

    let scalers = extract_statistics(&conf.feature, &scp, &feats)?;

    let path = featdir.scaler();
    scalers.save(&path)?;
    tracing::info!("Save scaler to {}", path.display());

    Ok(())
}

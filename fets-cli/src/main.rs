//! fets-cli - FeTS orchestrator entry point
//!
//! Parses operator parameters, resolves the installation layout, and hands
//! the run to the planner wired to the real process runner. Hard failures
//! surface as a nonzero exit with the error on stderr; non-fatal failures are
//! summarized at the end and written to a JSON report in the logging
//! directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fets_cli::planner::{RunPlanner, RunRequest};
use fets_cli::types::{Device, RunMode};
use fets_common::layout::InstallLayout;
use fets_common::process::TokioProcessRunner;

/// Command-line arguments for fets-cli
#[derive(Parser, Debug)]
#[command(name = "fets-cli")]
#[command(about = "Federated tumor segmentation orchestrator")]
#[command(version)]
struct Args {
    /// Input data directory with one subdirectory per subject
    #[arg(short = 'd', long, env = "FETS_DATA_DIR")]
    data_dir: PathBuf,

    /// Input model weights file
    #[arg(short = 'm', long)]
    model_name: String,

    /// Perform training instead of inference
    #[arg(short = 't', long)]
    training: bool,

    /// Location of the logging directory
    #[arg(short = 'L', long, env = "FETS_LOGGING_DIR")]
    logging_dir: PathBuf,

    /// Comma-separated architecture(s) to infer/train on; only a single
    /// architecture is supported for training
    #[arg(short = 'a', long)]
    archs: String,

    /// Comma-separated label fusion strategies for multi-arch inference
    #[arg(long, default_value = "staple")]
    label_fuse: String,

    /// Run the external processes on GPU
    #[arg(short = 'g', long)]
    gpu: bool,

    /// Common name of collaborator (required for training)
    #[arg(short = 'c', long)]
    col_name: Option<String>,

    /// FeTS installation directory (defaults to FETS_INSTALL_DIR or the
    /// executable's directory)
    #[arg(long, env = "FETS_INSTALL_DIR")]
    install_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fets_cli=info,fets_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mode = RunMode::from_flags(args.training, args.col_name.clone())?;
    let layout = InstallLayout::resolve(args.install_dir.as_deref())
        .context("Failed to resolve the FeTS installation layout")?;

    info!("Starting FeTS orchestrator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Installation root: {}", layout.root().display());
    info!("Data directory: {}", args.data_dir.display());
    info!("Logging directory: {}", args.logging_dir.display());

    let request = RunRequest {
        data_dir: args.data_dir,
        model_name: args.model_name,
        logging_dir: args.logging_dir.clone(),
        archs: args.archs,
        label_fusion: args.label_fuse,
        device: Device::from_gpu_flag(args.gpu),
        mode,
    };

    let runner = TokioProcessRunner;
    let planner = RunPlanner::new(&layout, &runner);
    let report = planner.run(&request).await?;

    report.log_summary();
    let report_path = report
        .write_json(&args.logging_dir)
        .context("Failed to write the run report")?;
    info!("Run report written to {}", report_path.display());

    Ok(())
}

// ==============================================================================
// main.rs - Triplet Repeat Processor Entry Point
// ==============================================================================
// Description: Command line entry point for one worksheet/gene run
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triplet_repeats::config::{Gene, RunConfig};
use triplet_repeats::models::CalibrationPolicy;
use triplet_repeats::output::{OutputFormat, OutputGenerator};
use triplet_repeats::processor::{RunOutcome, TripletProcessor, UNKNOWN_GENE_MESSAGE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gene name (FRAX, FA, C9ORF72, HD, MDMYo(DM1), SCA1, SCA2, SCA3, SCA6)
    #[arg(short, long, env = "TRIPLETS_GENE")]
    gene: String,

    /// Worksheet number
    #[arg(short, long, env = "TRIPLETS_WORKSHEET")]
    worksheet: String,

    /// Directory holding the GeneMapper export
    #[arg(short, long, env = "TRIPLETS_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Reference controls table (defaults to the gene's table in data_dir)
    #[arg(short, long, env = "TRIPLETS_CONTROLS")]
    controls: Option<PathBuf>,

    /// Output directory (defaults to data_dir)
    #[arg(short, long, env = "TRIPLETS_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Allowed control deviation in base pairs
    #[arg(short, long, env = "TRIPLETS_TOLERANCE", default_value_t = 3.0)]
    tolerance: f64,

    /// Report formats (tsv, review, json, sqlite)
    #[arg(
        short,
        long,
        env = "TRIPLETS_FORMAT",
        value_delimiter = ',',
        default_value = "tsv,review"
    )]
    format: Vec<OutputFormat>,
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triplet_repeats=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Triplet repeat processor starting...");

    let args = Args::parse();

    if !args.tolerance.is_finite() || args.tolerance < 0.0 {
        anyhow::bail!("Tolerance must be a non-negative number: {}", args.tolerance);
    }

    let output_dir = args.output_dir.unwrap_or_else(|| args.data_dir.clone());

    let gene = match args.gene.parse::<Gene>() {
        Ok(gene) => gene,
        Err(e) => {
            OutputGenerator::new(
                format!("{}_{}", args.worksheet, args.gene.trim()),
                args.worksheet.clone(),
                output_dir,
            )
            .write_message(UNKNOWN_GENE_MESSAGE)?;
            return Err(e).context("Invalid gene");
        }
    };

    let config = RunConfig {
        controls_path: args.controls,
        formats: args.format,
        policy: CalibrationPolicy {
            tolerance: args.tolerance,
            ..CalibrationPolicy::default()
        },
        ..RunConfig::new(gene, args.worksheet, args.data_dir)
    }
    .with_output_dir(&output_dir);

    let processor = TripletProcessor::new(config);
    info!("Run id: {}", processor.run_id());

    match processor.process()? {
        RunOutcome::Completed { rows, reports } => {
            info!("Called {} samples", rows.len());
            for (format, path) in &reports {
                info!("{:?} report: {:?}", format, path);
            }
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::ControlsOutOfTolerance {
            out_of_tolerance,
            message_path,
        } => {
            warn!(
                "Controls out of tolerance ({}); see {:?}",
                out_of_tolerance.join(", "),
                message_path
            );
            Ok(ExitCode::from(2))
        }
    }
}

// ==============================================================================
// main.rs - Variant Comparison Entry Point
// ==============================================================================
// Description: Command-line interface for risk tables, tall tables, and pairwise matrices
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use variant_comparison::models::AbsencePolicy;
use variant_comparison::output::{MatrixExporter, OutputFormat, TableLayout};
use variant_comparison::processor::{RunConfig, VariantComparisonProcessor, DEFAULT_FLATTEN_KEY};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Worker threads for pairwise matrices (default: one per core)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Write a JSON run manifest to this path
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Only read these chromosomes (e.g., chr1,chr2)
    #[arg(long, global = true, value_delimiter = ',')]
    chromosomes: Vec<String>,

    /// Reject variant files larger than this many bytes (default: no limit)
    #[arg(long, global = true)]
    max_file_size: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Person × risk SNP allele score table
    RiskTable {
        #[arg(long)]
        vcf_dir: PathBuf,
        #[arg(long)]
        panel: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Leave out the 0..4 normalization rows
        #[arg(long)]
        no_normalization: bool,
    },

    /// Tall (person, SNP, score) rows for non-zero risk scores
    RiskTall {
        #[arg(long)]
        vcf_dir: PathBuf,
        #[arg(long)]
        panel: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Tall (person, SNP, allele) rows for every SNP record
    Tall {
        #[arg(long)]
        vcf_dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Restrict to these person ids
        #[arg(long, value_delimiter = ',')]
        people: Vec<String>,
    },

    /// Person × person difference counts
    Differences {
        #[arg(long)]
        vcf_dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Whether a SNP seen in only one person counts (count or ignore)
        #[arg(long, default_value = "count")]
        absence: AbsencePolicy,
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
        #[arg(long, default_value = "wide")]
        layout: TableLayout,
    },

    /// SNP × SNP risk allele co-occurrence from a risk table
    CoOccurrence {
        #[arg(long)]
        risk_table: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
        #[arg(long, default_value = "wide")]
        layout: TableLayout,
    },

    /// Flatten any wide CSV into A,B,value rows
    Flatten {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = DEFAULT_FLATTEN_KEY)]
        key_column: String,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::RiskTable { .. } => "risk-table",
            Command::RiskTall { .. } => "risk-tall",
            Command::Tall { .. } => "tall",
            Command::Differences { .. } => "differences",
            Command::CoOccurrence { .. } => "co-occurrence",
            Command::Flatten { .. } => "flatten",
        }
    }

    fn vcf_dir(&self) -> Option<PathBuf> {
        match self {
            Command::RiskTable { vcf_dir, .. }
            | Command::RiskTall { vcf_dir, .. }
            | Command::Tall { vcf_dir, .. }
            | Command::Differences { vcf_dir, .. } => Some(vcf_dir.clone()),
            Command::CoOccurrence { .. } | Command::Flatten { .. } => None,
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "variant_comparison=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line arguments
    let args = Args::parse();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let command_name = args.command.name();
    info!("variant-comparison {} starting", command_name);

    let config = RunConfig {
        input_dir: args.command.vcf_dir(),
        chromosomes: args.chromosomes,
        manifest_path: args.manifest,
        max_file_size: args.max_file_size,
    };
    let mut processor = VariantComparisonProcessor::new(config, command_name);

    let result = match args.command {
        Command::RiskTable {
            panel,
            output,
            no_normalization,
            ..
        } => processor
            .risk_table(&panel, &output, !no_normalization)
            .map(|table| info!("Risk table: {} rows -> {:?}", table.len(), output)),
        Command::RiskTall { panel, output, .. } => processor
            .risk_tall(&panel, &output)
            .map(|rows| info!("Risk tall table: {} rows -> {:?}", rows, output)),
        Command::Tall { output, people, .. } => processor
            .tall(&output, &people)
            .map(|rows| info!("Tall table: {} rows -> {:?}", rows, output)),
        Command::Differences {
            output,
            absence,
            format,
            layout,
            ..
        } => processor
            .differences(absence, &MatrixExporter::new(format, layout), &output)
            .map(|matrix| info!("Difference matrix: {} people -> {:?}", matrix.len(), output)),
        Command::CoOccurrence {
            risk_table,
            output,
            format,
            layout,
        } => processor
            .co_occurrence(&risk_table, &MatrixExporter::new(format, layout), &output)
            .map(|matrix| info!("Co-occurrence matrix: {} SNPs -> {:?}", matrix.len(), output)),
        Command::Flatten {
            input,
            output,
            key_column,
        } => processor
            .flatten(&input, &output, &key_column)
            .map(|rows| info!("Flattened {} cells -> {:?}", rows, output)),
    };

    if let Err(e) = result {
        warn!("{} failed: {:#}", command_name, e);
        return Err(e);
    }

    processor.finish()?;
    Ok(())
}

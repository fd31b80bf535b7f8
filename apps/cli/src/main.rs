//! Sift CLI - review annotation pipeline
//!
//! Provides the `sift` command: merge store exports, prepare records for
//! labeling, run the annotation rounds and split the labeled set.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sift_core::{LoggingConfig, SiftConfig};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use commands::{label, merge, pipeline, prepare, split};

/// Sift - label app-store reviews with an LLM oracle
#[derive(Parser, Debug)]
#[command(
    name = "sift",
    author,
    version,
    about = "Sift - review annotation pipeline",
    long_about = "Sift merges app-store review exports, cleans them, labels them in validated rounds\nagainst a closed category set and produces a stratified train/test split."
)]
struct Args {
    /// Configuration file (defaults to ./sift.toml when present)
    #[arg(short, long, global = true, env = "SIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge Google Play and App Store CSV exports into one CSV
    Merge {
        /// Google Play export (reviewId,userName,rating,date,review)
        #[arg(long)]
        google_csv: Option<PathBuf>,

        /// App Store export (same columns)
        #[arg(long)]
        app_store_csv: Option<PathBuf>,

        /// Output path (defaults to a timestamped file in paths.processed_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clean a merged CSV into the unlabeled record set
    Prepare {
        /// Merged CSV produced by `sift merge`
        #[arg(long)]
        merged_csv: PathBuf,

        /// Output path (defaults to a timestamped file in paths.labeling_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Label records in validated rounds
    Label {
        /// JSON array of unlabeled records
        #[arg(long)]
        input: PathBuf,

        /// Accept oracle labels without schema validation
        #[arg(long)]
        skip_validation: bool,

        /// Timestamp used in output file names
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// Stratified train/test split of a labeled set
    Split {
        /// Labeled JSON produced by `sift label`
        #[arg(long)]
        labeled: PathBuf,

        /// Timestamp used in output file names
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// Run merge (optional), prepare, label and split in sequence
    Pipeline {
        /// Start from an already merged CSV
        #[arg(long, conflicts_with_all = ["google_csv", "app_store_csv"])]
        merged_csv: Option<PathBuf>,

        /// Google Play export to merge first
        #[arg(long)]
        google_csv: Option<PathBuf>,

        /// App Store export to merge first
        #[arg(long)]
        app_store_csv: Option<PathBuf>,

        /// Accept oracle labels without schema validation
        #[arg(long)]
        skip_validation: bool,
    },
}

fn init_tracing(cli_level: Option<&str>, json: bool, logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {}", level))?,
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr);
    if json || logging.json {
        builder.json().try_init().map_err(|e| anyhow::anyhow!(e))?;
    } else {
        builder.try_init().map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

/// Cancels `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight work and writing partial results");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = SiftConfig::discover(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(args.log_level.as_deref(), args.log_json, &config.logging)?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);

    match args.command {
        Command::Merge { google_csv, app_store_csv, output } => {
            merge::execute(&config, google_csv, app_store_csv, output)?;
        }
        Command::Prepare { merged_csv, output } => {
            prepare::execute(&config, &merged_csv, output)?;
        }
        Command::Label { input, skip_validation, timestamp } => {
            label::execute(&config, &input, skip_validation, timestamp, cancel).await?;
        }
        Command::Split { labeled, timestamp } => {
            split::execute(&config, &labeled, timestamp)?;
        }
        Command::Pipeline { merged_csv, google_csv, app_store_csv, skip_validation } => {
            let source = match merged_csv {
                Some(path) => pipeline::Source::Merged(path),
                None => pipeline::Source::Exports { google_play: google_csv, app_store: app_store_csv },
            };
            pipeline::execute(&config, source, skip_validation, cancel).await?;
        }
    }

    Ok(())
}

//! `sift merge`

use super::{output_path, print_artifacts};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use sift_core::SiftConfig;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct MergeOutput {
    pub merged_csv: PathBuf,
    pub rows: usize,
}

pub fn execute(
    config: &SiftConfig,
    google_csv: Option<PathBuf>,
    app_store_csv: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let timestamp = sift_core::artifacts::timestamp();
    let merged = run(config, google_csv, app_store_csv, output, &timestamp)?;
    print_artifacts(&merged)
}

pub fn run(
    config: &SiftConfig,
    google_csv: Option<PathBuf>,
    app_store_csv: Option<PathBuf>,
    output: Option<PathBuf>,
    timestamp: &str,
) -> Result<MergeOutput> {
    let merged_csv = output_path(output, &config.paths.processed_dir, "merged_reviews", timestamp, "csv");

    let rows = sift_core::merge::merge_files(google_csv.as_deref(), app_store_csv.as_deref(), &merged_csv)
        .context("Failed to merge review exports")?;

    eprintln!("{} {} reviews -> {}", "Merged".green().bold(), rows, merged_csv.display().to_string().cyan());
    Ok(MergeOutput { merged_csv, rows })
}

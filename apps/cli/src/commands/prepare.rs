//! `sift prepare`

use super::{output_path, print_artifacts};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use sift_core::artifacts::write_json;
use sift_core::{Preparer, SiftConfig};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct PrepareOutput {
    pub unlabeled: PathBuf,
    pub records: usize,
}

pub fn execute(config: &SiftConfig, merged_csv: &Path, output: Option<PathBuf>) -> Result<()> {
    let timestamp = sift_core::artifacts::timestamp();
    let prepared = run(config, merged_csv, output, &timestamp)?;
    print_artifacts(&prepared)
}

pub fn run(config: &SiftConfig, merged_csv: &Path, output: Option<PathBuf>, timestamp: &str) -> Result<PrepareOutput> {
    let unlabeled = output_path(output, &config.paths.labeling_dir, "unlabeled_reviews", timestamp, "json");

    let preparer = Preparer::new(config.cleaning.clone())?;
    let records = preparer
        .prepare_file(merged_csv)
        .with_context(|| format!("Failed to prepare {}", merged_csv.display()))?;
    write_json(&unlabeled, &records).with_context(|| format!("Failed to write {}", unlabeled.display()))?;

    eprintln!(
        "{} {} records for labeling -> {}",
        "Prepared".green().bold(),
        records.len(),
        unlabeled.display().to_string().cyan()
    );
    Ok(PrepareOutput { unlabeled, records: records.len() })
}

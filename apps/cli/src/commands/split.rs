//! `sift split`

use super::print_artifacts;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use sift_core::SiftConfig;
use sift_core::artifacts::{read_json, timestamped_filename};
use sift_dataset::{stratified_split, write_split};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct SplitOutput {
    pub train: PathBuf,
    pub test: PathBuf,
    pub manifest: PathBuf,
}

pub fn execute(config: &SiftConfig, labeled: &Path, timestamp: Option<String>) -> Result<()> {
    let timestamp = timestamp.unwrap_or_else(sift_core::artifacts::timestamp);
    let written = run(config, labeled, &timestamp)?;
    print_artifacts(&written)
}

pub fn run(config: &SiftConfig, labeled: &Path, timestamp: &str) -> Result<SplitOutput> {
    let rows: Vec<Value> = read_json(labeled).with_context(|| format!("Failed to load {}", labeled.display()))?;
    let outcome = stratified_split(rows, &config.splitting).context("Failed to split labeled set")?;

    let dir = &config.paths.splits_dir;
    let output = SplitOutput {
        train: dir.join(timestamped_filename("train_set", timestamp, "json")),
        test: dir.join(timestamped_filename("test_set", timestamp, "json")),
        manifest: dir.join(timestamped_filename("split_manifest", timestamp, "json")),
    };
    write_split(&outcome, &config.splitting, labeled, &output.train, &output.test, &output.manifest)
        .context("Failed to write split")?;

    eprintln!(
        "{} {} train / {} test rows across {} classes",
        "Split".green().bold(),
        outcome.train.len(),
        outcome.test.len(),
        outcome.classes.len()
    );
    for (class, counts) in &outcome.classes {
        eprintln!("  {:<18} train {:>5}  test {:>5}", class, counts.train, counts.test);
    }

    Ok(output)
}

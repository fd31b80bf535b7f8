//! `sift label`

use super::print_artifacts;
use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use sift_core::artifacts::{LabelArtifacts, RunSummary, load_unlabeled, write_label_artifacts};
use sift_core::{RoundController, SiftConfig};
use sift_oracles::OracleFactory;
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub async fn execute(
    config: &SiftConfig,
    input: &Path,
    skip_validation: bool,
    timestamp: Option<String>,
    cancel: CancellationToken,
) -> Result<()> {
    let timestamp = timestamp.unwrap_or_else(sift_core::artifacts::timestamp);
    let written = run(config, input, skip_validation, &timestamp, cancel).await?;
    print_artifacts(&written)
}

pub async fn run(
    config: &SiftConfig,
    input: &Path,
    skip_validation: bool,
    timestamp: &str,
    cancel: CancellationToken,
) -> Result<LabelArtifacts> {
    let records = load_unlabeled(input).with_context(|| format!("Failed to load {}", input.display()))?;

    let mut annotation = config.annotation.clone();
    annotation.skip_validation |= skip_validation;

    let oracle = OracleFactory::create(&config.oracle, &annotation.vocabulary()).context("Failed to create oracle")?;
    let controller = RoundController::new(oracle, annotation)?;

    let started_at = Utc::now();
    let result = controller.run(&records, cancel).await?;
    let summary = RunSummary::new(controller.oracle_id(), started_at, &result);

    let written = write_label_artifacts(&config.paths.labeling_dir, timestamp, &records, &result, &summary)
        .context("Failed to write label artifacts")?;

    print_summary(&summary);
    Ok(written)
}

fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!("{}", format!("Label run {}", summary.run_id).bold().cyan());
    eprintln!("  {:<14} {}", "Oracle:", summary.oracle_id.dimmed());
    eprintln!("  {:<14} {}", "Records:", summary.input_records);
    eprintln!("  {:<14} {}", "Labeled:", summary.labeled.to_string().green());
    let quarantined = summary.quarantined.to_string();
    eprintln!(
        "  {:<14} {}",
        "Quarantined:",
        if summary.quarantined > 0 { quarantined.yellow() } else { quarantined.normal() }
    );
    eprintln!("  {:<14} {}", "Rounds:", summary.rounds_executed);

    for round in &summary.rounds {
        eprintln!(
            "    round {:>2}: {} submitted, {} passed, {} failed, {} faulted batches ({} ms)",
            round.round, round.submitted, round.passed, round.failed, round.faulted_batches, round.duration_ms
        );
    }

    if summary.interrupted {
        eprintln!(
            "  {} {} records left pending; rerun `sift label` on the pending file to resume",
            "Interrupted:".red().bold(),
            summary.pending
        );
    }
    eprintln!();
}

//! `sift pipeline`: merge (optional), prepare, label and split in one run.

use super::{label, merge, prepare, print_artifacts, split};
use anyhow::Result;
use serde::Serialize;
use sift_core::SiftConfig;
use sift_core::artifacts::LabelArtifacts;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Where the pipeline starts.
#[derive(Debug)]
pub enum Source {
    Merged(PathBuf),
    Exports { google_play: Option<PathBuf>, app_store: Option<PathBuf> },
}

#[derive(Debug, Serialize)]
struct PipelineOutput {
    merged_csv: PathBuf,
    unlabeled: PathBuf,
    label: LabelArtifacts,
    #[serde(skip_serializing_if = "Option::is_none")]
    split: Option<split::SplitOutput>,
}

pub async fn execute(
    config: &SiftConfig,
    source: Source,
    skip_validation: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let timestamp = sift_core::artifacts::timestamp();
    info!(timestamp = %timestamp, "Starting pipeline");

    let merged_csv = match source {
        Source::Merged(path) => path,
        Source::Exports { google_play, app_store } => {
            merge::run(config, google_play, app_store, None, &timestamp)?.merged_csv
        }
    };

    let unlabeled = prepare::run(config, &merged_csv, None, &timestamp)?.unlabeled;
    let label = label::run(config, &unlabeled, skip_validation, &timestamp, cancel.clone()).await?;

    let split = if cancel.is_cancelled() {
        warn!("Pipeline interrupted; skipping split");
        None
    } else {
        Some(split::run(config, &label.labeled, &timestamp)?)
    };

    print_artifacts(&PipelineOutput { merged_csv, unlabeled, label, split })
}

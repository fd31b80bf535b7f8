//! Reading and writing run artifacts.

use crate::assembler::RunResult;
use crate::error::{Result, SiftError};
use crate::ledger::RoundReport;
use chrono::{DateTime, Local, Utc};
use serde::{Serialize, de::DeserializeOwned};
use sift_abstraction::UnlabeledRecord;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Local timestamp used in artifact file names.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `{stem}_{timestamp}.{ext}`
pub fn timestamped_filename(stem: &str, timestamp: &str, ext: &str) -> String {
    format!("{stem}_{timestamp}.{ext}")
}

/// Reads a JSON array of records.
///
/// # Errors
/// Returns `SiftError::Input` when the file is missing or not a record array.
pub fn load_unlabeled(path: &Path) -> Result<Vec<UnlabeledRecord>> {
    read_json(path)
}

/// Reads any JSON document, mapping every failure to `SiftError::Input`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SiftError::Input(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content).map_err(|e| SiftError::Input(format!("{}: {}", path.display(), e)))
}

/// Writes pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Counts and per-round reports for one label run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub oracle_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_records: usize,
    pub labeled: usize,
    pub quarantined: usize,
    pub pending: usize,
    pub rounds_executed: u32,
    pub interrupted: bool,
    pub rounds: Vec<RoundReport>,
}

impl RunSummary {
    pub fn new(oracle_id: &str, started_at: DateTime<Utc>, result: &RunResult) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            oracle_id: oracle_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            input_records: result.total(),
            labeled: result.labeled.len(),
            quarantined: result.quarantined.len(),
            pending: result.pending.len(),
            rounds_executed: result.rounds_executed,
            interrupted: result.interrupted,
            rounds: result.rounds.clone(),
        }
    }
}

/// Paths written by [`write_label_artifacts`].
#[derive(Debug, Clone, Serialize)]
pub struct LabelArtifacts {
    pub labeled: PathBuf,
    pub quarantined: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PathBuf>,
    pub summary: PathBuf,
}

/// Writes labeled, quarantined, pending (interrupted runs only) and summary files.
pub fn write_label_artifacts(
    dir: &Path,
    timestamp: &str,
    original: &[UnlabeledRecord],
    result: &RunResult,
    summary: &RunSummary,
) -> Result<LabelArtifacts> {
    let labeled = dir.join(timestamped_filename("labeled_reviews", timestamp, "json"));
    write_json(&labeled, &result.labeled_rows(original))?;

    let quarantined = dir.join(timestamped_filename("quarantined_reviews", timestamp, "json"));
    write_json(&quarantined, &result.quarantined_rows(original))?;

    let pending = if result.interrupted {
        let path = dir.join(timestamped_filename("pending_reviews", timestamp, "json"));
        write_json(&path, &result.pending)?;
        Some(path)
    } else {
        None
    };

    let summary_path = dir.join(timestamped_filename("label_run", timestamp, "json"));
    write_json(&summary_path, summary)?;

    info!(
        labeled = %labeled.display(),
        quarantined = %quarantined.display(),
        summary = %summary_path.display(),
        "Label artifacts written"
    );

    Ok(LabelArtifacts { labeled, quarantined, pending, summary: summary_path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::ledger::{RecordLedger, RoundHistory};
    use sift_abstraction::{LabelCandidate, RecordId, SourcePlatform};
    use tempfile::TempDir;

    fn record(id: &str) -> UnlabeledRecord {
        UnlabeledRecord {
            id: RecordId::from(id),
            source_platform: SourcePlatform::AppStore,
            text: "介面很好用".to_string(),
            rating: 5,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_timestamped_filename() {
        assert_eq!(
            timestamped_filename("labeled_reviews", "20250101_120000", "json"),
            "labeled_reviews_20250101_120000.json"
        );
        assert_eq!(timestamp().len(), "20250101_120000".len());
    }

    #[test]
    fn test_load_unlabeled_errors_are_input_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_unlabeled(&missing), Err(SiftError::Input(_))));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"not": "an array"}"#).unwrap();
        assert!(matches!(load_unlabeled(&bad), Err(SiftError::Input(_))));
    }

    #[test]
    fn test_write_label_artifacts() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("labeling");
        let records = vec![record("a"), record("b")];

        let mut ledger = RecordLedger::new(&records).unwrap();
        ledger.pass(&RecordId::from("a"), LabelCandidate::new("a", "POSITIVE"), 1);
        let history = RoundHistory { ledger, rounds: Vec::new(), rounds_executed: 1, interrupted: true };
        let result = assemble(&records, history);
        let summary = RunSummary::new("mock:test", Utc::now(), &result);

        let written = write_label_artifacts(&out, "20250101_120000", &records, &result, &summary).unwrap();

        let labeled: Vec<serde_json::Value> = read_json(&written.labeled).unwrap();
        assert_eq!(labeled.len(), 1);
        assert_eq!(labeled[0]["primary_category"], "POSITIVE");

        let pending = load_unlabeled(written.pending.as_ref().unwrap()).unwrap();
        assert_eq!(pending, vec![records[1].clone()]);

        let summary: serde_json::Value = read_json(&written.summary).unwrap();
        assert_eq!(summary["labeled"], 1);
        assert_eq!(summary["pending"], 1);
        assert_eq!(summary["interrupted"], true);
    }
}

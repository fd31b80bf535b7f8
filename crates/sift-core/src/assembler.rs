//! Partitions a finished run into labeled, quarantined and pending records.

use crate::ledger::{RecordState, RoundHistory, RoundReport};
use crate::validator::FailureReason;
use serde::{Deserialize, Serialize};
use sift_abstraction::{LabelCandidate, RecordId, UnlabeledRecord};
use std::collections::BTreeMap;

/// A record that never passed, with the reasons from its last round.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarantinedRecord {
    pub record: UnlabeledRecord,
    pub failure_reasons: Vec<FailureReason>,
}

/// Outcome of a label run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub labeled: BTreeMap<RecordId, LabelCandidate>,
    pub quarantined: BTreeMap<RecordId, QuarantinedRecord>,
    /// Records left open by cancellation, in input order.
    pub pending: Vec<UnlabeledRecord>,
    pub rounds_executed: u32,
    pub interrupted: bool,
    pub rounds: Vec<RoundReport>,
}

/// A labeled output row: the record plus its validated label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRow {
    #[serde(flatten)]
    pub record: UnlabeledRecord,
    pub primary_category: String,
    pub secondary_categories: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub rationale: Option<String>,
}

/// A quarantined output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedRow {
    #[serde(flatten)]
    pub record: UnlabeledRecord,
    pub failure_reasons: Vec<String>,
}

/// Pending rows keep the input shape so they can be fed back to `label`.
pub type PendingRow = UnlabeledRecord;

/// Builds the run result from the final ledger states.
///
/// Every record of `original` lands in exactly one partition.
pub fn assemble(original: &[UnlabeledRecord], history: RoundHistory) -> RunResult {
    let RoundHistory { ledger, rounds, rounds_executed, interrupted } = history;

    let mut labeled = BTreeMap::new();
    let mut quarantined = BTreeMap::new();
    let mut pending = Vec::new();

    for record in original {
        match ledger.state(&record.id) {
            Some(RecordState::Passed { candidate, .. }) => {
                labeled.insert(record.id.clone(), candidate.clone());
            }
            Some(RecordState::Quarantined { reasons }) => {
                quarantined.insert(
                    record.id.clone(),
                    QuarantinedRecord { record: record.clone(), failure_reasons: reasons.clone() },
                );
            }
            Some(_) | None => pending.push(record.clone()),
        }
    }

    RunResult { labeled, quarantined, pending, rounds_executed, interrupted, rounds }
}

impl RunResult {
    pub fn total(&self) -> usize {
        self.labeled.len() + self.quarantined.len() + self.pending.len()
    }

    /// Labeled rows in input order.
    pub fn labeled_rows(&self, original: &[UnlabeledRecord]) -> Vec<LabeledRow> {
        original
            .iter()
            .filter_map(|record| {
                self.labeled.get(&record.id).map(|candidate| LabeledRow {
                    record: record.clone(),
                    primary_category: candidate.primary_category.clone(),
                    secondary_categories: candidate.secondary_categories.clone(),
                    confidence: candidate.confidence,
                    rationale: candidate.rationale.clone(),
                })
            })
            .collect()
    }

    /// Quarantined rows in input order.
    pub fn quarantined_rows(&self, original: &[UnlabeledRecord]) -> Vec<QuarantinedRow> {
        original
            .iter()
            .filter_map(|record| {
                self.quarantined.get(&record.id).map(|q| QuarantinedRow {
                    record: q.record.clone(),
                    failure_reasons: q.failure_reasons.iter().map(ToString::to_string).collect(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::RecordLedger;
    use chrono::{TimeZone, Utc};
    use sift_abstraction::SourcePlatform;

    fn record(id: &str) -> UnlabeledRecord {
        UnlabeledRecord {
            id: RecordId::from(id),
            source_platform: SourcePlatform::GooglePlay,
            text: "信用卡綁定一直失敗".to_string(),
            rating: 1,
            submitted_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
        }
    }

    fn history() -> (Vec<UnlabeledRecord>, RoundHistory) {
        let records = vec![record("a"), record("b"), record("c")];
        let mut ledger = RecordLedger::new(&records).unwrap();
        ledger.pass(
            &RecordId::from("b"),
            LabelCandidate::new("b", "BUG").with_secondary("CREDIT_CARD").with_confidence(0.9),
            1,
        );
        ledger.fail(&RecordId::from("c"), 1, vec![FailureReason::Cancelled]);
        ledger.fail(&RecordId::from("a"), 1, vec![FailureReason::NoResponse]);
        (records, RoundHistory { ledger, rounds: Vec::new(), rounds_executed: 1, interrupted: true })
    }

    #[test]
    fn test_assemble_partitions_every_record() {
        let (records, history) = history();
        let result = assemble(&records, history);

        assert_eq!(result.total(), records.len());
        assert!(result.labeled.contains_key(&RecordId::from("b")));
        assert_eq!(result.pending.len(), 2);
        assert!(result.quarantined.is_empty());
        assert!(result.interrupted);
    }

    #[test]
    fn test_quarantined_rows_carry_reason_text() {
        let records = vec![record("a"), record("b")];
        let mut ledger = RecordLedger::new(&records).unwrap();
        ledger.fail(&RecordId::from("a"), 2, vec![FailureReason::UnknownPrimary("SPAM".to_string())]);
        ledger.pass(&RecordId::from("b"), LabelCandidate::new("b", "POSITIVE"), 2);
        ledger.quarantine_open();

        let history = RoundHistory { ledger, rounds: Vec::new(), rounds_executed: 2, interrupted: false };
        let result = assemble(&records, history);
        let rows = result.quarantined_rows(&records);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.id, RecordId::from("a"));
        assert_eq!(rows[0].failure_reasons, vec![r#"primary_category "SPAM" is not in the closed label set"#]);
    }

    #[test]
    fn test_labeled_row_flattens_record_fields() {
        let (records, history) = history();
        let result = assemble(&records, history);
        let rows = result.labeled_rows(&records);

        let value = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(value["id"], "b");
        assert_eq!(value["source_platform"], "google_play");
        assert_eq!(value["primary_category"], "BUG");
        assert_eq!(value["secondary_categories"][0], "CREDIT_CARD");
        assert_eq!(value["confidence"], 0.9);

        let back: LabeledRow = serde_json::from_value(value).unwrap();
        assert_eq!(back, rows[0]);
    }
}

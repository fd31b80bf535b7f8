//! Schema validation of label candidates.
//!
//! Checks run in four categories: structural, domain, consistency and
//! record linkage. Evaluation stops at the first category that reports a
//! violation, but every violation inside that category is reported. The
//! validator never corrects a value.

use sift_abstraction::{LabelCandidate, LabelVocabulary, RecordId, UnlabeledRecord};
use std::collections::BTreeSet;
use thiserror::Error;

/// Why a record did not pass in a round.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error("record_id is empty")]
    MissingRecordId,

    #[error("primary_category is empty")]
    EmptyPrimary,

    #[error("secondary_categories[{index}] is empty")]
    EmptySecondary { index: usize },

    #[error("confidence {value} is outside [0, 1]")]
    InvalidConfidence { value: String },

    #[error("primary_category {0:?} is not in the closed label set")]
    UnknownPrimary(String),

    #[error("secondary category {0:?} is not in the label set")]
    UnknownSecondary(String),

    #[error("primary_category {0:?} is repeated in secondary_categories")]
    PrimaryRepeatedAsSecondary(String),

    #[error("secondary category {0:?} is listed more than once")]
    DuplicateSecondary(String),

    #[error("candidate id {candidate} does not match any record of the batch")]
    UnknownRecord { candidate: RecordId },

    #[error("oracle returned more than one candidate for this record")]
    DuplicateCandidate,

    #[error("no response from oracle for this record")]
    NoResponse,

    #[error("oracle fault: {0}")]
    OracleFault(String),

    #[error("run cancelled before this record was labeled")]
    Cancelled,
}

/// PASS or FAIL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

/// Result of validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub record_id: RecordId,
    pub verdict: Verdict,
    /// Empty iff the verdict is `Pass`.
    pub failure_reasons: Vec<FailureReason>,
}

impl ValidationOutcome {
    fn from_reasons(record_id: RecordId, failure_reasons: Vec<FailureReason>) -> Self {
        let verdict = if failure_reasons.is_empty() { Verdict::Pass } else { Verdict::Fail };
        Self { record_id, verdict, failure_reasons }
    }

    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Validates candidates against a fixed vocabulary.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    vocabulary: LabelVocabulary,
}

impl SchemaValidator {
    pub fn new(vocabulary: LabelVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    /// Validates `candidate` against the record its id resolved to.
    ///
    /// `record` is `None` when the id matched no record of the batch.
    pub fn validate(&self, candidate: &LabelCandidate, record: Option<&UnlabeledRecord>) -> ValidationOutcome {
        let mut reasons = Self::structural(candidate);
        if reasons.is_empty() {
            reasons = self.domain(candidate);
        }
        if reasons.is_empty() {
            reasons = Self::consistency(candidate);
        }
        if reasons.is_empty() {
            reasons = Self::linkage(candidate, record);
        }

        ValidationOutcome::from_reasons(candidate.record_id.clone(), reasons)
    }

    fn structural(candidate: &LabelCandidate) -> Vec<FailureReason> {
        let mut reasons = Vec::new();

        if candidate.record_id.as_str().trim().is_empty() {
            reasons.push(FailureReason::MissingRecordId);
        }
        if candidate.primary_category.trim().is_empty() {
            reasons.push(FailureReason::EmptyPrimary);
        }
        for (index, secondary) in candidate.secondary_categories.iter().enumerate() {
            if secondary.trim().is_empty() {
                reasons.push(FailureReason::EmptySecondary { index });
            }
        }
        if let Some(value) = candidate.confidence {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                reasons.push(FailureReason::InvalidConfidence { value: value.to_string() });
            }
        }

        reasons
    }

    fn domain(&self, candidate: &LabelCandidate) -> Vec<FailureReason> {
        let mut reasons = Vec::new();

        if !self.vocabulary.primary.contains(&candidate.primary_category) {
            reasons.push(FailureReason::UnknownPrimary(candidate.primary_category.clone()));
        }
        for secondary in &candidate.secondary_categories {
            if !self.vocabulary.secondary.contains(secondary) {
                reasons.push(FailureReason::UnknownSecondary(secondary.clone()));
            }
        }

        reasons
    }

    fn consistency(candidate: &LabelCandidate) -> Vec<FailureReason> {
        let mut reasons = Vec::new();
        let mut seen = BTreeSet::new();

        for secondary in &candidate.secondary_categories {
            if secondary == &candidate.primary_category {
                if !reasons.contains(&FailureReason::PrimaryRepeatedAsSecondary(secondary.clone())) {
                    reasons.push(FailureReason::PrimaryRepeatedAsSecondary(secondary.clone()));
                }
            } else if !seen.insert(secondary.as_str()) {
                reasons.push(FailureReason::DuplicateSecondary(secondary.clone()));
            }
        }

        reasons
    }

    fn linkage(candidate: &LabelCandidate, record: Option<&UnlabeledRecord>) -> Vec<FailureReason> {
        match record {
            Some(record) if record.id == candidate.record_id => Vec::new(),
            _ => vec![FailureReason::UnknownRecord { candidate: candidate.record_id.clone() }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use sift_abstraction::SourcePlatform;

    fn validator() -> SchemaValidator {
        SchemaValidator::new(LabelVocabulary::split(
            ["BUG", "UI/UX", "POSITIVE"],
            ["ACCOUNT", "GENERAL", "BUG"],
        ))
    }

    fn record(id: &str) -> UnlabeledRecord {
        UnlabeledRecord {
            id: RecordId::from(id),
            source_platform: SourcePlatform::GooglePlay,
            text: "登入後畫面空白".to_string(),
            rating: 1,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_candidate_passes() {
        let candidate = LabelCandidate::new("a", "BUG").with_secondary("ACCOUNT").with_confidence(0.8);
        let outcome = validator().validate(&candidate, Some(&record("a")));
        assert!(outcome.is_pass());
        assert!(outcome.failure_reasons.is_empty());
    }

    #[test]
    fn test_structural_accumulates_and_short_circuits() {
        let mut candidate = LabelCandidate::new("", "").with_secondary("").with_confidence(1.5);
        candidate.secondary_categories.push("NOT_A_LABEL".to_string());

        let outcome = validator().validate(&candidate, None);
        assert_eq!(outcome.verdict, Verdict::Fail);
        assert_eq!(
            outcome.failure_reasons,
            vec![
                FailureReason::MissingRecordId,
                FailureReason::EmptyPrimary,
                FailureReason::EmptySecondary { index: 0 },
                FailureReason::InvalidConfidence { value: "1.5".to_string() },
            ]
        );
    }

    #[test]
    fn test_nan_confidence_fails() {
        let candidate = LabelCandidate::new("a", "BUG").with_confidence(f64::NAN);
        let outcome = validator().validate(&candidate, Some(&record("a")));
        assert!(matches!(outcome.failure_reasons[0], FailureReason::InvalidConfidence { .. }));
    }

    #[test]
    fn test_domain_is_exact_and_case_sensitive() {
        let candidate = LabelCandidate::new("a", "bug").with_secondary("Account");
        let outcome = validator().validate(&candidate, Some(&record("a")));
        assert_eq!(
            outcome.failure_reasons,
            vec![
                FailureReason::UnknownPrimary("bug".to_string()),
                FailureReason::UnknownSecondary("Account".to_string()),
            ]
        );
    }

    #[test]
    fn test_consistency_checks() {
        let candidate = LabelCandidate::new("a", "BUG")
            .with_secondary("BUG")
            .with_secondary("GENERAL")
            .with_secondary("GENERAL");
        let outcome = validator().validate(&candidate, Some(&record("a")));
        assert_eq!(
            outcome.failure_reasons,
            vec![
                FailureReason::PrimaryRepeatedAsSecondary("BUG".to_string()),
                FailureReason::DuplicateSecondary("GENERAL".to_string()),
            ]
        );
    }

    #[test]
    fn test_linkage_failure() {
        let candidate = LabelCandidate::new("ghost", "BUG");
        let outcome = validator().validate(&candidate, None);
        assert_eq!(
            outcome.failure_reasons,
            vec![FailureReason::UnknownRecord { candidate: RecordId::from("ghost") }]
        );

        let outcome = validator().validate(&candidate, Some(&record("other")));
        assert!(!outcome.is_pass());
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(
            FailureReason::UnknownPrimary("SPAM".to_string()).to_string(),
            r#"primary_category "SPAM" is not in the closed label set"#
        );
        assert_eq!(FailureReason::NoResponse.to_string(), "no response from oracle for this record");
    }

    proptest! {
        #[test]
        fn prop_validator_is_deterministic_and_consistent(
            primary in "[A-Z_/]{0,8}",
            secondary in proptest::collection::vec("[A-Z]{0,6}", 0..4),
            confidence in proptest::option::of(-1.0f64..2.0),
        ) {
            let candidate = LabelCandidate {
                record_id: RecordId::from("a"),
                primary_category: primary,
                secondary_categories: secondary,
                confidence,
                rationale: None,
            };
            let rec = record("a");
            let first = validator().validate(&candidate, Some(&rec));
            let second = validator().validate(&candidate, Some(&rec));

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.is_pass(), first.failure_reasons.is_empty());
        }
    }
}

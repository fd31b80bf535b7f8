//! Label oracle abstraction layer for Sift.
//!
//! This crate defines the record and label types that flow through the
//! annotation workflow, and the capability trait every labeling oracle
//! implements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Represents a wholesale failure of a single oracle call.
///
/// Faults are always batch-scoped: a fault means the oracle produced no
/// usable response for any record in the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleFault {
    /// The request could not be delivered (DNS, connection reset, TLS, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// The call did not complete within the configured per-call timeout.
    #[error("Oracle call timed out after {after_ms}ms")]
    Timeout {
        /// Elapsed budget in milliseconds.
        after_ms: u64,
    },

    /// Provider quota exceeded or rate limit hit.
    #[error("Provider '{provider}' quota exceeded{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    QuotaExceeded {
        /// The provider name (e.g., "gemini", "openai-compatible").
        provider: String,
        /// Optional error message from the provider.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// The provider answered, but the transport payload could not be understood.
    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    /// The provider rejected the request (authentication, 4xx, 5xx).
    #[error("Oracle rejected request: {0}")]
    Rejected(String),

    /// The oracle is not configured correctly (missing key, unknown provider).
    #[error("Oracle configuration error: {0}")]
    Configuration(String),
}

impl OracleFault {
    /// Builds a timeout fault from the elapsed budget.
    #[must_use]
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout { after_ms: after.as_millis() as u64 }
    }

    /// Returns true if this fault was caused by the per-call timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Stable identifier of a review record, unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The store a review was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePlatform {
    /// Google Play store.
    GooglePlay,
    /// Apple App Store.
    AppStore,
}

impl SourcePlatform {
    /// Canonical snake_case name, as used in artifacts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GooglePlay => "google_play",
            Self::AppStore => "app_store",
        }
    }
}

impl fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourcePlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "google_play" | "googleplay" | "play" => Ok(Self::GooglePlay),
            "app_store" | "appstore" | "ios" => Ok(Self::AppStore),
            other => Err(format!("unknown source platform: {other}")),
        }
    }
}

/// A cleaned review waiting for a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlabeledRecord {
    /// Stable identifier.
    pub id: RecordId,
    /// Store the review was collected from.
    pub source_platform: SourcePlatform,
    /// Normalized review text.
    pub text: String,
    /// Star rating, 1 to 5.
    pub rating: u8,
    /// When the review was posted.
    pub submitted_at: DateTime<Utc>,
}

/// A label proposed by an oracle for one record.
///
/// Candidates are untrusted until the schema validator has passed them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCandidate {
    /// The record this label claims to describe.
    pub record_id: RecordId,
    /// Main category; must belong to the closed label set.
    #[serde(default)]
    pub primary_category: String,
    /// Additional categories, possibly empty.
    #[serde(default)]
    pub secondary_categories: Vec<String>,
    /// Oracle confidence in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Free-text justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl LabelCandidate {
    /// Creates a candidate with only a primary category.
    pub fn new(record_id: impl Into<RecordId>, primary_category: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            primary_category: primary_category.into(),
            secondary_categories: Vec::new(),
            confidence: None,
            rationale: None,
        }
    }

    /// Adds a secondary category.
    #[must_use]
    pub fn with_secondary(mut self, category: impl Into<String>) -> Self {
        self.secondary_categories.push(category.into());
        self
    }

    /// Sets the confidence score.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Sets the rationale.
    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// The closed vocabularies labels are checked against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelVocabulary {
    /// Values allowed for `primary_category`.
    pub primary: BTreeSet<String>,
    /// Values allowed in `secondary_categories`.
    pub secondary: BTreeSet<String>,
}

impl LabelVocabulary {
    /// A vocabulary where primary and secondary share one closed set.
    pub fn shared<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let primary: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self { secondary: primary.clone(), primary }
    }

    /// A vocabulary with a distinct secondary set.
    pub fn split<P, S, A, B>(primary: P, secondary: S) -> Self
    where
        P: IntoIterator<Item = A>,
        S: IntoIterator<Item = B>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            primary: primary.into_iter().map(Into::into).collect(),
            secondary: secondary.into_iter().map(Into::into).collect(),
        }
    }
}

/// An ordered group of records submitted to the oracle in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationBatch {
    /// Identifier unique within a run, e.g. `r2-b0`.
    pub batch_id: String,
    /// Round this batch belongs to (1-based).
    pub round: u32,
    /// Records in submission order.
    pub records: Vec<UnlabeledRecord>,
}

impl AnnotationBatch {
    /// Number of records in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record of this batch by id.
    #[must_use]
    pub fn record(&self, id: &RecordId) -> Option<&UnlabeledRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Ids in submission order.
    pub fn record_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.records.iter().map(|r| &r.id)
    }
}

/// A capability for labeling review batches.
///
/// Oracles must be `Send + Sync` so that batches of one round can be
/// dispatched concurrently.
#[async_trait]
pub trait LabelOracle: Send + Sync {
    /// Labels every record in `batch`.
    ///
    /// Returning fewer candidates than records, or candidates in a different
    /// order, is allowed; callers correlate by `record_id`.
    ///
    /// # Errors
    /// Returns an `OracleFault` when the whole call failed.
    async fn annotate(&self, batch: &AnnotationBatch) -> Result<Vec<LabelCandidate>, OracleFault>;

    /// Returns an identifier for logs (provider and model).
    fn oracle_id(&self) -> &str;
}

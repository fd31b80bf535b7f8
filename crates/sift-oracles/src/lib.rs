//! Label oracle implementations for Sift.
//!
//! This crate provides concrete implementations of the `LabelOracle` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Deterministic offline labels for testing and dry runs
//! - **Gemini**: Google's Gemini models with a JSON response schema (API key required)
//! - **OpenAI-compatible**: Any server implementing the Chat Completions API

pub mod coerce;
pub mod factory;
pub mod gemini;
pub mod prompt;
pub mod universal;

use async_trait::async_trait;
use sift_abstraction::{AnnotationBatch, LabelCandidate, LabelOracle, OracleFault};
use tracing::debug;

pub use factory::{OracleConfig, OracleFactory, OracleProvider};
pub use gemini::GeminiOracle;
pub use universal::UniversalOracle;

/// A deterministic offline implementation of the `LabelOracle` trait.
///
/// By default the label is derived from the star rating, which gives a
/// multi-class output suitable for exercising the full pipeline without
/// network access.
#[derive(Debug, Clone)]
pub struct MockOracle {
    id: String,
    fixed: Option<(String, Vec<String>)>,
}

impl MockOracle {
    /// Creates a rating-driven mock oracle.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: format!("mock:{}", id.into()), fixed: None }
    }

    /// Creates a mock oracle that answers every record with the same labels.
    #[must_use]
    pub fn fixed(id: impl Into<String>, primary: &str, secondary: &[&str]) -> Self {
        Self {
            id: format!("mock:{}", id.into()),
            fixed: Some((
                primary.to_string(),
                secondary.iter().map(ToString::to_string).collect(),
            )),
        }
    }

    fn rating_label(rating: u8) -> &'static str {
        match rating {
            0..=2 => "BUG",
            3 => "FEATURE_REQUEST",
            _ => "POSITIVE",
        }
    }
}

#[async_trait]
impl LabelOracle for MockOracle {
    async fn annotate(&self, batch: &AnnotationBatch) -> Result<Vec<LabelCandidate>, OracleFault> {
        debug!(
            oracle = %self.id,
            batch_id = %batch.batch_id,
            records = batch.len(),
            "MockOracle labeling batch"
        );

        let candidates = batch
            .records
            .iter()
            .map(|record| {
                let (primary, secondary) = match &self.fixed {
                    Some((primary, secondary)) => (primary.clone(), secondary.clone()),
                    None => (
                        Self::rating_label(record.rating).to_string(),
                        vec!["GENERAL".to_string()],
                    ),
                };
                LabelCandidate {
                    record_id: record.id.clone(),
                    primary_category: primary,
                    secondary_categories: secondary,
                    confidence: Some(1.0),
                    rationale: Some("mock label".to_string()),
                }
            })
            .collect();

        Ok(candidates)
    }

    fn oracle_id(&self) -> &str {
        &self.id
    }
}

/// Maps a non-success HTTP status to an oracle fault.
///
/// 402/429 become `QuotaExceeded`, everything else is a rejection with the
/// status and body preserved for the logs.
pub(crate) fn fault_from_status(provider: &str, status: reqwest::StatusCode, body: String) -> OracleFault {
    if status == reqwest::StatusCode::PAYMENT_REQUIRED
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
    {
        return OracleFault::QuotaExceeded { provider: provider.to_string(), message: Some(body) };
    }

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return OracleFault::Rejected(format!("Authentication failed ({}): {}", status, body));
    }

    if status.is_server_error() {
        return OracleFault::Rejected(format!("Server error ({}): {}", status, body));
    }

    OracleFault::Rejected(format!("API error ({}): {}", status, body))
}

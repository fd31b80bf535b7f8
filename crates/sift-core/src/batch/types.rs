//! Data types for batch dispatch.

use sift_abstraction::{AnnotationBatch, LabelCandidate, OracleFault};
use std::time::Duration;

/// Retry policy for wholesale oracle faults.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier (e.g., 2.0 for exponential backoff).
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self { max_retries, initial_delay, max_delay, multiplier }
    }

    /// Calculate the delay for a given retry attempt.
    ///
    /// Uses exponential backoff: initial_delay * multiplier^retry_count, capped at max_delay.
    pub fn calculate_delay(&self, retry_count: u32) -> Duration {
        let delay_ms = (self.initial_delay.as_millis() as f64
            * self.multiplier.powi(i32::try_from(retry_count).unwrap_or(i32::MAX)))
        .min(self.max_delay.as_millis() as f64) as u64;
        Duration::from_millis(delay_ms)
    }

    /// Total attempts allowed, including the first one.
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// How a single batch submission ended.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    /// The oracle answered; candidates are still unvalidated.
    Delivered(Vec<LabelCandidate>),
    /// Every attempt failed; carries the last fault.
    Exhausted(OracleFault),
    /// The run was cancelled before the batch got an answer.
    Cancelled,
}

/// A batch together with its outcome.
#[derive(Debug, Clone)]
pub struct BatchDelivery {
    pub batch: AnnotationBatch,
    pub outcome: DeliveryOutcome,
    /// Oracle calls made, including the successful one.
    pub attempts: u32,
    pub elapsed: Duration,
}

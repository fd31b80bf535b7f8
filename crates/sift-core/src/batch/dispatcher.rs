//! Concurrent batch submission with timeout, retry and cancellation.

use crate::batch::types::{BatchDelivery, DeliveryOutcome, RetryPolicy};
use sift_abstraction::{AnnotationBatch, LabelOracle, OracleFault};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Submits batches to an oracle with bounded concurrency.
///
/// Each call is wrapped in a timeout; a timeout counts as a fault and is
/// retried like any other wholesale failure.
pub struct BatchDispatcher {
    oracle: Arc<dyn LabelOracle>,
    /// Maximum number of concurrent oracle calls.
    concurrency: usize,
    /// Timeout per oracle call.
    timeout: Duration,
    retry_policy: RetryPolicy,
    semaphore: Arc<Semaphore>,
}

impl BatchDispatcher {
    pub fn new(
        oracle: Arc<dyn LabelOracle>,
        concurrency: usize,
        timeout: Duration,
        retry_policy: RetryPolicy,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            oracle,
            concurrency,
            timeout,
            retry_policy,
            semaphore: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// Dispatches every batch and returns the deliveries in input order.
    ///
    /// Completion order does not affect the returned order.
    pub async fn dispatch(
        &self,
        batches: Vec<AnnotationBatch>,
        cancel: &CancellationToken,
    ) -> Vec<BatchDelivery> {
        if batches.is_empty() {
            return Vec::new();
        }

        debug!(
            batches = batches.len(),
            concurrency = self.concurrency,
            timeout_secs = self.timeout.as_secs(),
            "Dispatching batches"
        );

        let mut handles = Vec::with_capacity(batches.len());
        for batch in batches {
            let oracle = Arc::clone(&self.oracle);
            let semaphore = Arc::clone(&self.semaphore);
            let retry_policy = self.retry_policy.clone();
            let timeout_duration = self.timeout;
            let cancel = cancel.clone();
            let fallback = batch.clone();

            let handle = tokio::spawn(async move {
                let start = Instant::now();

                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let Some(permit) = permit else {
                    return BatchDelivery {
                        batch,
                        outcome: DeliveryOutcome::Cancelled,
                        attempts: 0,
                        elapsed: start.elapsed(),
                    };
                };

                let (outcome, attempts) =
                    submit_with_retry(oracle.as_ref(), &batch, timeout_duration, &retry_policy, &cancel).await;
                drop(permit);

                BatchDelivery { batch, outcome, attempts, elapsed: start.elapsed() }
            });

            handles.push((fallback, handle));
        }

        let mut deliveries = Vec::with_capacity(handles.len());
        for (fallback, handle) in handles {
            match handle.await {
                Ok(delivery) => deliveries.push(delivery),
                Err(e) => {
                    error!(batch_id = %fallback.batch_id, "Batch task join error: {}", e);
                    deliveries.push(BatchDelivery {
                        batch: fallback,
                        outcome: DeliveryOutcome::Exhausted(OracleFault::Rejected(format!(
                            "oracle task failed: {}",
                            e
                        ))),
                        attempts: 0,
                        elapsed: Duration::ZERO,
                    });
                }
            }
        }

        deliveries
    }
}

async fn submit_with_retry(
    oracle: &dyn LabelOracle,
    batch: &AnnotationBatch,
    timeout_duration: Duration,
    retry_policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> (DeliveryOutcome, u32) {
    let mut attempts = 0;

    loop {
        if cancel.is_cancelled() {
            return (DeliveryOutcome::Cancelled, attempts);
        }
        attempts += 1;

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return (DeliveryOutcome::Cancelled, attempts),
            result = timeout(timeout_duration, oracle.annotate(batch)) => result,
        };

        let fault = match result {
            Ok(Ok(candidates)) => {
                debug!(
                    batch_id = %batch.batch_id,
                    attempt = attempts,
                    candidates = candidates.len(),
                    "Oracle answered batch"
                );
                return (DeliveryOutcome::Delivered(candidates), attempts);
            }
            Ok(Err(fault)) => fault,
            Err(_) => OracleFault::timeout(timeout_duration),
        };

        let retry_count = attempts - 1;
        if retry_count >= retry_policy.max_retries {
            error!(
                batch_id = %batch.batch_id,
                oracle = %oracle.oracle_id(),
                attempts,
                fault = %fault,
                "Oracle retries exhausted"
            );
            return (DeliveryOutcome::Exhausted(fault), attempts);
        }

        let delay = retry_policy.calculate_delay(retry_count);
        warn!(
            batch_id = %batch.batch_id,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            fault = %fault,
            "Oracle call failed; retrying after backoff"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => return (DeliveryOutcome::Cancelled, attempts),
            () = tokio::time::sleep(delay) => {}
        }
    }
}

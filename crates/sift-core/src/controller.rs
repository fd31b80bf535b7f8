//! Annotation round controller.
//!
//! Drives plan, dispatch and validation for up to `max_rounds` rounds. Each
//! round works on the records that have not passed yet; a passed record is
//! never resubmitted. Records still open after the last round are
//! quarantined with their last failure reasons. A cancelled run leaves open
//! records unquarantined so they can be resumed.

use crate::assembler::{RunResult, assemble};
use crate::batch::{BatchDelivery, BatchDispatcher, DeliveryOutcome, plan};
use crate::config::AnnotationConfig;
use crate::error::Result;
use crate::ledger::{RecordLedger, RoundHistory, RoundReport};
use crate::validator::{FailureReason, SchemaValidator};
use sift_abstraction::{LabelCandidate, LabelOracle, RecordId, UnlabeledRecord};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs the annotation workflow against one oracle.
pub struct RoundController {
    oracle: Arc<dyn LabelOracle>,
    config: AnnotationConfig,
    validator: SchemaValidator,
    dispatcher: BatchDispatcher,
}

impl RoundController {
    /// Creates a controller.
    ///
    /// # Errors
    /// Returns `SiftError::Config` when the annotation config is invalid.
    pub fn new(oracle: Arc<dyn LabelOracle>, config: AnnotationConfig) -> Result<Self> {
        config.validate()?;

        let validator = SchemaValidator::new(config.vocabulary());
        let dispatcher = BatchDispatcher::new(
            Arc::clone(&oracle),
            config.concurrency,
            config.oracle_timeout(),
            config.retry_policy(),
        );

        Ok(Self { oracle, config, validator, dispatcher })
    }

    pub fn oracle_id(&self) -> &str {
        self.oracle.oracle_id()
    }

    /// Labels `records` and assembles the result.
    pub async fn run(&self, records: &[UnlabeledRecord], cancel: CancellationToken) -> Result<RunResult> {
        let history = self.execute(records, cancel).await?;
        Ok(assemble(records, history))
    }

    /// Runs the rounds and returns the final ledger.
    ///
    /// # Errors
    /// Returns `SiftError::Input` on duplicate record ids, before any oracle call.
    pub async fn execute(&self, records: &[UnlabeledRecord], cancel: CancellationToken) -> Result<RoundHistory> {
        let mut ledger = RecordLedger::new(records)?;
        let mut rounds = Vec::new();
        let mut rounds_executed = 0;
        let mut interrupted = false;

        info!(
            oracle = %self.oracle.oracle_id(),
            records = records.len(),
            batch_size = self.config.batch_size,
            max_rounds = self.config.max_rounds,
            skip_validation = self.config.skip_validation,
            "Starting annotation run"
        );

        for round in 1..=self.config.max_rounds {
            if cancel.is_cancelled() {
                warn!(round, "Run cancelled before round start");
                interrupted = true;
                break;
            }

            let working: Vec<UnlabeledRecord> =
                records.iter().filter(|r| ledger.is_open(&r.id)).cloned().collect();
            if working.is_empty() {
                debug!(round, "Working set empty; stopping");
                break;
            }

            rounds_executed = round;
            let started = Instant::now();
            let batches = plan(&working, self.config.batch_size, round)?;
            for record in &working {
                ledger.mark_in_flight(&record.id, round);
            }

            info!(round, records = working.len(), batches = batches.len(), "Round started");

            let mut report = RoundReport {
                round,
                batches: batches.len(),
                submitted: working.len(),
                ..RoundReport::default()
            };

            let deliveries = self.dispatcher.dispatch(batches, &cancel).await;
            for delivery in deliveries {
                self.fold_delivery(&mut ledger, delivery, &mut report);
            }
            report.duration_ms = started.elapsed().as_millis() as u64;

            info!(
                round,
                passed = report.passed,
                failed = report.failed,
                faulted_batches = report.faulted_batches,
                duration_ms = report.duration_ms,
                "Round finished"
            );

            let cancelled = report.cancelled_batches > 0;
            rounds.push(report);
            if cancelled {
                warn!(round, "Run cancelled during round");
                interrupted = true;
                break;
            }
        }

        if !interrupted {
            let quarantined = ledger.quarantine_open();
            if quarantined > 0 {
                warn!(quarantined, rounds_executed, "Records quarantined after final round");
            }
        }

        info!(
            rounds_executed,
            passed = ledger.passed_count(),
            open = ledger.open_count(),
            interrupted,
            "Annotation run finished"
        );

        Ok(RoundHistory { ledger, rounds, rounds_executed, interrupted })
    }

    fn fold_delivery(&self, ledger: &mut RecordLedger, delivery: BatchDelivery, report: &mut RoundReport) {
        let BatchDelivery { batch, outcome, attempts, .. } = delivery;
        let round = batch.round;

        let candidates = match outcome {
            DeliveryOutcome::Cancelled => {
                report.cancelled_batches += 1;
                for id in batch.record_ids() {
                    ledger.fail(id, round, vec![FailureReason::Cancelled]);
                }
                report.failed += batch.len();
                return;
            }
            DeliveryOutcome::Exhausted(fault) => {
                warn!(
                    batch_id = %batch.batch_id,
                    round,
                    attempts,
                    fault = %fault,
                    "Batch failed; records carried to next round"
                );
                report.faulted_batches += 1;
                for id in batch.record_ids() {
                    ledger.fail(id, round, vec![FailureReason::OracleFault(fault.to_string())]);
                }
                report.failed += batch.len();
                return;
            }
            DeliveryOutcome::Delivered(candidates) => candidates,
        };

        let mut by_record: BTreeMap<RecordId, Vec<LabelCandidate>> = BTreeMap::new();
        for candidate in candidates {
            if batch.record(&candidate.record_id).is_none() {
                warn!(
                    batch_id = %batch.batch_id,
                    record_id = %candidate.record_id,
                    "Ignoring candidate for a record not in the batch"
                );
                continue;
            }
            by_record.entry(candidate.record_id.clone()).or_default().push(candidate);
        }

        for record in &batch.records {
            ledger.mark_validating(&record.id, round);

            let mut found = by_record.remove(&record.id).unwrap_or_default();
            let result = if found.is_empty() {
                Err(vec![FailureReason::NoResponse])
            } else if self.config.skip_validation {
                Ok(found.swap_remove(0))
            } else if found.len() > 1 {
                Err(vec![FailureReason::DuplicateCandidate])
            } else {
                let candidate = found.swap_remove(0);
                let outcome = self.validator.validate(&candidate, Some(record));
                if outcome.is_pass() { Ok(candidate) } else { Err(outcome.failure_reasons) }
            };

            match result {
                Ok(candidate) => {
                    ledger.pass(&record.id, candidate, round);
                    report.passed += 1;
                }
                Err(reasons) => {
                    debug!(
                        record_id = %record.id,
                        round,
                        reasons = ?reasons.iter().map(ToString::to_string).collect::<Vec<_>>(),
                        "Record failed validation"
                    );
                    ledger.fail(&record.id, round, reasons);
                    report.failed += 1;
                }
            }
        }
    }
}

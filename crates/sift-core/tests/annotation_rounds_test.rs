//! Integration tests for the annotation round controller.

mod common;

use common::{ScriptedOracle, config, records};
use sift_abstraction::{LabelCandidate, OracleFault, RecordId};
use sift_core::{FailureReason, RoundController, SiftError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_all_valid_in_first_round() {
    let input = records(10);
    let oracle = Arc::new(ScriptedOracle::constant("BUG"));
    let controller = RoundController::new(oracle.clone(), config(4, 3, 0)).unwrap();

    let result = controller.run(&input, CancellationToken::new()).await.unwrap();

    assert_eq!(result.labeled.len(), 10);
    assert!(result.quarantined.is_empty());
    assert!(result.pending.is_empty());
    assert_eq!(result.rounds_executed, 1);
    assert_eq!(result.rounds[0].batches, 3);
    assert_eq!(oracle.calls(), 3);
}

#[tokio::test]
async fn test_out_of_domain_label_is_resubmitted() {
    let input = records(5);
    let oracle = Arc::new(ScriptedOracle::new(|batch| {
        Ok(batch
            .records
            .iter()
            .map(|r| {
                let primary = if batch.round == 1 && r.id.as_str() == "rec-3" { "SPAM" } else { "BUG" };
                LabelCandidate::new(r.id.clone(), primary)
            })
            .collect())
    }));
    let controller = RoundController::new(oracle, config(10, 2, 0)).unwrap();

    let result = controller.run(&input, CancellationToken::new()).await.unwrap();

    assert_eq!(result.labeled.len(), 5);
    assert_eq!(result.labeled[&RecordId::from("rec-3")].primary_category, "BUG");
    assert_eq!(result.rounds_executed, 2);
    assert_eq!(result.rounds[1].submitted, 1);
}

#[tokio::test]
async fn test_passed_label_is_kept_across_rounds() {
    let input = records(4);
    let seen: Arc<Mutex<Vec<(u32, RecordId)>>> = Arc::default();
    let log = seen.clone();
    let oracle = Arc::new(ScriptedOracle::new(move |batch| {
        let mut log = log.lock().unwrap();
        log.extend(batch.records.iter().map(|r| (batch.round, r.id.clone())));

        let mut candidates: Vec<LabelCandidate> = batch
            .records
            .iter()
            .map(|r| {
                let primary = match (batch.round, r.id.as_str()) {
                    (1, "rec-1") => "BUG",
                    (1, _) => "SPAM",
                    _ => "POSITIVE",
                };
                LabelCandidate::new(r.id.clone(), primary)
            })
            .collect();
        if batch.round > 1 {
            // a different valid label for the record that already passed
            candidates.push(LabelCandidate::new("rec-1", "UI/UX"));
        }
        Ok(candidates)
    }));
    let controller = RoundController::new(oracle, config(10, 3, 0)).unwrap();

    let result = controller.run(&input, CancellationToken::new()).await.unwrap();

    assert_eq!(result.labeled.len(), 4);
    assert_eq!(result.labeled[&RecordId::from("rec-1")].primary_category, "BUG");
    assert_eq!(result.labeled[&RecordId::from("rec-2")].primary_category, "POSITIVE");
    assert_eq!(result.rounds_executed, 2);
    assert_eq!(result.rounds[1].submitted, 3);

    let seen = seen.lock().unwrap();
    assert!(seen.iter().filter(|(round, _)| *round > 1).all(|(_, id)| id.as_str() != "rec-1"));
    assert_eq!(seen.iter().filter(|(round, _)| *round == 2).count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_timeout_quarantines_record() {
    let input = records(1);
    let oracle = Arc::new(ScriptedOracle::hanging());
    let controller = RoundController::new(oracle.clone(), config(4, 1, 2)).unwrap();

    let result = controller.run(&input, CancellationToken::new()).await.unwrap();

    assert!(result.labeled.is_empty());
    assert_eq!(oracle.calls(), 3);
    let quarantined = &result.quarantined[&RecordId::from("rec-1")];
    assert_eq!(
        quarantined.failure_reasons,
        vec![FailureReason::OracleFault(OracleFault::timeout(Duration::from_secs(1)).to_string())]
    );
    assert_eq!(result.rounds[0].faulted_batches, 1);
}

#[tokio::test]
async fn test_skip_validation_accepts_invalid_category() {
    let input = records(3);
    let oracle = Arc::new(ScriptedOracle::constant("NOT_A_CATEGORY"));
    let mut annotation = config(2, 2, 0);
    annotation.skip_validation = true;
    let controller = RoundController::new(oracle, annotation).unwrap();

    let result = controller.run(&input, CancellationToken::new()).await.unwrap();

    assert_eq!(result.labeled.len(), 3);
    assert!(result.labeled.values().all(|c| c.primary_category == "NOT_A_CATEGORY"));
}

#[tokio::test]
async fn test_cancellation_before_first_round_leaves_records_pending() {
    let input = records(4);
    let oracle = Arc::new(ScriptedOracle::constant("BUG"));
    let controller = RoundController::new(oracle.clone(), config(2, 3, 0)).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = controller.run(&input, cancel).await.unwrap();

    assert!(result.interrupted);
    assert_eq!(result.pending.len(), 4);
    assert!(result.quarantined.is_empty());
    assert_eq!(result.rounds_executed, 0);
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_mid_round_keeps_completed_labels() {
    let input = records(4);
    let oracle = Arc::new(ScriptedOracle::constant("BUG").with_delay(Duration::from_millis(500)));
    let mut annotation = config(2, 3, 0);
    annotation.concurrency = 1;
    let controller = RoundController::new(oracle, annotation).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(750)).await;
        trigger.cancel();
    });

    let result = controller.run(&input, cancel).await.unwrap();

    assert!(result.interrupted);
    assert_eq!(result.labeled.len(), 2);
    assert_eq!(result.pending.len(), 2);
    assert!(result.quarantined.is_empty());
    assert_eq!(result.rounds[0].cancelled_batches, 1);
}

#[tokio::test]
async fn test_missing_duplicate_and_unrequested_candidates() {
    let input = records(3);
    let oracle = Arc::new(ScriptedOracle::new(|_| {
        Ok(vec![
            LabelCandidate::new("rec-1", "BUG"),
            LabelCandidate::new("rec-2", "BUG"),
            LabelCandidate::new("rec-2", "POSITIVE"),
            LabelCandidate::new("stranger", "BUG"),
        ])
    }));
    let controller = RoundController::new(oracle, config(5, 1, 0)).unwrap();

    let result = controller.run(&input, CancellationToken::new()).await.unwrap();

    assert_eq!(result.labeled.keys().map(RecordId::as_str).collect::<Vec<_>>(), vec!["rec-1"]);
    assert_eq!(
        result.quarantined[&RecordId::from("rec-2")].failure_reasons,
        vec![FailureReason::DuplicateCandidate]
    );
    assert_eq!(result.quarantined[&RecordId::from("rec-3")].failure_reasons, vec![FailureReason::NoResponse]);
    assert_eq!(result.total(), 3);
}

#[tokio::test]
async fn test_empty_successful_response_fails_every_record() {
    let input = records(2);
    let oracle = Arc::new(ScriptedOracle::new(|_| Ok(Vec::new())));
    let controller = RoundController::new(oracle, config(5, 2, 0)).unwrap();

    let result = controller.run(&input, CancellationToken::new()).await.unwrap();

    assert_eq!(result.quarantined.len(), 2);
    assert_eq!(result.rounds_executed, 2);
    assert!(result.quarantined.values().all(|q| q.failure_reasons == vec![FailureReason::NoResponse]));
}

#[tokio::test]
async fn test_duplicate_input_ids_rejected_before_oracle_call() {
    let mut input = records(2);
    input[1].id = input[0].id.clone();
    let oracle = Arc::new(ScriptedOracle::constant("BUG"));
    let controller = RoundController::new(oracle.clone(), config(5, 2, 0)).unwrap();

    let err = controller.run(&input, CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, SiftError::Input(_)));
    assert_eq!(oracle.calls(), 0);
}

#[test]
fn test_invalid_config_rejected() {
    let oracle = Arc::new(ScriptedOracle::constant("BUG"));
    let err = RoundController::new(oracle, config(0, 1, 0)).err().unwrap();
    assert!(matches!(err, SiftError::Config(_)));
}

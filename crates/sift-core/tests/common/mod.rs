//! Shared fixtures for sift-core integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sift_abstraction::{
    AnnotationBatch, LabelCandidate, LabelOracle, OracleFault, RecordId, SourcePlatform, UnlabeledRecord,
};
use sift_core::AnnotationConfig;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

type Responder = dyn Fn(&AnnotationBatch) -> Result<Vec<LabelCandidate>, OracleFault> + Send + Sync;

/// Oracle whose answers are computed by a closure over the batch.
pub struct ScriptedOracle {
    respond: Box<Responder>,
    delay: Duration,
    calls: AtomicU32,
}

impl ScriptedOracle {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&AnnotationBatch) -> Result<Vec<LabelCandidate>, OracleFault> + Send + Sync + 'static,
    {
        Self { respond: Box::new(respond), delay: Duration::ZERO, calls: AtomicU32::new(0) }
    }

    /// Answers every record with `primary`.
    pub fn constant(primary: &'static str) -> Self {
        Self::new(move |batch| {
            Ok(batch.records.iter().map(|r| LabelCandidate::new(r.id.clone(), primary)).collect())
        })
    }

    /// Never answers within any reasonable timeout.
    pub fn hanging() -> Self {
        Self::constant("BUG").with_delay(Duration::from_secs(3600))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LabelOracle for ScriptedOracle {
    async fn annotate(&self, batch: &AnnotationBatch) -> Result<Vec<LabelCandidate>, OracleFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.respond)(batch)
    }

    fn oracle_id(&self) -> &str {
        "scripted"
    }
}

pub fn records(n: usize) -> Vec<UnlabeledRecord> {
    (1..=n)
        .map(|i| UnlabeledRecord {
            id: RecordId(format!("rec-{i}")),
            source_platform: if i % 2 == 0 { SourcePlatform::AppStore } else { SourcePlatform::GooglePlay },
            text: format!("第{i}則評論：登入後閃退"),
            rating: (i % 5) as u8 + 1,
            submitted_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        })
        .collect()
}

/// Small, fast annotation settings.
pub fn config(batch_size: usize, max_rounds: u32, max_oracle_retries: u32) -> AnnotationConfig {
    AnnotationConfig {
        batch_size,
        max_rounds,
        max_oracle_retries,
        oracle_timeout_seconds: 1.0,
        retry_initial_delay_ms: 10,
        retry_max_delay_ms: 40,
        ..AnnotationConfig::default()
    }
}

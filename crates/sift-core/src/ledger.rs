//! Per-record state tracking across annotation rounds.

use crate::error::{Result, SiftError};
use crate::validator::FailureReason;
use serde::Serialize;
use sift_abstraction::{LabelCandidate, RecordId, UnlabeledRecord};
use std::collections::BTreeMap;
use tracing::warn;

/// Where a record stands in the annotation workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordState {
    Pending,
    InFlight { round: u32 },
    Validating { round: u32 },
    /// Terminal. The candidate is immutable for the rest of the run.
    Passed { candidate: LabelCandidate, round: u32 },
    /// Eligible for the next round.
    FailedRound { round: u32, reasons: Vec<FailureReason> },
    /// Terminal.
    Quarantined { reasons: Vec<FailureReason> },
}

impl RecordState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed { .. } | Self::Quarantined { .. })
    }

    /// True for states that still need a passing label.
    pub const fn is_open(&self) -> bool {
        !self.is_terminal()
    }
}

/// Ledger of every input record and its current state.
///
/// Iteration follows input order.
#[derive(Debug, Clone)]
pub struct RecordLedger {
    order: Vec<RecordId>,
    states: BTreeMap<RecordId, RecordState>,
}

impl RecordLedger {
    /// Creates a ledger with every record `Pending`.
    ///
    /// # Errors
    /// Returns `SiftError::Input` when two records share an id.
    pub fn new(records: &[UnlabeledRecord]) -> Result<Self> {
        let mut order = Vec::with_capacity(records.len());
        let mut states = BTreeMap::new();

        for record in records {
            if states.insert(record.id.clone(), RecordState::Pending).is_some() {
                return Err(SiftError::Input(format!("duplicate record id: {}", record.id)));
            }
            order.push(record.id.clone());
        }

        Ok(Self { order, states })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn state(&self, id: &RecordId) -> Option<&RecordState> {
        self.states.get(id)
    }

    /// Ids and states in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &RecordState)> {
        self.order.iter().filter_map(|id| self.states.get(id).map(|state| (id, state)))
    }

    pub fn is_open(&self, id: &RecordId) -> bool {
        self.states.get(id).is_some_and(RecordState::is_open)
    }

    /// Number of records not yet terminal.
    pub fn open_count(&self) -> usize {
        self.states.values().filter(|s| s.is_open()).count()
    }

    pub fn passed_count(&self) -> usize {
        self.states.values().filter(|s| matches!(s, RecordState::Passed { .. })).count()
    }

    pub fn mark_in_flight(&mut self, id: &RecordId, round: u32) {
        self.transition_open(id, RecordState::InFlight { round });
    }

    pub fn mark_validating(&mut self, id: &RecordId, round: u32) {
        self.transition_open(id, RecordState::Validating { round });
    }

    /// Records a passing label. A record that already passed keeps its first label.
    pub fn pass(&mut self, id: &RecordId, candidate: LabelCandidate, round: u32) {
        self.transition_open(id, RecordState::Passed { candidate, round });
    }

    pub fn fail(&mut self, id: &RecordId, round: u32, reasons: Vec<FailureReason>) {
        self.transition_open(id, RecordState::FailedRound { round, reasons });
    }

    /// Moves every open record to `Quarantined`, keeping its last reasons.
    pub fn quarantine_open(&mut self) -> usize {
        let mut count = 0;
        for state in self.states.values_mut().filter(|s| s.is_open()) {
            let reasons = match state {
                RecordState::FailedRound { reasons, .. } => std::mem::take(reasons),
                _ => vec![FailureReason::NoResponse],
            };
            *state = RecordState::Quarantined { reasons };
            count += 1;
        }
        count
    }

    fn transition_open(&mut self, id: &RecordId, next: RecordState) {
        match self.states.get_mut(id) {
            Some(state) if state.is_open() => *state = next,
            Some(_) => warn!(record_id = %id, "Ignoring transition of a terminal record"),
            None => warn!(record_id = %id, "Ignoring transition of an unknown record"),
        }
    }
}

/// Summary of one executed round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    pub round: u32,
    pub batches: usize,
    pub submitted: usize,
    pub passed: usize,
    pub failed: usize,
    pub faulted_batches: usize,
    pub cancelled_batches: usize,
    pub duration_ms: u64,
}

/// Final ledger plus what happened in each round.
#[derive(Debug, Clone)]
pub struct RoundHistory {
    pub ledger: RecordLedger,
    pub rounds: Vec<RoundReport>,
    pub rounds_executed: u32,
    /// Set when the run was cancelled; open records are left unquarantined.
    pub interrupted: bool,
}

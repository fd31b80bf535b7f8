//! Property tests for run-level invariants.

mod common;

use common::{ScriptedOracle, config, records};
use proptest::prelude::*;
use sift_abstraction::LabelCandidate;
use sift_core::RoundController;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Each record passes from round `(hash of id) % 4 + 1` onwards; earlier rounds answer out of domain.
fn staggered_oracle(seed: u64) -> ScriptedOracle {
    ScriptedOracle::new(move |batch| {
        Ok(batch
            .records
            .iter()
            .map(|r| {
                let ready_round = (r.id.as_str().bytes().map(u64::from).sum::<u64>() + seed) % 4 + 1;
                let primary = if u64::from(batch.round) >= ready_round { "POSITIVE" } else { "positive" };
                LabelCandidate::new(r.id.clone(), primary)
            })
            .collect())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_partition_complete_and_rounds_bounded(
        n in 0usize..40,
        batch_size in 1usize..8,
        max_rounds in 1u32..5,
        seed in 0u64..16,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let input = records(n);
        let controller =
            RoundController::new(Arc::new(staggered_oracle(seed)), config(batch_size, max_rounds, 0)).unwrap();

        let result = runtime.block_on(controller.run(&input, CancellationToken::new())).unwrap();

        prop_assert!(result.rounds_executed <= max_rounds);
        prop_assert!(result.pending.is_empty());
        prop_assert_eq!(result.total(), n);

        let labeled: BTreeSet<_> = result.labeled.keys().collect();
        let quarantined: BTreeSet<_> = result.quarantined.keys().collect();
        prop_assert!(labeled.is_disjoint(&quarantined));

        let submitted: Vec<usize> = result.rounds.iter().map(|r| r.submitted).collect();
        prop_assert!(submitted.windows(2).all(|w| w[1] <= w[0]));
        for report in &result.rounds {
            prop_assert_eq!(report.passed + report.failed, report.submitted);
        }
        prop_assert!(result.labeled.values().all(|c| c.primary_category == "POSITIVE"));
    }
}

//! Partitions a working set into bounded-size batches.

use crate::error::{Result, SiftError};
use sift_abstraction::{AnnotationBatch, UnlabeledRecord};

/// Splits `records` into batches of at most `batch_size`, preserving order.
///
/// Batch ids are `r{round}-b{index}`. An empty working set yields no batches.
///
/// # Errors
/// Returns `SiftError::Config` when `batch_size` is zero.
pub fn plan(records: &[UnlabeledRecord], batch_size: usize, round: u32) -> Result<Vec<AnnotationBatch>> {
    if batch_size == 0 {
        return Err(SiftError::Config("batch_size must be greater than 0".to_string()));
    }

    Ok(records
        .chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| AnnotationBatch {
            batch_id: format!("r{round}-b{index}"),
            round,
            records: chunk.to_vec(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use sift_abstraction::{RecordId, SourcePlatform};

    fn records(n: usize) -> Vec<UnlabeledRecord> {
        (0..n)
            .map(|i| UnlabeledRecord {
                id: RecordId(format!("r{i}")),
                source_platform: SourcePlatform::GooglePlay,
                text: "好用".to_string(),
                rating: 5,
                submitted_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_plan_ten_records_batch_of_four() {
        let batches = plan(&records(10), 4, 1).unwrap();
        let sizes: Vec<usize> = batches.iter().map(AnnotationBatch::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(batches[2].batch_id, "r1-b2");
        assert!(batches.iter().all(|b| b.round == 1));
    }

    #[test]
    fn test_plan_zero_batch_size_is_config_error() {
        assert!(matches!(plan(&records(3), 0, 1), Err(SiftError::Config(_))));
    }

    #[test]
    fn test_plan_empty() {
        assert!(plan(&[], 5, 3).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_plan_preserves_order_and_bounds(n in 0usize..200, size in 1usize..50) {
            let input = records(n);
            let batches = plan(&input, size, 2).unwrap();

            prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));
            let flat: Vec<&RecordId> = batches.iter().flat_map(AnnotationBatch::record_ids).collect();
            let expected: Vec<&RecordId> = input.iter().map(|r| &r.id).collect();
            prop_assert_eq!(flat, expected);
        }
    }
}

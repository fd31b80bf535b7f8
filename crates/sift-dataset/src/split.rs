use crate::error::{DatasetError, DatasetResult};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

fn default_test_size() -> f64 {
    0.2
}

fn default_random_state() -> u64 {
    42
}

fn default_stratify_field() -> String {
    "primary_category".to_string()
}

/// The `[splitting]` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of each class that goes to the test set, in (0, 1).
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Seed for the per-class shuffle.
    #[serde(default = "default_random_state")]
    pub random_state: u64,
    /// Row field whose value defines the class.
    #[serde(default = "default_stratify_field")]
    pub stratify_field: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            random_state: default_random_state(),
            stratify_field: default_stratify_field(),
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> DatasetResult<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(DatasetError::InvalidConfig(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.stratify_field.trim().is_empty() {
            return Err(DatasetError::InvalidConfig("stratify_field must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Rows per side for one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub train: usize,
    pub test: usize,
}

#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub train: Vec<Value>,
    pub test: Vec<Value>,
    pub classes: BTreeMap<String, ClassCounts>,
}

fn class_of(row: &Value, field: &str) -> Option<String> {
    match row.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Number of rows of a class that go to the test side.
///
/// Classes with at least two rows keep one row on each side.
fn test_count(len: usize, test_size: f64) -> usize {
    if len < 2 {
        return 0;
    }
    let wanted = (len as f64 * test_size).round() as usize;
    wanted.clamp(1, len - 1)
}

/// Splits `rows` into train and test, stratified on `config.stratify_field`.
///
/// Each class is shuffled with a generator seeded from `random_state`, so the
/// same input and config always give the same split.
pub fn stratified_split(rows: Vec<Value>, config: &SplitConfig) -> DatasetResult<SplitOutcome> {
    config.validate()?;
    if rows.is_empty() {
        return Err(DatasetError::Empty);
    }

    let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (index, row) in rows.into_iter().enumerate() {
        let class = class_of(&row, &config.stratify_field).ok_or_else(|| {
            DatasetError::MissingField { index, field: config.stratify_field.clone() }
        })?;
        groups.entry(class).or_default().push(row);
    }

    let mut rng = StdRng::seed_from_u64(config.random_state);
    let mut train = Vec::new();
    let mut test = Vec::new();
    let mut classes = BTreeMap::new();

    for (class, mut members) in groups {
        if members.len() < 2 {
            warn!(class = %class, rows = members.len(), "Class has fewer than two rows; kept in train only");
        }

        members.shuffle(&mut rng);
        let n_test = test_count(members.len(), config.test_size);
        let train_part = members.split_off(n_test);

        classes.insert(class, ClassCounts { train: train_part.len(), test: members.len() });
        test.extend(members);
        train.extend(train_part);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    info!(
        train = train.len(),
        test = test.len(),
        classes = classes.len(),
        field = %config.stratify_field,
        "Stratified split complete"
    );

    Ok(SplitOutcome { train, test, classes })
}

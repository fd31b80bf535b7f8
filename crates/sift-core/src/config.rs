//! Configuration for Sift.
//!
//! Loaded from a TOML file; every section and field has a default, so an
//! empty file (or no file) is a valid configuration.

use crate::batch::RetryPolicy;
use crate::error::{Result, SiftError};
use serde::{Deserialize, Serialize};
use sift_abstraction::LabelVocabulary;
use sift_dataset::SplitConfig;
use sift_oracles::OracleConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sift.toml";

const DEFAULT_PRIMARY_LABELS: [&str; 6] =
    ["BUG", "UI/UX", "FEATURE_REQUEST", "PERFORMANCE", "POSITIVE", "INVALID"];
const DEFAULT_SECONDARY_LABELS: [&str; 4] = ["ACCOUNT", "TRANSACTION", "CREDIT_CARD", "GENERAL"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiftConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub splitting: SplitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SiftConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SiftError::Config(format!("Configuration file not found: {}", path.display())));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| SiftError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `explicit` if given, else `./sift.toml` if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load_from_file(&local);
        }

        Ok(Self::default())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.annotation.validate()?;
        self.splitting.validate().map_err(|e| SiftError::Config(e.to_string()))?;
        Ok(())
    }
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_labeling_dir() -> PathBuf {
    PathBuf::from("data/labeling")
}

fn default_splits_dir() -> PathBuf {
    PathBuf::from("data/splits")
}

/// Output directories for each stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Merged CSV files.
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    /// Unlabeled, labeled, quarantined and pending JSON files.
    #[serde(default = "default_labeling_dir")]
    pub labeling_dir: PathBuf,
    /// Train/test splits and manifests.
    #[serde(default = "default_splits_dir")]
    pub splits_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            processed_dir: default_processed_dir(),
            labeling_dir: default_labeling_dir(),
            splits_dir: default_splits_dir(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_max_rounds() -> u32 {
    8
}

fn default_max_oracle_retries() -> u32 {
    5
}

fn default_oracle_timeout_seconds() -> f64 {
    300.0
}

fn default_closed_label_set() -> Vec<String> {
    DEFAULT_PRIMARY_LABELS.iter().map(ToString::to_string).collect()
}

fn default_secondary_label_set() -> Option<Vec<String>> {
    Some(DEFAULT_SECONDARY_LABELS.iter().map(ToString::to_string).collect())
}

fn default_concurrency() -> usize {
    4
}

fn default_retry_initial_delay_ms() -> u64 {
    30_000
}

fn default_retry_max_delay_ms() -> u64 {
    240_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

/// The `[annotation]` section: round controller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Records per oracle call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Upper bound on annotation rounds.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    /// Retries per batch after a wholesale oracle fault.
    #[serde(default = "default_max_oracle_retries")]
    pub max_oracle_retries: u32,
    /// Per-call timeout, fractional seconds allowed.
    #[serde(default = "default_oracle_timeout_seconds")]
    pub oracle_timeout_seconds: f64,
    /// Allowed `primary_category` values.
    #[serde(default = "default_closed_label_set")]
    pub closed_label_set: Vec<String>,
    /// Allowed secondary values. An empty list shares `closed_label_set`.
    #[serde(default = "default_secondary_label_set")]
    pub secondary_label_set: Option<Vec<String>>,
    /// Accept oracle output without validation.
    #[serde(default)]
    pub skip_validation: bool,
    /// Maximum concurrent oracle calls within a round.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_rounds: default_max_rounds(),
            max_oracle_retries: default_max_oracle_retries(),
            oracle_timeout_seconds: default_oracle_timeout_seconds(),
            closed_label_set: default_closed_label_set(),
            secondary_label_set: default_secondary_label_set(),
            skip_validation: false,
            concurrency: default_concurrency(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl AnnotationConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `SiftError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SiftError::Config(msg.to_string()));

        if self.batch_size == 0 {
            return invalid("annotation.batch_size must be greater than 0");
        }
        if self.max_rounds == 0 {
            return invalid("annotation.max_rounds must be greater than 0");
        }
        if !self.oracle_timeout_seconds.is_finite() || self.oracle_timeout_seconds <= 0.0 {
            return invalid("annotation.oracle_timeout_seconds must be a positive number");
        }
        if self.concurrency == 0 {
            return invalid("annotation.concurrency must be greater than 0");
        }
        if self.closed_label_set.is_empty() {
            return invalid("annotation.closed_label_set must not be empty");
        }
        let secondary = self.secondary_label_set.iter().flatten();
        if self.closed_label_set.iter().chain(secondary).any(|l| l.trim().is_empty()) {
            return invalid("label sets must not contain empty labels");
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return invalid("annotation.backoff_multiplier must be at least 1.0");
        }
        if self.retry_initial_delay_ms > self.retry_max_delay_ms {
            return invalid("annotation.retry_initial_delay_ms must not exceed retry_max_delay_ms");
        }
        Ok(())
    }

    /// The vocabulary candidates are validated against.
    pub fn vocabulary(&self) -> LabelVocabulary {
        match &self.secondary_label_set {
            Some(secondary) if !secondary.is_empty() => {
                LabelVocabulary::split(self.closed_label_set.iter().cloned(), secondary.iter().cloned())
            }
            _ => LabelVocabulary::shared(self.closed_label_set.iter().cloned()),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_oracle_retries,
            Duration::from_millis(self.retry_initial_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
            self.backoff_multiplier,
        )
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.oracle_timeout_seconds).unwrap_or(Duration::MAX)
    }
}

fn default_min_length() -> usize {
    1
}

fn default_min_cjk_chars() -> usize {
    2
}

fn default_true() -> bool {
    true
}

/// The `[cleaning]` section used by `prepare`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Minimum cleaned length, in characters.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Minimum number of CJK ideographs.
    #[serde(default = "default_min_cjk_chars")]
    pub min_cjk_chars: usize,
    #[serde(default = "default_true")]
    pub enable_emoji_removal: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            min_cjk_chars: default_min_cjk_chars(),
            enable_emoji_removal: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// The `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when neither `--log-level` nor `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

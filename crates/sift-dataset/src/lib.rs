//! Sift Dataset
//!
//! Training-set primitives for labeled review data:
//! - Stratified train/test splitting (`stratified_split`)
//! - Content-hash dataset identifiers (`DatasetId`)
//! - Writing split outputs + manifests

pub mod dataset;
pub mod error;
pub mod manifest;
pub mod split;

pub use dataset::{DatasetId, compute_dataset_id};
pub use error::{DatasetError, DatasetResult};
pub use manifest::{SplitArtifact, SplitManifest, sha256_file, write_split};
pub use split::{ClassCounts, SplitConfig, SplitOutcome, stratified_split};

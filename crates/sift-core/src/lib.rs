//! Sift Core - review annotation workflow.
//!
//! This crate provides:
//! - Schema validation of oracle label candidates
//! - Batch planning and concurrent dispatch with retry and timeout
//! - The round controller and result assembly
//! - Configuration, artifact I/O and the merge/prepare stages
//!
//! # Example
//!
//! ```rust,no_run
//! use sift_core::{SiftConfig, RoundController, artifacts};
//! use sift_oracles::MockOracle;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> sift_core::Result<()> {
//!     let config = SiftConfig::discover(None)?;
//!     let records = artifacts::load_unlabeled("unlabeled.json".as_ref())?;
//!     let controller = RoundController::new(Arc::new(MockOracle::new("demo")), config.annotation)?;
//!     let result = controller.run(&records, CancellationToken::new()).await?;
//!     println!("labeled {}", result.labeled.len());
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod assembler;
pub mod batch;
pub mod config;
pub mod controller;
pub mod error;
pub mod ledger;
pub mod merge;
pub mod prepare;
pub mod validator;

pub use assembler::{LabeledRow, PendingRow, QuarantinedRecord, QuarantinedRow, RunResult, assemble};
pub use batch::{BatchDelivery, BatchDispatcher, DeliveryOutcome, RetryPolicy, plan};
pub use config::{AnnotationConfig, CleaningConfig, LoggingConfig, PathsConfig, SiftConfig};
pub use controller::RoundController;
pub use error::{Result, SiftError};
pub use ledger::{RecordLedger, RecordState, RoundHistory, RoundReport};
pub use merge::MergedRow;
pub use prepare::Preparer;
pub use validator::{FailureReason, SchemaValidator, ValidationOutcome, Verdict};

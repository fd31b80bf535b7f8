//! Command implementations for the Sift CLI.

pub mod label;
pub mod merge;
pub mod pipeline;
pub mod prepare;
pub mod split;

use serde::Serialize;
use sift_core::artifacts::timestamped_filename;
use std::path::{Path, PathBuf};

/// `explicit` if given, else `{dir}/{stem}_{timestamp}.{ext}`.
pub(crate) fn output_path(explicit: Option<PathBuf>, dir: &Path, stem: &str, timestamp: &str, ext: &str) -> PathBuf {
    explicit.unwrap_or_else(|| dir.join(timestamped_filename(stem, timestamp, ext)))
}

/// Prints the written artifact paths as JSON on stdout.
pub(crate) fn print_artifacts<T: Serialize>(artifacts: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(artifacts)?);
    Ok(())
}

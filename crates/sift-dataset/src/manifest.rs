use crate::dataset::{DatasetId, compute_dataset_id};
use crate::error::DatasetResult;
use crate::split::{ClassCounts, SplitConfig, SplitOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One written side of a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitArtifact {
    pub path: PathBuf,
    pub rows: usize,
    pub sha256: String,
    pub dataset_id: DatasetId,
}

/// Describes a train/test split written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitManifest {
    pub created_at: DateTime<Utc>,
    pub source: PathBuf,
    pub config: SplitConfig,
    pub train: SplitArtifact,
    pub test: SplitArtifact,
    pub classes: BTreeMap<String, ClassCounts>,
}

pub fn sha256_file(path: &Path) -> DatasetResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

fn write_rows(path: &Path, rows: &[Value]) -> DatasetResult<SplitArtifact> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.flush()?;
    drop(writer);

    Ok(SplitArtifact {
        path: path.to_path_buf(),
        rows: rows.len(),
        sha256: sha256_file(path)?,
        dataset_id: compute_dataset_id(rows)?,
    })
}

/// Writes both sides of `outcome` and a manifest next to them.
pub fn write_split(
    outcome: &SplitOutcome,
    config: &SplitConfig,
    source: &Path,
    train_path: &Path,
    test_path: &Path,
    manifest_path: &Path,
) -> DatasetResult<SplitManifest> {
    let train = write_rows(train_path, &outcome.train)?;
    let test = write_rows(test_path, &outcome.test)?;

    let manifest = SplitManifest {
        created_at: Utc::now(),
        source: source.to_path_buf(),
        config: config.clone(),
        train,
        test,
        classes: outcome.classes.clone(),
    };

    if let Some(parent) = manifest_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(manifest_path)?);
    serde_json::to_writer_pretty(&mut writer, &manifest)?;
    writer.flush()?;

    Ok(manifest)
}

//! Merges Google Play and App Store CSV exports into one CSV schema.

use crate::error::{Result, SiftError};
use serde::{Deserialize, Serialize};
use sift_abstraction::SourcePlatform;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// A row of a store export (`reviewId,userName,rating,date,review`).
#[derive(Debug, Clone, Default, Deserialize)]
struct ExportRow {
    #[serde(rename = "reviewId", default)]
    review_id: String,
    #[serde(rename = "userName", default)]
    user_name: String,
    #[serde(default)]
    rating: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    review: String,
}

/// A row of the merged CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRow {
    pub platform: String,
    #[serde(rename = "reviewId")]
    pub review_id: String,
    #[serde(rename = "userName", default)]
    pub user_name: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub content: String,
}

/// Reads one store export and tags its rows with `platform`.
pub fn read_export(path: &Path, platform: SourcePlatform) -> Result<Vec<MergedRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| SiftError::Input(format!("cannot read {}: {}", path.display(), e)))?;

    let mut rows = Vec::new();
    for row in reader.deserialize::<ExportRow>() {
        let row = row?;
        rows.push(MergedRow {
            platform: platform.to_string(),
            review_id: row.review_id,
            user_name: row.user_name,
            rating: row.rating,
            date: row.date,
            content: row.review,
        });
    }

    info!(path = %path.display(), platform = %platform, rows = rows.len(), "Loaded store export");
    Ok(rows)
}

/// Concatenates sources in order and drops repeated review ids, first wins.
pub fn merge_rows<I>(sources: I) -> Vec<MergedRow>
where
    I: IntoIterator<Item = Vec<MergedRow>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    let mut dropped = 0usize;

    for row in sources.into_iter().flatten() {
        if seen.insert(row.review_id.clone()) {
            merged.push(row);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        warn!(dropped, "Dropped duplicate review ids");
    }
    merged
}

/// Merges the given exports (Google Play first) and writes the unified CSV.
///
/// # Errors
/// Returns `SiftError::Input` when neither export is given.
pub fn merge_files(google_play: Option<&Path>, app_store: Option<&Path>, output: &Path) -> Result<usize> {
    if google_play.is_none() && app_store.is_none() {
        return Err(SiftError::Input("at least one of the Google Play or App Store exports is required".to_string()));
    }

    let mut sources = Vec::new();
    if let Some(path) = google_play {
        sources.push(read_export(path, SourcePlatform::GooglePlay)?);
    }
    if let Some(path) = app_store {
        sources.push(read_export(path, SourcePlatform::AppStore)?);
    }

    let merged = merge_rows(sources);
    write_merged(output, &merged)?;

    info!(output = %output.display(), rows = merged.len(), "Merged reviews written");
    Ok(merged.len())
}

/// Writes merged rows with the unified header.
pub fn write_merged(path: &Path, rows: &[MergedRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(["platform", "reviewId", "userName", "rating", "date", "content"])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a merged CSV back.
pub fn read_merged(path: &Path) -> Result<Vec<MergedRow>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| SiftError::Input(format!("cannot read {}: {}", path.display(), e)))?;
    reader.deserialize::<MergedRow>().map(|row| row.map_err(SiftError::from)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "reviewId,userName,rating,date,review\n";

    #[test]
    fn test_merge_google_first_and_dedup() {
        let dir = TempDir::new().unwrap();
        let google = dir.path().join("google.csv");
        let apple = dir.path().join("apple.csv");
        std::fs::write(&google, format!("{HEADER}g1,amy,5,2024-01-01 10:00:00,很好用\ndup,bob,1,2024-01-02,閃退\n")).unwrap();
        std::fs::write(&apple, format!("{HEADER}dup,carl,2,2024-01-03,重複\na1,dora,3,,\n")).unwrap();

        let output = dir.path().join("out/merged.csv");
        let count = merge_files(Some(&google), Some(&apple), &output).unwrap();
        assert_eq!(count, 3);

        let rows = read_merged(&output).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.review_id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "dup", "a1"]);
        assert_eq!(rows[1].platform, "google_play");
        assert_eq!(rows[1].content, "閃退");
        assert_eq!(rows[2].platform, "app_store");
        assert_eq!(rows[2].content, "");
    }

    #[test]
    fn test_merge_requires_an_input() {
        let dir = TempDir::new().unwrap();
        let err = merge_files(None, None, &dir.path().join("merged.csv")).unwrap_err();
        assert!(matches!(err, SiftError::Input(_)));
    }

    #[test]
    fn test_merged_header_is_unified() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged.csv");
        write_merged(&output, &[]).unwrap();
        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content.trim(), "platform,reviewId,userName,rating,date,content");
    }
}

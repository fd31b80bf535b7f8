//! Cleans merged reviews into the unlabeled record set.

use crate::config::CleaningConfig;
use crate::error::{Result, SiftError};
use crate::merge::{MergedRow, read_merged};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use sift_abstraction::{RecordId, SourcePlatform, UnlabeledRecord};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

const EMOJI_PATTERN: &str = concat!(
    "[",
    r"\x{1F600}-\x{1F64F}",
    r"\x{1F300}-\x{1F5FF}",
    r"\x{1F680}-\x{1F6FF}",
    r"\x{1F1E0}-\x{1F1FF}",
    r"\x{1F900}-\x{1F9FF}",
    r"\x{1FA00}-\x{1FAFF}",
    r"\x{2600}-\x{26FF}",
    r"\x{2700}-\x{27BF}",
    r"\x{1F004}\x{1F0CF}",
    r"\x{1F170}-\x{1F251}",
    r"\x{FE00}-\x{FE0F}",
    r"\x{200D}\x{20E3}\x{2B50}\x{2B55}",
    "]",
);

/// Why a merged row did not become a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    EmptyText,
    TooShort,
    BadRating,
    BadDate,
    BadPlatform,
}

/// Text cleaner and record builder.
#[derive(Debug, Clone)]
pub struct Preparer {
    config: CleaningConfig,
    emoji: Regex,
    whitespace: Regex,
}

impl Preparer {
    pub fn new(config: CleaningConfig) -> Result<Self> {
        let emoji = Regex::new(EMOJI_PATTERN).map_err(|e| SiftError::Config(format!("emoji pattern: {e}")))?;
        let whitespace = Regex::new(r"\s+").map_err(|e| SiftError::Config(format!("whitespace pattern: {e}")))?;
        Ok(Self { config, emoji, whitespace })
    }

    /// Folds full-width ASCII, applies NFKC, strips emoji when enabled and
    /// collapses whitespace.
    pub fn clean_text(&self, text: &str) -> String {
        let folded: String = text.chars().map(fold_fullwidth).nfkc().collect();
        let stripped = if self.config.enable_emoji_removal {
            self.emoji.replace_all(&folded, "").into_owned()
        } else {
            folded
        };
        self.whitespace.replace_all(&stripped, " ").trim().to_string()
    }

    /// Length and CJK-count checks, counted in chars.
    pub fn passes_length_checks(&self, text: &str) -> bool {
        text.chars().count() >= self.config.min_length
            && text.chars().filter(|&c| is_cjk(c)).count() >= self.config.min_cjk_chars
    }

    /// Builds records from merged rows. Rows that fail cleaning are skipped.
    pub fn prepare_rows(&self, rows: &[MergedRow]) -> Vec<UnlabeledRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut duplicates = 0usize;

        for (index, row) in rows.iter().enumerate() {
            match self.prepare_row(index, row) {
                Ok(record) => {
                    if seen.insert(record.id.clone()) {
                        records.push(record);
                    } else {
                        duplicates += 1;
                    }
                }
                Err(reason) => {
                    debug!(row = index, review_id = %row.review_id, ?reason, "Skipping row");
                    skipped += 1;
                }
            }
        }

        if duplicates > 0 {
            warn!(duplicates, "Dropped rows with repeated ids");
        }
        info!(input = rows.len(), prepared = records.len(), skipped, "Prepared records for labeling");
        records
    }

    fn prepare_row(&self, index: usize, row: &MergedRow) -> std::result::Result<UnlabeledRecord, Skip> {
        let raw = row.content.trim();
        if raw.is_empty() {
            return Err(Skip::EmptyText);
        }

        let text = self.clean_text(raw);
        if text.is_empty() {
            return Err(Skip::EmptyText);
        }
        if !self.passes_length_checks(&text) {
            return Err(Skip::TooShort);
        }

        let source_platform: SourcePlatform = row.platform.parse().map_err(|_| Skip::BadPlatform)?;

        let Some(rating) = parse_rating(&row.rating) else {
            warn!(row = index, rating = %row.rating, "Unparsable rating; row skipped");
            return Err(Skip::BadRating);
        };

        let Some(submitted_at) = parse_date(&row.date) else {
            warn!(row = index, date = %row.date, "Unparsable date; row skipped");
            return Err(Skip::BadDate);
        };

        let review_id = row.review_id.trim();
        let id = if review_id.is_empty() {
            RecordId(format!("{source_platform}-{index}"))
        } else {
            RecordId::from(review_id)
        };

        Ok(UnlabeledRecord { id, source_platform, text, rating, submitted_at })
    }

    /// Reads a merged CSV and returns the cleaned records.
    pub fn prepare_file(&self, merged_csv: &Path) -> Result<Vec<UnlabeledRecord>> {
        let rows = read_merged(merged_csv)?;
        info!(path = %merged_csv.display(), rows = rows.len(), "Loaded merged reviews");
        Ok(self.prepare_rows(&rows))
    }
}

fn fold_fullwidth(c: char) -> char {
    match c {
        '\u{3000}' => ' ',
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        _ => c,
    }
}

fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF
            | 0x3400..=0x4DBF
            | 0x20000..=0x2A6DF
            | 0x2A700..=0x2B73F
            | 0x2B740..=0x2B81F
            | 0x2B820..=0x2CEAF
    )
}

/// Parses a rating and clamps it into 1..=5.
fn parse_rating(raw: &str) -> Option<u8> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(1.0, 5.0) as u8)
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

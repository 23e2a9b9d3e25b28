//! Interchange format for `export` / `import`.
//!
//! JSON is an array of [`EntryRecord`] in recency order (newest first). The
//! text format is a human-readable dump and cannot be imported back.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Entry, Source};
use crate::error::{AppError, AppResult};
use crate::utils::text::is_blank;
use crate::utils::time::parse_timestamp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Json,
    Text,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Text => f.write_str("txt"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "txt" | "text" => Ok(ExportFormat::Text),
            other => Err(format!("unsupported format: {other} (expected json or txt)")),
        }
    }
}

/// One persisted entry as it appears in export files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EntryRecord {
    pub id: i64,
    pub content: String,
    pub content_hash: String,
    pub timestamp: String,
    pub source: Source,
    pub char_count: i64,
    pub word_count: i64,
    pub pinned: u8,
}

impl From<&Entry> for EntryRecord {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            content: entry.content.clone(),
            content_hash: entry.content_hash.clone(),
            timestamp: entry.timestamp.clone(),
            source: entry.source,
            char_count: entry.char_count,
            word_count: entry.word_count,
            pinned: u8::from(entry.pinned),
        }
    }
}

/// A record that passed validation and is ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub pinned: bool,
}

pub fn render(entries: &[Entry], format: ExportFormat) -> AppResult<String> {
    match format {
        ExportFormat::Json => {
            let records: Vec<EntryRecord> = entries.iter().map(EntryRecord::from).collect();
            serde_json::to_string_pretty(&records)
                .map_err(|err| AppError::Internal(format!("failed to encode export: {err}")))
        }
        ExportFormat::Text => {
            let mut out = String::new();
            for (index, entry) in entries.iter().enumerate() {
                out.push_str(&format!("=== Entry {} ({}) ===\n", index + 1, entry.timestamp));
                out.push_str(&entry.content);
                out.push_str("\n\n");
            }
            Ok(out)
        }
    }
}

/// Validates the whole payload before anything touches the store. Records
/// come back oldest first so replaying them keeps their relative order.
pub fn parse_records(data: &str, format: ExportFormat) -> AppResult<Vec<ImportRecord>> {
    if format != ExportFormat::Json {
        return Err(AppError::ImportFormat(format!(
            "{format} import is not supported, use json"
        )));
    }

    let records: Vec<EntryRecord> =
        serde_json::from_str(data).map_err(|err| AppError::ImportFormat(err.to_string()))?;

    let mut validated = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| validate(index, record))
        .collect::<AppResult<Vec<_>>>()?;

    validated.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    Ok(validated)
}

fn validate(index: usize, record: EntryRecord) -> AppResult<ImportRecord> {
    let invalid = |reason: &str| AppError::ImportFormat(format!("record {index}: {reason}"));

    if is_blank(&record.content) {
        return Err(invalid("content is empty"));
    }
    if record.pinned > 1 {
        return Err(invalid("pinned must be 0 or 1"));
    }
    if record.char_count < 0 || record.word_count < 0 {
        return Err(invalid("counts must not be negative"));
    }
    let timestamp = parse_timestamp(&record.timestamp)
        .ok_or_else(|| invalid(&format!("unreadable timestamp {:?}", record.timestamp)))?;

    Ok(ImportRecord {
        id: record.id,
        content: record.content,
        timestamp,
        pinned: record.pinned == 1,
    })
}

use std::path::Path;

use regex::RegexBuilder;
use tracing::{debug, info};

use crate::db::{Database, Entry, NewEntry, Source, SourceOnRefresh, Stats};
use crate::error::{AppError, AppResult};
use crate::services::prune::{report_pruned, run_prune};
use crate::services::transfer::{self, ExportFormat};
use crate::utils::text::is_blank;

pub const DEFAULT_LIST_LIMIT: i64 = 10;
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;

/// The clipboard history. Every mutation goes through here and is committed
/// before the call returns.
///
/// Positions are 1-based recency ranks (newest first, ties broken by id)
/// resolved against the table at call time.
pub struct HistoryStore {
    db: Database,
}

impl HistoryStore {
    /// Opens or creates the store at `path`. A `history_limit` is persisted
    /// for every process sharing the file and applied immediately.
    pub fn open(path: &Path, history_limit: Option<i64>) -> AppResult<Self> {
        Self::from_database(Database::new(path)?, history_limit)
    }

    fn from_database(db: Database, history_limit: Option<i64>) -> AppResult<Self> {
        let store = Self { db };
        if let Some(limit) = history_limit {
            store.set_history_limit(limit)?;
        }
        Ok(store)
    }

    #[cfg(test)]
    pub fn in_memory(history_limit: i64) -> AppResult<Self> {
        Self::from_database(Database::new_in_memory()?, Some(history_limit))
    }

    pub fn path(&self) -> Option<&Path> {
        self.db.path()
    }

    pub fn history_limit(&self) -> AppResult<i64> {
        Ok(self.db.history_limit()?)
    }

    /// Returns how many entries the new limit pruned.
    pub fn set_history_limit(&self, history_limit: i64) -> AppResult<usize> {
        self.db.set_history_limit(history_limit)?;
        let pruned = run_prune(&self.db, self.history_limit()?)?;
        Ok(pruned.len())
    }

    pub fn add(&self, content: &str, source: Source) -> AppResult<i64> {
        self.record(content, source).map(|entry| entry.id)
    }

    /// Same path as [`add`](Self::add) but hands back the stored entry.
    pub fn record(&self, content: &str, source: Source) -> AppResult<Entry> {
        if is_blank(content) {
            return Err(AppError::Validation("content is empty".to_string()));
        }

        let (outcome, pruned) = self.db.upsert_and_prune(NewEntry {
            content,
            source,
            pinned: false,
            on_refresh: SourceOnRefresh::Replace,
        })?;
        report_pruned(&pruned);
        Ok(outcome.into_entry())
    }

    pub fn get(&self, position: i64) -> AppResult<Option<String>> {
        Ok(self.get_entry(position)?.map(|entry| entry.content))
    }

    pub fn get_entry(&self, position: i64) -> AppResult<Option<Entry>> {
        Ok(self.db.entry_at(position)?)
    }

    pub fn list(&self, limit: i64) -> AppResult<Vec<Entry>> {
        Ok(self.db.list_entries(limit)?)
    }

    /// Case-insensitive regex search over full content, newest first.
    pub fn search(&self, query: &str, limit: i64) -> AppResult<Vec<Entry>> {
        let pattern = RegexBuilder::new(query).case_insensitive(true).build()?;
        let found = self.db.find_entries(limit, |content| pattern.is_match(content))?;
        debug!(query, matches = found.len(), "searched history");
        Ok(found)
    }

    pub fn pin(&self, position: i64) -> AppResult<bool> {
        Ok(self.db.set_pinned_at(position, true)?.is_some())
    }

    pub fn unpin(&self, position: i64) -> AppResult<bool> {
        Ok(self.db.set_pinned_at(position, false)?.is_some())
    }

    /// Removes the entry even when it is pinned.
    pub fn delete(&self, position: i64) -> AppResult<bool> {
        let deleted = self.db.delete_at(position)?;
        if let Some(entry) = &deleted {
            debug!(id = entry.id, position, "deleted entry");
        }
        Ok(deleted.is_some())
    }

    pub fn clear(&self, keep_pinned: bool) -> AppResult<usize> {
        let removed = self.db.clear(keep_pinned)?;
        info!(removed, keep_pinned, "cleared history");
        Ok(removed)
    }

    pub fn stats(&self) -> AppResult<Stats> {
        Ok(self.db.stats()?)
    }

    pub fn export(&self, format: ExportFormat) -> AppResult<String> {
        transfer::render(&self.db.all_entries()?, format)
    }

    /// All-or-nothing: the payload is validated before the first write and
    /// applied in a single transaction. Matching content refreshes the
    /// existing entry and keeps its source and pin.
    pub fn import(&self, data: &str, format: ExportFormat) -> AppResult<usize> {
        let records = transfer::parse_records(data, format)?;
        let entries: Vec<NewEntry<'_>> = records
            .iter()
            .map(|record| NewEntry {
                content: &record.content,
                source: Source::Import,
                pinned: record.pinned,
                on_refresh: SourceOnRefresh::Keep,
            })
            .collect();

        let outcome = self.db.upsert_batch(&entries, self.history_limit()?)?;
        info!(
            inserted = outcome.inserted,
            refreshed = outcome.refreshed,
            pruned = outcome.pruned,
            "imported history"
        );
        Ok(outcome.inserted + outcome.refreshed)
    }
}

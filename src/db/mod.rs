mod schema;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::utils::hash::sha256_hex;
use crate::utils::text::{char_count, is_blank, word_count};
use crate::utils::time::{next_timestamp, normalize_timestamp};

use schema::HISTORY_TABLE;

pub const DEFAULT_HISTORY_LIMIT: i64 = 100;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database lock poisoned")]
    LockPoisoned,
}

/// Provenance of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Clipboard,
    Manual,
    Import,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Clipboard => "clipboard",
            Source::Manual => "manual",
            Source::Import => "import",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "clipboard" => Ok(Source::Clipboard),
            "manual" => Ok(Source::Manual),
            "import" => Ok(Source::Import),
            other => Err(format!("unknown entry source: {other}")),
        }
    }
}

impl ToSql for Source {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Source {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: String| FromSqlError::Other(err.into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: i64,
    pub content: String,
    pub content_hash: String,
    pub timestamp: String,
    pub source: Source,
    pub char_count: i64,
    pub word_count: i64,
    pub pinned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stats {
    pub total_entries: i64,
    pub pinned_entries: i64,
    pub total_characters: i64,
    pub total_words: i64,
    pub oldest_entry: Option<String>,
    pub newest_entry: Option<String>,
    pub database_size_bytes: u64,
    pub database_path: String,
}

/// What happens to `source` when new content matches an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOnRefresh {
    Replace,
    Keep,
}

#[derive(Debug, Clone, Copy)]
pub struct NewEntry<'a> {
    pub content: &'a str,
    pub source: Source,
    pub pinned: bool,
    pub on_refresh: SourceOnRefresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    Inserted(Entry),
    Refreshed(Entry),
}

impl Upsert {
    pub fn entry(&self) -> &Entry {
        match self {
            Upsert::Inserted(entry) | Upsert::Refreshed(entry) => entry,
        }
    }

    pub fn into_entry(self) -> Entry {
        match self {
            Upsert::Inserted(entry) | Upsert::Refreshed(entry) => entry,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Upsert::Inserted(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub refreshed: usize,
    pub pruned: usize,
}

pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

const ENTRY_COLUMNS: &str = "
    id,
    content,
    content_hash,
    timestamp,
    source,
    char_count,
    word_count,
    pinned
";

const RECENCY_ORDER: &str = "ORDER BY timestamp DESC, id DESC";

impl Database {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    pub fn new(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    fn initialize(conn: &Connection) -> Result<(), DbError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        ensure_history_schema(conn)?;

        conn.execute_batch(schema::CREATE_SETTINGS_TABLE)?;
        conn.execute_batch(schema::CREATE_INDEX_TIMESTAMP)?;
        conn.execute_batch(schema::CREATE_INDEX_PINNED)?;

        conn.execute(
            "INSERT OR IGNORE INTO clipstack_settings (id, history_limit) VALUES (1, ?1)",
            params![DEFAULT_HISTORY_LIMIT],
        )?;

        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn history_limit(&self) -> Result<i64, DbError> {
        let conn = self.conn()?;
        history_limit_in(&conn).map_err(DbError::from)
    }

    pub fn set_history_limit(&self, history_limit: i64) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE clipstack_settings SET history_limit = ?1 WHERE id = 1",
            params![history_limit.max(1)],
        )?;
        Ok(())
    }

    /// Inserts `new` or refreshes the entry that already holds the same content.
    pub fn upsert_entry(&self, new: NewEntry<'_>) -> Result<Upsert, DbError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = upsert_in(&tx, &new)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Upserts `new` and prunes to the stored history limit in one
    /// transaction. Neither step is committed unless both succeed.
    pub fn upsert_and_prune(&self, new: NewEntry<'_>) -> Result<(Upsert, Vec<Entry>), DbError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = upsert_in(&tx, &new)?;
        let history_limit = history_limit_in(&tx)?;
        let pruned = prune_in(&tx, history_limit)?;
        tx.commit()?;
        Ok((outcome, pruned))
    }

    /// Applies every entry in order inside one transaction, pruning after each.
    pub fn upsert_batch(
        &self,
        entries: &[NewEntry<'_>],
        history_limit: i64,
    ) -> Result<BatchOutcome, DbError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut outcome = BatchOutcome::default();

        for new in entries {
            match upsert_in(&tx, new)? {
                Upsert::Inserted(_) => outcome.inserted += 1,
                Upsert::Refreshed(_) => outcome.refreshed += 1,
            }
            outcome.pruned += prune_in(&tx, history_limit)?.len();
        }

        tx.commit()?;
        Ok(outcome)
    }

    pub fn entry_at(&self, position: i64) -> Result<Option<Entry>, DbError> {
        if position < 1 {
            return Ok(None);
        }
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM {HISTORY_TABLE} {RECENCY_ORDER} LIMIT 1 OFFSET ?1"
            ),
            params![position - 1],
            entry_from_row,
        )
        .optional()
        .map_err(DbError::from)
    }

    pub fn list_entries(&self, limit: i64) -> Result<Vec<Entry>, DbError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        self.query_recent(limit)
    }

    pub fn all_entries(&self) -> Result<Vec<Entry>, DbError> {
        self.query_recent(-1)
    }

    fn query_recent(&self, limit: i64) -> Result<Vec<Entry>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM {HISTORY_TABLE} {RECENCY_ORDER} LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], entry_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Walks entries newest first and keeps those accepted by `matches`,
    /// stopping once `limit` have been collected.
    pub fn find_entries<F>(&self, limit: i64, mut matches: F) -> Result<Vec<Entry>, DbError>
    where
        F: FnMut(&str) -> bool,
    {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        let limit = limit as usize;
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM {HISTORY_TABLE} {RECENCY_ORDER}"
        ))?;
        let rows = stmt.query_map([], entry_from_row)?;

        let mut found = Vec::new();
        for row in rows {
            let entry = row?;
            if matches(&entry.content) {
                found.push(entry);
                if found.len() >= limit {
                    break;
                }
            }
        }
        Ok(found)
    }

    pub fn set_pinned_at(&self, position: i64, pinned: bool) -> Result<Option<Entry>, DbError> {
        if position < 1 {
            return Ok(None);
        }
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "
                UPDATE {HISTORY_TABLE}
                SET pinned = ?1
                WHERE id = (SELECT id FROM {HISTORY_TABLE} {RECENCY_ORDER} LIMIT 1 OFFSET ?2)
                RETURNING {ENTRY_COLUMNS}
                "
            ),
            params![pinned, position - 1],
            entry_from_row,
        )
        .optional()
        .map_err(DbError::from)
    }

    pub fn delete_at(&self, position: i64) -> Result<Option<Entry>, DbError> {
        if position < 1 {
            return Ok(None);
        }
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "
                DELETE FROM {HISTORY_TABLE}
                WHERE id = (SELECT id FROM {HISTORY_TABLE} {RECENCY_ORDER} LIMIT 1 OFFSET ?1)
                RETURNING {ENTRY_COLUMNS}
                "
            ),
            params![position - 1],
            entry_from_row,
        )
        .optional()
        .map_err(DbError::from)
    }

    pub fn clear(&self, keep_pinned: bool) -> Result<usize, DbError> {
        let conn = self.conn()?;
        let deleted = if keep_pinned {
            conn.execute(&format!("DELETE FROM {HISTORY_TABLE} WHERE pinned = 0"), [])?
        } else {
            conn.execute(&format!("DELETE FROM {HISTORY_TABLE}"), [])?
        };
        Ok(deleted)
    }

    pub fn prune_excess(&self, history_limit: i64) -> Result<Vec<Entry>, DbError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let pruned = prune_in(&tx, history_limit)?;
        tx.commit()?;
        Ok(pruned)
    }

    pub fn count_entries(&self) -> Result<i64, DbError> {
        let conn = self.conn()?;
        conn.query_row(&format!("SELECT COUNT(*) FROM {HISTORY_TABLE}"), [], |row| {
            row.get(0)
        })
        .map_err(DbError::from)
    }

    pub fn stats(&self) -> Result<Stats, DbError> {
        let conn = self.conn()?;
        let mut stats = conn.query_row(
            &format!(
                "
                SELECT
                    COUNT(*),
                    COALESCE(SUM(pinned), 0),
                    COALESCE(SUM(char_count), 0),
                    COALESCE(SUM(word_count), 0),
                    MIN(timestamp),
                    MAX(timestamp)
                FROM {HISTORY_TABLE}
                "
            ),
            [],
            |row| {
                Ok(Stats {
                    total_entries: row.get(0)?,
                    pinned_entries: row.get(1)?,
                    total_characters: row.get(2)?,
                    total_words: row.get(3)?,
                    oldest_entry: row.get(4)?,
                    newest_entry: row.get(5)?,
                    database_size_bytes: 0,
                    database_path: String::new(),
                })
            },
        )?;

        if let Some(path) = self.path.as_deref() {
            stats.database_size_bytes = store_size_on_disk(path);
            stats.database_path = path.to_string_lossy().to_string();
        } else {
            stats.database_path = ":memory:".to_string();
        }
        Ok(stats)
    }
}

fn upsert_in(conn: &Connection, new: &NewEntry<'_>) -> Result<Upsert, rusqlite::Error> {
    let hash = sha256_hex(new.content);
    let timestamp = next_timestamp(Utc::now(), newest_timestamp_in(conn)?.as_deref());

    let existing: Option<i64> = conn
        .query_row(
            &format!("SELECT id FROM {HISTORY_TABLE} WHERE content_hash = ?1"),
            params![hash],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        match new.on_refresh {
            SourceOnRefresh::Replace => conn.execute(
                &format!("UPDATE {HISTORY_TABLE} SET timestamp = ?1, source = ?2 WHERE id = ?3"),
                params![timestamp, new.source, id],
            )?,
            SourceOnRefresh::Keep => conn.execute(
                &format!("UPDATE {HISTORY_TABLE} SET timestamp = ?1 WHERE id = ?2"),
                params![timestamp, id],
            )?,
        };
        debug!(id, "refreshed duplicate entry");
        return entry_by_id_in(conn, id).map(Upsert::Refreshed);
    }

    conn.execute(
        &format!(
            "
            INSERT INTO {HISTORY_TABLE} (
                content,
                content_hash,
                timestamp,
                source,
                char_count,
                word_count,
                pinned
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "
        ),
        params![
            new.content,
            hash,
            timestamp,
            new.source,
            char_count(new.content),
            word_count(new.content),
            new.pinned,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, source = %new.source, "inserted entry");
    entry_by_id_in(conn, id).map(Upsert::Inserted)
}

/// Removes the oldest unpinned entries beyond `history_limit`. Pinned entries
/// do not count toward the limit.
fn prune_in(conn: &Connection, history_limit: i64) -> Result<Vec<Entry>, rusqlite::Error> {
    let history_limit = history_limit.max(1);
    let mut stmt = conn.prepare(&format!(
        "
        DELETE FROM {HISTORY_TABLE}
        WHERE id IN (
            SELECT id FROM {HISTORY_TABLE}
            WHERE pinned = 0
            {RECENCY_ORDER}
            LIMIT -1 OFFSET ?1
        )
        RETURNING {ENTRY_COLUMNS}
        "
    ))?;
    let rows = stmt.query_map(params![history_limit], entry_from_row)?;
    rows.collect()
}

fn history_limit_in(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        "SELECT history_limit FROM clipstack_settings WHERE id = 1",
        [],
        |row| row.get(0),
    )
}

fn newest_timestamp_in(conn: &Connection) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT MAX(timestamp) FROM {HISTORY_TABLE}"),
        [],
        |row| row.get(0),
    )
}

fn entry_by_id_in(conn: &Connection, id: i64) -> Result<Entry, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM {HISTORY_TABLE} WHERE id = ?1"),
        params![id],
        entry_from_row,
    )
}

fn entry_from_row(row: &Row<'_>) -> Result<Entry, rusqlite::Error> {
    Ok(Entry {
        id: row.get(0)?,
        content: row.get(1)?,
        content_hash: row.get(2)?,
        timestamp: row.get(3)?,
        source: row.get(4)?,
        char_count: row.get(5)?,
        word_count: row.get(6)?,
        pinned: row.get::<_, i64>(7)? == 1,
    })
}

fn store_size_on_disk(path: &Path) -> u64 {
    let mut wal = path.as_os_str().to_owned();
    wal.push("-wal");
    [path.to_path_buf(), PathBuf::from(wal)]
        .iter()
        .filter_map(|file| fs::metadata(file).ok())
        .map(|meta| meta.len())
        .sum()
}

fn ensure_history_schema(conn: &Connection) -> Result<(), DbError> {
    let table_sql: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![HISTORY_TABLE],
            |row| row.get(0),
        )
        .optional()?;

    match table_sql {
        None => {
            conn.execute_batch(&schema::create_history_table(HISTORY_TABLE))?;
            Ok(())
        }
        Some(sql) if history_schema_is_current(&sql) => Ok(()),
        Some(_) => migrate_legacy_history(conn),
    }
}

fn history_schema_is_current(table_sql: &str) -> bool {
    table_sql.contains("UNIQUE") && table_sql.contains("'import'")
}

struct LegacyRow {
    id: i64,
    content: String,
    timestamp: String,
    source: Option<String>,
    pinned: Option<i64>,
}

/// Rebuilds a table written by the first ClipStack release: hashes were not
/// stable across runs, duplicates were allowed and timestamps were naive.
fn migrate_legacy_history(conn: &Connection) -> Result<(), DbError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch("DROP TABLE IF EXISTS clipboard_history_v2;")?;
    tx.execute_batch(&schema::create_history_table("clipboard_history_v2"))?;

    let legacy = {
        let mut stmt = tx.prepare(&format!(
            "SELECT id, content, timestamp, source, pinned FROM {HISTORY_TABLE} {RECENCY_ORDER}"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(LegacyRow {
                id: row.get(0)?,
                content: row.get(1)?,
                timestamp: row.get(2)?,
                source: row.get(3)?,
                pinned: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let fallback_timestamp = next_timestamp(Utc::now(), None);
    for row in &legacy {
        if is_blank(&row.content) {
            continue;
        }
        let source = row
            .source
            .as_deref()
            .and_then(|value| value.parse::<Source>().ok())
            .unwrap_or(Source::Clipboard);
        let timestamp =
            normalize_timestamp(&row.timestamp).unwrap_or_else(|| fallback_timestamp.clone());
        tx.execute(
            "
            INSERT INTO clipboard_history_v2 (
                id,
                content,
                content_hash,
                timestamp,
                source,
                char_count,
                word_count,
                pinned
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(content_hash) DO UPDATE SET pinned = MAX(pinned, excluded.pinned)
            ",
            params![
                row.id,
                row.content,
                sha256_hex(&row.content),
                timestamp,
                source,
                char_count(&row.content),
                word_count(&row.content),
                row.pinned.unwrap_or(0).clamp(0, 1),
            ],
        )?;
    }
    let kept: i64 =
        tx.query_row("SELECT COUNT(*) FROM clipboard_history_v2", [], |row| row.get(0))?;

    tx.execute_batch(&format!(
        "DROP TABLE {HISTORY_TABLE}; ALTER TABLE clipboard_history_v2 RENAME TO {HISTORY_TABLE};"
    ))?;
    tx.commit()?;
    info!(rows = legacy.len(), kept, "migrated legacy clipboard history");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;

    use rusqlite::Connection;
    use uuid::Uuid;

    use super::*;

    fn manual(content: &str) -> NewEntry<'_> {
        NewEntry {
            content,
            source: Source::Manual,
            pinned: false,
            on_refresh: SourceOnRefresh::Replace,
        }
    }

    fn temp_db_path(tag: &str) -> PathBuf {
        env::temp_dir().join(format!("clipstack-{tag}-{}.sqlite3", Uuid::new_v4()))
    }

    #[test]
    fn upsert_and_prune_applies_stored_limit() {
        let db = Database::new_in_memory().expect("db init");
        db.set_history_limit(2).expect("limit");
        for content in ["one", "two"] {
            let (_, pruned) = db.upsert_and_prune(manual(content)).expect("upsert");
            assert!(pruned.is_empty());
        }

        let (outcome, pruned) = db.upsert_and_prune(manual("three")).expect("upsert");
        assert!(outcome.is_inserted());
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].content, "one");
        assert_eq!(db.count_entries().expect("count"), 2);
    }

    #[test]
    fn failed_prune_rolls_back_the_upsert() {
        let db = Database::new_in_memory().expect("db init");
        db.set_history_limit(1).expect("limit");
        db.upsert_and_prune(manual("a")).expect("first");
        db.conn()
            .expect("conn")
            .execute_batch(&format!(
                "CREATE TRIGGER refuse_delete BEFORE DELETE ON {HISTORY_TABLE}
                 BEGIN SELECT RAISE(ABORT, 'delete refused'); END;"
            ))
            .expect("trigger");

        assert!(db.upsert_and_prune(manual("b")).is_err());
        assert_eq!(db.count_entries().expect("count"), 1);
        let newest = db.entry_at(1).expect("entry").expect("present");
        assert_eq!(newest.content, "a");
    }

    #[test]
    fn upsert_inserts_then_refreshes() {
        let db = Database::new_in_memory().expect("db init");
        let first = db.upsert_entry(manual("alpha")).expect("insert");
        assert!(first.is_inserted());

        let again = db
            .upsert_entry(NewEntry {
                source: Source::Clipboard,
                ..manual("alpha")
            })
            .expect("refresh");
        assert!(!again.is_inserted());
        assert_eq!(again.entry().id, first.entry().id);
        assert_eq!(again.entry().source, Source::Clipboard);
        assert!(again.entry().timestamp > first.entry().timestamp);
        assert_eq!(db.count_entries().expect("count"), 1);
    }

    #[test]
    fn keep_policy_preserves_source_on_refresh() {
        let db = Database::new_in_memory().expect("db init");
        db.upsert_entry(manual("alpha")).expect("insert");
        let refreshed = db
            .upsert_entry(NewEntry {
                source: Source::Import,
                on_refresh: SourceOnRefresh::Keep,
                ..manual("alpha")
            })
            .expect("refresh");
        assert_eq!(refreshed.entry().source, Source::Manual);
    }

    #[test]
    fn derives_counts_and_hash() {
        let db = Database::new_in_memory().expect("db init");
        let entry = db
            .upsert_entry(manual("hello  brave\nworld"))
            .expect("insert")
            .into_entry();
        assert_eq!(entry.char_count, 18);
        assert_eq!(entry.word_count, 3);
        assert_eq!(entry.content_hash, sha256_hex("hello  brave\nworld"));
        assert!(!entry.pinned);
    }

    #[test]
    fn positions_follow_recency() {
        let db = Database::new_in_memory().expect("db init");
        db.upsert_entry(manual("first")).expect("first");
        db.upsert_entry(manual("second")).expect("second");

        assert_eq!(db.entry_at(1).expect("pos 1").map(|e| e.content).as_deref(), Some("second"));
        assert_eq!(db.entry_at(2).expect("pos 2").map(|e| e.content).as_deref(), Some("first"));
        assert!(db.entry_at(3).expect("pos 3").is_none());
        assert!(db.entry_at(0).expect("pos 0").is_none());
        assert!(db.entry_at(-4).expect("negative").is_none());
    }

    #[test]
    fn pin_and_delete_by_position() {
        let db = Database::new_in_memory().expect("db init");
        db.upsert_entry(manual("old")).expect("old");
        db.upsert_entry(manual("new")).expect("new");

        let pinned = db.set_pinned_at(2, true).expect("pin").expect("entry");
        assert_eq!(pinned.content, "old");
        assert!(pinned.pinned);
        assert!(db.set_pinned_at(9, true).expect("pin missing").is_none());

        let deleted = db.delete_at(2).expect("delete").expect("entry");
        assert_eq!(deleted.content, "old");
        assert_eq!(db.count_entries().expect("count"), 1);
    }

    #[test]
    fn prune_keeps_pinned_and_newest() {
        let db = Database::new_in_memory().expect("db init");
        db.upsert_entry(manual("pinned")).expect("pinned");
        db.set_pinned_at(1, true).expect("pin");
        db.upsert_entry(manual("a")).expect("a");
        db.upsert_entry(manual("b")).expect("b");
        db.upsert_entry(manual("c")).expect("c");

        let pruned = db.prune_excess(2).expect("prune");
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].content, "a");

        let contents: Vec<String> = db
            .all_entries()
            .expect("list")
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert_eq!(contents, vec!["c", "b", "pinned"]);
    }

    #[test]
    fn list_limit_zero_is_empty() {
        let db = Database::new_in_memory().expect("db init");
        db.upsert_entry(manual("x")).expect("x");
        assert!(db.list_entries(0).expect("zero").is_empty());
        assert!(db.list_entries(-1).expect("negative").is_empty());
        assert_eq!(db.list_entries(5).expect("five").len(), 1);
    }

    #[test]
    fn batch_prunes_after_each_insert() {
        let db = Database::new_in_memory().expect("db init");
        let contents: Vec<String> = (0..5).map(|i| format!("item {i}")).collect();
        let batch: Vec<NewEntry<'_>> = contents.iter().map(|c| manual(c)).collect();

        let outcome = db.upsert_batch(&batch, 3).expect("batch");
        assert_eq!(outcome.inserted, 5);
        assert_eq!(outcome.pruned, 2);
        assert_eq!(db.count_entries().expect("count"), 3);
    }

    #[test]
    fn settings_default_and_update() {
        let db = Database::new_in_memory().expect("db init");
        assert_eq!(db.history_limit().expect("limit"), DEFAULT_HISTORY_LIMIT);
        db.set_history_limit(0).expect("set");
        assert_eq!(db.history_limit().expect("limit"), 1);
    }

    #[test]
    fn stats_on_disk_store() {
        let path = temp_db_path("stats");
        let db = Database::new(&path).expect("open");
        db.upsert_entry(manual("one two")).expect("insert");
        db.set_pinned_at(1, true).expect("pin");

        let stats = db.stats().expect("stats");
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.pinned_entries, 1);
        assert_eq!(stats.total_characters, 7);
        assert_eq!(stats.total_words, 2);
        assert_eq!(stats.oldest_entry, stats.newest_entry);
        assert!(stats.database_size_bytes > 0);
        assert_eq!(stats.database_path, path.to_string_lossy());

        drop(db);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn migrates_legacy_schema() {
        let path = temp_db_path("migrate");
        let conn = Connection::open(&path).expect("open old db");
        conn.execute_batch(
            r#"
            CREATE TABLE clipboard_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                source TEXT DEFAULT 'clipboard',
                char_count INTEGER,
                word_count INTEGER,
                pinned INTEGER DEFAULT 0
            );
            CREATE INDEX idx_timestamp ON clipboard_history(timestamp DESC);
            CREATE INDEX idx_content_hash ON clipboard_history(content_hash);
            CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT);
            INSERT INTO clipboard_history (content, content_hash, timestamp, source, char_count, word_count, pinned)
            VALUES ('dup', '-11', '2026-01-20T10:00:00.000000', 'manual', 3, 1, 1);
            INSERT INTO clipboard_history (content, content_hash, timestamp, source, char_count, word_count, pinned)
            VALUES ('watched', '42', '2026-01-21T10:00:00.000000', 'watch', 7, 1, 0);
            INSERT INTO clipboard_history (content, content_hash, timestamp, source, char_count, word_count, pinned)
            VALUES ('dup', '-12', '2026-01-22T10:00:00.000000', 'clipboard', 3, 1, 0);
            "#,
        )
        .expect("seed old schema");
        drop(conn);

        let db = Database::new(&path).expect("open migrated db");
        let entries = db.all_entries().expect("entries");
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].content, "dup");
        assert_eq!(entries[0].id, 3);
        assert_eq!(entries[0].content_hash, sha256_hex("dup"));
        assert!(entries[0].pinned);
        assert!(entries[0].timestamp.ends_with('Z'));

        assert_eq!(entries[1].content, "watched");
        assert_eq!(entries[1].source, Source::Clipboard);

        let again = db.upsert_entry(manual("watched")).expect("dedup after migration");
        assert!(!again.is_inserted());

        drop(db);
        let _ = fs::remove_file(&path);
    }
}

pub const HISTORY_TABLE: &str = "clipboard_history";

pub fn create_history_table(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  content TEXT NOT NULL CHECK (length(content) > 0),
  content_hash TEXT NOT NULL UNIQUE,
  timestamp TEXT NOT NULL,
  source TEXT NOT NULL DEFAULT 'clipboard' CHECK (source IN ('clipboard', 'manual', 'import')),
  char_count INTEGER NOT NULL,
  word_count INTEGER NOT NULL,
  pinned INTEGER NOT NULL DEFAULT 0 CHECK (pinned IN (0, 1))
);
"#
    )
}

pub const CREATE_SETTINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS clipstack_settings (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  history_limit INTEGER NOT NULL DEFAULT 100 CHECK (history_limit > 0)
);
"#;

pub const CREATE_INDEX_TIMESTAMP: &str =
    "CREATE INDEX IF NOT EXISTS idx_timestamp ON clipboard_history(timestamp DESC, id DESC);";
pub const CREATE_INDEX_PINNED: &str =
    "CREATE INDEX IF NOT EXISTS idx_pinned ON clipboard_history(pinned);";

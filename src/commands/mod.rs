//! Command-line front end. Formatting only; every decision about history
//! lives in [`HistoryStore`].

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::clipboard::{self, ClipboardService};
use crate::config::Config;
use crate::db::{Entry, Source};
use crate::error::{AppError, AppResult};
use crate::services::capture::{capture_once, restore_entry, WatchSession};
use crate::services::history::{HistoryStore, DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT};
use crate::services::transfer::ExportFormat;
use crate::utils::text::preview;
use crate::utils::time::parse_timestamp;

const PREVIEW_CHARS: usize = 80;
const RULE: &str = "----------------------------------------------------------------------";

#[derive(Debug, Parser)]
#[command(name = "clipstack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clipboard history manager for power users")]
pub struct Cli {
    /// Use this history database instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Log store activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List recent clipboard entries
    #[command(visible_alias = "ls")]
    List {
        /// Number of entries to show
        #[arg(short = 'n', long = "last", default_value_t = DEFAULT_LIST_LIMIT)]
        last: i64,
    },
    /// Show one entry (1 = most recent)
    #[command(visible_alias = "g")]
    Get {
        #[arg(default_value_t = 1)]
        position: i64,
        /// Print the content only
        #[arg(short, long)]
        quiet: bool,
    },
    /// Copy an entry back to the system clipboard
    #[command(visible_alias = "c")]
    Copy {
        #[arg(default_value_t = 1)]
        position: i64,
    },
    /// Search history with a case-insensitive regex
    #[command(visible_aliases = ["s", "find"])]
    Search {
        query: String,
        #[arg(short = 'n', long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: i64,
    },
    /// Add text to the history by hand
    #[command(visible_alias = "a")]
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Capture the current clipboard content
    #[command(visible_alias = "cap")]
    Capture,
    /// Capture clipboard changes until interrupted
    Watch,
    /// Protect an entry from pruning and clear
    Pin { position: i64 },
    /// Remove the pin from an entry
    Unpin { position: i64 },
    /// Delete an entry, pinned or not
    #[command(visible_aliases = ["del", "rm"])]
    Delete { position: i64 },
    /// Clear the history (pinned entries are kept unless --all)
    Clear {
        /// Required to actually delete anything
        #[arg(short, long)]
        force: bool,
        /// Also delete pinned entries
        #[arg(long)]
        all: bool,
    },
    /// Show history statistics
    Stats,
    /// Export the history
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// json or txt
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,
    },
    /// Import a JSON export
    Import { file: PathBuf },
}

/// Runs one command and returns the process exit code.
pub fn execute(cli: Cli, mut config: Config) -> AppResult<i32> {
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }
    let store = HistoryStore::open(&config.resolve_db_path()?, config.history_limit())?;
    let command = cli.command.unwrap_or(Commands::List {
        last: DEFAULT_LIST_LIMIT,
    });

    match command {
        Commands::List { last } => cmd_list(&store, last),
        Commands::Get { position, quiet } => cmd_get(&store, position, quiet),
        Commands::Copy { position } => {
            let clipboard = clipboard::default_service();
            if restore_entry(&store, clipboard.as_ref(), position)? {
                let content = store.get(position)?.unwrap_or_default();
                println!("[OK] Entry #{position} copied to clipboard");
                println!("[CONTENT] {}", preview(&content, 50));
                Ok(0)
            } else {
                println!("[ERROR] Failed to copy entry #{position}");
                Ok(1)
            }
        }
        Commands::Search { query, limit } => cmd_search(&store, &query, limit),
        Commands::Add { text } => {
            let content = text.join(" ");
            let id = store.add(&content, Source::Manual)?;
            println!("[OK] Added entry (ID: {id})");
            println!("[CONTENT] {}", preview(&content, 60));
            Ok(0)
        }
        Commands::Capture => {
            let clipboard = clipboard::default_service();
            match capture_once(&store, clipboard.as_ref())? {
                Some(entry) => {
                    println!("[OK] Captured clipboard content");
                    println!("[CONTENT] {}", preview(&entry.content, 60));
                    Ok(0)
                }
                None => {
                    println!("[INFO] Clipboard is empty or unavailable");
                    Ok(1)
                }
            }
        }
        Commands::Watch => {
            let clipboard = clipboard::service_with_timeout(config.watch_read_timeout());
            cmd_watch(store, clipboard, &config)
        }
        Commands::Pin { position } => {
            report_position(store.pin(position)?, &format!("Pinned entry #{position}"), position)
        }
        Commands::Unpin { position } => report_position(
            store.unpin(position)?,
            &format!("Unpinned entry #{position}"),
            position,
        ),
        Commands::Delete { position } => report_position(
            store.delete(position)?,
            &format!("Deleted entry #{position}"),
            position,
        ),
        Commands::Clear { force, all } => {
            if !force {
                println!("[WARNING] This will delete clipboard history!");
                println!("Use --force to confirm, add --all to include pinned entries");
                return Ok(1);
            }
            let removed = store.clear(!all)?;
            if all {
                println!("[OK] Cleared {removed} entries");
            } else {
                println!("[OK] Cleared {removed} unpinned entries (pinned entries preserved)");
            }
            Ok(0)
        }
        Commands::Stats => cmd_stats(&store),
        Commands::Export { output, format } => {
            let data = store.export(format)?;
            match output {
                Some(path) => {
                    fs::write(&path, data).map_err(|err| {
                        AppError::Internal(format!("failed to write {}: {err}", path.display()))
                    })?;
                    println!("[OK] Exported to {}", path.display());
                }
                None => println!("{data}"),
            }
            Ok(0)
        }
        Commands::Import { file } => {
            let data = fs::read_to_string(&file).map_err(|err| {
                AppError::ImportFormat(format!("failed to read {}: {err}", file.display()))
            })?;
            let count = store.import(&data, ExportFormat::Json)?;
            println!("[OK] Imported {count} entries from {}", file.display());
            Ok(0)
        }
    }
}

fn cmd_list(store: &HistoryStore, last: i64) -> AppResult<i32> {
    let entries = store.list(last)?;
    if entries.is_empty() {
        println!("[INFO] No clipboard entries found.");
        println!("[TIP] Use 'clipstack capture' or 'clipstack watch' to record the clipboard");
        return Ok(0);
    }

    println!("[CLIPBOARD HISTORY] Showing {} most recent entries", entries.len());
    println!("{RULE}");
    for (index, entry) in entries.iter().enumerate() {
        println!("{}", list_row(index + 1, entry));
    }
    println!("{RULE}");
    Ok(0)
}

fn cmd_get(store: &HistoryStore, position: i64, quiet: bool) -> AppResult<i32> {
    let Some(entry) = store.get_entry(position)? else {
        println!("[ERROR] No entry at position {position}");
        return Ok(1);
    };

    if quiet {
        println!("{}", entry.content);
        return Ok(0);
    }

    println!("[ENTRY #{position}]");
    println!("Timestamp: {}", display_time(&entry.timestamp));
    println!("Source: {}", entry.source);
    println!("Characters: {}", entry.char_count);
    println!("Words: {}", entry.word_count);
    println!("Pinned: {}", if entry.pinned { "Yes" } else { "No" });
    println!("{}", &RULE[..40]);
    println!("{}", entry.content);
    println!("{}", &RULE[..40]);
    Ok(0)
}

fn cmd_search(store: &HistoryStore, query: &str, limit: i64) -> AppResult<i32> {
    let results = match store.search(query, limit) {
        Err(AppError::Query(err)) => {
            warn!("invalid pattern, searching literally: {err}");
            store.search(&regex::escape(query), limit)?
        }
        other => other?,
    };

    if results.is_empty() {
        println!("[INFO] No entries found matching '{query}'");
        return Ok(0);
    }

    println!("[SEARCH RESULTS] Found {} matches for '{query}'", results.len());
    println!("{RULE}");
    for (index, entry) in results.iter().enumerate() {
        println!("{}", list_row(index + 1, entry));
    }
    println!("{RULE}");
    Ok(0)
}

fn cmd_stats(store: &HistoryStore) -> AppResult<i32> {
    let stats = store.stats()?;
    println!("[CLIPSTACK STATISTICS]");
    println!("{}", &RULE[..40]);
    println!("  Total entries:    {}", stats.total_entries);
    println!("  Pinned entries:   {}", stats.pinned_entries);
    println!("  History limit:    {}", store.history_limit()?);
    println!("  Total characters: {}", stats.total_characters);
    println!("  Total words:      {}", stats.total_words);
    if let Some(oldest) = &stats.oldest_entry {
        println!("  Oldest entry:     {}", display_time(oldest));
    }
    if let Some(newest) = &stats.newest_entry {
        println!("  Newest entry:     {}", display_time(newest));
    }
    println!("  Database size:    {:.1} KB", stats.database_size_bytes as f64 / 1024.0);
    println!("  Database path:    {}", stats.database_path);
    println!("{}", &RULE[..40]);
    Ok(0)
}

fn cmd_watch(
    store: HistoryStore,
    clipboard: Arc<dyn ClipboardService>,
    config: &Config,
) -> AppResult<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Internal(format!("failed to start runtime: {err}")))?;

    let (mut session, cancel) = WatchSession::new(config.poll_interval());
    println!("[CLIPSTACK WATCH MODE]");
    println!("Monitoring clipboard for changes... Press Ctrl+C to stop");
    println!("{}", &RULE[..40]);

    let summary = runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        tokio::task::spawn_blocking(move || {
            session.run(&store, clipboard.as_ref(), |entry| {
                let at = Local::now().format("%H:%M:%S");
                println!("[{at}] Captured: {}", preview(&entry.content, 50));
            })
        })
        .await
        .map_err(|err| AppError::Internal(format!("watch task failed: {err}")))
    })?;

    println!();
    println!("[INFO] Stopped watching ({} captured)", summary.captured);
    Ok(0)
}

fn report_position(found: bool, success: &str, position: i64) -> AppResult<i32> {
    if found {
        println!("[OK] {success}");
        Ok(0)
    } else {
        println!("[ERROR] Entry #{position} not found");
        Ok(1)
    }
}

fn list_row(rank: usize, entry: &Entry) -> String {
    let pin = if entry.pinned { " [*]" } else { "    " };
    format!(
        "  {rank:3}{pin}  {:16}  ({:5} chars)  {}",
        display_time(&entry.timestamp),
        entry.char_count,
        preview(&entry.content, PREVIEW_CHARS)
    )
}

fn display_time(timestamp: &str) -> String {
    parse_timestamp(timestamp)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

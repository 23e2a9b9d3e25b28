use tracing::info;

use crate::db::{Database, Entry};
use crate::error::AppResult;

pub fn run_prune(db: &Database, history_limit: i64) -> AppResult<Vec<Entry>> {
    let pruned = db.prune_excess(history_limit)?;
    report_pruned(&pruned);
    Ok(pruned)
}

pub fn report_pruned(pruned: &[Entry]) {
    if let Some(newest_removed) = pruned.first() {
        info!(
            count = pruned.len(),
            newest_removed = newest_removed.id,
            "pruned oldest unpinned entries"
        );
    }
}

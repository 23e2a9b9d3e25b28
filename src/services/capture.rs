use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::clipboard::ClipboardService;
use crate::db::{Entry, Source};
use crate::error::AppResult;
use crate::services::history::HistoryStore;
use crate::utils::hash::sha256_hex;
use crate::utils::text::is_blank;

/// Reads the clipboard once and records it. `Ok(None)` when there was
/// nothing to capture.
pub fn capture_once(
    store: &HistoryStore,
    clipboard: &dyn ClipboardService,
) -> AppResult<Option<Entry>> {
    match read_clipboard(clipboard) {
        Some(content) => store.record(&content, Source::Clipboard).map(Some),
        None => Ok(None),
    }
}

/// Puts the entry at `position` back on the system clipboard.
pub fn restore_entry(
    store: &HistoryStore,
    clipboard: &dyn ClipboardService,
    position: i64,
) -> AppResult<bool> {
    let Some(content) = store.get(position)? else {
        return Ok(false);
    };
    match clipboard.write_text(&content) {
        Ok(()) => Ok(true),
        Err(err) => {
            warn!(backend = clipboard.name(), "failed to write clipboard: {err}");
            Ok(false)
        }
    }
}

fn read_clipboard(clipboard: &dyn ClipboardService) -> Option<String> {
    match clipboard.read_text() {
        Ok(Some(content)) if !is_blank(&content) => Some(content),
        Ok(_) => None,
        Err(err) => {
            debug!(backend = clipboard.name(), "clipboard unavailable: {err}");
            None
        }
    }
}

/// Stops a running [`WatchSession`]. Dropping every handle stops it too.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Sender<()>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub polls: u64,
    pub captured: u64,
}

/// State of one continuous watch. Change detection compares against the last
/// content this session captured, not against the store.
pub struct WatchSession {
    interval: Duration,
    last_hash: Option<String>,
    cancel_rx: Receiver<()>,
}

impl WatchSession {
    pub fn new(interval: Duration) -> (Self, CancelHandle) {
        let (tx, cancel_rx) = mpsc::channel();
        let session = Self {
            interval,
            last_hash: None,
            cancel_rx,
        };
        (session, CancelHandle { tx })
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    /// One poll: capture the clipboard if it changed since the last capture.
    pub fn poll(
        &mut self,
        store: &HistoryStore,
        clipboard: &dyn ClipboardService,
    ) -> AppResult<Option<Entry>> {
        let Some(content) = read_clipboard(clipboard) else {
            return Ok(None);
        };

        let hash = sha256_hex(&content);
        if self.last_hash.as_deref() == Some(hash.as_str()) {
            return Ok(None);
        }

        let entry = store.record(&content, Source::Clipboard)?;
        self.last_hash = Some(hash);
        Ok(Some(entry))
    }

    /// Polls until cancelled. Blocks the calling thread; cancellation is
    /// noticed within one interval. Store failures are logged and the
    /// content is retried on the next poll.
    pub fn run<F>(
        &mut self,
        store: &HistoryStore,
        clipboard: &dyn ClipboardService,
        mut on_capture: F,
    ) -> WatchSummary
    where
        F: FnMut(&Entry),
    {
        let mut summary = WatchSummary::default();
        info!(interval_ms = self.interval.as_millis() as u64, "watching clipboard");

        loop {
            summary.polls += 1;
            match self.poll(store, clipboard) {
                Ok(Some(entry)) => {
                    summary.captured += 1;
                    on_capture(&entry);
                }
                Ok(None) => {}
                Err(err) => error!("clipboard capture failed: {err}"),
            }

            match self.cancel_rx.recv_timeout(self.interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        info!(polls = summary.polls, captured = summary.captured, "stopped watching");
        summary
    }
}

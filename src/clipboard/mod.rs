use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

pub mod command;
pub mod native;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("native clipboard failed: {0}")]
    Native(String),
    #[error("no clipboard backend available")]
    Unavailable,
}

/// Read/write access to the live system clipboard. Text only.
pub trait ClipboardService: Send + Sync {
    fn name(&self) -> &'static str;
    /// `Ok(None)` means the clipboard holds no text.
    fn read_text(&self) -> Result<Option<String>, ClipboardError>;
    fn write_text(&self, content: &str) -> Result<(), ClipboardError>;
}

/// Tries each backend in order until one answers.
pub struct FallbackClipboard {
    backends: Vec<Arc<dyn ClipboardService>>,
}

impl FallbackClipboard {
    pub fn new(backends: Vec<Arc<dyn ClipboardService>>) -> Self {
        Self { backends }
    }
}

impl ClipboardService for FallbackClipboard {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        let mut last_err = ClipboardError::Unavailable;
        for backend in &self.backends {
            match backend.read_text() {
                Ok(text) => return Ok(text),
                Err(err) => {
                    debug!(backend = backend.name(), "clipboard read failed: {err}");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    fn write_text(&self, content: &str) -> Result<(), ClipboardError> {
        let mut last_err = ClipboardError::Unavailable;
        for backend in &self.backends {
            match backend.write_text(content) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    debug!(backend = backend.name(), "clipboard write failed: {err}");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}

pub(crate) fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub fn default_service() -> Arc<dyn ClipboardService> {
    service_with_timeout(command::COMMAND_TIMEOUT)
}

/// Platform chain whose command tools are killed after `timeout`.
pub fn service_with_timeout(timeout: Duration) -> Arc<dyn ClipboardService> {
    Arc::new(platform_chain(timeout))
}

fn platform_chain(timeout: Duration) -> FallbackClipboard {
    let native: Arc<dyn ClipboardService> = Arc::new(native::NativeClipboard);
    let command: Arc<dyn ClipboardService> =
        Arc::new(command::CommandClipboard::for_platform().with_timeout(timeout));

    // X11 selections vanish when their owner exits; xclip/xsel fork a holder.
    let backends = if cfg!(any(target_os = "macos", target_os = "windows")) {
        vec![native, command]
    } else {
        vec![command, native]
    };
    FallbackClipboard::new(backends)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Scripted {
        read: Mutex<Option<Result<Option<String>, ClipboardError>>>,
        writes: Mutex<Vec<String>>,
        fail_writes: bool,
    }

    impl Scripted {
        fn reading(result: Result<Option<String>, ClipboardError>) -> Arc<Self> {
            Arc::new(Self {
                read: Mutex::new(Some(result)),
                writes: Mutex::new(Vec::new()),
                fail_writes: false,
            })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                read: Mutex::new(Some(Err(ClipboardError::Command("boom".to_string())))),
                writes: Mutex::new(Vec::new()),
                fail_writes: true,
            })
        }
    }

    impl ClipboardService for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn read_text(&self) -> Result<Option<String>, ClipboardError> {
            self.read
                .lock()
                .expect("lock")
                .take()
                .unwrap_or(Err(ClipboardError::Unavailable))
        }

        fn write_text(&self, content: &str) -> Result<(), ClipboardError> {
            if self.fail_writes {
                return Err(ClipboardError::Command("write refused".to_string()));
            }
            self.writes.lock().expect("lock").push(content.to_string());
            Ok(())
        }
    }

    fn chain(backends: Vec<Arc<Scripted>>) -> FallbackClipboard {
        FallbackClipboard::new(
            backends
                .into_iter()
                .map(|backend| backend as Arc<dyn ClipboardService>)
                .collect(),
        )
    }

    #[test]
    fn platform_chain_order() {
        let chain = platform_chain(Duration::from_secs(1));
        let names: Vec<&str> = chain.backends.iter().map(|b| b.name()).collect();
        if cfg!(any(target_os = "macos", target_os = "windows")) {
            assert_eq!(names, ["arboard", "command"]);
        } else {
            assert_eq!(names, ["command", "arboard"]);
        }
    }

    #[test]
    fn falls_through_failing_backend_on_read() {
        let good = Scripted::reading(Ok(Some("copied".to_string())));
        let chain = chain(vec![Scripted::broken(), good]);
        assert_eq!(chain.read_text().expect("read").as_deref(), Some("copied"));
    }

    #[test]
    fn empty_clipboard_stops_the_chain() {
        let empty = Scripted::reading(Ok(None));
        let never = Scripted::reading(Ok(Some("unreached".to_string())));
        let chain = chain(vec![empty, never]);
        assert!(chain.read_text().expect("read").is_none());
    }

    #[test]
    fn write_uses_first_working_backend() {
        let good = Scripted::reading(Ok(None));
        let chain = chain(vec![Scripted::broken(), good.clone()]);
        chain.write_text("hello").expect("write");
        assert_eq!(good.writes.lock().expect("lock").as_slice(), ["hello".to_string()]);
    }

    #[test]
    fn reports_error_when_every_backend_fails() {
        let chain = chain(vec![Scripted::broken()]);
        assert!(chain.read_text().is_err());
        assert!(matches!(
            FallbackClipboard::new(Vec::new()).write_text("x"),
            Err(ClipboardError::Unavailable)
        ));
    }
}

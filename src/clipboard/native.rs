use super::{non_empty, ClipboardError, ClipboardService};

/// `arboard` backend. A handle is opened per call so the service stays
/// `Send + Sync` on every platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeClipboard;

impl NativeClipboard {
    fn open() -> Result<arboard::Clipboard, ClipboardError> {
        arboard::Clipboard::new().map_err(to_native)
    }
}

impl ClipboardService for NativeClipboard {
    fn name(&self) -> &'static str {
        "arboard"
    }

    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        match Self::open()?.get_text() {
            Ok(text) => Ok(non_empty(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(err) => Err(to_native(err)),
        }
    }

    fn write_text(&self, content: &str) -> Result<(), ClipboardError> {
        Self::open()?
            .set_text(content.to_string())
            .map_err(to_native)
    }
}

fn to_native(err: arboard::Error) -> ClipboardError {
    ClipboardError::Native(err.to_string())
}

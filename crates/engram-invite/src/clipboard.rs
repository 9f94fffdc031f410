//! Clipboard seam
//!
//! Copy actions write through this trait so the engines never touch a
//! platform clipboard directly.

use crate::error::ClipboardError;
use parking_lot::Mutex;

/// Destination of copy actions
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents with `text`
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Process-local clipboard
///
/// Keeps the last written text; used headless and in tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    /// Create an empty clipboard
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last written text
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

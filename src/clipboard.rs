//! Clipboard access for the copy action, copy-on-failure and the
//! `copy-text` utility effect.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arboard::Clipboard;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::ResultExt;

/// Somewhere copied text can go.
pub trait ClipboardSink: Send + Sync {
    fn copy_text(&self, text: &str) -> Result<()>;

    /// Copy markup with a plain-text alternative. Sinks without markup
    /// support copy the text.
    fn copy_html(&self, _html: &str, alt_text: &str) -> Result<()> {
        self.copy_text(alt_text)
    }
}

/// The system clipboard via arboard.
///
/// A fresh handle is opened per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn copy_text(&self, text: &str) -> Result<()> {
        let mut clipboard = Clipboard::new().context("Failed to access clipboard")?;
        clipboard
            .set_text(text)
            .context("Failed to set clipboard text")?;
        debug!(text_len = text.len(), "Copied text to clipboard");
        Ok(())
    }

    /// Falls back to the plain-text alternative when markup is refused.
    fn copy_html(&self, html: &str, alt_text: &str) -> Result<()> {
        let mut clipboard = Clipboard::new().context("Failed to access clipboard")?;
        let copied_html = clipboard
            .set_html(html, Some(alt_text))
            .context("Failed to set clipboard html")
            .log_err();
        if copied_html.is_some() {
            debug!(html_len = html.len(), "Copied markup to clipboard");
            return Ok(());
        }
        clipboard
            .set_text(alt_text)
            .context("Failed to set clipboard text")?;
        debug!(text_len = alt_text.len(), "Copied plain text in place of markup");
        Ok(())
    }
}

/// Clipboard kept in memory; clones share contents.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<String>>>,
    unavailable: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard that refuses every write
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl ClipboardSink for MemoryClipboard {
    fn copy_text(&self, text: &str) -> Result<()> {
        if self.unavailable {
            bail!("clipboard unavailable");
        }
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clipboard_shares_contents_between_clones() {
        let clipboard = MemoryClipboard::new();
        let sink: Box<dyn ClipboardSink> = Box::new(clipboard.clone());
        sink.copy_text("hello").unwrap();
        assert_eq!(clipboard.contents().as_deref(), Some("hello"));

        sink.copy_html("<b>hi</b>", "hi").unwrap();
        assert_eq!(clipboard.contents().as_deref(), Some("hi"));
    }

    #[test]
    fn unavailable_clipboard_errors() {
        let clipboard = MemoryClipboard::unavailable();
        assert!(clipboard.copy_text("x").is_err());
        assert!(clipboard.contents().is_none());
    }

    #[cfg(feature = "system-tests")]
    #[test]
    #[ignore]
    fn system_clipboard_round_trip() {
        SystemClipboard.copy_text("command-palette test").unwrap();
        let mut clipboard = Clipboard::new().unwrap();
        assert_eq!(clipboard.get_text().unwrap(), "command-palette test");
    }
}

//! Lifecycle notifications for subscribers.

use serde::Serialize;

/// How free text was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmitVia {
    /// Enter with no active item
    Custom,
    /// Cmd/Ctrl+Enter, regardless of the active item
    ModifierEnter,
}

impl SubmitVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitVia::Custom => "custom",
            SubmitVia::ModifierEnter => "modifier-enter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PaletteEvent {
    #[serde(rename_all = "camelCase")]
    Opened { palette_id: String },
    #[serde(rename_all = "camelCase")]
    Closed { palette_id: String },
    /// `query` is trimmed, `raw` is exactly what was typed
    #[serde(rename_all = "camelCase")]
    SubmittedFreeText {
        query: String,
        raw: String,
        via: SubmitVia,
    },
}

impl PaletteEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PaletteEvent::Opened { .. } => "opened",
            PaletteEvent::Closed { .. } => "closed",
            PaletteEvent::SubmittedFreeText { .. } => "submitted-free-text",
        }
    }
}

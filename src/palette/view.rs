//! Render snapshot handed to the render callback after every transition.

use super::state::{PreviewPhase, Status};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewItem {
    pub title: String,
    pub description: String,
    pub group: String,
    pub tags: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewView {
    pub title: String,
    pub text: String,
    pub phase: PreviewPhase,
    pub scroll_top: usize,
    pub primary_enabled: bool,
    pub secondary_enabled: bool,
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaletteView {
    pub open: bool,
    pub query: String,
    pub placeholder: String,
    /// Query field accepts edits
    pub query_enabled: bool,
    /// List accepts navigation
    pub list_enabled: bool,
    pub items: Vec<ViewItem>,
    /// Shown instead of the list when nothing matches
    pub empty_message: Option<String>,
    pub status: Option<Status>,
    pub preview: Option<PreviewView>,
}

impl PaletteView {
    pub fn active_item(&self) -> Option<&ViewItem> {
        self.items.iter().find(|item| item.active)
    }

    pub fn titles(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.title.as_str()).collect()
    }
}

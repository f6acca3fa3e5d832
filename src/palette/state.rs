//! Palette state and its invariants.
//!
//! `active_index` is always `None` or a valid index into `filtered`; every
//! mutation below preserves that.

/// Whether the palette is visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Closed,
    Open,
}

/// Preview sub-panel state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreviewPhase {
    #[default]
    Hidden,
    /// A response is arriving; list and query are locked
    Streaming,
    /// Content frozen, insert and copy available
    Ready,
}

/// Status banner variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusVariant {
    #[default]
    Info,
    Success,
    Warning,
    Danger,
}

impl StatusVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusVariant::Info => "info",
            StatusVariant::Success => "success",
            StatusVariant::Warning => "warning",
            StatusVariant::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub message: String,
    pub variant: StatusVariant,
    /// Show a spinner
    pub loading: bool,
}

impl Status {
    pub fn new(message: impl Into<String>, variant: StatusVariant) -> Self {
        Self {
            message: message.into(),
            variant,
            loading: false,
        }
    }

    pub fn loading(message: impl Into<String>) -> Self {
        Self {
            loading: true,
            ..Self::new(message, StatusVariant::Info)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaletteState {
    pub phase: Phase,
    pub query: String,
    /// Indices into the catalog index, in display order
    pub filtered: Vec<usize>,
    pub active_index: Option<usize>,
    pub preview_phase: PreviewPhase,
    pub status: Option<Status>,
}

impl PaletteState {
    pub fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }

    pub fn is_streaming(&self) -> bool {
        self.preview_phase == PreviewPhase::Streaming
    }

    /// `-1` when nothing is active
    pub fn active_index_i32(&self) -> i32 {
        self.active_index.map(|i| i as i32).unwrap_or(-1)
    }

    /// Catalog index of the active entry
    pub fn active_entry(&self) -> Option<usize> {
        self.active_index.and_then(|i| self.filtered.get(i).copied())
    }

    /// Replace the filtered set, selecting the first result if any.
    pub fn set_filtered(&mut self, filtered: Vec<usize>) {
        self.active_index = if filtered.is_empty() { None } else { Some(0) };
        self.filtered = filtered;
    }

    /// Move by `delta` with wraparound. No-op on an empty set.
    pub fn move_active(&mut self, delta: isize) {
        let len = self.filtered.len() as isize;
        if len == 0 {
            self.active_index = None;
            return;
        }
        let current = match self.active_index {
            Some(i) => i as isize,
            // Nothing active: down lands on the first item, up on the last
            None if delta > 0 => -1,
            None => len,
        };
        self.active_index = Some((current + delta).rem_euclid(len) as usize);
    }

    /// Point at `index`, clamped into range (mouse hover / click).
    pub fn set_active_clamped(&mut self, index: usize) {
        self.active_index = if self.filtered.is_empty() {
            None
        } else {
            Some(index.min(self.filtered.len() - 1))
        };
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = Some(status);
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }
}

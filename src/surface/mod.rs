//! Target surfaces and insertion
//!
//! A target surface is the editable destination that receives inserted
//! content. Two kinds exist:
//!
//! - [`PlainField`] - a value + selection-range field (single or multi-line)
//! - [`RichRegion`] - a rich editable region that may re-serialize markup
//!
//! The palette never owns a surface. It keeps a [`TargetSurfaceRef`] (a weak
//! back-reference plus the enclosing context id) and re-validates it right
//! before every insertion.
//!
//! - `markup` - markdown rendering and markup -> text reduction
//! - `strategies` - ordered rich-region insertion strategies
//! - `arbitrator` - [`insert`] entry point
//! - `memory` - in-memory surfaces for tests and the CLI harness

mod arbitrator;
pub mod markup;
mod memory;
mod strategies;

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use arbitrator::{insert, insert_with, InsertOptions, InsertResult};
pub use memory::{CommandBehavior, MemoryPlainField, MemoryRichRegion, PasteBehavior, RegionEvent};
pub use strategies::{default_strategies, InsertionStrategy};

// ============================================
// INSERT MODE
// ============================================

/// Where inserted content lands relative to the current selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InsertMode {
    /// Replace the current selection (or insert at the caret)
    #[default]
    Caret,
    Append,
    Prepend,
    /// Replace the whole content
    Replace,
}

impl InsertMode {
    /// Unknown or missing modes become `Caret`.
    pub fn normalize(mode: &str) -> Self {
        match mode.trim().to_ascii_lowercase().as_str() {
            "append" => InsertMode::Append,
            "prepend" => InsertMode::Prepend,
            "replace" => InsertMode::Replace,
            _ => InsertMode::Caret,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InsertMode::Caret => "caret",
            InsertMode::Append => "append",
            InsertMode::Prepend => "prepend",
            InsertMode::Replace => "replace",
        }
    }
}

impl std::fmt::Display for InsertMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InsertMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for InsertMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(InsertMode::normalize).unwrap_or_default())
    }
}

// ============================================
// PAYLOAD
// ============================================

/// Content on its way into a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub content: String,
    /// `content` is markup rather than plain text
    pub as_html: bool,
}

impl Payload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            as_html: false,
        }
    }

    pub fn markup(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            as_html: true,
        }
    }

    /// Text representation; markup is reduced to its text content.
    pub fn plain_text(&self) -> String {
        if self.as_html {
            markup::html_to_text(&self.content)
        } else {
            self.content.clone()
        }
    }

    /// Markup representation; plain text is escaped with line breaks kept.
    pub fn markup_text(&self) -> String {
        if self.as_html {
            self.content.clone()
        } else {
            markup::text_to_html(&self.content)
        }
    }

    pub fn input_type(&self) -> &'static str {
        if self.as_html {
            "insertHTML"
        } else {
            "insertText"
        }
    }
}

// ============================================
// SURFACE TRAITS
// ============================================

/// A value + selection-range text field.
///
/// Offsets are in characters.
pub trait PlainField: Send {
    fn is_attached(&self) -> bool;
    /// Identifier of the enclosing context the field currently lives in
    fn context_id(&self) -> Option<String> {
        None
    }
    fn value(&self) -> String;
    /// `(start, end)` of the selection, `None` when the field has none
    fn selection(&self) -> Option<(usize, usize)>;
    fn set_value(&mut self, value: String);
    fn set_selection(&mut self, start: usize, end: usize);
    /// Notify listeners that the value changed
    fn dispatch_input(&mut self);
    fn focus(&mut self);
}

/// Caret placement requested before a rich-region insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretPlacement {
    Start,
    End,
    SelectAll,
}

impl CaretPlacement {
    /// `Caret` mode leaves the selection where the user put it.
    pub fn for_mode(mode: InsertMode) -> Option<Self> {
        match mode {
            InsertMode::Caret => None,
            InsertMode::Append => Some(CaretPlacement::End),
            InsertMode::Prepend => Some(CaretPlacement::Start),
            InsertMode::Replace => Some(CaretPlacement::SelectAll),
        }
    }
}

/// A rich editable region.
///
/// The mutating hooks mirror what a host editor exposes: a synthetic paste, an
/// editing command, and a raw fragment splice. Any of them may fail or report
/// success without changing anything, so callers verify via
/// [`RichRegion::html`] / [`RichRegion::text`].
pub trait RichRegion: Send {
    fn is_attached(&self) -> bool;
    fn context_id(&self) -> Option<String> {
        None
    }
    /// Serialized markup of the whole region
    fn html(&self) -> String;
    /// Text content of the whole region
    fn text(&self) -> String;
    fn focus(&mut self);
    fn place_caret(&mut self, placement: CaretPlacement) -> anyhow::Result<()>;
    /// Pre-insertion intent notification (cancelable in hosts that care)
    fn dispatch_before_input(&mut self, input_type: &str, data: &str) -> anyhow::Result<()>;
    /// Post-insertion change notification
    fn dispatch_input(&mut self, data: &str) -> anyhow::Result<()>;
    /// Dispatch a synthetic paste carrying both representations
    fn dispatch_paste(&mut self, html: &str, text: &str) -> anyhow::Result<()>;
    /// Run the host's insert-text / insert-markup editing command.
    /// `Ok(false)` means the command is unsupported or was refused.
    fn exec_insert(&mut self, payload: &Payload) -> anyhow::Result<bool>;
    /// Splice a fragment at the caret and place the caret after it
    fn insert_fragment(&mut self, payload: &Payload) -> anyhow::Result<()>;
}

/// Shared handle to a live surface, owned by the host.
#[derive(Clone)]
pub enum SurfaceHandle {
    Plain(Arc<Mutex<dyn PlainField>>),
    Rich(Arc<Mutex<dyn RichRegion>>),
}

impl SurfaceHandle {
    pub fn plain(field: impl PlainField + 'static) -> Self {
        SurfaceHandle::Plain(Arc::new(Mutex::new(field)))
    }

    pub fn rich(region: impl RichRegion + 'static) -> Self {
        SurfaceHandle::Rich(Arc::new(Mutex::new(region)))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SurfaceHandle::Plain(_) => "plain",
            SurfaceHandle::Rich(_) => "rich",
        }
    }

    pub fn is_attached(&self) -> bool {
        match self {
            SurfaceHandle::Plain(field) => field.lock().is_attached(),
            SurfaceHandle::Rich(region) => region.lock().is_attached(),
        }
    }

    pub fn context_id(&self) -> Option<String> {
        match self {
            SurfaceHandle::Plain(field) => field.lock().context_id(),
            SurfaceHandle::Rich(region) => region.lock().context_id(),
        }
    }

    /// Current text content, for diagnostics and the CLI
    pub fn text(&self) -> String {
        match self {
            SurfaceHandle::Plain(field) => field.lock().value(),
            SurfaceHandle::Rich(region) => region.lock().text(),
        }
    }

    fn downgrade(&self) -> WeakSurface {
        match self {
            SurfaceHandle::Plain(field) => WeakSurface::Plain(Arc::downgrade(field)),
            SurfaceHandle::Rich(region) => WeakSurface::Rich(Arc::downgrade(region)),
        }
    }
}

impl std::fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SurfaceHandle").field(&self.kind()).finish()
    }
}

#[derive(Clone)]
enum WeakSurface {
    Plain(Weak<Mutex<dyn PlainField>>),
    Rich(Weak<Mutex<dyn RichRegion>>),
}

/// Back-reference to the last focused editable surface.
///
/// Holds no ownership: the surface may be dropped or detached by the host at
/// any time, and [`resolve`](Self::resolve) reports that.
#[derive(Clone)]
pub struct TargetSurfaceRef {
    surface: WeakSurface,
    context_id: Option<String>,
}

impl TargetSurfaceRef {
    /// Capture a surface together with the context it currently lives in.
    pub fn capture(handle: &SurfaceHandle) -> Self {
        Self {
            surface: handle.downgrade(),
            context_id: handle.context_id(),
        }
    }

    pub fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    /// The surface, if it still exists, is attached, and hasn't moved to a
    /// different context since capture.
    pub fn resolve(&self) -> Option<SurfaceHandle> {
        let handle = match &self.surface {
            WeakSurface::Plain(weak) => SurfaceHandle::Plain(weak.upgrade()?),
            WeakSurface::Rich(weak) => SurfaceHandle::Rich(weak.upgrade()?),
        };
        if !handle.is_attached() {
            return None;
        }
        if self.context_id.is_some() && handle.context_id() != self.context_id {
            return None;
        }
        Some(handle)
    }

    pub fn is_live(&self) -> bool {
        self.resolve().is_some()
    }

    /// Same underlying surface as `handle`
    pub fn points_to(&self, handle: &SurfaceHandle) -> bool {
        match (&self.surface, handle) {
            (WeakSurface::Plain(weak), SurfaceHandle::Plain(arc)) => {
                std::ptr::addr_eq(weak.as_ptr(), Arc::as_ptr(arc))
            }
            (WeakSurface::Rich(weak), SurfaceHandle::Rich(arc)) => {
                std::ptr::addr_eq(weak.as_ptr(), Arc::as_ptr(arc))
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for TargetSurfaceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.surface {
            WeakSurface::Plain(_) => "plain",
            WeakSurface::Rich(_) => "rich",
        };
        f.debug_struct("TargetSurfaceRef")
            .field("kind", &kind)
            .field("context_id", &self.context_id)
            .finish()
    }
}

//! In-memory surfaces.
//!
//! Used by the CLI harness and by tests that need a surface with a specific
//! (mis)behavior: a region that ignores pastes, an editing command that lies
//! about success, a field that gets detached mid-session.

use anyhow::bail;

use super::{markup, CaretPlacement, Payload, PlainField, RichRegion};

// ============================================
// PLAIN FIELD
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPlainField {
    value: String,
    selection: Option<(usize, usize)>,
    attached: bool,
    context_id: Option<String>,
    input_events: usize,
    focused: bool,
}

impl MemoryPlainField {
    /// A field holding `value` with the caret at its end.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let end = value.chars().count();
        Self {
            value,
            selection: Some((end, end)),
            attached: true,
            context_id: None,
            input_events: 0,
            focused: false,
        }
    }

    pub fn with_selection(mut self, start: usize, end: usize) -> Self {
        self.selection = Some((start, end));
        self
    }

    pub fn without_selection(mut self) -> Self {
        self.selection = None;
        self
    }

    pub fn with_context_id(mut self, id: impl Into<String>) -> Self {
        self.context_id = Some(id.into());
        self
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn input_events(&self) -> usize {
        self.input_events
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }
}

impl PlainField for MemoryPlainField {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn context_id(&self) -> Option<String> {
        self.context_id.clone()
    }

    fn value(&self) -> String {
        self.value.clone()
    }

    fn selection(&self) -> Option<(usize, usize)> {
        self.selection
    }

    fn set_value(&mut self, value: String) {
        self.value = value;
    }

    fn set_selection(&mut self, start: usize, end: usize) {
        self.selection = Some((start, end));
    }

    fn dispatch_input(&mut self) {
        self.input_events += 1;
    }

    fn focus(&mut self) {
        self.focused = true;
    }
}

// ============================================
// RICH REGION
// ============================================

/// How a [`MemoryRichRegion`] reacts to a synthetic paste.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PasteBehavior {
    #[default]
    Accept,
    /// Event dispatched, nothing changes
    Ignore,
    Fail,
}

/// How a [`MemoryRichRegion`] reacts to the editing command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandBehavior {
    #[default]
    Accept,
    Unsupported,
    /// Reports success, changes nothing
    NoOp,
    Fail,
}

/// Everything observable that happened to a [`MemoryRichRegion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionEvent {
    Focus,
    Caret(CaretPlacement),
    BeforeInput { input_type: String },
    Input,
    Paste,
    Command,
    Fragment,
}

/// Rich region backed by a markup string and a byte-offset selection.
#[derive(Debug, Clone)]
pub struct MemoryRichRegion {
    html: String,
    selection: (usize, usize),
    attached: bool,
    context_id: Option<String>,
    paste: PasteBehavior,
    command: CommandBehavior,
    fragment_fails: bool,
    events: Vec<RegionEvent>,
}

impl MemoryRichRegion {
    pub fn new(html: impl Into<String>) -> Self {
        let html = html.into();
        let end = html.len();
        Self {
            html,
            selection: (end, end),
            attached: true,
            context_id: None,
            paste: PasteBehavior::default(),
            command: CommandBehavior::default(),
            fragment_fails: false,
            events: Vec::new(),
        }
    }

    pub fn with_paste(mut self, behavior: PasteBehavior) -> Self {
        self.paste = behavior;
        self
    }

    pub fn with_command(mut self, behavior: CommandBehavior) -> Self {
        self.command = behavior;
        self
    }

    pub fn with_failing_fragment(mut self) -> Self {
        self.fragment_fails = true;
        self
    }

    pub fn with_context_id(mut self, id: impl Into<String>) -> Self {
        self.context_id = Some(id.into());
        self
    }

    pub fn set_context_id(&mut self, id: impl Into<String>) {
        self.context_id = Some(id.into());
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn events(&self) -> &[RegionEvent] {
        &self.events
    }

    fn splice(&mut self, markup: &str) {
        let (start, end) = self.selection;
        self.html.replace_range(start..end, markup);
        let caret = start + markup.len();
        self.selection = (caret, caret);
    }
}

impl RichRegion for MemoryRichRegion {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn context_id(&self) -> Option<String> {
        self.context_id.clone()
    }

    fn html(&self) -> String {
        self.html.clone()
    }

    fn text(&self) -> String {
        markup::html_to_text(&self.html)
    }

    fn focus(&mut self) {
        self.events.push(RegionEvent::Focus);
    }

    fn place_caret(&mut self, placement: CaretPlacement) -> anyhow::Result<()> {
        if !self.attached {
            bail!("region is detached");
        }
        let end = self.html.len();
        self.selection = match placement {
            CaretPlacement::Start => (0, 0),
            CaretPlacement::End => (end, end),
            CaretPlacement::SelectAll => (0, end),
        };
        self.events.push(RegionEvent::Caret(placement));
        Ok(())
    }

    fn dispatch_before_input(&mut self, input_type: &str, _data: &str) -> anyhow::Result<()> {
        self.events.push(RegionEvent::BeforeInput {
            input_type: input_type.to_string(),
        });
        Ok(())
    }

    fn dispatch_input(&mut self, _data: &str) -> anyhow::Result<()> {
        self.events.push(RegionEvent::Input);
        Ok(())
    }

    fn dispatch_paste(&mut self, html: &str, _text: &str) -> anyhow::Result<()> {
        self.events.push(RegionEvent::Paste);
        match self.paste {
            PasteBehavior::Accept => self.splice(html),
            PasteBehavior::Ignore => {}
            PasteBehavior::Fail => bail!("paste event rejected"),
        }
        Ok(())
    }

    fn exec_insert(&mut self, payload: &Payload) -> anyhow::Result<bool> {
        self.events.push(RegionEvent::Command);
        match self.command {
            CommandBehavior::Accept => {
                self.splice(&payload.markup_text());
                Ok(true)
            }
            CommandBehavior::Unsupported => Ok(false),
            CommandBehavior::NoOp => Ok(true),
            CommandBehavior::Fail => bail!("editing command threw"),
        }
    }

    fn insert_fragment(&mut self, payload: &Payload) -> anyhow::Result<()> {
        self.events.push(RegionEvent::Fragment);
        if self.fragment_fails {
            bail!("fragment splice failed");
        }
        self.splice(&payload.markup_text());
        Ok(())
    }
}

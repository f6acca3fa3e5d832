//! The palette state machine.
//!
//! ```text
//! Closed -> Open -> Open+Previewing{Streaming|Ready} -> Closed
//! ```
//!
//! One [`Palette`] per mount point. All state is mutated on the owning
//! thread; remote calls run on worker threads and report back over a channel
//! that [`Palette::pump`] drains. Each remote call gets a session id and
//! messages tagged with any other id are dropped, so a superseded call can
//! never write into the current preview.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender};
use tracing::{debug, info, instrument, trace, warn};

use super::effects::{EffectContext, EffectRegistry};
use super::events::{PaletteEvent, SubmitVia};
use super::keys::{KeyInput, KeyOrigin, Shortcut};
use super::preview::Preview;
use super::state::{Phase, PreviewPhase, PaletteState, Status, StatusVariant};
use super::view::{PaletteView, PreviewView, ViewItem};
use crate::catalog::{bind_json, CatalogIndex, Command, CommandAction, Group, RemoteCallSpec};
use crate::clipboard::{ClipboardSink, SystemClipboard};
use crate::config::Config;
use crate::error::{PaletteError, ResultExt};
use crate::ingest::{StreamEvent, StreamFailure, StreamIngestor, StreamSummary};
use crate::logging;
use crate::remote::{
    self, build_request_body, buffered_text, render_template, template_vars, RemoteClient,
    RemoteRequest, RequestContext, UreqClient,
};
use crate::surface::markup;
use crate::surface::{
    default_strategies, insert_with, InsertOptions, InsertResult, InsertionStrategy, SurfaceHandle,
    TargetSurfaceRef,
};

const STATUS_OPEN: &str = "Type to search commands or press Enter to run.";
const STATUS_NO_COMMANDS: &str = "No commands available.";
const STATUS_GENERATING: &str = "Generating response…";
const STATUS_READY: &str = "Response ready.";
const STATUS_PARTIAL: &str = "Response ended early; showing what arrived.";
const STATUS_EMPTY_RESPONSE: &str = "No response received; showing fallback response.";
const STATUS_SNIPPET_READY: &str = "Snippet ready to insert.";
const STATUS_INSERTED: &str = "Inserted.";
const STATUS_INSERT_COPIED: &str = "Couldn't insert here; copied to clipboard instead.";
const STATUS_COPIED: &str = "Copied to clipboard.";

/// How often [`Palette::wait_for_response`] drains the channel
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Reports the editable surface that currently has focus, if any.
pub trait FocusResolver: Send {
    fn focused_surface(&self) -> Option<SurfaceHandle>;
}

impl<F> FocusResolver for F
where
    F: Fn() -> Option<SurfaceHandle> + Send,
{
    fn focused_surface(&self) -> Option<SurfaceHandle> {
        self()
    }
}

/// Supplies structured context for outgoing remote calls.
pub trait ContextProvider: Send {
    fn request_context(&self) -> RequestContext;
}

impl<F> ContextProvider for F
where
    F: Fn() -> RequestContext + Send,
{
    fn request_context(&self) -> RequestContext {
        self()
    }
}

/// What a worker thread reports for its session.
#[derive(Debug)]
enum RemoteUpdate {
    Stream(StreamEvent),
    /// Nothing was received
    RequestFailed { message: String, timed_out: bool },
}

#[derive(Debug)]
struct SessionMessage {
    session: u64,
    update: RemoteUpdate,
}

/// The one in-flight remote call.
#[derive(Debug)]
struct ActiveSession {
    id: u64,
    endpoint: String,
    fallback_text: String,
    timeout: Duration,
    deadline: Instant,
    cancelled: Arc<AtomicBool>,
}

impl ActiveSession {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

type RenderFn = Box<dyn FnMut(&PaletteView) + Send>;

pub struct Palette {
    id: String,
    config: Config,
    shortcut: Option<Shortcut>,

    groups: Vec<Group>,
    catalog: Arc<CatalogIndex>,
    /// Index snapshot taken when the palette opened
    snapshot: Arc<CatalogIndex>,

    state: PaletteState,
    last_query: String,
    preview: Preview,

    target: Option<TargetSurfaceRef>,
    last_editable: Option<TargetSurfaceRef>,

    focus: Box<dyn FocusResolver>,
    context: Box<dyn ContextProvider>,
    remote: Arc<dyn RemoteClient>,
    ingestor: StreamIngestor,
    clipboard: Arc<dyn ClipboardSink>,
    effects: EffectRegistry,
    strategies: Vec<Box<dyn InsertionStrategy>>,

    next_session: u64,
    active_session: Option<ActiveSession>,
    updates_tx: Sender<SessionMessage>,
    updates_rx: Receiver<SessionMessage>,

    subscribers: Vec<Sender<PaletteEvent>>,
    render: Option<RenderFn>,
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palette")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("commands", &self.catalog.len())
            .field("session", &self.active_session.as_ref().map(|s| s.id))
            .finish_non_exhaustive()
    }
}

impl Palette {
    pub fn new(config: Config) -> Self {
        let shortcut = config
            .get_hotkey()
            .and_then(|hotkey| hotkey.to_shortcut().warn_on_err());
        let (updates_tx, updates_rx) = async_channel::unbounded();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            shortcut,
            groups: Vec::new(),
            catalog: Arc::new(CatalogIndex::default()),
            snapshot: Arc::new(CatalogIndex::default()),
            state: PaletteState::default(),
            last_query: String::new(),
            preview: Preview::default(),
            target: None,
            last_editable: None,
            focus: Box::new(|| -> Option<SurfaceHandle> { None }),
            context: Box::new(RequestContext::default),
            remote: Arc::new(UreqClient),
            ingestor: StreamIngestor::new(),
            clipboard: Arc::new(SystemClipboard),
            effects: EffectRegistry::new(),
            strategies: default_strategies(),
            next_session: 0,
            active_session: None,
            updates_tx,
            updates_rx,
            subscribers: Vec::new(),
            render: None,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteClient>) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_ingestor(mut self, ingestor: StreamIngestor) -> Self {
        self.ingestor = ingestor;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardSink>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_focus_resolver(mut self, focus: impl FocusResolver + 'static) -> Self {
        self.focus = Box::new(focus);
        self
    }

    pub fn with_context_provider(mut self, context: impl ContextProvider + 'static) -> Self {
        self.context = Box::new(context);
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<Box<dyn InsertionStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_render(mut self, render: impl FnMut(&PaletteView) + Send + 'static) -> Self {
        self.render = Some(Box::new(render));
        self
    }

    pub fn with_effect<F>(mut self, id: impl Into<String>, effect: F) -> Self
    where
        F: Fn(&serde_json::Value, &EffectContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.effects.register(id, effect);
        self
    }

    // ============================================
    // ACCESSORS
    // ============================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &PaletteState {
        &self.state
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn shortcut(&self) -> Option<&Shortcut> {
        self.shortcut.as_ref()
    }

    pub fn target(&self) -> Option<&TargetSurfaceRef> {
        self.target.as_ref()
    }

    /// Commands currently listed, in display order
    pub fn visible_commands(&self) -> Vec<&Command> {
        self.state
            .filtered
            .iter()
            .filter_map(|&idx| self.snapshot.command(idx))
            .collect()
    }

    /// Receive lifecycle events. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<PaletteEvent> {
        let (tx, rx) = async_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    // ============================================
    // CATALOG
    // ============================================

    /// Replace the catalog. An open palette re-filters against it.
    pub fn set_catalog(&mut self, groups: Vec<Group>) {
        self.catalog = Arc::new(CatalogIndex::build(&groups));
        self.groups = groups;
        info!(
            palette_id = %self.id,
            commands = self.catalog.len(),
            "Catalog replaced"
        );

        if self.state.is_open() {
            self.snapshot = self.catalog.clone();
            self.refilter();
            if self.catalog.is_empty() {
                self.state
                    .set_status(Status::new(STATUS_NO_COMMANDS, StatusVariant::Warning));
            }
            self.render();
        }
    }

    /// Bind and install a JSON catalog; returns the per-item diagnostics.
    pub fn set_catalog_json(&mut self, json: &str) -> anyhow::Result<Vec<PaletteError>> {
        let bound = bind_json(json)?;
        self.set_catalog(bound.groups);
        Ok(bound.skipped)
    }

    // ============================================
    // OPEN / CLOSE
    // ============================================

    /// Open, targeting whatever the focus resolver reports.
    pub fn open(&mut self) {
        let focused = self.focus.focused_surface();
        self.open_with_target(focused);
    }

    /// Open, targeting `focused` (or the last editable if it isn't usable).
    #[instrument(skip_all, fields(palette_id = %self.id))]
    pub fn open_with_target(&mut self, focused: Option<SurfaceHandle>) {
        if self.state.is_open() {
            return;
        }

        self.target = self.capture_target(focused);
        self.snapshot = self.catalog.clone();
        self.state.phase = Phase::Open;
        self.state.query = if self.config.get_restore_last_query() {
            self.last_query.clone()
        } else {
            String::new()
        };
        self.preview.clear();
        self.state.preview_phase = PreviewPhase::Hidden;
        self.refilter();

        let status = if self.snapshot.is_empty() {
            Status::new(STATUS_NO_COMMANDS, StatusVariant::Warning)
        } else {
            Status::new(STATUS_OPEN, StatusVariant::Info)
        };
        self.state.set_status(status);

        logging::log_palette_event(
            &self.id,
            "opened",
            self.target.as_ref().map(|_| "with target"),
        );
        self.emit(PaletteEvent::Opened {
            palette_id: self.id.clone(),
        });
        self.render();
    }

    /// Close, clearing the query.
    pub fn close(&mut self) {
        self.close_inner(true);
    }

    fn close_inner(&mut self, clear_query: bool) {
        if !self.state.is_open() {
            return;
        }

        self.cancel_session();
        self.last_query = self.state.query.clone();
        if clear_query {
            self.state.query.clear();
        }
        self.state.phase = Phase::Closed;
        self.state.set_filtered(Vec::new());
        self.state.preview_phase = PreviewPhase::Hidden;
        self.state.clear_status();
        self.preview.clear();
        self.target = None;

        logging::log_palette_event(&self.id, "closed", None);
        self.emit(PaletteEvent::Closed {
            palette_id: self.id.clone(),
        });
        self.render();
    }

    pub fn toggle(&mut self) {
        if self.state.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    /// Remember `surface` as the last editable that had focus.
    pub fn note_focus(&mut self, surface: &SurfaceHandle) {
        if surface.is_attached() {
            self.last_editable = Some(TargetSurfaceRef::capture(surface));
        }
    }

    fn capture_target(&mut self, focused: Option<SurfaceHandle>) -> Option<TargetSurfaceRef> {
        match focused.filter(SurfaceHandle::is_attached) {
            Some(handle) => {
                let target = TargetSurfaceRef::capture(&handle);
                self.last_editable = Some(target.clone());
                debug!(kind = handle.kind(), "Captured focused surface");
                Some(target)
            }
            None => {
                let fallback = self.last_editable.clone().filter(TargetSurfaceRef::is_live);
                debug!(
                    has_fallback = fallback.is_some(),
                    "No focused editable, using last captured"
                );
                fallback
            }
        }
    }

    // ============================================
    // QUERY AND SELECTION
    // ============================================

    /// Ignored while closed or streaming. Returns whether the query changed.
    pub fn set_query(&mut self, query: &str) -> bool {
        if !self.state.is_open() || self.state.is_streaming() {
            return false;
        }
        self.state.query = query.to_string();
        self.refilter();
        self.render();
        true
    }

    fn refilter(&mut self) {
        let filtered = crate::search::filter(&self.snapshot, &self.state.query);
        trace!(query_len = self.state.query.len(), results = filtered.len(), "Filtered");
        self.state.set_filtered(filtered);
    }

    fn navigable(&self) -> bool {
        self.state.is_open() && !self.state.is_streaming()
    }

    /// Move the active item by `delta`, wrapping.
    pub fn move_selection(&mut self, delta: isize) {
        if !self.navigable() {
            return;
        }
        self.state.move_active(delta);
        self.render();
    }

    pub fn hover(&mut self, position: usize) {
        if !self.navigable() {
            return;
        }
        self.state.set_active_clamped(position);
        self.render();
    }

    pub fn click(&mut self, position: usize) {
        if !self.navigable() {
            return;
        }
        self.state.set_active_clamped(position);
        self.activate();
    }

    /// Handle one key press. Returns true when the palette consumed it.
    pub fn handle_key(&mut self, input: &KeyInput) -> bool {
        let is_shortcut = input.origin == KeyOrigin::Page
            && self
                .shortcut
                .as_ref()
                .is_some_and(|shortcut| shortcut.matches(input));
        if is_shortcut {
            self.toggle();
            return true;
        }

        if !self.state.is_open() {
            return false;
        }

        if input.key == "escape" {
            self.close_inner(!input.composing);
            return true;
        }
        if input.composing {
            return false;
        }

        let navigation = matches!(input.key.as_str(), "down" | "up" | "tab" | "enter");
        if self.state.is_streaming() {
            return navigation;
        }

        match input.key.as_str() {
            "down" => self.move_selection(1),
            "up" => self.move_selection(-1),
            "tab" => self.move_selection(if input.modifiers.shift { -1 } else { 1 }),
            "enter" if input.modifiers.accelerator() => {
                self.submit_free_text(SubmitVia::ModifierEnter)
            }
            "enter" => self.activate(),
            _ => return false,
        }
        true
    }

    // ============================================
    // ACTIVATION
    // ============================================

    /// Run the active item, or submit the query as free text when nothing is
    /// active.
    pub fn activate(&mut self) {
        if !self.navigable() {
            return;
        }
        match self.state.active_entry() {
            Some(entry) => match self.snapshot.command(entry).cloned() {
                Some(command) => self.run_command(&command),
                None => crate::debug_panic!("filtered entry {} outside index", entry),
            },
            None => self.submit_free_text(SubmitVia::Custom),
        }
    }

    /// Run `command`. A remote call supersedes any call still in flight.
    #[instrument(skip_all, fields(palette_id = %self.id, command = %command.title))]
    pub fn run_command(&mut self, command: &Command) {
        logging::log_palette_event(&self.id, "activated", Some(command.action.kind()));

        match &command.action {
            CommandAction::StaticText { body } => {
                self.cancel_session();
                self.preview.begin(command.title.clone());
                self.preview.finish(body.clone(), false);
                self.state.preview_phase = PreviewPhase::Ready;
                self.state
                    .set_status(Status::new(STATUS_SNIPPET_READY, StatusVariant::Success));
                self.render();
            }
            CommandAction::RemoteCall(spec) => self.start_remote(&command.title, spec),
            CommandAction::Utility { effect_id, payload } => {
                let context = EffectContext {
                    palette_id: &self.id,
                    query: &self.state.query,
                    clipboard: self.clipboard.as_ref(),
                };
                match self.effects.run(effect_id, payload, &context) {
                    Ok(()) if command.keep_open => {
                        let message = format!("Ran \"{}\".", command.title);
                        self.state
                            .set_status(Status::new(message, StatusVariant::Success));
                        self.render();
                    }
                    Ok(()) => self.close(),
                    Err(err) => {
                        warn!(effect_id = %effect_id, error = %err, "Effect failed");
                        self.state.set_status(Status::new(
                            format!("\"{}\" failed: {}", command.title, err),
                            StatusVariant::Danger,
                        ));
                        self.render();
                    }
                }
            }
        }
    }

    /// Announce the typed query and, with a quick prompt configured, send it.
    pub fn submit_free_text(&mut self, via: SubmitVia) {
        if !self.navigable() {
            return;
        }
        let raw = self.state.query.clone();
        let query = raw.trim().to_string();
        if query.is_empty() {
            return;
        }

        logging::log_palette_event(&self.id, "submitted", Some(via.as_str()));
        self.emit(PaletteEvent::SubmittedFreeText {
            query,
            raw,
            via,
        });

        if let Some(quick) = self.config.quick_prompt.clone() {
            let spec = RemoteCallSpec {
                endpoint: quick.endpoint,
                prompt_template: quick.prompt_template,
                timeout_ms: None,
                fallback_text: None,
            };
            self.start_remote(&quick.title, &spec);
        }
    }

    // ============================================
    // REMOTE SESSIONS
    // ============================================

    fn start_remote(&mut self, title: &str, spec: &RemoteCallSpec) {
        self.cancel_session();

        let defaults = self.config.get_remote();
        let timeout = Duration::from_millis(spec.timeout_ms.unwrap_or(defaults.timeout_ms));
        let context = self.context.request_context();
        let vars = template_vars(&self.state.query, title, &context);
        let prompt = render_template(&spec.prompt_template, &vars);

        let mut headers: Vec<(String, String)> = defaults.headers.into_iter().collect();
        headers.sort();
        let request = RemoteRequest {
            endpoint: spec.endpoint.clone(),
            body: build_request_body(&prompt, &self.id, title, &context),
            headers,
            timeout,
        };

        self.next_session += 1;
        let session = self.next_session;
        let cancelled = Arc::new(AtomicBool::new(false));
        self.active_session = Some(ActiveSession {
            id: session,
            endpoint: spec.endpoint.clone(),
            fallback_text: spec
                .fallback_text
                .clone()
                .unwrap_or(defaults.fallback_text),
            timeout,
            deadline: Instant::now() + timeout,
            cancelled: cancelled.clone(),
        });

        self.preview.begin(title);
        self.state.preview_phase = PreviewPhase::Streaming;
        self.state.set_status(Status::loading(STATUS_GENERATING));
        logging::log_stream_event(session, "requested", 0, false);
        self.render();

        let remote = self.remote.clone();
        let ingestor = self.ingestor.clone();
        let tx = self.updates_tx.clone();
        std::thread::spawn(move || {
            let send = |update: RemoteUpdate| {
                // Receiver gone means the palette was dropped
                let _ = tx.send_blocking(SessionMessage { session, update });
            };

            let response = match remote.post(&request) {
                Ok(response) => response,
                Err(err) => {
                    send(RemoteUpdate::RequestFailed {
                        message: format!("{:#}", err),
                        timed_out: remote::is_timeout(&err),
                    });
                    return;
                }
            };

            for event in ingestor.events(response.body, response.content_type.as_deref()) {
                if cancelled.load(Ordering::SeqCst) {
                    trace!(session, "Session cancelled, dropping stream");
                    return;
                }
                send(RemoteUpdate::Stream(event));
            }
        });
    }

    fn cancel_session(&mut self) {
        if let Some(session) = self.active_session.take() {
            session.cancel();
            logging::log_stream_event(session.id, "cancelled", self.preview.text().len(), false);
        }
    }

    /// Apply every pending remote update, then enforce the session deadline.
    /// Returns true if anything changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.updates_rx.try_recv() {
            let current = self.active_session.as_ref().map(|s| s.id);
            if current != Some(message.session) {
                trace!(
                    session = message.session,
                    current = ?current,
                    "Dropping update from stale session"
                );
                continue;
            }
            self.apply_update(message.update);
            changed = true;
        }

        let expired = self
            .active_session
            .as_ref()
            .is_some_and(|session| Instant::now() >= session.deadline);
        if expired {
            self.expire_session();
            changed = true;
        }

        if changed {
            self.render();
        }
        changed
    }

    /// Pump until the current response is ready or its deadline passes.
    pub fn wait_for_response(&mut self) -> bool {
        loop {
            self.pump();
            if self.active_session.is_none() {
                return self.state.preview_phase == PreviewPhase::Ready;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn apply_update(&mut self, update: RemoteUpdate) {
        let session_id = self.active_session.as_ref().map(|s| s.id).unwrap_or_default();
        match update {
            RemoteUpdate::Stream(StreamEvent::Started) => {
                logging::log_stream_event(session_id, "started", 0, false);
            }
            RemoteUpdate::Stream(StreamEvent::Chunk(delta)) => {
                self.preview.append(&delta);
            }
            RemoteUpdate::Stream(StreamEvent::Completed(summary)) => {
                logging::log_stream_event(session_id, "completed", summary.text.len(), summary.structured);
                self.complete_session(summary);
            }
            RemoteUpdate::Stream(StreamEvent::Failed(failure)) => {
                logging::log_stream_event(session_id, "failed", failure.partial.len(), false);
                self.fail_session(failure);
            }
            RemoteUpdate::RequestFailed { message, timed_out } => {
                let Some(session) = self.active_session.as_ref() else {
                    return;
                };
                let err = if timed_out {
                    PaletteError::Timeout {
                        endpoint: session.endpoint.clone(),
                        timeout_ms: session.timeout.as_millis() as u64,
                    }
                } else {
                    PaletteError::Remote {
                        endpoint: session.endpoint.clone(),
                        message,
                    }
                };
                warn!(error = %err, "Remote call failed before any output");
                self.finish_with_fallback(Status::new(err.user_message(), err.severity()));
            }
        }
    }

    fn complete_session(&mut self, summary: StreamSummary) {
        if summary.handled {
            self.finish_with_text(summary.text, Status::new(STATUS_READY, StatusVariant::Success));
            return;
        }
        match buffered_text(&summary.raw) {
            Some(text) => {
                self.finish_with_text(text, Status::new(STATUS_READY, StatusVariant::Success))
            }
            None => self.finish_with_fallback(Status::new(STATUS_EMPTY_RESPONSE, StatusVariant::Warning)),
        }
    }

    fn fail_session(&mut self, failure: StreamFailure) {
        if failure.received_any && !failure.partial.trim().is_empty() {
            self.finish_with_text(failure.partial, Status::new(STATUS_PARTIAL, StatusVariant::Success));
            return;
        }
        let err = match self.active_session.as_ref() {
            Some(session) if failure.timed_out => PaletteError::Timeout {
                endpoint: session.endpoint.clone(),
                timeout_ms: session.timeout.as_millis() as u64,
            },
            _ => PaletteError::Stream(failure.message),
        };
        warn!(error = %err, "Response stream failed before any output");
        self.finish_with_fallback(Status::new(err.user_message(), err.severity()));
    }

    /// The deadline passed with the worker still running.
    fn expire_session(&mut self) {
        let Some(session) = self.active_session.as_ref() else {
            return;
        };
        session.cancel();
        let err = PaletteError::Timeout {
            endpoint: session.endpoint.clone(),
            timeout_ms: session.timeout.as_millis() as u64,
        };
        warn!(error = %err, partial_len = self.preview.text().len(), "Aborting remote call");

        let partial = self.preview.text().to_string();
        if partial.trim().is_empty() {
            self.finish_with_fallback(Status::new(err.user_message(), err.severity()));
        } else {
            self.finish_with_text(partial, Status::new(STATUS_PARTIAL, StatusVariant::Success));
        }
    }

    fn finish_with_text(&mut self, text: String, status: Status) {
        self.active_session = None;
        self.preview.finish(text, false);
        self.state.preview_phase = PreviewPhase::Ready;
        self.state.set_status(status);
    }

    fn finish_with_fallback(&mut self, status: Status) {
        let fallback = self
            .active_session
            .take()
            .map(|session| session.fallback_text)
            .unwrap_or_else(|| self.config.get_remote().fallback_text);
        self.preview.finish(fallback, true);
        self.state.preview_phase = PreviewPhase::Ready;
        self.state.set_status(status);
    }

    // ============================================
    // PREVIEW ACTIONS
    // ============================================

    /// Primary action: insert the preview into the captured target.
    ///
    /// `None` when there is nothing ready to insert. A failed insert keeps
    /// the preview and, if configured, copies the text instead.
    #[instrument(skip_all, fields(palette_id = %self.id))]
    pub fn insert_preview(&mut self) -> Option<InsertResult> {
        if self.state.preview_phase != PreviewPhase::Ready || !self.preview.primary_enabled {
            return None;
        }

        let as_html = self.config.get_insert_as_html();
        let content = if as_html {
            self.preview.html()
        } else {
            self.preview.text().to_string()
        };
        let options = InsertOptions {
            mode: self.config.get_insert_mode(),
            as_html,
        };
        let result = insert_with(self.target.as_ref(), &content, options, &self.strategies);

        if result.success {
            if self.config.get_keep_open_after_insert() {
                self.state
                    .set_status(Status::new(STATUS_INSERTED, StatusVariant::Success));
                self.render();
            } else {
                self.close();
            }
            return Some(result);
        }

        let err = PaletteError::Insertion(result.method.to_string());
        warn!(error = %err, "Preview insertion failed");
        let status = if self.config.get_copy_on_insert_failure() {
            match self.copy_content(&content, as_html) {
                Ok(()) => Status::new(STATUS_INSERT_COPIED, StatusVariant::Warning),
                Err(err) => Status::new(err.user_message(), err.severity()),
            }
        } else {
            Status::new(err.user_message(), err.severity())
        };
        self.state.set_status(status);
        self.render();
        Some(result)
    }

    /// Secondary action: copy the preview text. No state change.
    pub fn copy_preview(&mut self) -> bool {
        if self.state.preview_phase != PreviewPhase::Ready || !self.preview.secondary_enabled {
            return false;
        }
        let text = self.preview.text().to_string();
        let copied = match self.copy_content(&text, false) {
            Ok(()) => {
                self.state
                    .set_status(Status::new(STATUS_COPIED, StatusVariant::Success));
                true
            }
            Err(err) => {
                self.state
                    .set_status(Status::new(err.user_message(), err.severity()));
                false
            }
        };
        self.render();
        copied
    }

    fn copy_content(&self, content: &str, as_html: bool) -> Result<(), PaletteError> {
        let result = if as_html {
            self.clipboard
                .copy_html(content, &markup::html_to_text(content))
        } else {
            self.clipboard.copy_text(content)
        };
        result.map_err(|e| {
            warn!(error = %e, "Clipboard copy failed");
            PaletteError::Clipboard(e.to_string())
        })
    }

    /// User scroll of the preview pane.
    pub fn scroll_preview(&mut self, line: usize) {
        self.preview.scroll_to(line);
        self.render();
    }

    pub fn set_preview_viewport(&mut self, lines: usize) {
        self.preview.set_viewport_lines(lines);
    }

    // ============================================
    // OUTPUT
    // ============================================

    fn emit(&mut self, event: PaletteEvent) {
        debug!(event = event.name(), "Emitting palette event");
        self.subscribers
            .retain(|subscriber| subscriber.try_send(event.clone()).is_ok());
    }

    pub fn view(&self) -> PaletteView {
        if !self.state.is_open() {
            return PaletteView::default();
        }

        let items: Vec<ViewItem> = self
            .state
            .filtered
            .iter()
            .enumerate()
            .filter_map(|(position, &idx)| {
                let command = self.snapshot.command(idx)?;
                Some(ViewItem {
                    title: command.title.clone(),
                    description: command.description.clone(),
                    group: command.group.clone(),
                    tags: command.tags.iter().cloned().collect(),
                    active: self.state.active_index == Some(position),
                })
            })
            .collect();

        let empty_message = (items.is_empty() && !self.snapshot.is_empty())
            .then(|| self.config.get_empty_state());

        let preview = (self.state.preview_phase != PreviewPhase::Hidden).then(|| PreviewView {
            title: self.preview.title.clone(),
            text: self.preview.text().to_string(),
            phase: self.state.preview_phase,
            scroll_top: self.preview.scroll_top(),
            primary_enabled: self.preview.primary_enabled,
            secondary_enabled: self.preview.secondary_enabled,
            used_fallback: self.preview.used_fallback,
        });

        PaletteView {
            open: true,
            query: self.state.query.clone(),
            placeholder: self.config.get_placeholder(),
            query_enabled: !self.state.is_streaming(),
            list_enabled: !self.state.is_streaming(),
            items,
            empty_message,
            status: self.state.status.clone(),
            preview,
        }
    }

    fn render(&mut self) {
        if self.render.is_none() {
            return;
        }
        let view = self.view();
        if let Some(render) = self.render.as_mut() {
            render(&view);
        }
    }
}

impl Drop for Palette {
    fn drop(&mut self) {
        if let Some(session) = self.active_session.take() {
            session.cancel();
        }
    }
}

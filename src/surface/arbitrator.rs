//! Insertion arbitration: deliver a payload into a captured target or fail
//! explicitly so the caller can offer a clipboard copy instead.

use tracing::{debug, warn};

use super::strategies::{default_strategies, InsertionStrategy};
use super::{CaretPlacement, InsertMode, Payload, PlainField, RichRegion, SurfaceHandle, TargetSurfaceRef};
use crate::logging;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOptions {
    pub mode: InsertMode,
    /// The payload is markup
    pub as_html: bool,
}

/// Outcome of one [`insert`] call.
///
/// `method` names the path taken: `input`, `clipboard-paste`, `command`,
/// `fragment`, `copy` or `error`. It is diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertResult {
    pub success: bool,
    pub method: &'static str,
}

impl InsertResult {
    fn ok(method: &'static str) -> Self {
        Self {
            success: true,
            method,
        }
    }

    fn failed(method: &'static str) -> Self {
        Self {
            success: false,
            method,
        }
    }
}

/// Insert `content` into `target` with the default strategy cascade.
pub fn insert(target: Option<&TargetSurfaceRef>, content: &str, options: InsertOptions) -> InsertResult {
    insert_with(target, content, options, &default_strategies())
}

/// Insert with an explicit rich-region strategy order.
pub fn insert_with(
    target: Option<&TargetSurfaceRef>,
    content: &str,
    options: InsertOptions,
    strategies: &[Box<dyn InsertionStrategy>],
) -> InsertResult {
    let payload = Payload {
        content: content.to_string(),
        as_html: options.as_html,
    };

    let result = match target.and_then(TargetSurfaceRef::resolve) {
        None => {
            debug!("No live target surface");
            InsertResult::failed("copy")
        }
        Some(SurfaceHandle::Plain(field)) => {
            insert_into_plain(&mut *field.lock(), &payload.plain_text(), options.mode);
            InsertResult::ok("input")
        }
        Some(SurfaceHandle::Rich(region)) => {
            let mut region = region.lock();
            match insert_into_rich(&mut *region, &payload, options.mode, strategies) {
                Ok(result) => result,
                Err(err) => {
                    warn!(error = %err, "Rich region insertion failed");
                    InsertResult::failed("error")
                }
            }
        }
    };

    logging::log_insert_result(result.method, result.success, content.len());
    result
}

/// Splice into a value + selection field. Never fails.
fn insert_into_plain(field: &mut dyn PlainField, text: &str, mode: InsertMode) {
    let inserted_len = text.chars().count();

    if mode == InsertMode::Replace {
        field.set_value(text.to_string());
        field.set_selection(inserted_len, inserted_len);
        field.dispatch_input();
        field.focus();
        return;
    }

    let value = field.value();
    let len = value.chars().count();
    let (start, end) = match mode {
        InsertMode::Append => (len, len),
        InsertMode::Prepend => (0, 0),
        _ => field.selection().unwrap_or((len, len)),
    };
    let end = end.min(len);
    let start = start.min(end);

    let head: String = value.chars().take(start).collect();
    let tail: String = value.chars().skip(end).collect();
    field.set_value(format!("{}{}{}", head, text, tail));

    let caret = start + inserted_len;
    field.set_selection(caret, caret);
    field.dispatch_input();
    field.focus();
}

/// Try each strategy in order; every attempt positions the caret, then
/// brackets the mutation with before-input and input notifications.
fn insert_into_rich(
    region: &mut dyn RichRegion,
    payload: &Payload,
    mode: InsertMode,
    strategies: &[Box<dyn InsertionStrategy>],
) -> anyhow::Result<InsertResult> {
    region.focus();
    let placement = CaretPlacement::for_mode(mode);
    let mut last_method = "fragment";

    for strategy in strategies {
        last_method = strategy.method();

        if let Some(placement) = placement {
            region.place_caret(placement)?;
        }
        region.dispatch_before_input(payload.input_type(), &payload.content)?;
        let outcome = strategy.try_set_content(region, payload);
        region.dispatch_input(&payload.content)?;

        match outcome {
            Ok(true) => return Ok(InsertResult::ok(strategy.method())),
            Ok(false) => debug!(method = strategy.method(), "Strategy did not land content"),
            Err(err) => warn!(method = strategy.method(), error = %err, "Strategy failed"),
        }
    }

    Ok(InsertResult::failed(last_method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{
        CommandBehavior, MemoryPlainField, MemoryRichRegion, PasteBehavior, RegionEvent,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn opts(mode: InsertMode) -> InsertOptions {
        InsertOptions {
            mode,
            as_html: false,
        }
    }

    fn plain(field: MemoryPlainField) -> (Arc<Mutex<MemoryPlainField>>, TargetSurfaceRef, SurfaceHandle) {
        let shared = Arc::new(Mutex::new(field));
        let handle = SurfaceHandle::Plain(shared.clone());
        let target = TargetSurfaceRef::capture(&handle);
        (shared, target, handle)
    }

    fn rich(region: MemoryRichRegion) -> (Arc<Mutex<MemoryRichRegion>>, TargetSurfaceRef, SurfaceHandle) {
        let shared = Arc::new(Mutex::new(region));
        let handle = SurfaceHandle::Rich(shared.clone());
        let target = TargetSurfaceRef::capture(&handle);
        (shared, target, handle)
    }

    #[test]
    fn replace_in_plain_field_puts_caret_at_end() {
        let (field, target, _handle) = plain(MemoryPlainField::new("old text").with_selection(1, 2));
        let result = insert(Some(&target), "hello", opts(InsertMode::Replace));

        assert_eq!(result, InsertResult { success: true, method: "input" });
        let field = field.lock();
        assert_eq!(field.value(), "hello");
        assert_eq!(field.selection(), Some((5, 5)));
        assert_eq!(field.input_events(), 1);
        assert!(field.is_focused());
    }

    #[test]
    fn caret_mode_replaces_selection() {
        let (field, target, _handle) = plain(MemoryPlainField::new("héllo world").with_selection(6, 11));
        insert(Some(&target), "there", opts(InsertMode::Caret));

        let field = field.lock();
        assert_eq!(field.value(), "héllo there");
        assert_eq!(field.selection(), Some((11, 11)));
    }

    #[test]
    fn append_and_prepend_ignore_selection() {
        let (field, target, _handle) = plain(MemoryPlainField::new("mid").with_selection(1, 1));
        insert(Some(&target), "<", opts(InsertMode::Prepend));
        insert(Some(&target), ">", opts(InsertMode::Append));

        let field = field.lock();
        assert_eq!(field.value(), "<mid>");
        assert_eq!(field.selection(), Some((5, 5)));
    }

    #[test]
    fn out_of_range_selection_is_clamped() {
        let (field, target, _handle) = plain(MemoryPlainField::new("abc").with_selection(7, 9));
        insert(Some(&target), "d", opts(InsertMode::Caret));
        assert_eq!(field.lock().value(), "abcd");
    }

    #[test]
    fn markup_into_plain_field_is_reduced_to_text() {
        let (field, target, _handle) = plain(MemoryPlainField::new(""));
        let result = insert(
            Some(&target),
            "<p>Hello <b>there</b></p>",
            InsertOptions {
                mode: InsertMode::Caret,
                as_html: true,
            },
        );
        assert!(result.success);
        assert_eq!(field.lock().value(), "Hello there");
    }

    #[test]
    fn missing_or_detached_target_falls_back_to_copy() {
        assert_eq!(
            insert(None, "x", opts(InsertMode::Caret)),
            InsertResult { success: false, method: "copy" }
        );

        let (field, target, _handle) = plain(MemoryPlainField::new(""));
        field.lock().detach();
        assert_eq!(insert(Some(&target), "x", opts(InsertMode::Caret)).method, "copy");
    }

    #[test]
    fn dropped_target_falls_back_to_copy() {
        let (_field, target, handle) = rich(MemoryRichRegion::new(""));
        drop(handle);
        drop(_field);
        assert_eq!(insert(Some(&target), "x", opts(InsertMode::Caret)).method, "copy");
    }

    #[test]
    fn successful_paste_skips_later_strategies() {
        let (region, target, _handle) = rich(MemoryRichRegion::new("<p>Hi</p>"));
        let result = insert(Some(&target), "Thanks!", opts(InsertMode::Append));

        assert_eq!(result, InsertResult { success: true, method: "clipboard-paste" });
        let region = region.lock();
        assert!(!region.events().contains(&RegionEvent::Command));
        assert!(!region.events().contains(&RegionEvent::Fragment));
        assert!(region.text().ends_with("Thanks!"));
    }

    #[test]
    fn notifications_bracket_each_attempt() {
        let (region, target, _handle) = rich(MemoryRichRegion::new("")
            .with_paste(PasteBehavior::Ignore)
            .with_command(CommandBehavior::Accept));
        let result = insert(Some(&target), "x", opts(InsertMode::Replace));
        assert_eq!(result.method, "command");

        let region = region.lock();
        let before_input = RegionEvent::BeforeInput {
            input_type: "insertText".to_string(),
        };
        assert_eq!(
            region.events(),
            &[
                RegionEvent::Focus,
                RegionEvent::Caret(CaretPlacement::SelectAll),
                before_input.clone(),
                RegionEvent::Paste,
                RegionEvent::Input,
                RegionEvent::Caret(CaretPlacement::SelectAll),
                before_input,
                RegionEvent::Command,
                RegionEvent::Input,
            ]
        );
    }

    #[test]
    fn falls_through_to_fragment() {
        let (region, target, _handle) = rich(MemoryRichRegion::new("<p>Hi</p>")
            .with_paste(PasteBehavior::Fail)
            .with_command(CommandBehavior::NoOp));
        let result = insert(Some(&target), "<em>ok</em>", InsertOptions {
            mode: InsertMode::Caret,
            as_html: true,
        });

        assert_eq!(result, InsertResult { success: true, method: "fragment" });
        assert!(region.lock().html().ends_with("<em>ok</em>"));
    }

    #[test]
    fn exhausted_strategies_report_failure() {
        let (_region, target, _handle) = rich(MemoryRichRegion::new("")
            .with_paste(PasteBehavior::Ignore)
            .with_command(CommandBehavior::Unsupported)
            .with_failing_fragment());
        assert_eq!(
            insert(Some(&target), "x", opts(InsertMode::Caret)),
            InsertResult { success: false, method: "fragment" }
        );
    }

    #[test]
    fn caret_placement_failure_reports_error() {
        // Attached, but the selection API throws
        struct Flaky(MemoryRichRegion);
        impl RichRegion for Flaky {
            fn is_attached(&self) -> bool {
                true
            }
            fn html(&self) -> String {
                self.0.html()
            }
            fn text(&self) -> String {
                self.0.text()
            }
            fn focus(&mut self) {}
            fn place_caret(&mut self, _placement: CaretPlacement) -> anyhow::Result<()> {
                anyhow::bail!("selection API unavailable")
            }
            fn dispatch_before_input(&mut self, t: &str, d: &str) -> anyhow::Result<()> {
                self.0.dispatch_before_input(t, d)
            }
            fn dispatch_input(&mut self, d: &str) -> anyhow::Result<()> {
                self.0.dispatch_input(d)
            }
            fn dispatch_paste(&mut self, h: &str, t: &str) -> anyhow::Result<()> {
                self.0.dispatch_paste(h, t)
            }
            fn exec_insert(&mut self, p: &Payload) -> anyhow::Result<bool> {
                self.0.exec_insert(p)
            }
            fn insert_fragment(&mut self, p: &Payload) -> anyhow::Result<()> {
                self.0.insert_fragment(p)
            }
        }

        let handle = SurfaceHandle::rich(Flaky(MemoryRichRegion::new("")));
        let target = TargetSurfaceRef::capture(&handle);
        assert_eq!(
            insert(Some(&target), "x", opts(InsertMode::Append)),
            InsertResult { success: false, method: "error" }
        );
    }
}

//! Rich-region insertion strategies, tried in order until one verifies.

use tracing::{debug, warn};

use super::{markup, Payload, RichRegion};

/// One way of getting content into a rich region.
pub trait InsertionStrategy: Send + Sync {
    /// Reported as the insertion method when this strategy succeeds
    fn method(&self) -> &'static str;

    /// Mutate the region and report whether the content verifiably landed.
    ///
    /// `Ok(false)` covers both "declined" and "ran but nothing changed".
    fn try_set_content(&self, region: &mut dyn RichRegion, payload: &Payload)
        -> anyhow::Result<bool>;
}

/// Synthetic paste carrying markup and plain text. Some editors only accept
/// paste-sourced input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipboardPaste;

impl InsertionStrategy for ClipboardPaste {
    fn method(&self) -> &'static str {
        "clipboard-paste"
    }

    fn try_set_content(
        &self,
        region: &mut dyn RichRegion,
        payload: &Payload,
    ) -> anyhow::Result<bool> {
        region.dispatch_paste(&payload.markup_text(), &payload.plain_text())?;
        Ok(was_inserted(region, payload))
    }
}

/// The host's insert-text / insert-markup editing command.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditCommand;

impl InsertionStrategy for EditCommand {
    fn method(&self) -> &'static str {
        "command"
    }

    fn try_set_content(
        &self,
        region: &mut dyn RichRegion,
        payload: &Payload,
    ) -> anyhow::Result<bool> {
        if !region.exec_insert(payload)? {
            debug!("Edit command unavailable");
            return Ok(false);
        }
        let landed = was_inserted(region, payload);
        if !landed {
            warn!("Edit command reported success but content did not change");
        }
        Ok(landed)
    }
}

/// Last resort: splice a fragment at the caret.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fragment;

impl InsertionStrategy for Fragment {
    fn method(&self) -> &'static str {
        "fragment"
    }

    fn try_set_content(
        &self,
        region: &mut dyn RichRegion,
        payload: &Payload,
    ) -> anyhow::Result<bool> {
        region.insert_fragment(payload)?;
        Ok(was_inserted(region, payload))
    }
}

/// Paste, then editing command, then fragment.
pub fn default_strategies() -> Vec<Box<dyn InsertionStrategy>> {
    vec![
        Box::new(ClipboardPaste),
        Box::new(EditCommand),
        Box::new(Fragment),
    ]
}

/// Exact trimmed substring for text; for markup, the markup itself or (since
/// hosts re-serialize) its text content.
pub(crate) fn was_inserted(region: &dyn RichRegion, payload: &Payload) -> bool {
    if payload.as_html {
        let expected = payload.content.trim();
        if expected.is_empty() {
            return true;
        }
        region.html().trim().contains(expected)
            || text_present(region, &markup::html_to_text(&payload.content))
    } else {
        text_present(region, &payload.content)
    }
}

fn text_present(region: &dyn RichRegion, text: &str) -> bool {
    let expected = text.trim();
    expected.is_empty() || region.text().trim().contains(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::memory::{CommandBehavior, MemoryRichRegion, PasteBehavior};

    #[test]
    fn paste_verifies_content() {
        let mut region = MemoryRichRegion::new("<p>Hi</p>");
        assert!(ClipboardPaste
            .try_set_content(&mut region, &Payload::text("there"))
            .unwrap());

        let mut deaf = MemoryRichRegion::new("").with_paste(PasteBehavior::Ignore);
        assert!(!ClipboardPaste
            .try_set_content(&mut deaf, &Payload::text("there"))
            .unwrap());
    }

    #[test]
    fn command_that_claims_success_without_change_is_rejected() {
        let mut region = MemoryRichRegion::new("").with_command(CommandBehavior::NoOp);
        assert!(!EditCommand
            .try_set_content(&mut region, &Payload::text("x"))
            .unwrap());

        let mut unsupported = MemoryRichRegion::new("").with_command(CommandBehavior::Unsupported);
        assert!(!EditCommand
            .try_set_content(&mut unsupported, &Payload::text("x"))
            .unwrap());
    }

    #[test]
    fn reserialized_markup_verifies_by_text() {
        let mut region = MemoryRichRegion::new("<div>Hello <strong>world</strong></div>");
        let payload = Payload::markup("<p>Hello <b>world</b></p>");
        assert!(was_inserted(&region, &payload));

        region = MemoryRichRegion::new("<div>Bye</div>");
        assert!(!was_inserted(&region, &payload));
    }

    #[test]
    fn blank_payload_always_verifies() {
        let region = MemoryRichRegion::new("");
        assert!(was_inserted(&region, &Payload::text("   ")));
        assert!(was_inserted(&region, &Payload::markup("")));
    }
}

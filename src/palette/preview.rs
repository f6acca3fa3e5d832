//! Preview pane buffer.
//!
//! Holds the accumulated response text plus enough scroll geometry to decide
//! whether new content should be followed. A preview the user scrolled up is
//! never yanked back down.

use crate::surface::markup;

const DEFAULT_VIEWPORT_LINES: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub title: String,
    text: String,
    /// Newlines in `text`, kept up to date as deltas arrive
    newlines: usize,
    /// First visible line
    scroll_top: usize,
    viewport_lines: usize,
    /// Primary ("insert") action available
    pub primary_enabled: bool,
    /// Secondary ("copy") action available
    pub secondary_enabled: bool,
    /// Content is the configured fallback rather than a real response
    pub used_fallback: bool,
}

impl Default for Preview {
    fn default() -> Self {
        Self {
            title: String::new(),
            text: String::new(),
            newlines: 0,
            scroll_top: 0,
            viewport_lines: DEFAULT_VIEWPORT_LINES,
            primary_enabled: false,
            secondary_enabled: false,
            used_fallback: false,
        }
    }
}

impl Preview {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Markup rendering of the current text
    pub fn html(&self) -> String {
        markup::markdown_to_html(&self.text)
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    /// Same count as `text().lines()`, without rescanning the buffer.
    pub fn line_count(&self) -> usize {
        let unterminated = !self.text.is_empty() && !self.text.ends_with('\n');
        (self.newlines + usize::from(unterminated)).max(1)
    }

    /// Furthest scroll position that still fills the viewport
    fn max_scroll(&self) -> usize {
        self.line_count().saturating_sub(self.viewport_lines)
    }

    pub fn is_at_bottom(&self) -> bool {
        self.scroll_top >= self.max_scroll()
    }

    pub fn set_viewport_lines(&mut self, lines: usize) {
        self.viewport_lines = lines.max(1);
        self.scroll_top = self.scroll_top.min(self.max_scroll());
    }

    /// User scroll.
    pub fn scroll_to(&mut self, line: usize) {
        self.scroll_top = line.min(self.max_scroll());
    }

    /// Reset for a new response.
    pub fn begin(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.text.clear();
        self.newlines = 0;
        self.scroll_top = 0;
        self.primary_enabled = false;
        self.secondary_enabled = false;
        self.used_fallback = false;
    }

    /// Append a streamed delta, following it only if already at the bottom.
    pub fn append(&mut self, delta: &str) {
        let follow = self.is_at_bottom();
        self.text.push_str(delta);
        self.newlines += count_newlines(delta);
        if follow {
            self.scroll_top = self.max_scroll();
        }
    }

    /// Replace the content and freeze it with both actions enabled.
    pub fn finish(&mut self, text: impl Into<String>, used_fallback: bool) {
        let follow = self.is_at_bottom();
        self.text = text.into();
        self.newlines = count_newlines(&self.text);
        self.scroll_top = if follow {
            self.max_scroll()
        } else {
            self.scroll_top.min(self.max_scroll())
        };
        self.used_fallback = used_fallback;
        self.primary_enabled = true;
        self.secondary_enabled = true;
    }

    pub fn clear(&mut self) {
        let viewport_lines = self.viewport_lines;
        *self = Self {
            viewport_lines,
            ..Self::default()
        };
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> String {
        (0..n).map(|i| format!("line {}\n", i)).collect()
    }

    #[test]
    fn follows_output_when_at_bottom() {
        let mut preview = Preview::default();
        preview.set_viewport_lines(3);
        preview.begin("Summarize");
        preview.append(&lines(5));
        assert_eq!(preview.scroll_top(), 2);
        preview.append(&lines(2));
        assert_eq!(preview.scroll_top(), 4);
        assert!(preview.is_at_bottom());
    }

    #[test]
    fn preserves_manual_scroll_position() {
        let mut preview = Preview::default();
        preview.set_viewport_lines(3);
        preview.append(&lines(10));
        preview.scroll_to(1);
        preview.append(&lines(10));
        assert_eq!(preview.scroll_top(), 1);
        assert!(!preview.is_at_bottom());
    }

    #[test]
    fn finish_enables_actions_and_marks_fallback() {
        let mut preview = Preview::default();
        preview.begin("Reply");
        assert!(!preview.primary_enabled);
        preview.finish("Thanks!", true);
        assert!(preview.primary_enabled && preview.secondary_enabled);
        assert!(preview.used_fallback);
        assert_eq!(preview.text(), "Thanks!");
        assert!(preview.html().contains("<p>Thanks!</p>"));
    }

    #[test]
    fn line_count_tracks_streamed_deltas() {
        let mut preview = Preview::default();
        preview.begin("Reply");
        assert_eq!(preview.line_count(), 1);
        for delta in ["Hel", "lo\nwor", "ld", "\n", "\n", "tail"] {
            preview.append(delta);
            assert_eq!(preview.line_count(), preview.text().lines().count().max(1));
        }
        assert_eq!(preview.line_count(), 4);

        preview.finish("a\r\nb\n", false);
        assert_eq!(preview.line_count(), 2);
        preview.begin("Again");
        assert_eq!(preview.line_count(), 1);
    }

    #[test]
    fn clear_keeps_viewport() {
        let mut preview = Preview::default();
        preview.set_viewport_lines(4);
        preview.finish("x", false);
        preview.clear();
        assert_eq!(preview, {
            let mut p = Preview::default();
            p.set_viewport_lines(4);
            p
        });
    }
}

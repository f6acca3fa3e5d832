//! Text <-> markup conversions used by the preview and by insertion.
//!
//! These are stateless transforms. Markdown rendering escapes raw HTML in the
//! source so generated responses can never inject markup of their own.

use std::sync::OnceLock;

use pulldown_cmark::{html, Event, Options, Parser};
use regex::Regex;

/// Render markdown-ish response text to markup.
pub fn markdown_to_html(content: &str) -> String {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(content, opts).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Escape text for inclusion in markup.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Plain text as markup, keeping line breaks.
pub fn text_to_html(text: &str) -> String {
    text.split('\n')
        .map(escape_html)
        .collect::<Vec<_>>()
        .join("<br>")
}

fn block_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr|blockquote|pre)\s*>").expect("Invalid regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid regex"))
}

fn blank_lines_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("Invalid regex"))
}

/// Reduce markup to its text content.
pub fn html_to_text(markup: &str) -> String {
    let with_breaks = block_break_regex().replace_all(markup, "\n");
    let stripped = tag_regex().replace_all(&with_breaks, "");
    let decoded = decode_entities(&stripped);
    blank_lines_regex()
        .replace_all(&decoded, "\n\n")
        .trim()
        .to_string()
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" stays "&lt;"
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_renders_and_escapes_raw_html() {
        let out = markdown_to_html("**Hi** <script>x</script>");
        assert!(out.contains("<strong>Hi</strong>"));
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
    }

    #[test]
    fn html_to_text_keeps_block_breaks() {
        assert_eq!(
            html_to_text("<p>Hello <b>there</b></p><p>Line&nbsp;2<br/>Line 3</p>"),
            "Hello there\nLine 2\nLine 3"
        );
    }

    #[test]
    fn html_to_text_decodes_entities_once() {
        assert_eq!(html_to_text("a &amp;lt; b &lt; c"), "a &lt; b < c");
    }

    #[test]
    fn text_to_html_escapes_and_breaks_lines() {
        assert_eq!(text_to_html("a < b\nc"), "a &lt; b<br>c");
        assert_eq!(html_to_text(&text_to_html("a < b\nc")), "a < b\nc");
    }

    #[test]
    fn rendered_markdown_reduces_back_to_text() {
        assert_eq!(html_to_text(&markdown_to_html("Hi there")), "Hi there");
    }
}

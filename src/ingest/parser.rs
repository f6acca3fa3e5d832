//! Per-frame chunk parsing.
//!
//! A frame is one newline-delimited line of a streamed response. The default
//! parser accepts event-stream lines, NDJSON envelopes, chat-completion deltas
//! and plain text, in that order of preference.

use serde_json::Value;

/// Strips `data:` and surrounding whitespace from event-stream lines
const EVENT_STREAM_MARKER: &str = "data:";

/// Terminator line sent by chat-completion streams
const DONE_SENTINEL: &str = "[DONE]";

/// Extracts the text carried by one frame.
///
/// Returning `None` (or an empty string) means the frame carries no text.
/// A returned chunk that differs from the frame it came from counts as
/// structured framing.
pub trait ChunkParser: Send + Sync {
    fn parse(&self, frame: &str) -> Option<String>;
}

impl<F> ChunkParser for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn parse(&self, frame: &str) -> Option<String> {
        self(frame)
    }
}

/// Parser for the envelope shapes seen in the wild.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultChunkParser;

impl ChunkParser for DefaultChunkParser {
    fn parse(&self, frame: &str) -> Option<String> {
        let line = strip_event_stream_marker(frame).trim();
        if line.is_empty() {
            return None;
        }
        if line == DONE_SENTINEL && frame.trim_start().starts_with(EVENT_STREAM_MARKER) {
            return None;
        }

        let parsed: Value = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            // Not JSON: literal text
            Err(_) => return Some(line.to_string()),
        };

        let text = match parsed {
            Value::Null => None,
            Value::Object(_) => extract_from_envelope(&parsed).or_else(|| Some(line.to_string())),
            _ => Some(line.to_string()),
        };
        text.filter(|text| !text.is_empty())
    }
}

fn strip_event_stream_marker(frame: &str) -> &str {
    match frame.trim_start().strip_prefix(EVENT_STREAM_MARKER) {
        Some(rest) => rest.trim_start(),
        None => frame,
    }
}

/// `Some("")` means a recognized envelope that carries no text.
fn extract_from_envelope(parsed: &Value) -> Option<String> {
    let kind = parsed
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match kind.as_str() {
        "begin" | "start" | "end" | "finish" => return Some(String::new()),
        "item" | "chunk" | "delta" | "token" => {
            let text = ["content", "text", "delta", "token"]
                .iter()
                .find_map(|field| non_empty_str(parsed.get(*field)))
                .unwrap_or_default();
            return Some(text.to_string());
        }
        _ => {}
    }

    // Chat-completion shape: {"choices": [{"delta": {"content": ...}}]}
    if let Some(choice) = parsed
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
    {
        let nested = non_empty_str(choice.get("delta").and_then(|d| d.get("content")))
            .or_else(|| non_empty_str(choice.get("message").and_then(|m| m.get("content"))));
        if let Some(text) = nested {
            return Some(text.to_string());
        }
    }

    ["content", "text", "response"]
        .iter()
        .find_map(|field| parsed.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Whether a response content type is a streaming-friendly format.
pub fn is_streaming_content_type(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    [
        "text/event-stream",
        "application/x-ndjson",
        "application/jsonl",
        "application/stream+json",
    ]
    .iter()
    .any(|kind| lowered.contains(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(frame: &str) -> Option<String> {
        DefaultChunkParser.parse(frame)
    }

    #[test]
    fn lifecycle_envelopes_carry_no_text() {
        assert_eq!(parse(r#"{"type":"start"}"#), None);
        assert_eq!(parse(r#"data: {"type":"END"}"#), None);
    }

    #[test]
    fn delta_envelopes_yield_their_field() {
        assert_eq!(
            parse(r#"data: {"type":"delta","content":"Hel"}"#).as_deref(),
            Some("Hel")
        );
        assert_eq!(
            parse(r#"{"type":"token","token":"lo"}"#).as_deref(),
            Some("lo")
        );
        assert_eq!(parse(r#"{"type":"item","content":""}"#), None);
    }

    #[test]
    fn chat_completion_deltas_and_messages() {
        assert_eq!(
            parse(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#).as_deref(),
            Some("Hi")
        );
        assert_eq!(
            parse(r#"{"choices":[{"message":{"content":"Done"}}]}"#).as_deref(),
            Some("Done")
        );
    }

    #[test]
    fn done_sentinel_ends_chat_streams_without_text() {
        assert_eq!(parse("data: [DONE]"), None);
        assert_eq!(parse("data:[DONE]"), None);
    }

    #[test]
    fn top_level_text_fields() {
        assert_eq!(parse(r#"{"response":"ok"}"#).as_deref(), Some("ok"));
        assert_eq!(parse(r#"{"text":"t","response":"r"}"#).as_deref(), Some("t"));
    }

    #[test]
    fn unrecognized_json_degrades_to_frame_text() {
        assert_eq!(parse(r#"{"foo":1}"#).as_deref(), Some(r#"{"foo":1}"#));
        assert_eq!(parse("42").as_deref(), Some("42"));
        assert_eq!(parse("null"), None);
    }

    #[test]
    fn plain_text_is_literal() {
        assert_eq!(parse("  just words ").as_deref(), Some("just words"));
        assert_eq!(parse("[DONE]").as_deref(), Some("[DONE]"));
        assert_eq!(parse("   "), None);
    }

    #[test]
    fn closures_are_parsers() {
        let upper = |frame: &str| Some(frame.to_uppercase());
        assert_eq!(upper.parse("abc").as_deref(), Some("ABC"));
    }

    #[test]
    fn streaming_content_types() {
        assert!(is_streaming_content_type("text/event-stream; charset=utf-8"));
        assert!(is_streaming_content_type("Application/X-NDJSON"));
        assert!(is_streaming_content_type("application/jsonl"));
        assert!(is_streaming_content_type("application/stream+json"));
        assert!(!is_streaming_content_type("application/json"));
        assert!(!is_streaming_content_type(""));
    }
}

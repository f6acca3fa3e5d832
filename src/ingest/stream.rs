//! The stream ingestor: bytes in, tagged events out.
//!
//! ```text
//! Started -> Chunk(text)* -> Completed(summary)
//!                         \-> Failed(failure)
//! ```
//!
//! Chunks are yielded in the order bytes were read, and the terminal event
//! always follows the last chunk. Read errors never escape as panics or
//! `Err`s: they become a `Failed` event carrying whatever text had been
//! accumulated so far.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::decoder::Utf8Decoder;
use super::parser::{is_streaming_content_type, ChunkParser, DefaultChunkParser};

const DEFAULT_READ_BUFFER: usize = 8 * 1024;

/// One step of an ingested response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Started,
    Chunk(String),
    Completed(StreamSummary),
    Failed(StreamFailure),
}

/// Final accounting of a fully-read response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    /// Concatenation of every chunk, in order
    pub text: String,
    /// At least one non-empty chunk was produced
    pub received_any: bool,
    /// At least one chunk differed from its raw frame
    pub structured: bool,
    /// False when the caller should treat `raw` as a single buffered document
    pub handled: bool,
    /// The whole decoded body
    pub raw: String,
    pub content_type: Option<String>,
}

/// A read error part-way through the response.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFailure {
    pub message: String,
    pub timed_out: bool,
    /// Chunk text accumulated before the failure
    pub partial: String,
    pub received_any: bool,
}

/// Configured ingestion; cheap to clone and share with worker threads.
#[derive(Clone)]
pub struct StreamIngestor {
    parser: Arc<dyn ChunkParser>,
    require_streaming_content_type: bool,
    buffer_size: usize,
}

impl Default for StreamIngestor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StreamIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamIngestor")
            .field(
                "require_streaming_content_type",
                &self.require_streaming_content_type,
            )
            .field("buffer_size", &self.buffer_size)
            .finish_non_exhaustive()
    }
}

impl StreamIngestor {
    pub fn new() -> Self {
        Self {
            parser: Arc::new(DefaultChunkParser),
            require_streaming_content_type: false,
            buffer_size: DEFAULT_READ_BUFFER,
        }
    }

    pub fn with_parser(mut self, parser: impl ChunkParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Skip frame parsing unless the content type is a streaming format.
    pub fn require_streaming_content_type(mut self, require: bool) -> Self {
        self.require_streaming_content_type = require;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Iterate the events of one response body.
    pub fn events<R: Read>(&self, reader: R, content_type: Option<&str>) -> StreamEvents<R> {
        let buffered_only = self.require_streaming_content_type
            && !content_type.is_some_and(is_streaming_content_type);

        StreamEvents {
            reader,
            parser: Arc::clone(&self.parser),
            decoder: Utf8Decoder::new(),
            buf: vec![0; self.buffer_size],
            line_buf: String::new(),
            raw: String::new(),
            text: String::new(),
            received_any: false,
            structured: false,
            content_type: content_type.map(str::to_string),
            queue: VecDeque::new(),
            phase: if buffered_only {
                Phase::Buffered
            } else {
                Phase::NotStarted
            },
        }
    }

    /// Drain a response, reporting every event to `on_event`.
    ///
    /// A failure resolves to an unhandled summary with empty text so the
    /// caller falls back to buffered handling.
    pub fn consume<R: Read>(
        &self,
        reader: R,
        content_type: Option<&str>,
        mut on_event: impl FnMut(&StreamEvent),
    ) -> StreamSummary {
        let mut summary = StreamSummary {
            content_type: content_type.map(str::to_string),
            ..Default::default()
        };
        for event in self.events(reader, content_type) {
            on_event(&event);
            match event {
                StreamEvent::Completed(done) => summary = done,
                StreamEvent::Failed(_) => summary.handled = false,
                StreamEvent::Started | StreamEvent::Chunk(_) => {}
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Reading,
    /// Content type says this isn't a stream: read it whole, no frames
    Buffered,
    Done,
}

/// Iterator over the events of one response body.
pub struct StreamEvents<R> {
    reader: R,
    parser: Arc<dyn ChunkParser>,
    decoder: Utf8Decoder,
    buf: Vec<u8>,
    line_buf: String,
    raw: String,
    text: String,
    received_any: bool,
    structured: bool,
    content_type: Option<String>,
    queue: VecDeque<StreamEvent>,
    phase: Phase,
}

impl<R: Read> StreamEvents<R> {
    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    fn handle_frame(&mut self, frame: &str) {
        let frame = frame.trim();
        if frame.is_empty() {
            return;
        }
        let Some(chunk) = self.parser.parse(frame).filter(|c| !c.is_empty()) else {
            return;
        };
        self.received_any = true;
        if chunk != frame {
            self.structured = true;
        }
        trace!(chunk_len = chunk.len(), "Stream chunk");
        self.text.push_str(&chunk);
        self.queue.push_back(StreamEvent::Chunk(chunk));
    }

    /// Only the new text is searched for newlines; the pending line never is.
    fn push_decoded(&mut self, decoded: &str) {
        self.raw.push_str(decoded);
        let mut rest = decoded;
        while let Some(newline) = rest.find('\n') {
            self.line_buf.push_str(&rest[..=newline]);
            let line = std::mem::take(&mut self.line_buf);
            self.handle_frame(&line);
            rest = &rest[newline + 1..];
        }
        self.line_buf.push_str(rest);
    }

    fn finish(&mut self) {
        let tail = self.decoder.finish();
        self.raw.push_str(&tail);
        self.line_buf.push_str(&tail);
        let remaining = std::mem::take(&mut self.line_buf);
        self.handle_frame(&remaining);

        let handled =
            self.received_any && (self.structured || !self.text.trim().is_empty());
        debug!(
            text_len = self.text.len(),
            raw_len = self.raw.len(),
            received_any = self.received_any,
            structured = self.structured,
            handled = handled,
            "Stream completed"
        );
        self.queue.push_back(StreamEvent::Completed(self.summary(handled)));
        self.phase = Phase::Done;
    }

    fn summary(&self, handled: bool) -> StreamSummary {
        StreamSummary {
            text: self.text.clone(),
            received_any: self.received_any,
            structured: self.structured,
            handled,
            raw: self.raw.clone(),
            content_type: self.content_type.clone(),
        }
    }

    fn fail(&mut self, err: std::io::Error) -> StreamEvent {
        self.phase = Phase::Done;
        let timed_out = matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
            || err.to_string().to_ascii_lowercase().contains("timeout");
        warn!(
            error = %err,
            timed_out = timed_out,
            partial_len = self.text.len(),
            "Stream read failed"
        );
        StreamEvent::Failed(StreamFailure {
            message: err.to_string(),
            timed_out,
            partial: self.text.clone(),
            received_any: self.received_any,
        })
    }

    fn read_buffered(&mut self) -> StreamEvent {
        let mut bytes = Vec::new();
        if let Err(err) = self.reader.read_to_end(&mut bytes) {
            return self.fail(err);
        }
        self.raw = String::from_utf8_lossy(&bytes).into_owned();
        self.phase = Phase::Done;
        debug!(raw_len = self.raw.len(), "Non-streaming content type, read whole body");
        StreamEvent::Completed(self.summary(false))
    }
}

impl<R: Read> Iterator for StreamEvents<R> {
    type Item = StreamEvent;

    fn next(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }

            match self.phase {
                Phase::Done => return None,
                Phase::Buffered => return Some(self.read_buffered()),
                Phase::NotStarted => {
                    self.phase = Phase::Reading;
                    return Some(StreamEvent::Started);
                }
                Phase::Reading => match self.reader.read(&mut self.buf) {
                    Ok(0) => self.finish(),
                    Ok(n) => {
                        let decoded = self.decoder.decode(&self.buf[..n]);
                        self.push_decoded(&decoded);
                    }
                    Err(err) if err.kind() == ErrorKind::Interrupted => {}
                    Err(err) => return Some(self.fail(err)),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields the body in fixed-size pieces, then optionally an error.
    struct ChunkedReader {
        pieces: VecDeque<Vec<u8>>,
        error: Option<ErrorKind>,
    }

    impl ChunkedReader {
        fn new(body: &[u8], piece: usize) -> Self {
            Self {
                pieces: body.chunks(piece).map(<[u8]>::to_vec).collect(),
                error: None,
            }
        }

        fn failing_with(mut self, kind: ErrorKind) -> Self {
            self.error = Some(kind);
            self
        }
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.pieces.pop_front() {
                Some(piece) => {
                    buf[..piece.len()].copy_from_slice(&piece);
                    Ok(piece.len())
                }
                None => match self.error.take() {
                    Some(kind) => Err(std::io::Error::new(kind, "connection reset")),
                    None => Ok(0),
                },
            }
        }
    }

    fn collect(reader: impl Read) -> Vec<StreamEvent> {
        StreamIngestor::new().events(reader, None).collect()
    }

    fn chunks(events: &[StreamEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Chunk(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn event_stream_deltas_reconstruct_text() {
        let body = "data: {\"type\":\"start\"}\n\
                    data: {\"type\":\"delta\",\"content\":\"Hel\"}\n\
                    data: {\"type\":\"delta\",\"content\":\"lo\"}\n\
                    data: {\"type\":\"end\"}\n";
        let events = collect(Cursor::new(body));

        assert_eq!(events.first(), Some(&StreamEvent::Started));
        assert_eq!(chunks(&events), vec!["Hel", "lo"]);
        match events.last() {
            Some(StreamEvent::Completed(summary)) => {
                assert_eq!(summary.text, "Hello");
                assert!(summary.structured);
                assert!(summary.received_any);
                assert!(summary.handled);
                assert_eq!(summary.raw, body);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn plain_lines_are_unstructured_concatenation() {
        let summary = StreamIngestor::new().consume(Cursor::new("Hello \nworld\n"), None, |_| {});
        assert_eq!(summary.text, "Helloworld");
        assert!(!summary.structured);
        assert!(summary.handled);
    }

    #[test]
    fn multibyte_split_across_reads() {
        let body = "{\"type\":\"delta\",\"content\":\"caf\u{e9} \u{2713}\"}\n";
        // 3-byte reads guarantee splits inside the multi-byte characters
        let summary =
            StreamIngestor::new().consume(ChunkedReader::new(body.as_bytes(), 3), None, |_| {});
        assert_eq!(summary.text, "caf\u{e9} \u{2713}");
        assert!(summary.structured);
    }

    #[test]
    fn long_line_across_reads_then_many_lines_in_one_read() {
        let long = "x".repeat(10_000);
        let mut body = format!("{{\"type\":\"delta\",\"content\":\"{}\"}}\n", long);
        body.push_str("one\ntwo\nthree\n");
        // The long frame spans many small reads; the short ones share the last read
        let mut reader = ChunkedReader::new(&body.as_bytes()[..body.len() - 14], 7);
        reader.pieces.push_back(body.as_bytes()[body.len() - 14..].to_vec());

        let events = collect(reader);
        assert_eq!(chunks(&events), vec![long.as_str(), "one", "two", "three"]);
        match events.last() {
            Some(StreamEvent::Completed(summary)) => {
                assert_eq!(summary.raw, body);
                assert!(summary.structured);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn trailing_frame_without_newline_is_flushed() {
        let body = "{\"type\":\"delta\",\"content\":\"a\"}\n{\"type\":\"delta\",\"content\":\"b\"}";
        let events = collect(Cursor::new(body));
        assert_eq!(chunks(&events), vec!["a", "b"]);
        assert!(matches!(events.last(), Some(StreamEvent::Completed(s)) if s.text == "ab"));
    }

    #[test]
    fn empty_body_is_unhandled() {
        let events = collect(Cursor::new(""));
        assert_eq!(events.len(), 2);
        match &events[1] {
            StreamEvent::Completed(summary) => {
                assert!(!summary.received_any);
                assert!(!summary.handled);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn lifecycle_only_stream_is_unhandled() {
        let summary = StreamIngestor::new().consume(
            Cursor::new("{\"type\":\"start\"}\n{\"type\":\"end\"}\n"),
            None,
            |_| {},
        );
        assert!(!summary.received_any);
        assert!(!summary.handled);
    }

    #[test]
    fn buffered_json_body_streams_its_response_field() {
        let summary =
            StreamIngestor::new().consume(Cursor::new("{\"response\":\"All set\"}"), None, |_| {});
        assert_eq!(summary.text, "All set");
        assert!(summary.handled);
    }

    #[test]
    fn read_error_fails_with_partial_text() {
        let reader = ChunkedReader::new(b"{\"type\":\"delta\",\"content\":\"part\"}\n", 64)
            .failing_with(ErrorKind::ConnectionReset);
        let events = collect(reader);

        assert_eq!(chunks(&events), vec!["part"]);
        match events.last() {
            Some(StreamEvent::Failed(failure)) => {
                assert_eq!(failure.partial, "part");
                assert!(failure.received_any);
                assert!(!failure.timed_out);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn consume_reports_failure_as_unhandled() {
        let reader = ChunkedReader::new(b"", 1).failing_with(ErrorKind::TimedOut);
        let mut failed = false;
        let summary = StreamIngestor::new().consume(reader, None, |event| {
            if let StreamEvent::Failed(f) = event {
                failed = f.timed_out;
            }
        });
        assert!(failed);
        assert!(!summary.handled);
        assert!(summary.text.is_empty());
    }

    #[test]
    fn required_content_type_skips_framing() {
        let ingestor = StreamIngestor::new().require_streaming_content_type(true);
        let events: Vec<_> = ingestor
            .events(Cursor::new("{\"text\":\"hi\"}"), Some("application/json"))
            .collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Completed(summary) => {
                assert!(!summary.handled);
                assert_eq!(summary.raw, "{\"text\":\"hi\"}");
            }
            other => panic!("expected completion, got {:?}", other),
        }

        let streamed: Vec<_> = ingestor
            .events(Cursor::new("data: hi\n"), Some("text/event-stream"))
            .collect();
        assert_eq!(chunks(&streamed), vec!["hi"]);
    }

    #[test]
    fn custom_parser_is_used() {
        let ingestor = StreamIngestor::new().with_parser(|frame: &str| {
            frame.strip_prefix("> ").map(str::to_string)
        });
        let summary = ingestor.consume(Cursor::new("> a\nskip\n> b\n"), None, |_| {});
        assert_eq!(summary.text, "ab");
        assert!(summary.structured);
    }
}

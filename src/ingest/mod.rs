//! Response ingestion
//!
//! Turns a byte stream of unknown framing (event-stream, newline-delimited
//! JSON, or a single buffered body) into an ordered sequence of tagged
//! [`StreamEvent`]s.
//!
//! - `decoder` - incremental, multi-byte-safe UTF-8 decoding
//! - `parser` - pluggable per-frame chunk parsing
//! - `stream` - the [`StreamIngestor`] iterator and its summary

mod decoder;
mod parser;
mod stream;

pub use decoder::Utf8Decoder;
pub use parser::{is_streaming_content_type, ChunkParser, DefaultChunkParser};
pub use stream::{StreamEvent, StreamEvents, StreamFailure, StreamIngestor, StreamSummary};

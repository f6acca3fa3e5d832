//! Incremental UTF-8 decoding.
//!
//! A read buffer boundary may land inside a multi-byte code point; the
//! trailing partial sequence is held back until the next buffer completes it.
//! Invalid sequences decode to U+FFFD.

#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (after any held-back prefix) as is complete.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());
        let mut consumed = 0;

        loop {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_up_to = consumed + err.valid_up_to();
                    out.push_str(
                        std::str::from_utf8(&self.pending[consumed..valid_up_to])
                            .unwrap_or_default(),
                    );
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_up_to + bad;
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes
                            consumed = valid_up_to;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        out
    }

    /// Flush anything still held back at end of stream.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_multibyte_code_point_is_reassembled() {
        let bytes = "héllo ✓".as_bytes();
        // 'é' is two bytes starting at index 1; split inside it
        let mut decoder = Utf8Decoder::new();
        let first = decoder.decode(&bytes[..2]);
        assert_eq!(first, "h");
        assert!(decoder.has_pending());
        let second = decoder.decode(&bytes[2..]);
        assert_eq!(format!("{}{}", first, second), "héllo ✓");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn byte_at_a_time_decoding() {
        let text = "añ✓🎉";
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        for byte in text.as_bytes() {
            out.push_str(&decoder.decode(std::slice::from_ref(byte)));
        }
        out.push_str(&decoder.finish());
        assert_eq!(out, text);
    }

    #[test]
    fn invalid_bytes_become_replacement_chars() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_tail_is_flushed_lossily() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xE2, 0x9C]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }
}

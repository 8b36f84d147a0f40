//! Incremental UTF-8 decoding.
//!
//! Serial reads split the byte stream at arbitrary points, including in the
//! middle of a multi-byte character. [`Utf8Decoder`] holds back an
//! incomplete trailing sequence until the rest of it arrives.

/// Replacement for invalid byte sequences.
const REPLACEMENT: char = '\u{FFFD}';

/// Stateful UTF-8 decoder for chunked input.
#[derive(Debug, Default, Clone)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Creates a decoder with no buffered bytes.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes`, prefixed by any incomplete sequence from the
    /// previous call. Invalid sequences become U+FFFD.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::with_capacity(self.pending.len());

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));

                    match e.error_len() {
                        Some(invalid) => {
                            text.push(REPLACEMENT);
                            self.pending.drain(..valid_up_to + invalid);
                        }
                        None => {
                            // incomplete tail, wait for more bytes
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }

        text
    }

    /// Number of bytes held back.
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Flushes held-back bytes lossily.
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b">>> "), ">>> ");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_split_multibyte() {
        let bytes = "µPy".as_bytes();
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&bytes[..1]), "");
        assert_eq!(decoder.pending_len(), 1);
        assert_eq!(decoder.decode(&bytes[1..]), "µPy");
    }

    #[test]
    fn test_invalid_byte_replaced() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_finish_flushes_lossy() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[0xE2, 0x82]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending_len(), 0);
    }
}

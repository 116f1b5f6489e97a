//! Incremental UTF-8 decoding for streamed response bodies.
//!
//! Chunk boundaries are wherever the transport put them, so a multi-byte
//! character can arrive split across two chunks. The decoder holds the
//! incomplete tail back until the next chunk completes it.

use crate::error::{Error, Result};

/// Longest UTF-8 sequence; an incomplete tail is always shorter.
const MAX_SEQUENCE_LEN: usize = 4;

#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is now complete.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String> {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);

        match std::str::from_utf8(&buf) {
            Ok(s) => Ok(s.to_string()),
            Err(e) => {
                if e.error_len().is_some() {
                    return Err(Error::Decode(format!(
                        "invalid UTF-8 sequence at byte {}",
                        e.valid_up_to()
                    )));
                }
                // Incomplete sequence at the end: keep it for the next chunk.
                let valid = e.valid_up_to();
                debug_assert!(buf.len() - valid < MAX_SEQUENCE_LEN);
                self.pending = buf.split_off(valid);
                String::from_utf8(buf).map_err(|err| Error::Decode(err.to_string()))
            }
        }
    }

    /// Called once the stream ends; leftover bytes mean the body was cut mid-character.
    pub fn finish(self) -> Result<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(Error::Decode(format!(
                "stream ended inside a {}-byte partial character",
                self.pending.len()
            )))
        }
    }
}

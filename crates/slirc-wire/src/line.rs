//! Line-based codec for tokio.
//!
//! Reads newline-terminated lines (`\n` or `\r\n`) and writes strings
//! verbatim. Inbound bytes are decoded as lossy UTF-8 so a stray Latin-1
//! byte never tears down the connection.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error;

/// Default inbound line limit: generous enough for IRCv3 tag blocks.
pub const DEFAULT_MAX_INBOUND: usize = 8191;

/// Line-based codec that handles newline-terminated messages.
///
/// Inbound lines longer than the configured limit are discarded up to and
/// including their terminator instead of failing the stream.
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum inbound line length
    max_len: usize,
    /// Set while skipping the rest of an oversized line
    discarding: bool,
}

impl LineCodec {
    /// Create a new codec with the default inbound limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_INBOUND)
    }

    /// Create a new codec with a custom inbound line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    fn strip_terminator(line: &[u8]) -> &[u8] {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        line.strip_suffix(b"\r").unwrap_or(line)
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                // No complete line yet
                if src.len() > self.max_len {
                    if !self.discarding {
                        warn!(limit = self.max_len, "Discarding oversized inbound line");
                    }
                    self.discarding = true;
                    src.clear();
                    self.next_index = 0;
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            let end = self.next_index + offset + 1;
            self.next_index = 0;

            if self.discarding {
                src.advance(end);
                self.discarding = false;
                continue;
            }

            let line = src.split_to(end);
            if line.len() > self.max_len {
                warn!(
                    actual = line.len(),
                    limit = self.max_len,
                    "Discarding oversized inbound line"
                );
                continue;
            }

            let data = String::from_utf8_lossy(Self::strip_terminator(&line)).into_owned();
            return Ok(Some(data));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() || self.discarding {
            src.clear();
            self.discarding = false;
            return Ok(None);
        }
        // Unterminated final line
        let rest = src.split();
        Ok(Some(
            String::from_utf8_lossy(Self::strip_terminator(&rest)).into_owned(),
        ))
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.extend_from_slice(msg.as_bytes());
        Ok(())
    }
}

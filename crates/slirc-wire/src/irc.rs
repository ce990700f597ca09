//! IRC message codec for tokio.
//!
//! Wraps [`LineCodec`] and turns lines into [`Message`] values. A malformed
//! line is surfaced as an `Err` *item* rather than a codec error, so a
//! `Framed` stream keeps going after it.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};
use crate::line::LineCodec;
use crate::message::Message;

/// Tokio codec for encoding/decoding IRC messages.
#[derive(Default)]
pub struct IrcCodec {
    inner: LineCodec,
}

impl IrcCodec {
    /// Create a new codec with the default inbound line limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new codec with a custom inbound line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            inner: LineCodec::with_max_len(max_len),
        }
    }

    /// Sanitize outgoing message data.
    ///
    /// - Truncates at the first line break, keeping a single `\n`
    /// - Rejects control characters other than IRC formatting codes
    pub fn sanitize(mut data: String) -> error::Result<String> {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
        }

        if let Some(ch) = data.chars().find(|&ch| is_illegal_control_char(ch)) {
            return Err(ProtocolError::IllegalControlChar(ch));
        }

        data.push('\n');
        Ok(data)
    }

    fn parse(line: String) -> Result<Message, ProtocolError> {
        Message::decode(&line).map_err(|cause| ProtocolError::InvalidMessage {
            string: line,
            cause,
        })
    }
}

/// Control characters that must never reach the wire.
///
/// CTCP (`\x01`), the mIRC formatting codes and tab stay legal.
fn is_illegal_control_char(ch: char) -> bool {
    const FORMAT_CODES: [char; 10] = [
        '\x01', '\x02', '\x03', '\x04', '\x0f', '\x11', '\x16', '\x1d', '\x1e', '\x1f',
    ];
    ch.is_control() && ch != '\t' && !FORMAT_CODES.contains(&ch)
}

impl Decoder for IrcCodec {
    type Item = Result<Message, ProtocolError>;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Self::Item>> {
        Ok(self.inner.decode(src)?.map(Self::parse))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<Self::Item>> {
        Ok(self.inner.decode_eof(src)?.map(Self::parse))
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> error::Result<()> {
        let sanitized = Self::sanitize(msg.to_string())?;
        self.inner.encode(sanitized, dst)
    }
}

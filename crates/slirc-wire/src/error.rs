//! Error types for the wire layer.
//!
//! [`MessageParseError`] describes why a single line could not be turned
//! into a [`crate::Message`]; [`ProtocolError`] wraps it together with the
//! transport-level failures surfaced by the codecs.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Illegal control character in an outgoing line.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    /// Failed to parse an IRC message.
    #[error("invalid message: {string:?}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

impl ProtocolError {
    /// Whether this error concerns one line only, leaving the stream usable.
    pub fn is_line_error(&self) -> bool {
        !matches!(self, ProtocolError::Io(_))
    }
}

/// Errors encountered when parsing IRC messages.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty after trimming leading spaces.
    #[error("empty message")]
    EmptyMessage,

    /// No command token was present.
    #[error("invalid command")]
    InvalidCommand,

    /// A prefix was opened with `:` but never followed by a space.
    #[error("unterminated origin/prefix")]
    UnterminatedOrigin,
}

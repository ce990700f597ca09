//! Unified error handling for slirc-bot.
//!
//! Each layer owns one enum: connecting ([`ConnectError`]), reply
//! pagination ([`PaginationError`]), handler isolation ([`HandlerFault`])
//! and the public bot API ([`BotError`]). Wire-level parse failures live in
//! `slirc_wire::ProtocolError`.

use slirc_wire::ProtocolError;
use thiserror::Error;

// ============================================================================
// Connect Errors (dial + registration)
// ============================================================================

/// Errors that abort one connect attempt.
///
/// Surfaced to the caller on the initial connect only; inside the
/// reconnect loop they are logged and retried.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tls handshake failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error("invalid server name for tls: {0}")]
    InvalidServerName(String),

    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("nickname in use: {0}")]
    NicknameInUse(String),

    #[error("registration rejected with numeric {code}: {reason}")]
    Registration { code: u16, reason: String },

    #[error("server error: {0}")]
    ServerError(String),

    #[error("connection closed during registration")]
    ConnectionClosed,

    #[error("registration timed out")]
    RegistrationTimeout,

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ConnectError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Tls(_) => "tls",
            Self::InvalidServerName(_) => "invalid_server_name",
            Self::ConnectTimeout(_) => "connect_timeout",
            Self::NicknameInUse(_) => "nickname_in_use",
            Self::Registration { .. } => "registration_rejected",
            Self::ServerError(_) => "server_error",
            Self::ConnectionClosed => "connection_closed",
            Self::RegistrationTimeout => "registration_timeout",
            Self::Protocol(_) => "protocol",
        }
    }
}

// ============================================================================
// Pagination Errors
// ============================================================================

/// A reply that cannot be sent within the 512 byte line limit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// Prefix, command and arguments alone exceed the limit.
    #[error("reply preamble exceeds line limit by {overflow} bytes")]
    PreambleTooLong { overflow: usize },

    /// The preamble fits exactly, leaving no room for trailing text.
    #[error("no room left for {len} bytes of trailing text")]
    NoRoomForTrailing { len: usize },
}

// ============================================================================
// Handler Faults
// ============================================================================

/// A panic caught at the dispatch boundary.
#[derive(Debug, Clone, Error)]
#[error("handler for {command} panicked: {message}")]
pub struct HandlerFault {
    /// The command whose handler failed.
    pub command: String,
    /// The panic payload, when it was a string.
    pub message: String,
}

// ============================================================================
// Bot API Errors
// ============================================================================

/// Errors returned by the public [`crate::Bot`] API.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("no connection named {0}")]
    UnknownNetwork(String),

    #[error("connection {0} already exists")]
    AlreadyConnected(String),

    #[error("outbound queue for {0} is closed")]
    QueueClosed(String),

    #[error("connect failed: {0}")]
    Connect(#[from] ConnectError),

    #[error("invalid mention pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl BotError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownNetwork(_) => "unknown_network",
            Self::AlreadyConnected(_) => "already_connected",
            Self::QueueClosed(_) => "queue_closed",
            Self::Connect(e) => e.error_code(),
            Self::Pattern(_) => "pattern",
        }
    }
}

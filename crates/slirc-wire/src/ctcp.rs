//! CTCP (Client-to-Client Protocol) classification.
//!
//! CTCP requests ride inside the trailing field of PRIVMSG/NOTICE,
//! delimited by `\x01`. The decoder splits them into [`crate::Message::ctcp`]
//! (the command name) and [`crate::Message::trailing`] (the body); this
//! module classifies the command name.
//!
//! # Reference
//! - CTCP specification: <https://modern.ircdocs.horse/ctcp.html>
//!
//! # Example
//!
//! ```
//! use slirc_wire::{CtcpKind, Message};
//!
//! let msg = Message::decode(":n!u@h PRIVMSG #c :\x01ACTION waves\x01").unwrap();
//! assert_eq!(msg.ctcp_kind(), Some(CtcpKind::Action));
//! assert_eq!(msg.trailing, "waves");
//! ```

use std::fmt;

/// The CTCP delimiter byte (`\x01`).
pub const CTCP_DELIM: char = '\x01';

/// Known CTCP command types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CtcpKind {
    /// ACTION - describes an action performed by the user (`/me`).
    Action,
    /// VERSION - requests client version information.
    Version,
    /// PING - measures round-trip latency.
    Ping,
    /// TIME - requests local time from the client.
    Time,
    /// CLIENTINFO - requests list of supported CTCP commands.
    Clientinfo,
    /// SOURCE - requests source code location.
    Source,
    /// Unknown or custom CTCP command.
    Unknown(String),
}

impl CtcpKind {
    /// Parse a CTCP command name into a `CtcpKind`.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "ACTION" => Self::Action,
            "VERSION" => Self::Version,
            "PING" => Self::Ping,
            "TIME" => Self::Time,
            "CLIENTINFO" => Self::Clientinfo,
            "SOURCE" => Self::Source,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    /// Returns the canonical uppercase name of this CTCP command.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Action => "ACTION",
            Self::Version => "VERSION",
            Self::Ping => "PING",
            Self::Time => "TIME",
            Self::Clientinfo => "CLIENTINFO",
            Self::Source => "SOURCE",
            Self::Unknown(s) => s,
        }
    }
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

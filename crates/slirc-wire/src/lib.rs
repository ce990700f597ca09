//! # slirc-wire
//!
//! The wire layer of slirc-bot: a flat IRC [`Message`] model, its
//! decoder and encoder, CTCP classification and tokio codecs that frame a
//! byte stream into newline-terminated lines.
//!
//! ## Quick Start
//!
//! ```rust
//! use slirc_wire::Message;
//!
//! let msg = Message::decode(":nick!user@host PRIVMSG #rust :hello there").unwrap();
//! assert_eq!(msg.sender(), "nick");
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.args, vec!["#rust".to_string()]);
//! assert_eq!(msg.trailing, "hello there");
//!
//! let reply = Message::privmsg("#rust", "hi");
//! assert_eq!(reply.encode(), b"PRIVMSG #rust :hi\n".to_vec());
//! ```
//!
//! The codec deliberately does not enforce the 512 byte protocol limit;
//! callers that produce text of arbitrary length split it themselves.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod ctcp;
pub mod error;
#[cfg(feature = "tokio")]
pub mod irc;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod nick;
pub mod response;

pub use self::ctcp::{CtcpKind, CTCP_DELIM};
pub use self::error::{MessageParseError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::irc::IrcCodec;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::message::Message;
pub use self::nick::{is_nick_char, NickExt, NICK_SPECIAL_CHARS};

/// Maximum length of an IRC line on the wire, terminator included (RFC 1459).
pub const MAX_IRC_LINE_LEN: usize = 512;

//! IRC numeric replies the client side of registration cares about.
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - Modern IRC documentation: <https://modern.ircdocs.horse/>

#![allow(non_camel_case_types)]

/// IRC server response code.
///
/// Only the numerics that drive registration are named; everything else is
/// classified through [`is_error_code`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    /// 001 - Welcome to the IRC network
    RPL_WELCOME = 1,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 422 - MOTD file is missing
    ERR_NOMOTD = 422,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname is already in use
    ERR_NICKNAMEINUSE = 433,
    /// 436 - Nickname collision
    ERR_NICKCOLLISION = 436,
    /// 464 - Password incorrect
    ERR_PASSWDMISMATCH = 464,
    /// 465 - You are banned from this server
    ERR_YOUREBANNEDCREEP = 465,
}

impl Response {
    /// Look up a named numeric.
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::RPL_WELCOME,
            376 => Self::RPL_ENDOFMOTD,
            422 => Self::ERR_NOMOTD,
            432 => Self::ERR_ERRONEUSNICKNAME,
            433 => Self::ERR_NICKNAMEINUSE,
            436 => Self::ERR_NICKCOLLISION,
            464 => Self::ERR_PASSWDMISMATCH,
            465 => Self::ERR_YOUREBANNEDCREEP,
            _ => return None,
        })
    }

    /// The numeric code.
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Whether a numeric code is an error reply (4xx).
pub fn is_error_code(code: u16) -> bool {
    (400..500).contains(&code)
}

//! Nickname validation utilities.
//!
//! # Reference
//! - RFC 2812 Section 2.3.1: Message format (nickname definition)

/// Default maximum nickname length per RFC 2812.
pub const DEFAULT_NICK_MAX_LEN: usize = 30;

/// Non-alphanumeric characters allowed inside a nickname.
pub const NICK_SPECIAL_CHARS: &str = "[]{}\\|^`-_";

/// Whether `c` may appear inside a nickname.
///
/// This is ASCII letters and digits plus [`NICK_SPECIAL_CHARS`]. A character
/// outside it terminates a nickname mention such as `bot: hello`.
#[inline]
pub fn is_nick_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || NICK_SPECIAL_CHARS.contains(c)
}

/// Extension trait for checking if a string is a valid IRC nickname.
pub trait NickExt {
    /// Check if this string is a valid IRC nickname.
    ///
    /// # Examples
    ///
    /// ```
    /// use slirc_wire::NickExt;
    ///
    /// assert!("nick".is_valid_nick());
    /// assert!("[cool]".is_valid_nick());
    ///
    /// assert!(!"123nick".is_valid_nick());
    /// assert!(!"".is_valid_nick());
    /// assert!(!"nick name".is_valid_nick());
    /// ```
    fn is_valid_nick(&self) -> bool;
}

impl NickExt for str {
    fn is_valid_nick(&self) -> bool {
        if self.is_empty() || self.len() > DEFAULT_NICK_MAX_LEN {
            return false;
        }
        let mut chars = self.chars();
        let first_ok = chars
            .next()
            .is_some_and(|c| is_nick_char(c) && !c.is_ascii_digit() && c != '-');
        first_ok && chars.all(is_nick_char)
    }
}

impl NickExt for String {
    fn is_valid_nick(&self) -> bool {
        self.as_str().is_valid_nick()
    }
}

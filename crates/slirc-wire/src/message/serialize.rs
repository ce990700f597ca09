//! Encoding [`Message`] into wire bytes.

use std::fmt;

use crate::ctcp::CTCP_DELIM;

use super::types::Message;

impl Message {
    /// Encode to wire bytes, terminated by a single `\n`.
    ///
    /// Every argument is followed by a space, so a message without a
    /// trailing field ends in `" \n"`. Servers accept this form.
    pub fn encode(&self) -> Vec<u8> {
        let mut line = self.to_string();
        line.push('\n');
        line.into_bytes()
    }
}

/// Renders the wire form without the line terminator.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = self.prefix.as_deref().filter(|p| !p.is_empty()) {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{} ", self.command)?;
        for arg in &self.args {
            write!(f, "{} ", arg)?;
        }

        let ctcp = self.ctcp.as_deref().filter(|c| !c.is_empty());
        match (ctcp, self.trailing.is_empty()) {
            (Some(name), false) => write!(
                f,
                ":{}{} {}{}",
                CTCP_DELIM, name, self.trailing, CTCP_DELIM
            ),
            (Some(name), true) => write!(f, ":{}{}{}", CTCP_DELIM, name, CTCP_DELIM),
            (None, false) => write!(f, ":{}", self.trailing),
            (None, true) => Ok(()),
        }
    }
}

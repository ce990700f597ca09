use crate::ctcp::CtcpKind;

/// A single IRC wire unit.
///
/// Unlike a fully typed command model, `Message` keeps the line flat:
/// the trailing field (everything after ` :`) is kept apart from the
/// space-separated arguments, and a CTCP block inside the trailing field is
/// split into its command name ([`Message::ctcp`]) and body
/// ([`Message::trailing`]).
///
/// An empty `trailing` means "no trailing field".
///
/// # Example
///
/// ```
/// use slirc_wire::Message;
///
/// let msg = Message::decode(":irc.example.net 001 bot :Welcome").unwrap();
/// assert_eq!(msg.prefix.as_deref(), Some("irc.example.net"));
/// assert_eq!(msg.numeric(), Some(1));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    /// Sender hostmask (`nick!user@host`) or server name.
    pub prefix: Option<String>,
    /// The command token, e.g. `PRIVMSG` or `433`.
    pub command: String,
    /// Space separated arguments preceding the trailing field.
    pub args: Vec<String>,
    /// Free-form trailing text, or the body of a CTCP block.
    pub trailing: String,
    /// CTCP command name when the trailing field was wrapped in `\x01`.
    pub ctcp: Option<String>,
}

impl Message {
    /// Create a message from a command, arguments and trailing text.
    pub fn new<C, T>(command: C, args: Vec<String>, trailing: T) -> Self
    where
        C: Into<String>,
        T: Into<String>,
    {
        Self {
            prefix: None,
            command: command.into(),
            args,
            trailing: trailing.into(),
            ctcp: None,
        }
    }

    /// Create a PRIVMSG message to a target with text.
    #[must_use]
    pub fn privmsg<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Self::new("PRIVMSG", vec![target.into()], text)
    }

    /// Create a NOTICE message to a target with text.
    #[must_use]
    pub fn notice<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Self::new("NOTICE", vec![target.into()], text)
    }

    /// Create a CTCP request carried by PRIVMSG.
    #[must_use]
    pub fn ctcp_request<T, C, B>(target: T, command: C, body: B) -> Self
    where
        T: Into<String>,
        C: Into<String>,
        B: Into<String>,
    {
        Self {
            ctcp: Some(command.into()),
            ..Self::privmsg(target, body)
        }
    }

    /// Create a CTCP reply carried by NOTICE.
    #[must_use]
    pub fn ctcp_reply<T, C, B>(target: T, command: C, body: B) -> Self
    where
        T: Into<String>,
        C: Into<String>,
        B: Into<String>,
    {
        Self {
            ctcp: Some(command.into()),
            ..Self::notice(target, body)
        }
    }

    /// Create a JOIN message for a channel.
    #[must_use]
    pub fn join<C>(channel: C) -> Self
    where
        C: Into<String>,
    {
        Self::new("JOIN", vec![channel.into()], "")
    }

    /// Create a JOIN message for a keyed channel.
    #[must_use]
    pub fn join_with_key<C, K>(channel: C, key: K) -> Self
    where
        C: Into<String>,
        K: Into<String>,
    {
        Self::new("JOIN", vec![channel.into(), key.into()], "")
    }

    /// Create a NICK message.
    #[must_use]
    pub fn nick<N>(nickname: N) -> Self
    where
        N: Into<String>,
    {
        Self::new("NICK", vec![nickname.into()], "")
    }

    /// Create a USER registration message.
    #[must_use]
    pub fn user<U, R>(username: U, realname: R) -> Self
    where
        U: Into<String>,
        R: Into<String>,
    {
        Self::new(
            "USER",
            vec![username.into(), "0".to_string(), "*".to_string()],
            realname,
        )
    }

    /// Create a PING message carrying `token`.
    #[must_use]
    pub fn ping<T>(token: T) -> Self
    where
        T: Into<String>,
    {
        Self::new("PING", vec![token.into()], "")
    }

    /// Create a PONG message carrying `token`.
    #[must_use]
    pub fn pong<T>(token: T) -> Self
    where
        T: Into<String>,
    {
        Self::new("PONG", Vec::new(), token)
    }

    /// Create a QUIT message with a reason.
    #[must_use]
    pub fn quit<R>(reason: R) -> Self
    where
        R: Into<String>,
    {
        Self::new("QUIT", Vec::new(), reason)
    }

    /// Set the prefix of this message.
    #[must_use]
    pub fn with_prefix<P>(mut self, prefix: P) -> Self
    where
        P: Into<String>,
    {
        self.prefix = Some(prefix.into());
        self
    }

    /// The nickname part of the prefix: everything before the first `!`.
    ///
    /// Returns the whole prefix when it has no `!` (a server name) and an
    /// empty string when there is no prefix.
    pub fn sender(&self) -> &str {
        match self.prefix.as_deref() {
            Some(prefix) => prefix.split('!').next().unwrap_or(prefix),
            None => "",
        }
    }

    /// Case-insensitive command comparison.
    pub fn is_command(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// The numeric reply code, when the command is a three digit numeric.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Classification of the CTCP command, if any.
    pub fn ctcp_kind(&self) -> Option<CtcpKind> {
        self.ctcp.as_deref().map(CtcpKind::parse)
    }

    /// The argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

//! Decoding raw lines into [`Message`].

use std::str::FromStr;

use crate::ctcp::CTCP_DELIM;
use crate::error::MessageParseError;

use super::types::Message;

impl Message {
    /// Decode one raw line (with or without its `\r\n` terminator).
    ///
    /// The trailing field begins at the first `:` that starts a token. When
    /// it is wrapped in `\x01`, the first word becomes [`Message::ctcp`] and
    /// the rest [`Message::trailing`]; a missing closing `\x01` is tolerated.
    pub fn decode(raw: &str) -> Result<Message, MessageParseError> {
        let line = raw.trim_end_matches(['\r', '\n']);
        let mut rest = line.trim_start_matches(' ');
        if rest.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let mut prefix = None;
        if let Some(origin) = rest.strip_prefix(':') {
            let end = origin
                .find(' ')
                .ok_or(MessageParseError::UnterminatedOrigin)?;
            if end > 0 {
                prefix = Some(origin[..end].to_owned());
            }
            rest = origin[end + 1..].trim_start_matches(' ');
        }

        let (head, payload) = split_trailing(rest);

        let mut trailing = String::new();
        let mut ctcp = None;
        if let Some(payload) = payload {
            match payload.strip_prefix(CTCP_DELIM) {
                Some(body) => {
                    let body = body.strip_suffix(CTCP_DELIM).unwrap_or(body);
                    let (name, text) = body.split_once(' ').unwrap_or((body, ""));
                    if !name.is_empty() {
                        ctcp = Some(name.to_owned());
                    }
                    trailing = text.to_owned();
                }
                None => trailing = payload.to_owned(),
            }
        }

        let mut tokens = head.split_whitespace();
        let command = tokens.next().ok_or(MessageParseError::InvalidCommand)?;

        Ok(Message {
            prefix,
            command: command.to_owned(),
            args: tokens.map(str::to_owned).collect(),
            trailing,
            ctcp,
        })
    }
}

/// Split at the trailing marker: a `:` at the start or one preceded by a space.
fn split_trailing(s: &str) -> (&str, Option<&str>) {
    if let Some(payload) = s.strip_prefix(':') {
        return ("", Some(payload));
    }
    match s.find(" :") {
        Some(pos) => (&s[..pos], Some(&s[pos + 2..])),
        None => (s, None),
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctcp::CtcpKind;

    #[test]
    fn decodes_privmsg_with_prefix() {
        let msg = Message::decode(":nick!user@host PRIVMSG #chan :hello world\r\n").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("nick!user@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.args, vec!["#chan"]);
        assert_eq!(msg.trailing, "hello world");
        assert_eq!(msg.ctcp, None);
    }

    #[test]
    fn decodes_ctcp_action() {
        let msg = Message::decode(":n!u@h PRIVMSG #c :\x01ACTION waves\x01").unwrap();
        assert_eq!(msg.ctcp.as_deref(), Some("ACTION"));
        assert_eq!(msg.ctcp_kind(), Some(CtcpKind::Action));
        assert_eq!(msg.trailing, "waves");
    }

    #[test]
    fn decodes_ctcp_without_body_or_closing_delimiter() {
        let msg = Message::decode("PRIVMSG bot :\x01VERSION\x01").unwrap();
        assert_eq!(msg.ctcp.as_deref(), Some("VERSION"));
        assert_eq!(msg.trailing, "");

        let msg = Message::decode("PRIVMSG bot :\x01PING 12345").unwrap();
        assert_eq!(msg.ctcp.as_deref(), Some("PING"));
        assert_eq!(msg.trailing, "12345");
    }

    #[test]
    fn decodes_line_without_prefix_or_trailing() {
        let msg = Message::decode("PING irc.example.net").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.args, vec!["irc.example.net"]);
        assert!(msg.trailing.is_empty());
    }

    #[test]
    fn decodes_trailing_only() {
        let msg = Message::decode("PING :token").unwrap();
        assert!(msg.args.is_empty());
        assert_eq!(msg.trailing, "token");
    }

    #[test]
    fn colon_inside_argument_is_not_trailing() {
        let msg = Message::decode("MODE #c +b a:b :reason here").unwrap();
        assert_eq!(msg.args, vec!["#c", "+b", "a:b"]);
        assert_eq!(msg.trailing, "reason here");
    }

    #[test]
    fn trailing_keeps_colons_and_spaces() {
        let msg = Message::decode("PRIVMSG #c :a : b  c ").unwrap();
        assert_eq!(msg.trailing, "a : b  c ");
    }

    #[test]
    fn leading_spaces_are_ignored() {
        let msg = Message::decode("   NOTICE * :hi").unwrap();
        assert_eq!(msg.command, "NOTICE");
    }

    #[test]
    fn empty_lines_are_rejected() {
        assert_eq!(Message::decode(""), Err(MessageParseError::EmptyMessage));
        assert_eq!(Message::decode("   \r\n"), Err(MessageParseError::EmptyMessage));
    }

    #[test]
    fn unterminated_prefix_is_rejected() {
        assert_eq!(
            Message::decode(":only.a.prefix"),
            Err(MessageParseError::UnterminatedOrigin)
        );
    }

    #[test]
    fn missing_command_is_rejected() {
        assert_eq!(
            Message::decode(":server.name    "),
            Err(MessageParseError::InvalidCommand)
        );
        assert_eq!(
            Message::decode(":hello"),
            Err(MessageParseError::UnterminatedOrigin)
        );
        assert_eq!(Message::decode(":x :y"), Err(MessageParseError::InvalidCommand));
    }

    #[test]
    fn from_str_matches_decode() {
        let msg: Message = "JOIN #rust".parse().unwrap();
        assert_eq!(msg, Message::join("#rust"));
    }
}

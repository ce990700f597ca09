//! PRIVMSG addressing.
//!
//! Decides whether a PRIVMSG is meant for the bot and, if so, which text is
//! the query and where the answer goes. Resolution order:
//!
//! 1. sent to the bot's nick: private, reply to the sender
//! 2. starts with the attention character: addressed in channel
//! 3. starts with `nick:` (nick then a non-nick character): mention
//! 4. anything else goes to the ambient handler, when one is set

use std::sync::Arc;

use regex::Regex;
use slirc_wire::{Message, NICK_SPECIAL_CHARS};

use super::registry::Action;
use crate::bot::Bot;

/// Produces reply text for a query. An empty string means "no reply".
pub trait TextHandler: Send + Sync + 'static {
    fn reply(&self, query: &str, msg: &Message) -> String;
}

impl<F> TextHandler for F
where
    F: Fn(&str, &Message) -> String + Send + Sync + 'static,
{
    fn reply(&self, query: &str, msg: &Message) -> String {
        self(query, msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Private,
    Attention,
    Mention,
    Ambient,
}

/// A resolved PRIVMSG: who gets the answer and what was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addressed<'a> {
    pub mode: AddressMode,
    pub target: &'a str,
    pub query: &'a str,
}

pub struct PrivmsgRouter {
    nickname: String,
    attention: char,
    mention: Regex,
    addressed: Arc<dyn TextHandler>,
    ambient: Option<Arc<dyn TextHandler>>,
}

impl PrivmsgRouter {
    pub fn new(
        nickname: &str,
        attention: char,
        addressed: Arc<dyn TextHandler>,
        ambient: Option<Arc<dyn TextHandler>>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            nickname: nickname.to_string(),
            attention,
            mention: mention_pattern(nickname)?,
            addressed,
            ambient,
        })
    }

    /// Work out how `msg` addresses the bot, if at all.
    pub fn resolve<'a>(&self, msg: &'a Message) -> Option<Addressed<'a>> {
        let first = msg.arg(0)?;
        let text = msg.trailing.as_str();

        if first.eq_ignore_ascii_case(&self.nickname) {
            let sender = msg.sender();
            if sender.is_empty() {
                return None;
            }
            return Some(Addressed {
                mode: AddressMode::Private,
                target: sender,
                query: text,
            });
        }

        if let Some(query) = text.strip_prefix(self.attention) {
            return Some(Addressed {
                mode: AddressMode::Attention,
                target: first,
                query,
            });
        }

        if let Some(m) = self.mention.find(text) {
            return Some(Addressed {
                mode: AddressMode::Mention,
                target: first,
                query: &text[m.end()..],
            });
        }

        self.ambient.as_ref().map(|_| Addressed {
            mode: AddressMode::Ambient,
            target: first,
            query: text,
        })
    }

    /// Resolve `msg` and build the reply, if any.
    pub fn route(&self, msg: &Message) -> Option<Message> {
        let addressed = self.resolve(msg)?;
        let handler = match addressed.mode {
            AddressMode::Ambient => self.ambient.as_ref()?,
            _ => &self.addressed,
        };

        let reply = handler.reply(addressed.query, msg);
        if reply.is_empty() {
            return None;
        }
        Some(Message::privmsg(addressed.target, reply))
    }
}

impl Action for PrivmsgRouter {
    fn call(&self, _bot: &Bot, msg: &Message) -> Option<Message> {
        self.route(msg)
    }
}

/// `nick` followed by a character that cannot appear in a nickname, then
/// any run of spaces, tabs or backticks.
fn mention_pattern(nickname: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?i)^{}[^a-zA-Z0-9{}][ \t`]*",
        regex::escape(nickname),
        regex::escape(NICK_SPECIAL_CHARS)
    ))
}

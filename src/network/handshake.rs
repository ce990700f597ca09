//! Client registration state machine.
//!
//! Sans-IO: the machine consumes decoded messages and returns actions; the
//! supervisor owns the socket and performs them. This keeps every branch of
//! the USER/NICK/ghost/MOTD exchange testable without a server.

use slirc_wire::Message;
use slirc_wire::response::{Response, is_error_code};

use crate::config::Credentials;
use crate::error::ConnectError;

/// Registration progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// Nothing sent yet.
    Idle,
    /// USER/NICK sent, waiting for welcome.
    Registering,
    /// Nick was taken; GHOST sent to NickServ, waiting for its answer.
    Ghosting,
    /// Welcomed; reading the MOTD burst.
    Motd,
    /// End of MOTD seen.
    Registered,
    /// A fatal reply ended this attempt.
    Failed,
}

/// Work the caller must perform after feeding the machine.
#[derive(Debug)]
pub enum RegistrationAction {
    /// Write this message to the server.
    Send(Message),
    /// Registration finished; the connection is usable.
    Complete,
    /// Registration failed; abandon this connection.
    Fail(ConnectError),
}

/// Drives one registration attempt.
#[derive(Debug)]
pub struct Registration {
    nickname: String,
    username: String,
    realname: String,
    password: Option<String>,
    state: RegistrationState,
    ghosted: bool,
}

impl Registration {
    pub fn new(nickname: &str, credentials: &Credentials) -> Self {
        Self {
            nickname: nickname.to_string(),
            username: credentials.username.clone(),
            realname: credentials.realname.clone(),
            password: credentials.password.clone(),
            state: RegistrationState::Idle,
            ghosted: false,
        }
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// The opening USER and NICK.
    pub fn start(&mut self) -> Vec<RegistrationAction> {
        self.state = RegistrationState::Registering;
        vec![
            RegistrationAction::Send(Message::user(&self.username, &self.realname)),
            RegistrationAction::Send(Message::nick(&self.nickname)),
        ]
    }

    /// Feed one message from the server.
    pub fn feed(&mut self, msg: &Message) -> Vec<RegistrationAction> {
        if matches!(
            self.state,
            RegistrationState::Registered | RegistrationState::Failed
        ) {
            return Vec::new();
        }

        if msg.is_command("PING") {
            let token = if msg.trailing.is_empty() {
                msg.arg(0).unwrap_or_default()
            } else {
                msg.trailing.as_str()
            };
            return vec![RegistrationAction::Send(Message::pong(token))];
        }

        if msg.is_command("ERROR") {
            return self.fail(ConnectError::ServerError(msg.trailing.clone()));
        }

        if msg.is_command("NOTICE") && self.state == RegistrationState::Ghosting {
            if msg.sender().eq_ignore_ascii_case("NickServ") {
                self.state = RegistrationState::Registering;
                return vec![RegistrationAction::Send(Message::nick(&self.nickname))];
            }
            return Vec::new();
        }

        let Some(code) = msg.numeric() else {
            return Vec::new();
        };

        match Response::from_code(code) {
            Some(Response::RPL_WELCOME) => {
                self.state = RegistrationState::Motd;
                Vec::new()
            }
            Some(Response::RPL_ENDOFMOTD | Response::ERR_NOMOTD)
                if self.state == RegistrationState::Motd =>
            {
                self.state = RegistrationState::Registered;
                vec![RegistrationAction::Complete]
            }
            Some(Response::ERR_NOMOTD) => Vec::new(),
            Some(Response::ERR_NICKNAMEINUSE) => self.nick_in_use(),
            _ if is_error_code(code) => self.fail(ConnectError::Registration {
                code,
                reason: msg.trailing.clone(),
            }),
            _ => Vec::new(),
        }
    }

    fn nick_in_use(&mut self) -> Vec<RegistrationAction> {
        match self.password.as_deref() {
            Some(password) if !self.ghosted => {
                self.ghosted = true;
                self.state = RegistrationState::Ghosting;
                let ghost = format!("GHOST {} {}", self.nickname, password);
                vec![RegistrationAction::Send(Message::privmsg("NickServ", ghost))]
            }
            _ => self.fail(ConnectError::NicknameInUse(self.nickname.clone())),
        }
    }

    fn fail(&mut self, error: ConnectError) -> Vec<RegistrationAction> {
        self.state = RegistrationState::Failed;
        vec![RegistrationAction::Fail(error)]
    }
}

/// The NickServ identify request sent once registered.
pub fn identify_message(password: &str) -> Message {
    Message::privmsg("NickServ", format!("identify {password}"))
}

/// Build the JOIN for a channel entry of the form `#chan` or `#chan key`.
pub fn join_message(entry: &str) -> Option<Message> {
    let mut parts = entry.split_whitespace();
    let channel = parts.next()?;
    Some(match parts.next() {
        Some(key) => Message::join_with_key(channel, key),
        None => Message::join(channel),
    })
}

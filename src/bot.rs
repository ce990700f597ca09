//! The bot aggregate.
//!
//! A [`Bot`] owns everything handlers may touch: its identity, the action
//! registry, the hostmask the server reports for it, and its named
//! connections. It is shared as `Arc<Bot>` and passed to every action.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use slirc_wire::Message;
use tracing::{debug, info};

use crate::config::NetworkOptions;
use crate::dispatch::{Action, ActionRegistry, PrivmsgRouter, TextHandler};
use crate::error::BotError;
use crate::network::{Network, NetworkStatus};

pub struct Bot {
    nickname: String,
    attention: char,
    actions: ActionRegistry,
    /// `nick!user@host` as seen by others; written only by the JOIN action.
    own_prefix: RwLock<String>,
    networks: DashMap<String, Network>,
}

impl Bot {
    /// Create a bot with the default PING and JOIN actions installed.
    pub fn new(nickname: impl Into<String>, attention: char) -> Arc<Self> {
        let bot = Self {
            nickname: nickname.into(),
            attention,
            actions: ActionRegistry::new(),
            own_prefix: RwLock::new(String::new()),
            networks: DashMap::new(),
        };
        bot.register("PING", answer_ping);
        bot.register("JOIN", record_own_join);
        Arc::new(bot)
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn attention(&self) -> char {
        self.attention
    }

    /// Our hostmask as last reported by the server, or empty if unknown.
    pub fn own_prefix(&self) -> String {
        self.own_prefix.read().clone()
    }

    pub fn set_own_prefix(&self, prefix: &str) {
        *self.own_prefix.write() = prefix.to_string();
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Register or override the action for `command`.
    pub fn register<F>(&self, command: &str, action: F)
    where
        F: Fn(&Bot, &Message) -> Option<Message> + Send + Sync + 'static,
    {
        self.actions.register(command, action);
    }

    /// Register a stateful [`Action`] implementation for `command`.
    pub fn register_action<A: Action>(&self, command: &str, action: A) {
        self.actions.register(command, action);
    }

    /// Route PRIVMSGs addressed to the bot to `addressed`.
    pub fn set_privmsg_handler<H: TextHandler>(&self, addressed: H) -> Result<(), BotError> {
        self.install_router(Arc::new(addressed), None)
    }

    /// Like [`Bot::set_privmsg_handler`], with `ambient` answering every
    /// PRIVMSG that is not addressed to the bot.
    pub fn set_privmsg_handlers<H, A>(&self, addressed: H, ambient: A) -> Result<(), BotError>
    where
        H: TextHandler,
        A: TextHandler,
    {
        self.install_router(Arc::new(addressed), Some(Arc::new(ambient)))
    }

    fn install_router(
        &self,
        addressed: Arc<dyn TextHandler>,
        ambient: Option<Arc<dyn TextHandler>>,
    ) -> Result<(), BotError> {
        let router = PrivmsgRouter::new(&self.nickname, self.attention, addressed, ambient)?;
        self.register_action("PRIVMSG", router);
        Ok(())
    }

    /// Open a supervised connection.
    ///
    /// Errors from this first attempt are returned; afterwards the
    /// connection reconnects on its own. Returns the number of channel
    /// JOINs sent.
    pub async fn connect(self: &Arc<Self>, options: NetworkOptions) -> Result<usize, BotError> {
        let name = options.server.label().to_string();
        if self.networks.contains_key(&name) {
            return Err(BotError::AlreadyConnected(name));
        }

        let (network, joined) = Network::open(Arc::clone(self), options).await?;

        let duplicate = match self.networks.entry(name.clone()) {
            Entry::Occupied(_) => Some(network),
            Entry::Vacant(entry) => {
                entry.insert(network);
                None
            }
        };
        if let Some(network) = duplicate {
            network.close().await;
            return Err(BotError::AlreadyConnected(name));
        }

        info!(network = %name, joined, "Network registered");
        Ok(joined)
    }

    /// Handle to the connection called `name`.
    pub fn network(&self, name: &str) -> Option<Network> {
        self.networks.get(name).map(|n| n.value().clone())
    }

    /// Names of all open connections, sorted.
    pub fn network_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.networks.iter().map(|n| n.key().clone()).collect();
        names.sort();
        names
    }

    pub fn status(&self, name: &str) -> Option<NetworkStatus> {
        self.networks.get(name).map(|n| n.status())
    }

    /// Queue `msg` on the connection called `name`.
    pub async fn send(&self, name: &str, msg: Message) -> Result<(), BotError> {
        let network = self
            .network(name)
            .ok_or_else(|| BotError::UnknownNetwork(name.to_string()))?;
        network.send(msg).await
    }

    /// Gracefully close the connection called `name`.
    pub async fn close(&self, name: &str) -> Result<(), BotError> {
        let (_, network) = self
            .networks
            .remove(name)
            .ok_or_else(|| BotError::UnknownNetwork(name.to_string()))?;
        network.close().await;
        Ok(())
    }

    /// Gracefully close every connection.
    pub async fn close_all(&self) {
        for name in self.network_names() {
            if let Err(e) = self.close(&name).await {
                debug!(network = %name, error = %e, "Already closed");
            }
        }
    }
}

fn answer_ping(_bot: &Bot, msg: &Message) -> Option<Message> {
    let token = if msg.trailing.is_empty() {
        msg.arg(0).unwrap_or_default()
    } else {
        msg.trailing.as_str()
    };
    Some(Message::pong(token))
}

fn record_own_join(bot: &Bot, msg: &Message) -> Option<Message> {
    if !msg.sender().eq_ignore_ascii_case(bot.nickname()) {
        return None;
    }
    if let Some(prefix) = msg.prefix.as_deref() {
        bot.set_own_prefix(prefix);
        debug!(prefix, "Learned own prefix");
    }
    None
}

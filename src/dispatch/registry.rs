//! Action registry: command token to handler.
//!
//! Lookups uppercase the command, so `privmsg` and `PRIVMSG` share a slot.
//! The map is mutable at runtime; an unregistered command is not an error.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use slirc_wire::Message;

use crate::bot::Bot;

/// A handler for one command.
///
/// Runs on the blocking pool, so it may do slow synchronous work. Returning
/// `Some` queues a reply (paginated as needed).
pub trait Action: Send + Sync + 'static {
    fn call(&self, bot: &Bot, msg: &Message) -> Option<Message>;
}

impl<F> Action for F
where
    F: Fn(&Bot, &Message) -> Option<Message> + Send + Sync + 'static,
{
    fn call(&self, bot: &Bot, msg: &Message) -> Option<Message> {
        self(bot, msg)
    }
}

/// Registry of command actions.
#[derive(Default)]
pub struct ActionRegistry {
    actions: RwLock<HashMap<String, Arc<dyn Action>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the action for `command`, returning the old one.
    pub fn register<A: Action>(&self, command: &str, action: A) -> Option<Arc<dyn Action>> {
        self.insert(command, Arc::new(action))
    }

    pub fn insert(&self, command: &str, action: Arc<dyn Action>) -> Option<Arc<dyn Action>> {
        self.actions
            .write()
            .insert(command.to_ascii_uppercase(), action)
    }

    pub fn remove(&self, command: &str) -> Option<Arc<dyn Action>> {
        self.actions.write().remove(&command.to_ascii_uppercase())
    }

    /// The action for `command`, if any.
    ///
    /// Returns a clone of the `Arc` so the lock is not held while it runs.
    pub fn get(&self, command: &str) -> Option<Arc<dyn Action>> {
        self.actions
            .read()
            .get(&command.to_ascii_uppercase())
            .cloned()
    }

    pub fn contains(&self, command: &str) -> bool {
        self.actions
            .read()
            .contains_key(&command.to_ascii_uppercase())
    }

    /// Registered commands, sorted.
    pub fn commands(&self) -> Vec<String> {
        let mut commands: Vec<String> = self.actions.read().keys().cloned().collect();
        commands.sort();
        commands
    }
}

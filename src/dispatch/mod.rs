//! Inbound message dispatch.
//!
//! The [`Dispatcher`] pops messages from the inbound queue in arrival order
//! and runs the registered [`Action`] for each one as its own task on the
//! blocking pool. A panicking action is caught at that boundary and logged
//! as a [`HandlerFault`]; nothing else is affected. Replies are paginated
//! and queued in order by the task that produced them.

pub mod pagination;
pub mod privmsg;
pub mod registry;

pub use pagination::{max_trailing_len, paginate};
pub use privmsg::{AddressMode, Addressed, PrivmsgRouter, TextHandler};
pub use registry::{Action, ActionRegistry};

use std::sync::Arc;

use slirc_wire::Message;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, trace, warn};

use crate::bot::Bot;
use crate::error::HandlerFault;
use crate::telemetry::{panic_message, spans};

pub struct Dispatcher {
    bot: Arc<Bot>,
    inbound: mpsc::Receiver<Message>,
    outbound: mpsc::Sender<Message>,
    pong: mpsc::Sender<()>,
}

impl Dispatcher {
    /// `pong` is the keepalive correlation hook; it is signalled without
    /// blocking for every inbound PONG.
    pub fn new(
        bot: Arc<Bot>,
        inbound: mpsc::Receiver<Message>,
        outbound: mpsc::Sender<Message>,
        pong: mpsc::Sender<()>,
    ) -> Self {
        Self {
            bot,
            inbound,
            outbound,
            pong,
        }
    }

    /// Run until the inbound queue closes.
    pub async fn run(mut self) {
        while let Some(msg) = self.inbound.recv().await {
            if msg.is_command("PONG") {
                // A full slot already means "PONG seen".
                let _ = self.pong.try_send(());
                trace!("PONG observed");
            }

            let Some(action) = self.bot.actions().get(&msg.command) else {
                trace!(command = %msg.command, "No action registered");
                continue;
            };

            let span = spans::dispatch(&msg.command, msg.sender());
            tokio::spawn(
                invoke(Arc::clone(&self.bot), action, msg, self.outbound.clone()).instrument(span),
            );
        }
        debug!("Inbound queue closed, dispatcher stopped");
    }
}

/// Run one action in isolation and queue its reply.
async fn invoke(
    bot: Arc<Bot>,
    action: Arc<dyn Action>,
    msg: Message,
    outbound: mpsc::Sender<Message>,
) {
    let command = msg.command.clone();
    let handler_bot = Arc::clone(&bot);
    let result = tokio::task::spawn_blocking(move || action.call(&handler_bot, &msg)).await;

    let reply = match result {
        Ok(Some(reply)) => reply,
        Ok(None) => return,
        Err(e) if e.is_panic() => {
            let fault = HandlerFault {
                command,
                message: panic_message(e.into_panic().as_ref()),
            };
            error!(error = %fault, "Handler fault");
            return;
        }
        Err(e) => {
            debug!(command = %command, error = %e, "Handler task cancelled");
            return;
        }
    };

    let chunks = match paginate(&bot.own_prefix(), reply) {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!(command = %command, error = %e, "Dropping unsendable reply");
            return;
        }
    };

    for chunk in chunks {
        if outbound.send(chunk).await.is_err() {
            debug!(command = %command, "Outbound queue closed, dropping reply");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Harness {
        inbound: mpsc::Sender<Message>,
        outbound: mpsc::Receiver<Message>,
        pong: mpsc::Receiver<()>,
    }

    fn start(bot: Arc<Bot>) -> Harness {
        let (inbound_tx, inbound_rx) = mpsc::channel(16);
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (pong_tx, pong_rx) = mpsc::channel(1);
        tokio::spawn(Dispatcher::new(bot, inbound_rx, outbound_tx, pong_tx).run());
        Harness {
            inbound: inbound_tx,
            outbound: outbound_rx,
            pong: pong_rx,
        }
    }

    async fn recv(rx: &mut mpsc::Receiver<Message>) -> Message {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for reply")
            .expect("outbound closed")
    }

    #[tokio::test]
    async fn ping_is_answered() {
        let mut h = start(Bot::new("bot", '!'));
        h.inbound.send(Message::ping("irc.example")).await.unwrap();
        let reply = recv(&mut h.outbound).await;
        assert_eq!(reply, Message::pong("irc.example"));
    }

    #[tokio::test]
    async fn unregistered_command_is_ignored() {
        let bot = Bot::new("bot", '!');
        bot.register("NOTICE", |_: &Bot, _: &Message| Some(Message::privmsg("#c", "seen")));
        let mut h = start(bot);

        h.inbound
            .send(Message::new("WALLOPS", vec![], "hello"))
            .await
            .unwrap();
        h.inbound.send(Message::notice("bot", "hi")).await.unwrap();

        // Only the registered command produced anything.
        assert_eq!(recv(&mut h.outbound).await.trailing, "seen");
        assert!(h.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn panicking_handler_is_isolated() {
        let bot = Bot::new("bot", '!');
        bot.register("TOPIC", |_: &Bot, _: &Message| -> Option<Message> {
            panic!("handler blew up")
        });
        bot.register("NOTICE", |_: &Bot, m: &Message| {
            Some(Message::privmsg("#c", m.trailing.clone()))
        });
        let mut h = start(bot);

        h.inbound
            .send(Message::new("TOPIC", vec!["#c".into()], "x"))
            .await
            .unwrap();
        h.inbound.send(Message::notice("bot", "first")).await.unwrap();
        h.inbound
            .send(Message::new("TOPIC", vec!["#c".into()], "y"))
            .await
            .unwrap();
        h.inbound.send(Message::notice("bot", "second")).await.unwrap();

        let mut seen = vec![
            recv(&mut h.outbound).await.trailing,
            recv(&mut h.outbound).await.trailing,
        ];
        seen.sort();
        assert_eq!(seen, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn long_reply_is_paginated_in_order() {
        let bot = Bot::new("bot", '!');
        let text: String = (0..300).map(|i| format!("w{i} ")).collect();
        let expected = text.trim_end().to_string();
        bot.register("NOTICE", move |_: &Bot, _: &Message| {
            Some(Message::privmsg("#c", text.clone()))
        });
        let mut h = start(bot);

        h.inbound.send(Message::notice("bot", "go")).await.unwrap();

        let mut parts = Vec::new();
        let mut total = 0;
        while total < expected.len() {
            let chunk = recv(&mut h.outbound).await;
            assert_eq!(chunk.args, vec!["#c"]);
            total += chunk.trailing.len() + usize::from(!parts.is_empty());
            parts.push(chunk.trailing);
        }
        assert!(parts.len() > 1);
        assert_eq!(parts.join(" ").trim_end(), expected);
    }

    #[tokio::test]
    async fn oversized_preamble_reply_is_dropped() {
        let bot = Bot::new("bot", '!');
        bot.register("NOTICE", |_: &Bot, _: &Message| {
            Some(Message::privmsg("#".repeat(600), "hi"))
        });
        let mut h = start(bot);

        h.inbound.send(Message::notice("bot", "go")).await.unwrap();
        h.inbound.send(Message::ping("t")).await.unwrap();

        // The PING reply arrives; the oversized reply never does.
        assert_eq!(recv(&mut h.outbound).await, Message::pong("t"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn pong_signals_keepalive_without_blocking() {
        let mut h = start(Bot::new("bot", '!'));

        for _ in 0..3 {
            h.inbound
                .send(Message::new("PONG", vec!["irc.example".into()], "bot"))
                .await
                .unwrap();
        }
        h.inbound.send(Message::ping("after")).await.unwrap();

        // Dispatch kept going even though the signal slot filled up.
        assert_eq!(recv(&mut h.outbound).await, Message::pong("after"));
        assert!(h.pong.try_recv().is_ok());
        assert!(h.pong.try_recv().is_err());
    }

    #[tokio::test]
    async fn own_join_records_prefix() {
        let bot = Bot::new("bot", '!');
        let mut h = start(Arc::clone(&bot));

        h.inbound
            .send(Message::join("#c").with_prefix("someone!u@elsewhere"))
            .await
            .unwrap();
        h.inbound
            .send(Message::join("#c").with_prefix("Bot!bot@host.example"))
            .await
            .unwrap();
        h.inbound.send(Message::ping("sync")).await.unwrap();
        recv(&mut h.outbound).await;

        // JOIN actions may still be running; poll briefly.
        for _ in 0..50 {
            if bot.own_prefix() == "Bot!bot@host.example" {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("own prefix not recorded: {:?}", bot.own_prefix());
    }
}

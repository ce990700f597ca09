//! Network layer: supervised connections to IRC servers.
//!
//! - [`Network`]: cloneable handle to one supervised server connection
//! - [`connection`]: one live socket with its listener, speaker and keepalive
//! - [`handshake`]: the USER/NICK/ghost/MOTD registration machine
//! - [`stream`], [`tls`]: plaintext and TLS transports

pub mod connection;
pub mod handshake;
pub mod stream;
mod supervisor;
pub mod tls;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use slirc_wire::Message;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};

use self::connection::{Channels, Outbox};
use self::supervisor::Supervisor;
use crate::bot::Bot;
use crate::config::NetworkOptions;
use crate::dispatch::Dispatcher;
use crate::error::{BotError, ConnectError};
use crate::telemetry::spans;

/// Capacity of the inbound and outbound queues.
pub const QUEUE_CAPACITY: usize = 64;

/// Lifecycle state of a supervised connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Registering,
    Connected,
}

/// Snapshot published by the supervisor.
///
/// `generation` counts successful connects; it changes exactly when the
/// live connection is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStatus {
    pub state: ConnectionState,
    pub generation: u64,
}

/// Handle to one supervised server connection.
///
/// Cheap to clone. Messages sent while the supervisor is reconnecting wait
/// in the outbound queue and go out on the next connection.
#[derive(Clone)]
pub struct Network {
    name: Arc<str>,
    outbound: mpsc::Sender<Message>,
    status: watch::Receiver<NetworkStatus>,
    shutdown: CancellationToken,
    quit_message: Arc<str>,
    quit_grace: Duration,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Network {
    /// Connect, register and start supervising.
    ///
    /// The first connect attempt is surfaced to the caller; once this
    /// returns `Ok`, every later failure is retried in the background.
    /// Also returns the number of channel JOINs sent.
    pub async fn open(bot: Arc<Bot>, options: NetworkOptions) -> Result<(Self, usize), ConnectError> {
        let name: Arc<str> = Arc::from(options.server.label());
        let span = spans::network(&name, &options.server.endpoint());

        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (pong_tx, pong_rx) = mpsc::channel(1);
        let (status_tx, status_rx) = watch::channel(NetworkStatus::default());
        let shutdown = CancellationToken::new();

        let channels = Channels {
            inbound: inbound_tx,
            outbound: outbound_tx.clone(),
            outbox: Arc::new(tokio::sync::Mutex::new(Outbox::new(outbound_rx))),
            pong: Arc::new(tokio::sync::Mutex::new(pong_rx)),
        };

        let quit_message = Arc::from(options.credentials.quit_message.as_str());
        let quit_grace = options.timing.quit_grace();

        let mut supervisor = Supervisor::new(
            bot.nickname().to_string(),
            options,
            channels,
            status_tx,
            shutdown.clone(),
        );
        let (conn, joined) = supervisor.establish().instrument(span.clone()).await?;

        let dispatcher = Dispatcher::new(bot, inbound_rx, outbound_tx.clone(), pong_tx);
        let tasks = vec![
            tokio::spawn(supervisor.run(conn).instrument(span.clone())),
            tokio::spawn(dispatcher.run().instrument(span)),
        ];

        Ok((
            Self {
                name,
                outbound: outbound_tx,
                status: status_rx,
                shutdown,
                quit_message,
                quit_grace,
                tasks: Arc::new(Mutex::new(tasks)),
            },
            joined,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a message for the server.
    pub async fn send(&self, msg: Message) -> Result<(), BotError> {
        self.outbound
            .send(msg)
            .await
            .map_err(|_| BotError::QueueClosed(self.name.to_string()))
    }

    /// The current `(state, generation)` snapshot.
    pub fn status(&self) -> NetworkStatus {
        *self.status.borrow()
    }

    /// Watch status changes, e.g. to wait for the next generation.
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Graceful shutdown: QUIT, wait for it to flush, then stop everything.
    ///
    /// The supervisor does not reconnect afterwards.
    pub async fn close(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }

        let quit = Message::quit(&*self.quit_message);
        match tokio::time::timeout(self.quit_grace, self.outbound.send(quit)).await {
            Ok(Ok(())) => tokio::time::sleep(self.quit_grace).await,
            Ok(Err(_)) => warn!(network = %self.name, "Outbound queue closed before QUIT"),
            Err(_) => warn!(network = %self.name, "Outbound queue full, closing without QUIT"),
        }

        self.shutdown.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(network = %self.name, error = %e, "Network task failed");
            }
        }
        info!(network = %self.name, "Closed");
    }
}

//! Connection supervisor: dial, register, run, and reconnect forever.
//!
//! Each connect attempt is a straight sequence of steps that either yields a
//! fully registered [`Connection`] or a [`ConnectError`]. The supervisor
//! exclusively owns connection identity: it replaces the live connection
//! wholesale and publishes `(state, generation)` through a `watch` channel.

use futures_util::{SinkExt, StreamExt};
use slirc_wire::IrcCodec;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::connection::{Channels, Connection, Keepalive, Transport};
use super::handshake::{Registration, RegistrationAction, identify_message, join_message};
use super::stream::BotStream;
use super::tls::upgrade_to_tls;
use super::{ConnectionState, NetworkStatus};
use crate::config::{Credentials, NetworkOptions, ServerConfig};
use crate::error::ConnectError;

pub struct Supervisor {
    nickname: String,
    options: NetworkOptions,
    channels: Channels,
    status: watch::Sender<NetworkStatus>,
    shutdown: CancellationToken,
    generation: u64,
}

impl Supervisor {
    pub fn new(
        nickname: String,
        options: NetworkOptions,
        channels: Channels,
        status: watch::Sender<NetworkStatus>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            nickname,
            options,
            channels,
            status,
            shutdown,
            generation: 0,
        }
    }

    fn publish(&self, state: ConnectionState) {
        self.status.send_replace(NetworkStatus {
            state,
            generation: self.generation,
        });
    }

    /// Run one connect sequence.
    ///
    /// Returns the live connection and the number of channel JOINs written.
    pub async fn establish(&mut self) -> Result<(Connection, usize), ConnectError> {
        let server = &self.options.server;
        let timing = &self.options.timing;

        self.publish(ConnectionState::Connecting);
        info!(endpoint = %server.endpoint(), tls = server.tls, "Connecting");
        let stream = tokio::time::timeout(timing.connect_timeout(), dial(server))
            .await
            .map_err(|_| ConnectError::ConnectTimeout(server.endpoint()))??;
        debug!(tls = stream.is_tls(), "Socket open");
        let mut transport = Framed::new(stream, IrcCodec::new());

        self.publish(ConnectionState::Registering);
        tokio::time::timeout(
            timing.registration_timeout(),
            register(&mut transport, &self.nickname, &self.options.credentials),
        )
        .await
        .map_err(|_| ConnectError::RegistrationTimeout)??;

        if let Some(password) = self.options.credentials.password.as_deref() {
            match transport.send(identify_message(password)).await {
                Ok(()) => debug!("Sent NickServ identify"),
                Err(e) => warn!(error = %e, "NickServ identify failed"),
            }
        }

        let joined = join_channels(&mut transport, &server.channels).await;

        self.generation += 1;
        let keepalive = Keepalive {
            nickname: self.nickname.clone(),
            interval: timing.ping_interval(),
            timeout: timing.ping_timeout(),
        };
        let conn = Connection::spawn(transport, self.generation, &self.channels, keepalive);
        self.publish(ConnectionState::Connected);
        info!(generation = self.generation, joined, "Connected");

        Ok((conn, joined))
    }

    /// Supervise `conn`, replacing it after every disconnect, until shutdown.
    pub async fn run(mut self, mut conn: Connection) {
        loop {
            let reason = conn.wait(&self.shutdown).await;
            let generation = conn.generation();
            conn.shutdown().await;
            self.publish(ConnectionState::Disconnected);

            let Some(reason) = reason else {
                info!(generation, "Supervisor stopped");
                return;
            };
            warn!(generation, reason = %reason, "Connection lost");

            conn = match self.reconnect().await {
                Some(conn) => conn,
                None => {
                    info!("Supervisor stopped while reconnecting");
                    return;
                }
            };
        }
    }

    /// Retry the connect sequence at a fixed delay until it succeeds.
    ///
    /// Returns `None` only on shutdown.
    async fn reconnect(&mut self) -> Option<Connection> {
        let delay = self.options.timing.reconnect_delay();
        let shutdown = self.shutdown.clone();
        let mut attempt = 0u64;

        loop {
            attempt += 1;
            tokio::select! {
                _ = shutdown.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            let result = tokio::select! {
                _ = shutdown.cancelled() => return None,
                result = self.establish() => result,
            };

            match result {
                Ok((conn, _)) => return Some(conn),
                Err(e) => {
                    self.publish(ConnectionState::Disconnected);
                    warn!(
                        attempt,
                        error = %e,
                        code = e.error_code(),
                        retry_in = ?delay,
                        "Reconnect failed"
                    );
                }
            }
        }
    }
}

/// Open the socket, wrapping it in TLS when configured.
async fn dial(server: &ServerConfig) -> Result<BotStream, ConnectError> {
    let tcp = TcpStream::connect((server.address.as_str(), server.port)).await?;
    if server.tls {
        let tls = upgrade_to_tls(tcp, &server.address, server.verify_cert).await?;
        Ok(BotStream::Tls(Box::new(tls)))
    } else {
        Ok(BotStream::Plain(tcp))
    }
}

/// Drive the registration machine over the transport.
async fn register(
    transport: &mut Transport,
    nickname: &str,
    credentials: &Credentials,
) -> Result<(), ConnectError> {
    let mut machine = Registration::new(nickname, credentials);
    if perform(transport, machine.start()).await? {
        return Ok(());
    }

    while let Some(frame) = transport.next().await {
        let msg = match frame {
            Ok(Ok(msg)) => msg,
            Ok(Err(e)) => {
                debug!(error = %e, "Dropping malformed line during registration");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        trace!(line = %msg, "[>]");
        if perform(transport, machine.feed(&msg)).await? {
            return Ok(());
        }
    }

    Err(ConnectError::ConnectionClosed)
}

/// Carry out registration actions; `true` once registration is complete.
async fn perform(
    transport: &mut Transport,
    actions: Vec<RegistrationAction>,
) -> Result<bool, ConnectError> {
    for action in actions {
        match action {
            RegistrationAction::Send(msg) => {
                trace!(line = %msg, "[<]");
                transport.send(msg).await?;
            }
            RegistrationAction::Complete => return Ok(true),
            RegistrationAction::Fail(e) => return Err(e),
        }
    }
    Ok(false)
}

async fn join_channels(transport: &mut Transport, entries: &[String]) -> usize {
    let mut joined = 0;
    for entry in entries {
        let Some(join) = join_message(entry) else {
            continue;
        };
        let channel = join.arg(0).unwrap_or_default().to_string();
        match transport.send(join).await {
            Ok(()) => {
                joined += 1;
                debug!(channel = %channel, "Joined");
            }
            Err(e) => warn!(channel = %channel, error = %e, "JOIN failed"),
        }
    }
    joined
}

//! Scripted in-process IRC server.
//!
//! Listens on an ephemeral loopback port; each test drives the accepted
//! connections by hand through [`TestClient`].

use std::time::Duration;

use slirc_bot::{Credentials, NetworkOptions, ServerConfig, TimingConfig};
use tokio::net::TcpListener;
use tokio::time::timeout;

use super::client::TestClient;

/// Name the bot registers the connection under.
pub const NETWORK: &str = "test";

/// A fake server instance.
pub struct TestServer {
    listener: TcpListener,
    port: u16,
}

impl TestServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the bot to (re)connect.
    pub async fn accept(&self) -> anyhow::Result<TestClient> {
        let (stream, _) = timeout(Duration::from_secs(10), self.listener.accept()).await??;
        Ok(TestClient::new(stream))
    }

    /// Options pointing the bot at this server with short timings.
    ///
    /// Keepalive is effectively off unless a test overrides it.
    pub fn options(&self, nickname: &str, channels: &[&str]) -> NetworkOptions {
        let mut server = ServerConfig::new("127.0.0.1", self.port);
        server.name = Some(NETWORK.to_string());
        server.channels = channels.iter().map(|c| c.to_string()).collect();

        NetworkOptions {
            server,
            credentials: Credentials::new(nickname),
            timing: TimingConfig {
                reconnect_delay_secs: 1,
                ping_interval_secs: 3600,
                ping_timeout_secs: 5,
                quit_grace_secs: 1,
                registration_timeout_secs: 5,
                connect_timeout_secs: 5,
            },
        }
    }
}

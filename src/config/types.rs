//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::*;
use super::validation::{self, ValidationError};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ValidationError>),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot identity.
    pub bot: BotConfig,
    /// The server to connect to.
    pub server: ServerConfig,
    /// Reconnect, keepalive and registration timing.
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Per-connection settings derived from this config.
    pub fn network_options(&self) -> NetworkOptions {
        NetworkOptions {
            server: self.server.clone(),
            credentials: self.bot.credentials(),
            timing: self.timing.clone(),
        }
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(content)?;
        validation::validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Nickname to register with.
    pub nickname: String,
    /// Character that addresses the bot in a channel (e.g. `!help`).
    #[serde(default = "default_attention")]
    pub attention: char,
    /// Ident sent with USER. Defaults to the nickname.
    pub username: Option<String>,
    /// Real name sent with USER. Defaults to the nickname.
    pub realname: Option<String>,
    /// NickServ password, used to ghost a stale session and to identify.
    pub password: Option<String>,
    /// Reason sent with QUIT on graceful shutdown.
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
    /// Answer to `version` queries and CTCP VERSION.
    #[serde(default = "default_version")]
    pub version: String,
    /// Answer to `source` queries.
    #[serde(default = "default_source")]
    pub source: String,
}

impl BotConfig {
    /// Registration credentials with defaults filled in.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone().unwrap_or_else(|| self.nickname.clone()),
            realname: self.realname.clone().unwrap_or_else(|| self.nickname.clone()),
            password: self.password.clone().filter(|p| !p.is_empty()),
            quit_message: self.quit_message.clone(),
        }
    }
}

/// Server endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Connection label. Defaults to the address.
    pub name: Option<String>,
    /// Hostname or IP address.
    pub address: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Wrap the socket in TLS.
    #[serde(default)]
    pub tls: bool,
    /// Verify the server certificate (disable only for self-signed test servers).
    #[serde(default = "default_true")]
    pub verify_cert: bool,
    /// Channels to join after registration, as `"#chan"` or `"#chan key"`.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl ServerConfig {
    /// Create a plaintext endpoint with defaults for everything else.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            name: None,
            address: address.into(),
            port,
            tls: false,
            verify_cert: true,
            channels: Vec::new(),
        }
    }

    /// The name this connection is registered under.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }

    /// `host:port` for dialing and logging.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Timing configuration, all values in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    /// Keepalive PING interval.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    /// How long to wait for the PONG after each keepalive PING.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,
    /// Time allowed for QUIT to flush before the socket is closed.
    #[serde(default = "default_quit_grace")]
    pub quit_grace_secs: u64,
    /// Upper bound on the USER/NICK..end-of-MOTD exchange.
    #[serde(default = "default_registration_timeout")]
    pub registration_timeout_secs: u64,
    /// Upper bound on TCP connect plus TLS handshake.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay(),
            ping_interval_secs: default_ping_interval(),
            ping_timeout_secs: default_ping_timeout(),
            quit_grace_secs: default_quit_grace(),
            registration_timeout_secs: default_registration_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl TimingConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn quit_grace(&self) -> Duration {
        Duration::from_secs(self.quit_grace_secs)
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// What the bot registers with on one network, besides its nickname.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub realname: String,
    /// NickServ password; `None` disables ghosting and identify.
    pub password: Option<String>,
    pub quit_message: String,
}

impl Credentials {
    /// Credentials with username and realname equal to the nickname.
    pub fn new(nickname: impl Into<String>) -> Self {
        let nickname = nickname.into();
        Self {
            username: nickname.clone(),
            realname: nickname,
            password: None,
            quit_message: default_quit_message(),
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// Everything needed to open and supervise one connection.
#[derive(Debug, Clone)]
pub struct NetworkOptions {
    pub server: ServerConfig,
    pub credentials: Credentials,
    pub timing: TimingConfig,
}

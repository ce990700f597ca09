//! slirc-bot - Straylight IRC bot substrate.
//!
//! A self-healing IRC client connection with concurrent, fault-isolated
//! command dispatch and reply pagination:
//!
//! - [`network`]: supervised connections that reconnect forever
//! - [`dispatch`]: action registry, PRIVMSG addressing and pagination
//! - [`bot`]: the [`Bot`] aggregate handed to every action
//! - [`config`]: TOML configuration

pub mod bot;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod network;
pub mod telemetry;

pub use bot::Bot;
pub use config::{Config, Credentials, NetworkOptions, ServerConfig, TimingConfig};
pub use dispatch::{Action, AddressMode, TextHandler};
pub use error::{BotError, ConnectError, HandlerFault, PaginationError};
pub use network::{ConnectionState, Network, NetworkStatus};
pub use slirc_wire::{CtcpKind, Message};

//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, BotConfig, ServerConfig, TimingConfig)
//! - [`defaults`]: serde default value functions
//! - [`validation`]: Load-time checks

mod defaults;
mod types;
mod validation;

pub use types::{
    BotConfig, Config, ConfigError, Credentials, NetworkOptions, ServerConfig, TimingConfig,
};
pub use validation::ValidationError;

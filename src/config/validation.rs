//! Configuration validation.
//!
//! Validates configuration at load time to catch common errors early.

use super::Config;
use slirc_wire::NickExt;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bot.nickname is required")]
    MissingNickname,
    #[error("bot.nickname is not a valid nickname: '{0}'")]
    InvalidNickname(String),
    #[error("bot.attention must be a visible character, got {0:?}")]
    InvalidAttention(char),
    #[error("server.address is required")]
    MissingAddress,
    #[error("server.channels entry must start with '#' or '&': '{0}'")]
    InvalidChannel(String),
    #[error("timing.ping_interval_secs must be greater than zero")]
    ZeroPingInterval,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let nick = &config.bot.nickname;
    if nick.is_empty() {
        errors.push(ValidationError::MissingNickname);
    } else if !nick.is_valid_nick() {
        errors.push(ValidationError::InvalidNickname(nick.clone()));
    }

    let attention = config.bot.attention;
    if attention.is_whitespace() || attention.is_control() {
        errors.push(ValidationError::InvalidAttention(attention));
    }

    if config.server.address.trim().is_empty() {
        errors.push(ValidationError::MissingAddress);
    }

    for entry in &config.server.channels {
        if !entry.starts_with(['#', '&']) {
            errors.push(ValidationError::InvalidChannel(entry.clone()));
        }
    }

    if config.timing.ping_interval_secs == 0 {
        errors.push(ValidationError::ZeroPingInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

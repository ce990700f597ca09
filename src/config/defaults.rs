//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Bot Defaults
// =============================================================================

pub fn default_attention() -> char {
    '!'
}

pub fn default_quit_message() -> String {
    "Leaving".to_string()
}

pub fn default_version() -> String {
    concat!("slirc-bot ", env!("CARGO_PKG_VERSION")).to_string()
}

pub fn default_source() -> String {
    env!("CARGO_PKG_REPOSITORY").to_string()
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_port() -> u16 {
    6667
}

// =============================================================================
// Timing Defaults (seconds)
// =============================================================================

pub fn default_reconnect_delay() -> u64 {
    5
}

pub fn default_ping_interval() -> u64 {
    12
}

pub fn default_ping_timeout() -> u64 {
    5
}

pub fn default_quit_grace() -> u64 {
    3
}

pub fn default_registration_timeout() -> u64 {
    60
}

pub fn default_connect_timeout() -> u64 {
    30
}

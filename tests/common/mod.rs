//! Integration test common infrastructure.
//!
//! Provides a scripted fake IRC server and a handle on the bot's side of
//! each accepted connection.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::{NETWORK, TestServer};

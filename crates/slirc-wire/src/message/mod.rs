//! IRC message types, decoding and encoding.
//!
//! - [`types`]: The [`Message`] struct and constructors
//! - [`parse`]: Decoding a raw line into a `Message`
//! - [`serialize`]: Encoding a `Message` back to wire bytes

mod parse;
mod serialize;
mod types;

pub use self::types::Message;

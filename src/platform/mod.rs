//! Embed host transport, player script parsing and payload decryption

pub mod client;
pub mod crypto;
pub mod script;
pub mod secret;

pub use client::*;
pub use script::*;
pub use secret::*;

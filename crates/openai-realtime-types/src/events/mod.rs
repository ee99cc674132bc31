//! Wire-level tagged unions for both directions of the protocol.

pub mod client;
pub mod server;

pub use client::ClientEvent;
pub use server::*;

//! Building blocks of the `realtime` terminal client.

pub mod args;
pub mod render;

//! The `["<command>", payload?, ack_id?]` message protocol (§6.1).

pub mod message;
pub mod stdio;

pub use message::{Inbound, Outbound};

//! Bidirectional message-transport host for the Aletheia knowledge engine
//! (§6.1, §6.2): a line-delimited `["<command>", payload?, ack_id?]` protocol
//! in front of an [`aletheia_core::Engine`], plus the narrator's template-
//! literal helper for turning subjects into inline prose.

pub mod error;
pub mod narrator;
pub mod protocol;
pub mod server;

pub use error::{Result, WorkerError};
pub use protocol::{Inbound, Outbound};
pub use server::Worker;

//! Worker-level errors: transport framing and dispatch failures layered over
//! [`aletheia_core::EngineError`] (§7 propagation policy — the worker stays
//! alive after any of these; only an unknown command is fatal to the loop).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("malformed inbound message: {0}")]
    Malformed(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("no handler registered for command: {0}")]
    NoHandler(String),

    #[error(transparent)]
    Engine(#[from] aletheia_core::EngineError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

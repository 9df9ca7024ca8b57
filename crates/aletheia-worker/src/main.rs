//! Aletheia worker process: runs a [`Worker`] over stdio.

use std::io;

use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use aletheia_worker::protocol::stdio::StdioTransport;
use aletheia_worker::Worker;

fn main() {
    // Logging goes to stderr; stdout is reserved for the message protocol.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    info!("aletheia worker starting on stdio");

    let worker = Worker::new();
    let transport = StdioTransport::new();

    if let Err(e) = transport.run(worker) {
        error!("worker error: {e}");
        std::process::exit(1);
    }

    info!("aletheia worker shutting down");
}

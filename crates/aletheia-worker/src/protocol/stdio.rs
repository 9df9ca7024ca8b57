//! Line-delimited JSON transport over stdin/stdout (§6.1).
//!
//! One message per line, in each direction. Unlike a JSON-RPC transport,
//! there is no request/response correlation baked into framing — correlation
//! is `ack_id`, carried inside the message itself, and an unknown command is
//! fatal to this loop rather than answered with an error message.

use std::io::{self, BufRead, BufReader, Write};

use tracing::{debug, warn};

use super::message::Inbound;
use crate::error::Result;
use crate::server::Worker;

pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }

    /// Runs the worker over stdio until stdin closes or a command proves
    /// unknown. Malformed lines are logged and skipped; they do not end the
    /// loop, since the host may just have sent a message this worker
    /// predates.
    pub fn run(self, mut worker: Worker) -> Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let reader = BufReader::new(stdin.lock());
        let mut stdout = stdout.lock();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            debug!("received: {} bytes", line.len());

            let value: serde_json::Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    warn!("failed to parse inbound line: {e}");
                    continue;
                }
            };
            let inbound = match Inbound::try_from(value) {
                Ok(i) => i,
                Err(e) => {
                    warn!("malformed message: {e}");
                    continue;
                }
            };

            let outbound = worker.dispatch(inbound)?;
            for message in outbound {
                let json = message.into_json();
                let rendered = serde_json::to_string(&json)?;
                debug!("sending: {} bytes", rendered.len());
                writeln!(stdout, "{rendered}")?;
            }
            stdout.flush()?;
        }

        Ok(())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

//! The worker: an [`Engine`] plus a command dispatch table (§6.1).
//!
//! Built-ins (`ping`, `start`) are handled directly; everything else —
//! `look` included — goes through [`Worker::handler_register`], the same
//! seam the narrator uses to add its own verbs. An unknown command is fatal
//! to the transport loop (§6.1, §7): the worker itself stays alive, but the
//! caller must reconnect.

use std::collections::{HashMap, VecDeque};

use aletheia_core::{Engine, MindId};
use serde_json::Value as Json;
use tracing::instrument;

use crate::error::{Result, WorkerError};
use crate::protocol::message::{Inbound, Outbound};

pub type Handler = Box<dyn FnMut(&mut Worker, Option<Json>) -> Result<Json> + Send>;

pub struct Worker {
    pub engine: Engine,
    pub world: Option<MindId>,
    handlers: HashMap<String, Handler>,
    outbox: VecDeque<Outbound>,
}

impl Worker {
    pub fn new() -> Self {
        let mut worker = Worker { engine: Engine::new(), world: None, handlers: HashMap::new(), outbox: VecDeque::new() };
        worker.handler_register("look", Box::new(Worker::handle_look));
        worker
    }

    /// Narrator hook: `handler_register` (§6.1) for any command beyond the
    /// two built-ins dispatch handles directly.
    pub fn handler_register(&mut self, command: impl Into<String>, handler: Handler) {
        self.handlers.insert(command.into(), handler);
    }

    pub fn push_outbound(&mut self, message: Outbound) {
        self.outbox.push_back(message);
    }

    /// Dispatches one inbound message and drains whatever it pushed to the
    /// outbox, in emission order, with the `ack` (if requested) always last.
    #[instrument(skip(self, inbound), fields(command = %inbound.command))]
    pub fn dispatch(&mut self, inbound: Inbound) -> Result<Vec<Outbound>> {
        let result = match inbound.command.as_str() {
            "ping" => Ok(Json::String("pong".into())),
            "start" => self.handle_start(inbound.payload),
            other => {
                let mut handler = self
                    .handlers
                    .remove(other)
                    .ok_or_else(|| WorkerError::UnknownCommand(other.to_string()))?;
                let outcome = handler(self, inbound.payload);
                self.handlers.insert(other.to_string(), handler);
                outcome
            }
        }?;

        let mut messages: Vec<Outbound> = self.outbox.drain(..).collect();
        if let Some(ack_id) = inbound.ack_id {
            messages.push(Outbound::ack(ack_id, result));
        }
        Ok(messages)
    }

    /// `start` (§6.1): world init. Creates the world mind, locks its origin
    /// state, and clears the host's display.
    fn handle_start(&mut self, _payload: Option<Json>) -> Result<Json> {
        let world = self.engine.create_world_mind(Some("world".into()), None)?;
        let origin = self.engine.mind(world)?.origin_state;
        self.engine.lock_state(origin)?;
        self.world = Some(world);
        self.push_outbound(Outbound::main_clear());
        Ok(Json::Null)
    }

    /// Default narrator `look` (§6.1): empty-room narration until a caller
    /// overrides it with `handler_register`. Exists so `start` always has
    /// somewhere to land a first `main_add`.
    fn handle_look(&mut self, _payload: Option<Json>) -> Result<Json> {
        let narration = crate::say!["You see nothing of note."];
        let json = serde_json::to_value(&narration)?;
        self.push_outbound(Outbound::main_add(json.clone()));
        Ok(json)
    }
}

impl Default for Worker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ping_acks_pong() {
        let mut worker = Worker::new();
        let inbound = Inbound::try_from(json!(["ping", null, 1])).unwrap();
        let messages = worker.dispatch(inbound).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].clone().into_json(), json!(["ack", 1, "pong"]));
    }

    #[test]
    fn start_creates_a_world_and_clears_the_screen() {
        let mut worker = Worker::new();
        let inbound = Inbound::try_from(json!(["start"])).unwrap();
        let messages = worker.dispatch(inbound).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].clone().into_json(), json!(["main_clear"]));
        assert!(worker.world.is_some());
    }

    #[test]
    fn unknown_command_is_an_error() {
        let mut worker = Worker::new();
        let inbound = Inbound::try_from(json!(["dance"])).unwrap();
        assert!(worker.dispatch(inbound).is_err());
    }

    #[test]
    fn registered_handler_dispatches_and_acks() {
        let mut worker = Worker::new();
        worker.handler_register("echo", Box::new(|_w: &mut Worker, payload: Option<Json>| Ok(payload.unwrap_or(Json::Null))));
        let inbound = Inbound::try_from(json!(["echo", "hi", 2])).unwrap();
        let messages = worker.dispatch(inbound).unwrap();
        assert_eq!(messages[0].clone().into_json(), json!(["ack", 2, "hi"]));
    }
}

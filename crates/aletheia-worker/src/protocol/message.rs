//! Wire shapes for the worker protocol (§6.1).
//!
//! Inbound: `["<command>", payload?, ack_id?]`. A bare JSON string is
//! normalized to `[str]` — a command with neither payload nor ack.
//! Outbound: any JSON array, e.g. `["ack", ack_id, result]`,
//! `["main_clear"]`, `["main_add", …]`, `["header_set", …]`.

use serde_json::Value as Json;

use crate::error::{Result, WorkerError};

#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub command: String,
    pub payload: Option<Json>,
    pub ack_id: Option<Json>,
}

impl TryFrom<Json> for Inbound {
    type Error = WorkerError;

    fn try_from(value: Json) -> Result<Self> {
        let elems = match value {
            Json::String(s) => vec![Json::String(s)],
            Json::Array(elems) => elems,
            other => {
                return Err(WorkerError::Malformed(format!(
                    "expected a command string or `[command, payload?, ack_id?]` array, got {other}"
                )));
            }
        };

        let mut elems = elems.into_iter();
        let command = match elems.next() {
            Some(Json::String(s)) => s,
            Some(other) => {
                return Err(WorkerError::Malformed(format!("command must be a string, got {other}")));
            }
            None => return Err(WorkerError::Malformed("empty message".into())),
        };
        let payload = elems.next().filter(|v| !v.is_null());
        let ack_id = elems.next().filter(|v| !v.is_null());

        Ok(Inbound { command, payload, ack_id })
    }
}

/// A raw outbound array. Built via the constructors below rather than
/// assembled ad hoc, so every emitted shape stays in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound(pub Json);

impl Outbound {
    pub fn ack(ack_id: Json, result: Json) -> Self {
        Outbound(Json::Array(vec![Json::String("ack".into()), ack_id, result]))
    }

    pub fn main_clear() -> Self {
        Outbound(Json::Array(vec![Json::String("main_clear".into())]))
    }

    pub fn main_add(narration: Json) -> Self {
        Outbound(Json::Array(vec![Json::String("main_add".into()), narration]))
    }

    pub fn header_set(value: Json) -> Self {
        Outbound(Json::Array(vec![Json::String("header_set".into()), value]))
    }

    pub fn into_json(self) -> Json {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_string_normalizes_to_command_only() {
        let inbound = Inbound::try_from(json!("ping")).unwrap();
        assert_eq!(inbound.command, "ping");
        assert!(inbound.payload.is_none());
        assert!(inbound.ack_id.is_none());
    }

    #[test]
    fn full_triple_parses_payload_and_ack() {
        let inbound = Inbound::try_from(json!(["look", {"direction": "north"}, 7])).unwrap();
        assert_eq!(inbound.command, "look");
        assert_eq!(inbound.payload, Some(json!({"direction": "north"})));
        assert_eq!(inbound.ack_id, Some(json!(7)));
    }

    #[test]
    fn empty_array_is_malformed() {
        assert!(Inbound::try_from(json!([])).is_err());
    }

    #[test]
    fn ack_wraps_command_id_and_result() {
        let out = Outbound::ack(json!(7), json!("done"));
        assert_eq!(out.into_json(), json!(["ack", 7, "done"]));
    }
}

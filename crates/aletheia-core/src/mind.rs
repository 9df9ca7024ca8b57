//! Mind — a container of states rooted at an origin (§4.9).
//!
//! `resolve_template`, `compose`, and `recall_by_archetype` all need to walk
//! other minds and beliefs through the registry, so they live as
//! [`crate::engine::Engine`] methods (`engine::mind_ops`) rather than
//! inherent methods here. This module holds the shape: a mind is a flat set
//! of states plus a parent pointer, never a subclassed hierarchy — the three
//! cosmos roles (Logos/Eidos/Materia) are tracked as a fixed set of
//! `MindId`s on `Engine` (see `engine::cosmos`), not as a variant of `Mind`
//! itself (see DESIGN.md).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{MindId, StateId, TraittypeId};
use crate::value::TraitValue;

/// Collection of states sharing one lineage (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mind {
    pub id: MindId,
    pub label: Option<String>,
    pub parent: Option<MindId>,
    pub origin_state: StateId,
    pub states: Vec<StateId>,
    /// The `trait: Traittype→?` field from §3, carried inert: no §4 operation
    /// reads it beyond round-tripping it through serialization. See
    /// DESIGN.md for why it is not given invented behavior.
    pub mind_traits: HashMap<TraittypeId, TraitValue>,
}

impl Mind {
    pub fn new(id: MindId, label: Option<String>, parent: Option<MindId>, origin_state: StateId) -> Self {
        Self {
            id,
            label,
            parent,
            origin_state,
            states: vec![origin_state],
            mind_traits: HashMap::new(),
        }
    }

    pub fn record_state(&mut self, state: StateId) {
        if !self.states.contains(&state) {
            self.states.push(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mind_starts_with_only_its_origin_state() {
        let mind = Mind::new(MindId(1), Some("npc-bartender".into()), None, StateId(10));
        assert_eq!(mind.states, vec![StateId(10)]);
        assert_eq!(mind.parent, None);
    }

    #[test]
    fn record_state_is_idempotent() {
        let mut mind = Mind::new(MindId(1), None, None, StateId(10));
        mind.record_state(StateId(11));
        mind.record_state(StateId(11));
        assert_eq!(mind.states, vec![StateId(10), StateId(11)]);
    }
}

//! Belief — versioned data node (§4.6).
//!
//! A belief is pure data; the algorithms that read and write it
//! (`get_trait`, `rev_trait`, `lock`, construction from a template) all need
//! registry-wide context — other beliefs, archetypes, traittypes, states —
//! so they live as [`crate::engine::Engine`] methods rather than inherent
//! methods here (see `engine::belief_ops`). This module only holds the shape
//! and the parts of it that genuinely need no outside context.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ArchetypeId, BeliefId, MindId, StateId, TraittypeId};
use crate::subject::Subject;
use crate::value::TraitValue;

/// A belief's bases may be other beliefs (inheritance/versioning) or bare
/// archetypes (classification with no inherited own-trait data) — §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeliefBase {
    Belief(BeliefId),
    Archetype(ArchetypeId),
}

/// Versioned data node: bases, own traits, ownership (§3).
///
/// `in_mind = None ∧ origin_state = None` designates a *shared* belief (a
/// prototype or cultural-knowledge container) — invariant from §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Belief {
    pub id: BeliefId,
    pub subject: Subject,
    pub in_mind: Option<MindId>,
    pub origin_state: Option<StateId>,
    pub bases: Vec<BeliefBase>,
    /// Presence of a key means "own value set" — including an explicit
    /// `TraitValue::Null` (blocks composition) or an explicit empty array
    /// (composition proceeds adding nothing of its own, §8 invariant 4).
    /// Absence means "unset": composable traits fully defer to bases.
    pub own_traits: HashMap<TraittypeId, TraitValue>,
    pub locked: bool,
    pub label: Option<String>,
}

impl Belief {
    pub fn new(
        id: BeliefId,
        subject: Subject,
        in_mind: Option<MindId>,
        origin_state: Option<StateId>,
        bases: Vec<BeliefBase>,
    ) -> Self {
        Self {
            id,
            subject,
            in_mind,
            origin_state,
            bases,
            own_traits: HashMap::new(),
            locked: false,
            label: None,
        }
    }

    pub fn is_shared(&self) -> bool {
        self.in_mind.is_none() && self.origin_state.is_none()
    }

    /// Belief-typed bases only, in declaration order.
    pub fn belief_bases(&self) -> impl Iterator<Item = BeliefId> + '_ {
        self.bases.iter().filter_map(|b| match b {
            BeliefBase::Belief(id) => Some(*id),
            BeliefBase::Archetype(_) => None,
        })
    }

    /// Archetype-typed bases only, in declaration order.
    pub fn archetype_bases(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        self.bases.iter().filter_map(|b| match b {
            BeliefBase::Archetype(id) => Some(*id),
            BeliefBase::Belief(_) => None,
        })
    }
}

/// Raw template for constructing a belief (`from_template` / `create_shared_from_template`, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeliefTemplate {
    /// Bases given either by label (resolved against the registry) or id.
    pub bases: Vec<String>,
    pub traits: HashMap<String, crate::traittype::RawValue>,
    pub label: Option<String>,
}

impl BeliefTemplate {
    pub fn new() -> Self {
        Self {
            bases: Vec::new(),
            traits: HashMap::new(),
            label: None,
        }
    }

    pub fn with_base(mut self, label: impl Into<String>) -> Self {
        self.bases.push(label.into());
        self
    }

    pub fn with_trait(mut self, trait_label: impl Into<String>, value: crate::traittype::RawValue) -> Self {
        self.traits.insert(trait_label.into(), value);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl Default for BeliefTemplate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_belief_and_archetype_bases() {
        let belief = Belief::new(
            BeliefId(1),
            Subject::new(1.into()),
            None,
            None,
            vec![
                BeliefBase::Belief(BeliefId(2)),
                BeliefBase::Archetype(ArchetypeId(9)),
            ],
        );
        assert_eq!(belief.belief_bases().collect::<Vec<_>>(), vec![BeliefId(2)]);
        assert_eq!(
            belief.archetype_bases().collect::<Vec<_>>(),
            vec![ArchetypeId(9)]
        );
    }

    #[test]
    fn shared_belief_has_no_mind_or_origin() {
        let belief = Belief::new(BeliefId(1), Subject::new(1.into()), None, None, vec![]);
        assert!(belief.is_shared());
    }
}

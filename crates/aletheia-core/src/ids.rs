//! Newtype identifiers for every arena-resident entity.
//!
//! Beliefs, states, minds, archetypes and traittypes all live in arenas owned
//! by [`crate::engine::Engine`] and reference each other only by id — never by
//! shared pointer. This keeps the cyclic belief/state/mind graph representable
//! without `Rc`/`RefCell` bookkeeping.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// The raw numeric value, as it appears in the serialization format.
            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

entity_id!(BeliefId, "Process-unique id of a [`crate::belief::Belief`].");
entity_id!(StateId, "Process-unique id of a [`crate::state::State`].");
entity_id!(MindId, "Process-unique id of a [`crate::mind::Mind`].");
entity_id!(
    ArchetypeId,
    "Process-unique id of a [`crate::archetype::Archetype`]."
);
entity_id!(
    TraittypeId,
    "Process-unique id of a [`crate::traittype::Traittype`]."
);

/// A subject-level id (`sid`), stable across every version of the belief it
/// identifies. Distinct from the process-unique `_id` every object also
/// carries — a belief's `_id` changes with every version; its subject's `sid`
/// never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sid(pub u64);

impl Sid {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Sid {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

//! Subject — canonical identity handle for a versioned entity (§4.3).
//!
//! A subject carries no trait data of its own; it is the stable anchor that
//! successive belief versions share. Per the pointer-graph design note it is
//! "a thin newtype over sid" at the value layer — the mutable bookkeeping
//! (`ground_mind`, and which belief is currently registered under it) lives
//! on [`crate::engine::Engine`], keyed by [`Sid`].

use serde::{Deserialize, Serialize};

use crate::ids::{MindId, Sid};

/// Identity-only handle. Serializes as the bare `sid` integer (§6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject {
    pub sid: Sid,
}

impl Subject {
    pub fn new(sid: Sid) -> Self {
        Self { sid }
    }
}

/// Engine-side bookkeeping for one subject. `ground_mind` scopes the subject
/// so a label may be reused across minds (invariant: a label is unique
/// *within* the sid/archetype namespace it was registered in, not globally
/// across every mind).
#[derive(Debug, Clone)]
pub struct SubjectRecord {
    pub sid: Sid,
    pub ground_mind: Option<MindId>,
}

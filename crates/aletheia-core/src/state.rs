//! State — immutable bitemporal delta node over a base (§4.7, §4.8).
//!
//! A state's own fields are plain data; every algorithm that reads or
//! mutates one in a registry-aware way (`branch`, `lock`, `get_beliefs`,
//! `rev_trait`) lives on [`crate::engine::Engine`] (`engine::state_ops`,
//! `engine::rev_index`). This module carries the shape, the
//! `insert`/`remove`/`touched` bookkeeping an unlocked state accumulates
//! before it is locked, and the handful of pure queries that need no
//! registry at all.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ids::{BeliefId, MindId, StateId, TraittypeId};
use crate::subject::Subject;

/// The tail of the `State` sum type (§9: "a single sum type with a common
/// header ... and a tail discriminated on time-ness / composition").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StateKind {
    /// A state with a temporal coordinate and an ordinary `base` chain.
    Temporal { tt: Option<u64>, vt: Option<u64> },
    /// `tt = vt = null`, no base chain — used for eternal/prototype states.
    Timeless,
    /// Read-only composition of several locked component states (§4.8).
    /// `base` is unused for this variant; `rev_base` queries fan out across
    /// every entry in `component_states` instead of following one pointer.
    Convergence { component_states: Vec<StateId> },
}

/// Bitemporal immutable delta: the visible belief set at `self` is
/// `insert ∖ remove`, recursively unioned through `base` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    pub in_mind: MindId,
    pub kind: StateKind,
    /// Base state in this same mind's chain. `None` for a mind's origin
    /// state and for every `Convergence` (which uses `component_states`
    /// instead). Always `Some` and locked for a `Temporal`/`Timeless` state
    /// created via `branch` (§3, invariant 5).
    pub base: Option<StateId>,
    /// The state in the *parent* mind that this state observes (§3).
    pub ground_state: Option<StateId>,
    /// The subject whose viewpoint this state represents, if any.
    pub self_subject: Option<Subject>,
    /// Set when this state was produced by `perceive` from a world state.
    pub about_state: Option<StateId>,
    pub insert: Vec<BeliefId>,
    pub remove: Vec<BeliefId>,
    /// Every state branched directly from this one, recorded at branch time
    /// (already-locked states only ever gain entries here, never lose one).
    pub branches: Vec<StateId>,
    pub locked: bool,
    /// Reverse-index skip pointers (§4.7), populated at `lock()` time:
    /// for each `(subject, traittype)` pair touched by this state, the
    /// nearest ancestor state on the chain that also touched it.
    pub rev_base: HashMap<Subject, HashMap<TraittypeId, Option<StateId>>>,
    /// `(subject, traittype)` pairs touched by this state's own
    /// insert/remove while unlocked. Consumed by `Engine::lock_state` to
    /// populate `rev_base`, then left in place as a record of what this
    /// state itself touched (distinct from what it points past).
    pub touched: HashSet<(Subject, TraittypeId)>,
    /// Lazily filled `subject -> belief` cache, populated only once this
    /// state is locked (§9, "must never be populated on unlocked ones").
    #[serde(skip)]
    pub subject_cache: HashMap<Subject, Option<BeliefId>>,
}

impl State {
    pub fn new_temporal(
        id: StateId,
        in_mind: MindId,
        base: Option<StateId>,
        ground_state: Option<StateId>,
        tt: Option<u64>,
        vt: Option<u64>,
    ) -> Self {
        Self {
            id,
            in_mind,
            kind: StateKind::Temporal { tt, vt },
            base,
            ground_state,
            self_subject: None,
            about_state: None,
            insert: Vec::new(),
            remove: Vec::new(),
            branches: Vec::new(),
            locked: false,
            rev_base: HashMap::new(),
            touched: HashSet::new(),
            subject_cache: HashMap::new(),
        }
    }

    pub fn new_timeless(id: StateId, in_mind: MindId) -> Self {
        Self {
            id,
            in_mind,
            kind: StateKind::Timeless,
            base: None,
            ground_state: None,
            self_subject: None,
            about_state: None,
            insert: Vec::new(),
            remove: Vec::new(),
            branches: Vec::new(),
            locked: false,
            rev_base: HashMap::new(),
            touched: HashSet::new(),
            subject_cache: HashMap::new(),
        }
    }

    pub fn new_convergence(id: StateId, in_mind: MindId, component_states: Vec<StateId>) -> Self {
        Self {
            id,
            in_mind,
            kind: StateKind::Convergence { component_states },
            base: None,
            ground_state: None,
            self_subject: None,
            about_state: None,
            insert: Vec::new(),
            remove: Vec::new(),
            branches: Vec::new(),
            locked: false,
            rev_base: HashMap::new(),
            touched: HashSet::new(),
            subject_cache: HashMap::new(),
        }
    }

    pub fn is_convergence(&self) -> bool {
        matches!(self.kind, StateKind::Convergence { .. })
    }

    pub fn component_states(&self) -> &[StateId] {
        match &self.kind {
            StateKind::Convergence { component_states } => component_states,
            _ => &[],
        }
    }

    pub fn tt(&self) -> Option<u64> {
        match self.kind {
            StateKind::Temporal { tt, .. } => tt,
            _ => None,
        }
    }

    pub fn vt(&self) -> Option<u64> {
        match self.kind {
            StateKind::Temporal { vt, .. } => vt,
            _ => None,
        }
    }

    /// Record that this (unlocked) state's insert/remove touched `(subject,
    /// traittype)` — called while resolving/validating a trait value during
    /// `set_trait`/`insert_beliefs` (§4.7 maintenance). No-op once locked.
    pub fn mark_touched(&mut self, subject: Subject, traittype: TraittypeId) {
        if !self.locked {
            self.touched.insert((subject, traittype));
        }
    }

    /// `insert` and `remove` share no belief id — §3 invariant 6, checked at
    /// lock time.
    pub fn insert_remove_disjoint(&self) -> bool {
        let removed: HashSet<_> = self.remove.iter().collect();
        !self.insert.iter().any(|b| removed.contains(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convergence_has_no_base_but_has_components() {
        let s = State::new_convergence(StateId(5), MindId(1), vec![StateId(1), StateId(2)]);
        assert!(s.is_convergence());
        assert_eq!(s.base, None);
        assert_eq!(s.component_states(), &[StateId(1), StateId(2)]);
    }

    #[test]
    fn timeless_has_no_temporal_coordinate() {
        let s = State::new_timeless(StateId(1), MindId(1));
        assert_eq!(s.tt(), None);
        assert_eq!(s.vt(), None);
    }

    #[test]
    fn disjointness_check_catches_overlap() {
        let mut s = State::new_temporal(StateId(1), MindId(1), None, None, Some(1), None);
        s.insert.push(BeliefId(1));
        s.remove.push(BeliefId(1));
        assert!(!s.insert_remove_disjoint());
    }

    #[test]
    fn mark_touched_is_noop_once_locked() {
        let mut s = State::new_temporal(StateId(1), MindId(1), None, None, Some(1), None);
        s.locked = true;
        s.mark_touched(Subject::new(1.into()), TraittypeId(1));
        assert!(s.touched.is_empty());
    }
}

//! State mutation, branch, lock, and forward reads (§4.7).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::belief::BeliefTemplate;
use crate::error::{EngineError, Result};
use crate::ids::{BeliefId, MindId, Sid, StateId};
use crate::state::{State, StateKind};
use crate::subject::Subject;
use crate::value::TraitValue;

use super::Engine;

impl Engine {
    /// §4.9 `create_state`: a fresh unlocked state with the given ground,
    /// rooted at no base (used for a mind's origin state, and whenever a
    /// mind needs a first state not branched from one of its own).
    pub fn create_state(
        &mut self,
        in_mind: MindId,
        ground_state: Option<StateId>,
        tt: Option<u64>,
        vt: Option<u64>,
    ) -> Result<StateId> {
        self.mind(in_mind)?;
        let id = StateId(self.next_id());
        let state = State::new_temporal(id, in_mind, None, ground_state, tt, vt);
        self.states.insert(id, state);
        if let Some(mind) = self.minds.get_mut(&in_mind) {
            mind.record_state(id);
        }
        Ok(id)
    }

    /// §4.7 `branch`: asserts `base` is locked, creates a new unlocked child
    /// in the same mind with `base = self` (§3 invariant 5).
    pub fn branch(
        &mut self,
        base: StateId,
        ground_state: Option<StateId>,
        tt: Option<u64>,
    ) -> Result<StateId> {
        let base_state = self.state(base)?;
        if !base_state.locked {
            return Err(EngineError::unlocked_base(base));
        }
        let in_mind = base_state.in_mind;
        let id = StateId(self.next_id());
        let state = State::new_temporal(id, in_mind, Some(base), ground_state, tt, None);
        self.states.insert(id, state);
        if let Some(mind) = self.minds.get_mut(&in_mind) {
            mind.record_state(id);
        }
        if let Some(base_state) = self.states.get_mut(&base) {
            base_state.branches.push(id);
        }
        Ok(id)
    }

    /// §4.8: a read-only composition of several locked component states.
    /// Every component must already be locked.
    pub fn create_convergence(
        &mut self,
        in_mind: MindId,
        component_states: Vec<StateId>,
        ground_state: Option<StateId>,
    ) -> Result<StateId> {
        for component in &component_states {
            if !self.state(*component)?.locked {
                return Err(EngineError::state(format!(
                    "convergence component state #{component} must be locked"
                )));
            }
        }
        let id = StateId(self.next_id());
        let mut state = State::new_convergence(id, in_mind, component_states);
        state.ground_state = ground_state;
        self.states.insert(id, state);
        if let Some(mind) = self.minds.get_mut(&in_mind) {
            mind.record_state(id);
        }
        Ok(id)
    }

    /// §4.7 `add_belief`: create a belief from a template and insert it.
    pub fn add_belief(&mut self, state_id: StateId, template: BeliefTemplate) -> Result<BeliefId> {
        let in_mind = self.state(state_id)?.in_mind;
        let belief_id = self.belief_from_template(Some(in_mind), template, Some(state_id))?;
        self.insert_beliefs(state_id, vec![belief_id])?;
        Ok(belief_id)
    }

    /// §4.7 `add_beliefs`: create and insert several beliefs in one call.
    pub fn add_beliefs(
        &mut self,
        state_id: StateId,
        templates: Vec<BeliefTemplate>,
    ) -> Result<Vec<BeliefId>> {
        templates
            .into_iter()
            .map(|t| self.add_belief(state_id, t))
            .collect()
    }

    /// §4.7 `insert_beliefs`: append to the state's insert list, validating
    /// mind ownership, then mark every `(subject, traittype)` pair this
    /// belief's resolved traits touch (§4.7 reverse-index maintenance).
    pub fn insert_beliefs(&mut self, state_id: StateId, beliefs: Vec<BeliefId>) -> Result<()> {
        self.assert_unlocked_state(state_id)?;
        let in_mind = self.state(state_id)?.in_mind;
        for belief_id in &beliefs {
            let belief = self.belief(*belief_id)?;
            if belief.in_mind != Some(in_mind) {
                return Err(EngineError::state(format!(
                    "belief #{belief_id} does not belong to mind #{in_mind}, cannot insert into state #{state_id}"
                )));
            }
        }
        for belief_id in beliefs {
            let state = self.states.get_mut(&state_id).expect("checked above");
            if !state.insert.contains(&belief_id) {
                state.insert.push(belief_id);
            }
            self.mark_touched_for_belief(state_id, belief_id)?;
        }
        Ok(())
    }

    /// §4.7 `remove_beliefs`. Errors on a [`crate::state::StateKind::Convergence`]
    /// (§4.8: "MAY NOT receive mutating remove operations").
    pub fn remove_beliefs(&mut self, state_id: StateId, beliefs: Vec<BeliefId>) -> Result<()> {
        self.assert_unlocked_state(state_id)?;
        if self.state(state_id)?.is_convergence() {
            return Err(EngineError::state(format!(
                "state #{state_id} is a Convergence and does not support remove_beliefs"
            )));
        }
        for belief_id in beliefs {
            self.belief(belief_id)?;
            let state = self.states.get_mut(&state_id).expect("checked above");
            if !state.remove.contains(&belief_id) {
                state.remove.push(belief_id);
            }
            self.mark_touched_for_belief(state_id, belief_id)?;
        }
        Ok(())
    }

    /// §4.7 `replace_beliefs`: for each belief with Belief bases, remove
    /// those bases then insert the new belief.
    pub fn replace_beliefs(&mut self, state_id: StateId, beliefs: Vec<BeliefId>) -> Result<()> {
        for belief_id in beliefs {
            let old_bases: Vec<BeliefId> = self.belief(belief_id)?.belief_bases().collect();
            if !old_bases.is_empty() {
                self.remove_beliefs(state_id, old_bases)?;
            }
            self.insert_beliefs(state_id, vec![belief_id])?;
        }
        Ok(())
    }

    fn assert_unlocked_state(&self, state_id: StateId) -> Result<()> {
        if self.state(state_id)?.locked {
            return Err(EngineError::locked_state(state_id));
        }
        Ok(())
    }

    /// §4.7 `lock`: a worklist (§9 "implement lock as an explicit worklist,
    /// not recursion") that locks `state_id`, then cascades into locking
    /// every state any just-locked belief's Mind-valued traits ground.
    #[tracing::instrument(skip(self))]
    pub fn lock_state(&mut self, state_id: StateId) -> Result<()> {
        let mut queue = VecDeque::new();
        queue.push_back(state_id);
        let mut locked_count = 0usize;
        while let Some(id) = queue.pop_front() {
            if self.state(id)?.locked {
                continue;
            }
            self.lock_state_single(id, &mut queue)?;
            locked_count += 1;
        }
        tracing::info!(state = state_id.raw(), cascade = locked_count, "state(s) locked");
        Ok(())
    }

    fn lock_state_single(&mut self, id: StateId, queue: &mut VecDeque<StateId>) -> Result<()> {
        if !self.state(id)?.insert_remove_disjoint() {
            return Err(EngineError::invariant(format!(
                "state #{id} inserts and removes the same belief before locking"
            )));
        }
        let insert_ids = self.state(id)?.insert.clone();
        self.states.get_mut(&id).expect("exists").locked = true;
        self.finalize_skip_pointers(id)?;
        for belief_id in insert_ids {
            self.lock_belief_cascade(belief_id, id, queue)?;
        }
        Ok(())
    }

    fn lock_belief_cascade(
        &mut self,
        belief_id: BeliefId,
        state_id: StateId,
        queue: &mut VecDeque<StateId>,
    ) -> Result<()> {
        if self.belief(belief_id)?.locked {
            return Ok(());
        }
        self.beliefs.get_mut(&belief_id).expect("exists").locked = true;
        let mut mind_ids = Vec::new();
        for value in self.belief(belief_id)?.own_traits.values() {
            collect_mind_ids(value, &mut mind_ids);
        }
        for mind_id in mind_ids {
            let states = self.mind(mind_id)?.states.clone();
            for s in states {
                if self.state(s)?.ground_state == Some(state_id) {
                    queue.push_back(s);
                }
            }
        }
        Ok(())
    }

    /// §4.7 `get_beliefs`: the visible belief set at `state_id`, resolved
    /// through the base chain (or, for a Convergence, through its
    /// components) — see `get_beliefs_map` for the algorithm.
    pub fn get_beliefs(&self, state_id: StateId) -> Result<Vec<BeliefId>> {
        let mut ids: Vec<BeliefId> = self.get_beliefs_map(state_id)?.into_values().collect();
        ids.sort_by_key(|b| b.raw());
        Ok(ids)
    }

    pub(crate) fn get_beliefs_map(&self, state_id: StateId) -> Result<HashMap<Sid, BeliefId>> {
        let mut resolved = HashMap::new();
        let mut seen = HashSet::new();
        let mut removed = HashSet::new();
        let mut cur = Some(state_id);
        while let Some(id) = cur {
            let s = self.state(id)?;
            if s.is_convergence() {
                let mut conv = HashMap::new();
                for component in s.component_states() {
                    for (sid, bid) in self.get_beliefs_map(*component)? {
                        conv.insert(sid, bid);
                    }
                }
                for bid in &s.insert {
                    let subj = self.belief(*bid)?.subject.sid;
                    conv.insert(subj, *bid);
                }
                for (sid, bid) in conv {
                    if !seen.contains(&sid) && !removed.contains(&sid) {
                        resolved.insert(sid, bid);
                    }
                }
                break;
            }
            for bid in &s.insert {
                let subj = self.belief(*bid)?.subject.sid;
                if !seen.contains(&subj) && !removed.contains(&subj) {
                    resolved.insert(subj, *bid);
                    seen.insert(subj);
                }
            }
            for bid in &s.remove {
                let subj = self.belief(*bid)?.subject.sid;
                if !seen.contains(&subj) {
                    removed.insert(subj);
                }
            }
            cur = s.base;
        }
        Ok(resolved)
    }

    /// §4.7 `get_belief_by_subject`: resolved form of `get_beliefs`, with a
    /// lazy `subject -> belief` cache on locked states (including cached
    /// `None` misses, §9 memory discipline).
    pub fn get_belief_by_subject(
        &mut self,
        state_id: StateId,
        subject: Subject,
    ) -> Result<Option<BeliefId>> {
        if let Some(state) = self.states.get(&state_id) {
            if state.locked {
                if let Some(cached) = state.subject_cache.get(&subject) {
                    return Ok(*cached);
                }
            }
        }
        let result = self.get_beliefs_map(state_id)?.get(&subject.sid).copied();
        if let Some(state) = self.states.get_mut(&state_id) {
            if state.locked {
                state.subject_cache.insert(subject, result);
            }
        }
        Ok(result)
    }

    /// §4.7 `get_belief_by_label`: label → sid → belief.
    pub fn get_belief_by_label(
        &mut self,
        state_id: StateId,
        label: &str,
    ) -> Result<Option<BeliefId>> {
        let Some(sid) = self.sid_by_label.get(label).copied() else {
            return Ok(None);
        };
        self.get_belief_by_subject(state_id, Subject::new(sid))
    }

    /// §4.7 `get_active_state_by_host`: the state in `subject`'s own mind
    /// whose `ground_state` lies on `state_id`'s ancestor chain, branching a
    /// fresh unlocked child if the latest match is locked and `state_id` is
    /// newer.
    pub fn get_active_state_by_host(
        &mut self,
        state_id: StateId,
        subject: Subject,
    ) -> Result<StateId> {
        let host_mind = self
            .subjects
            .get(&subject.sid)
            .and_then(|r| r.ground_mind)
            .ok_or_else(|| {
                EngineError::resolution(format!(
                    "subject {} has no ground mind to host a state",
                    subject.sid
                ))
            })?;
        let ancestors = self.ancestor_chain(state_id)?;
        let host_states = self.mind(host_mind)?.states.clone();
        let mut candidates: Vec<StateId> = host_states
            .into_iter()
            .filter(|s| {
                self.states
                    .get(s)
                    .and_then(|s| s.ground_state)
                    .map(|g| ancestors.contains(&g))
                    .unwrap_or(false)
            })
            .collect();
        candidates.sort_by_key(|s| s.raw());
        let latest = candidates.last().copied().ok_or_else(|| {
            EngineError::resolution(format!(
                "no state in mind #{host_mind} grounds any ancestor of state #{state_id}"
            ))
        })?;
        let latest_state = self.state(latest)?;
        let query_tt = self.state(state_id)?.tt();
        let is_newer = match (query_tt, latest_state.tt()) {
            (Some(q), Some(l)) => q > l,
            (Some(_), None) => true,
            _ => false,
        };
        if latest_state.locked && is_newer {
            self.branch(latest, None, query_tt)
        } else {
            Ok(latest)
        }
    }

    /// The chain of state ids from `state_id` up through `base` pointers
    /// (inclusive), stopping at the origin or at a Convergence (whose
    /// "ancestors" fan out rather than chain).
    pub(crate) fn ancestor_chain(&self, state_id: StateId) -> Result<Vec<StateId>> {
        let mut chain = Vec::new();
        let mut cur = Some(state_id);
        while let Some(id) = cur {
            chain.push(id);
            let s = self.state(id)?;
            if s.is_convergence() {
                break;
            }
            cur = s.base;
        }
        Ok(chain)
    }
}

fn collect_mind_ids(value: &TraitValue, out: &mut Vec<MindId>) {
    match value {
        TraitValue::Mind(m) => out.push(*m),
        TraitValue::Array(items) => {
            for item in items {
                collect_mind_ids(item, out);
            }
        }
        TraitValue::Fuzzy(f) => {
            for alt in &f.alternatives {
                collect_mind_ids(&alt.value, out);
            }
        }
        _ => {}
    }
}

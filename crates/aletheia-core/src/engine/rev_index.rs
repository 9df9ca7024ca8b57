//! The `rev_trait` skip-list query and its maintenance (§4.7).
//!
//! Walking the full base chain to answer "which beliefs reference subject S
//! via traittype T at state X" would cost O(chain length) per query. Instead
//! every locked state records, per touched `(subject, traittype)` pair, a
//! skip pointer to the nearest ancestor that also touched it (`State::rev_base`).
//! `rev_trait` follows that shortcut chain instead of the full base chain.

use std::collections::HashSet;

use crate::error::Result;
use crate::ids::{BeliefId, StateId, TraittypeId};
use crate::subject::Subject;
use crate::value::TraitValue;

use super::Engine;

impl Engine {
    /// Marks every `(subject, traittype)` pair this belief *references*,
    /// counting inherited and composed values — not only its own directly-set
    /// traits (§4.7: "counting inherited, composed, and own values") — on the
    /// state that is inserting (or removing) it. Called from
    /// `insert_beliefs`/`remove_beliefs`.
    pub(crate) fn mark_touched_for_belief(
        &mut self,
        state_id: StateId,
        belief_id: BeliefId,
    ) -> Result<()> {
        let mut marks: Vec<(Subject, TraittypeId)> = Vec::new();
        for traittype_id in self.get_slots(belief_id)? {
            if !self.traittype(traittype_id)?.is_subject_reference() {
                continue;
            }
            let value = self.get_trait(belief_id, state_id, traittype_id)?;
            let mut subjects = Vec::new();
            value.subjects(&mut subjects);
            for subject in subjects {
                marks.push((subject, traittype_id));
            }
        }
        if let Some(state) = self.states.get_mut(&state_id) {
            for (subject, traittype_id) in marks {
                state.mark_touched(subject, traittype_id);
            }
        }
        Ok(())
    }

    /// At lock time (§4.7): for every `(subject, traittype)` this state
    /// touched, find the nearest ancestor on its `base` chain that also
    /// touched it and record that as the skip pointer (`None` if no ancestor
    /// touched it, meaning the chain bottoms out here).
    pub(crate) fn finalize_skip_pointers(&mut self, state_id: StateId) -> Result<()> {
        let state = self.state(state_id)?;
        let touched: Vec<(Subject, TraittypeId)> = state.touched.iter().copied().collect();
        let base = state.base;

        let mut skips = std::collections::HashMap::new();
        for (subject, traittype_id) in touched {
            let skip = self.nearest_touching_ancestor(base, subject, traittype_id)?;
            skips
                .entry(subject)
                .or_insert_with(std::collections::HashMap::new)
                .insert(traittype_id, skip);
        }
        if let Some(state) = self.states.get_mut(&state_id) {
            for (subject, by_traittype) in skips {
                state.rev_base.entry(subject).or_default().extend(by_traittype);
            }
        }
        Ok(())
    }

    fn nearest_touching_ancestor(
        &self,
        mut cur: Option<StateId>,
        subject: Subject,
        traittype_id: TraittypeId,
    ) -> Result<Option<StateId>> {
        while let Some(id) = cur {
            let state = self.state(id)?;
            if state.touched.contains(&(subject, traittype_id)) {
                return Ok(Some(id));
            }
            cur = state.base;
        }
        Ok(None)
    }

    /// §4.7 `rev_trait`: every belief visible at `state_id` whose resolved
    /// value for `traittype_id` references `subject` (directly, through a
    /// Fuzzy alternative, or through an array element). Follows skip
    /// pointers on locked ancestors instead of walking every intermediate
    /// state, and fans out across every component of a Convergence.
    pub fn rev_trait(
        &self,
        state_id: StateId,
        subject: Subject,
        traittype_id: TraittypeId,
    ) -> Result<Vec<BeliefId>> {
        let mut candidates = Vec::new();
        self.collect_rev_candidates(state_id, subject, traittype_id, &mut candidates)?;

        let visible = self.get_beliefs_map(state_id)?;
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for belief_id in candidates {
            let belief = self.belief(belief_id)?;
            let Some(&visible_id) = visible.get(&belief.subject.sid) else {
                continue;
            };
            if !seen.insert(visible_id) {
                continue;
            }
            let value = self.get_trait(visible_id, state_id, traittype_id)?;
            if references_subject(&value, subject) {
                out.push(visible_id);
            }
        }
        out.sort_by_key(|b| b.raw());
        Ok(out)
    }

    fn collect_rev_candidates(
        &self,
        state_id: StateId,
        subject: Subject,
        traittype_id: TraittypeId,
        out: &mut Vec<BeliefId>,
    ) -> Result<()> {
        let state = self.state(state_id)?;
        if state.is_convergence() {
            for component in state.component_states() {
                self.collect_rev_candidates(*component, subject, traittype_id, out)?;
            }
            return Ok(());
        }

        for belief_id in &state.insert {
            let belief = self.belief(*belief_id)?;
            if belief.subject == subject {
                continue;
            }
            let value = self.get_trait(*belief_id, state_id, traittype_id)?;
            if references_subject(&value, subject) {
                out.push(*belief_id);
            }
        }

        let skip = state
            .rev_base
            .get(&subject)
            .and_then(|by_traittype| by_traittype.get(&traittype_id).copied());
        match skip {
            Some(Some(ancestor)) => self.collect_rev_candidates(ancestor, subject, traittype_id, out)?,
            Some(None) => {}
            None => {
                if let Some(base) = state.base {
                    self.collect_rev_candidates(base, subject, traittype_id, out)?;
                }
            }
        }
        Ok(())
    }
}

fn references_subject(value: &TraitValue, subject: Subject) -> bool {
    let mut out = Vec::new();
    value.subjects(&mut out);
    out.contains(&subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::{BeliefBase, BeliefTemplate};
    use crate::traittype::{RawValue, StructKind, TraitKind};

    #[test]
    fn rev_trait_finds_direct_reference() {
        let mut engine = Engine::new();
        let location_tt = engine
            .register_traittype(
                "location",
                TraitKind::Struct(StructKind::Subject),
                None,
                None,
                false,
                None,
                None,
                false,
            )
            .unwrap();
        engine
            .register_archetype("Actor", vec![], vec![(location_tt, None)])
            .unwrap();
        let mind = engine.create_world_mind(Some("test".into()), None).unwrap();
        let state = engine.mind(mind).unwrap().origin_state;

        let room = engine
            .add_belief(state, BeliefTemplate::new().with_base("Actor").with_label("room"))
            .unwrap();
        let room_subject = engine.belief(room).unwrap().subject;
        let npc = engine
            .add_belief(
                state,
                BeliefTemplate::new()
                    .with_base("Actor")
                    .with_label("npc")
                    .with_trait("location", RawValue::Label("room".into())),
            )
            .unwrap();
        engine.lock_state(state).unwrap();

        let traittype = engine.traittype_by_label("location").unwrap();
        let refs = engine.rev_trait(state, room_subject, traittype).unwrap();
        assert_eq!(refs, vec![npc]);
    }

    #[test]
    fn rev_trait_finds_composed_reference_through_a_base() {
        // A belief with no own value for a composable trait still resolves
        // one by composing its bases (§4.5 `get_derived_value`); rev_trait
        // must surface it as a referencing belief too (§4.7 maintenance:
        // "counting inherited, composed, and own values").
        let mut engine = Engine::new();
        engine.register_archetype("Item", vec![], vec![]).unwrap();
        let inventory_tt = engine
            .register_traittype(
                "inventory",
                TraitKind::Struct(StructKind::Subject),
                Some(crate::traittype::Container::Array),
                None,
                true,
                None,
                None,
                false,
            )
            .unwrap();
        engine
            .register_archetype("Holder", vec![], vec![(inventory_tt, None)])
            .unwrap();
        let mind = engine.create_world_mind(Some("test".into()), None).unwrap();
        let state = engine.mind(mind).unwrap().origin_state;

        let sword = engine
            .add_belief(state, BeliefTemplate::new().with_base("Item").with_label("sword"))
            .unwrap();
        let sword_subject = engine.belief(sword).unwrap().subject;
        let base_holder = engine
            .add_belief(
                state,
                BeliefTemplate::new()
                    .with_base("Holder")
                    .with_label("base_holder")
                    .with_trait("inventory", RawValue::Array(vec![RawValue::Label("sword".into())])),
            )
            .unwrap();
        let child_holder = engine
            .belief_from(
                Some(mind),
                vec![BeliefBase::Belief(base_holder)],
                vec![],
                Some(state),
            )
            .unwrap();
        engine.insert_beliefs(state, vec![child_holder]).unwrap();
        engine.lock_state(state).unwrap();

        let refs = engine.rev_trait(state, sword_subject, inventory_tt).unwrap();
        assert!(refs.contains(&base_holder), "base holder sets its own inventory");
        assert!(
            refs.contains(&child_holder),
            "child holder composes sword into its inventory purely by inheritance"
        );
    }
}

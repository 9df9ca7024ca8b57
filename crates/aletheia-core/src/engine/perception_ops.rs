//! `recognize`/`identify`/`perceive`/`learn_from`/`learn_about` (§4.10).
//!
//! All five operate on an observer's own unlocked state. Tree-pruning
//! (recognized nodes are not re-walked, modality filtering stops descent
//! into traits outside the observer's configured set) keeps `perceive` from
//! re-copying a world it has already integrated.

use std::collections::HashSet;

use crate::belief::BeliefBase;
use crate::error::Result;
use crate::ids::{BeliefId, StateId};
use crate::subject::Subject;
use crate::traittype::{Modality, RawValue};
use crate::value::TraitValue;

use super::Engine;

/// The belief produced by `perceive`: an `EventPerception` wrapping the
/// subjects of every knowledge belief it touched (`content`, §4.10.3).
#[derive(Debug, Clone)]
pub struct EventPerception {
    pub belief: BeliefId,
    pub subjects: Vec<Subject>,
}

impl Engine {
    /// §4.10.1 `recognize`: up to `max_candidates` beliefs in `state`'s chain
    /// whose `@about` trait names `target.sid`, most-recent first.
    pub fn recognize(&mut self, state: StateId, target: Subject) -> Result<Vec<BeliefId>> {
        let about_tt = self.about_traittype()?;
        let candidates = self.rev_trait(state, target, about_tt)?;
        let mut out: Vec<BeliefId> = candidates.into_iter().rev().collect();
        out.truncate(self.config.max_candidates);
        Ok(out)
    }

    /// §4.10.2 `identify`: locate beliefs already in `state`'s chain that
    /// could plausibly *be* `perceived` — same archetypes, and every
    /// certain/particular Subject trait they share also matches.
    pub fn identify(&mut self, state: StateId, perceived: BeliefId) -> Result<Vec<BeliefId>> {
        let archetypes = self.get_archetypes(perceived)?;
        let own_traits = self.belief(perceived)?.own_traits.clone();

        let discriminator = own_traits.iter().find_map(|(tt_id, value)| {
            let traittype = self.traittypes.get(tt_id)?;
            if traittype.is_subject_reference() {
                value.as_subject().map(|s| (*tt_id, s))
            } else {
                None
            }
        });

        let mut candidates: Vec<BeliefId> = if let Some((tt_id, subject)) = discriminator {
            self.rev_trait(state, subject, tt_id)?
        } else {
            self.get_beliefs(state)?
                .into_iter()
                .filter(|b| {
                    self.get_archetypes(*b)
                        .map(|a| a.iter().any(|x| archetypes.contains(x)))
                        .unwrap_or(false)
                })
                .collect()
        };

        candidates.retain(|candidate| {
            *candidate != perceived
                && self
                    .all_traits_match(*candidate, perceived)
                    .unwrap_or(false)
        });
        candidates.reverse();
        candidates.truncate(self.config.max_candidates);
        Ok(candidates)
    }

    /// §4.10 `_all_traits_match`: every trait present on both beliefs must be
    /// equal (Subject by sid; Fuzzy matches if the concrete value lies among
    /// its alternatives).
    pub(crate) fn all_traits_match(&self, a: BeliefId, b: BeliefId) -> Result<bool> {
        let a = self.belief(a)?;
        let b = self.belief(b)?;
        for (tt_id, a_value) in &a.own_traits {
            if let Some(b_value) = b.own_traits.get(tt_id) {
                if !a_value.matches(b_value) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// §4.10.3 `perceive`: version-or-create a knowledge belief per observed
    /// world belief, filtered to the observer's modality set, and wrap the
    /// result subjects in a fresh `EventPerception`.
    pub fn perceive(&mut self, state: StateId, world_beliefs: Vec<BeliefId>) -> Result<EventPerception> {
        let modalities: HashSet<Modality> = self.config.default_modalities.iter().cloned().collect();
        let mut subjects = Vec::new();
        let mut seen = HashSet::new();
        for world_belief in world_beliefs {
            self.perceive_one(state, world_belief, &modalities, &mut subjects, &mut seen)?;
        }
        self.wrap_event_perception(state, subjects)
    }

    fn perceive_one(
        &mut self,
        state: StateId,
        world_belief: BeliefId,
        modalities: &HashSet<Modality>,
        subjects: &mut Vec<Subject>,
        seen: &mut HashSet<BeliefId>,
    ) -> Result<()> {
        if !seen.insert(world_belief) {
            return Ok(());
        }
        let subject = self.belief(world_belief)?.subject;

        if let Some(recognized) = self.recognize(state, subject)?.first().copied() {
            if self.is_fresh_and_matching(state, recognized, world_belief)? {
                subjects.push(subject);
                return Ok(());
            }
        }

        let perceptible = self.perceptible_traits(world_belief, state, modalities)?;
        let candidates = self.candidate_perceived_shell(world_belief, &perceptible)?;
        let existing = self.identify(state, candidates)?;
        self.discard_shell(candidates)?;

        let about_tt = self.about_traittype()?;
        let knowledge_id = if existing.len() == 1 {
            let base = existing[0];
            let id = self.new_belief(Some(self.state(state)?.in_mind), None, vec![BeliefBase::Belief(base)], Some(state))?;
            self.apply_perceptible_traits(id, &perceptible, about_tt, subject, Some(state))?;
            id
        } else {
            let id = self.new_belief(Some(self.state(state)?.in_mind), None, vec![], Some(state))?;
            self.apply_perceptible_traits(id, &perceptible, about_tt, subject, Some(state))?;
            id
        };
        self.insert_beliefs(state, vec![knowledge_id])?;
        subjects.push(self.belief(knowledge_id)?.subject);

        for (_, value) in &perceptible {
            self.walk_nested(state, value, modalities, subjects, seen)?;
        }
        Ok(())
    }

    fn walk_nested(
        &mut self,
        state: StateId,
        value: &TraitValue,
        modalities: &HashSet<Modality>,
        subjects: &mut Vec<Subject>,
        seen: &mut HashSet<BeliefId>,
    ) -> Result<()> {
        let mut referenced = Vec::new();
        value.subjects(&mut referenced);
        for subject in referenced {
            if let Some(&belief_id) = self.belief_by_subject.get(&subject.sid).and_then(|v| v.last()) {
                self.perceive_one(state, belief_id, modalities, subjects, seen)?;
            }
        }
        Ok(())
    }

    fn is_fresh_and_matching(&self, state: StateId, recognized: BeliefId, world_belief: BeliefId) -> Result<bool> {
        let memory_tt = self.belief(recognized)?.origin_state.and_then(|s| self.states.get(&s)).and_then(|s| s.tt());
        let world_tt = self.state(state)?.tt();
        let fresh = match (world_tt, memory_tt) {
            (Some(w), Some(m)) => w <= m,
            _ => true,
        };
        Ok(fresh && self.all_traits_match(recognized, world_belief)?)
    }

    /// Traits on `belief_id` whose traittype's `exposure` lies in `modalities`
    /// (§4.10.3, perceptible subtree).
    fn perceptible_traits(
        &self,
        belief_id: BeliefId,
        state: StateId,
        modalities: &HashSet<Modality>,
    ) -> Result<Vec<(crate::ids::TraittypeId, TraitValue)>> {
        let mut out = Vec::new();
        for (tt_id, value) in self.get_traits(belief_id, state)? {
            if let Ok(traittype) = self.traittype(tt_id) {
                let visible = traittype
                    .exposure
                    .as_ref()
                    .map(|m| modalities.contains(m))
                    .unwrap_or(true);
                if visible {
                    out.push((tt_id, value));
                }
            }
        }
        Ok(out)
    }

    /// A throwaway unlocked belief carrying only the perceptible traits,
    /// used purely to drive `identify`'s comparison — removed by the caller
    /// immediately after.
    fn candidate_perceived_shell(
        &mut self,
        world_belief: BeliefId,
        perceptible: &[(crate::ids::TraittypeId, TraitValue)],
    ) -> Result<BeliefId> {
        let bases = self.belief(world_belief)?.bases.clone();
        let id = self.new_belief(None, None, bases, None)?;
        if let Some(belief) = self.beliefs.get_mut(&id) {
            for (tt_id, value) in perceptible {
                belief.own_traits.insert(*tt_id, value.clone());
            }
        }
        Ok(id)
    }

    /// Removes a throwaway `candidate_perceived_shell` belief and its
    /// registry entries entirely — it never observed a state and must leave
    /// no trace (no phantom subject, no dangling `belief_by_subject` row).
    fn discard_shell(&mut self, belief_id: BeliefId) -> Result<()> {
        let sid = self.belief(belief_id)?.subject.sid;
        self.beliefs.remove(&belief_id);
        if let Some(ids) = self.belief_by_subject.get_mut(&sid) {
            ids.retain(|&id| id != belief_id);
            if ids.is_empty() {
                self.belief_by_subject.remove(&sid);
            }
        }
        self.subjects.remove(&sid);
        Ok(())
    }

    fn apply_perceptible_traits(
        &mut self,
        belief_id: BeliefId,
        perceptible: &[(crate::ids::TraittypeId, TraitValue)],
        about_tt: crate::ids::TraittypeId,
        about_subject: Subject,
        creator_state: Option<StateId>,
    ) -> Result<()> {
        let _ = creator_state;
        if let Some(belief) = self.beliefs.get_mut(&belief_id) {
            belief.own_traits.insert(about_tt, TraitValue::Subject(about_subject));
            for (tt_id, value) in perceptible {
                belief.own_traits.insert(*tt_id, value.clone());
            }
        }
        Ok(())
    }

    fn wrap_event_perception(&mut self, state: StateId, subjects: Vec<Subject>) -> Result<EventPerception> {
        let archetype_id = self.event_perception_archetype()?;
        let about_tt = self.about_traittype()?;
        let content_tt = self.traittype_by_label("content")?;
        let in_mind = self.state(state)?.in_mind;
        let id = self.new_belief(Some(in_mind), None, vec![BeliefBase::Archetype(archetype_id)], Some(state))?;
        let content = TraitValue::Array(subjects.iter().map(|s| TraitValue::Subject(*s)).collect());
        if let Some(belief) = self.beliefs.get_mut(&id) {
            belief.own_traits.insert(content_tt, content);
        }
        let _ = about_tt;
        self.insert_beliefs(state, vec![id])?;
        Ok(EventPerception { belief: id, subjects })
    }

    /// §4.10.4 `learn_from`: re-run the version-or-create flow over every
    /// subject in an already-produced `EventPerception`, without re-wrapping
    /// it (idempotent on an unchanged perception — `identify`/`recognize`
    /// naturally return the same belief and no new version is created).
    pub fn learn_from(&mut self, state: StateId, perception: &EventPerception) -> Result<()> {
        let modalities: HashSet<Modality> = self.config.default_modalities.iter().cloned().collect();
        let mut subjects = Vec::new();
        let mut seen = HashSet::new();
        for subject in &perception.subjects {
            if let Some(&belief_id) = self.belief_by_subject.get(&subject.sid).and_then(|v| v.last()) {
                self.perceive_one(state, belief_id, &modalities, &mut subjects, &mut seen)?;
            }
        }
        Ok(())
    }

    /// §4.10.5 `learn_about`: copy named traits from `belief` directly into
    /// (a new version of) the observer's recognized belief for the same
    /// subject, bypassing the perception wrapper entirely.
    pub fn learn_about(
        &mut self,
        state: StateId,
        belief_id: BeliefId,
        trait_labels: &[String],
    ) -> Result<BeliefId> {
        let subject = self.belief(belief_id)?.subject;
        let about_tt = self.about_traittype()?;
        let recognized = self.recognize(state, subject)?.first().copied();

        let mut traits = Vec::with_capacity(trait_labels.len());
        for label in trait_labels {
            let tt_id = self.traittype_by_label(label)?;
            let source_state = self
                .belief(belief_id)?
                .origin_state
                .unwrap_or(state);
            let value = self.get_trait(belief_id, source_state, tt_id)?;
            traits.push((label.clone(), super::mind_ops::value_to_raw(value)));
        }

        let bases = match recognized {
            Some(existing) => vec![BeliefBase::Belief(existing)],
            None => vec![],
        };
        let in_mind = self.state(state)?.in_mind;
        let knowledge_id = self.belief_from(Some(in_mind), bases, traits, Some(state))?;
        self.set_trait(knowledge_id, about_tt, RawValue::SubjectRef(subject), Some(state))?;
        self.insert_beliefs(state, vec![knowledge_id])?;
        Ok(knowledge_id)
    }
}

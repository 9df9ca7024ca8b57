//! Mind creation, template resolution, composition, recall (§4.9).

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::fuzzy::{Fuzzy, FuzzyAlternative};
use crate::ids::{ArchetypeId, MindId, StateId, TraittypeId};
use crate::mind::Mind;
use crate::subject::Subject;
use crate::traittype::RawValue;
use crate::value::TraitValue;

use super::Engine;

impl Engine {
    /// Bare mind construction: a fresh id, a fresh unlocked origin state,
    /// parented wherever the caller wants (used internally by
    /// `create_world_mind` and `resolve_mind_template`).
    pub fn create_mind(
        &mut self,
        label: Option<String>,
        parent: Option<MindId>,
        ground_state: Option<StateId>,
    ) -> Result<MindId> {
        if let Some(p) = parent {
            self.mind(p)?;
        }
        let mind_id = MindId(self.next_id());
        let state_id = StateId(self.next_id());
        let state = crate::state::State::new_temporal(state_id, mind_id, None, ground_state, None, None);
        self.states.insert(state_id, state);
        let mind = Mind::new(mind_id, label, parent, state_id);
        self.minds.insert(mind_id, mind);
        Ok(mind_id)
    }

    /// A world mind, parented under `Materia` (or under `parent` if given —
    /// e.g. a child world nested under another world's mind via a Mind trait).
    pub fn create_world_mind(&mut self, label: Option<String>, parent: Option<MindId>) -> Result<MindId> {
        let parent = parent.unwrap_or(self.cosmos.materia);
        self.create_mind(label, Some(parent), None)
    }

    /// §4.9 `Mind::resolve_template`: a plain `label -> [trait names]` map
    /// names, per label, a belief visible in `creator_state` whose listed
    /// traits are copied (already-resolved, subject-dereferenced) into a
    /// fresh knowledge-belief in a newly minted mind. The mind's origin
    /// state grounds on `creator_state` and observes `owner_subject`.
    pub fn resolve_mind_template(
        &mut self,
        outer_mind: MindId,
        spec: HashMap<String, Vec<String>>,
        owner_subject: Subject,
        creator_state: StateId,
    ) -> Result<MindId> {
        self.mind(outer_mind)?;
        let mind_id = self.create_mind(None, Some(outer_mind), Some(creator_state))?;
        let origin = self.mind(mind_id)?.origin_state;
        if let Some(state) = self.states.get_mut(&origin) {
            state.self_subject = Some(owner_subject);
        }

        let mut labels: Vec<&String> = spec.keys().collect();
        labels.sort();
        for label in labels {
            let trait_names = &spec[label];
            let source_belief = self
                .get_belief_by_label(creator_state, label)?
                .ok_or_else(|| {
                    EngineError::resolution(format!(
                        "mind template names '{label}', not visible at state #{creator_state}"
                    ))
                })?;
            let mut traits = Vec::with_capacity(trait_names.len());
            for name in trait_names {
                let tt_id = self.traittype_by_label(name)?;
                let value = self.get_trait(source_belief, creator_state, tt_id)?;
                traits.push((name.clone(), value_to_raw(value)));
            }
            let known_subject = self.belief(source_belief)?.subject;
            let id = self.belief_from(
                Some(mind_id),
                vec![],
                traits,
                Some(origin),
            )?;
            let sid = self.get_or_create_sid(known_subject.sid, Some(mind_id));
            let _ = sid;
            if let Some(label_text) = self.belief_label(source_belief)? {
                let _ = self.set_belief_label(id, format!("{label_text}@{mind_id}"));
            }
            self.insert_beliefs(origin, vec![id])?;
        }
        Ok(mind_id)
    }

    /// §4.9 `Mind::compose`: several bases each contribute a Mind-valued
    /// trait; fold them into one read-only [`crate::state::StateKind::Convergence`]
    /// mind whose origin state composes every contributing mind's origin
    /// state.
    pub fn compose_minds(&mut self, in_mind: MindId, minds: Vec<MindId>) -> Result<MindId> {
        for m in &minds {
            self.mind(*m)?;
        }
        let component_states: Vec<StateId> = minds
            .iter()
            .map(|m| self.mind(*m).map(|m| m.origin_state))
            .collect::<Result<_>>()?;
        for s in &component_states {
            if !self.state(*s)?.locked {
                self.lock_state(*s)?;
            }
        }
        let composed_mind = self.create_mind(None, Some(in_mind), None)?;
        let origin = self.mind(composed_mind)?.origin_state;
        let convergence = self.create_convergence(composed_mind, component_states, None)?;
        if let Some(m) = self.minds.get_mut(&composed_mind) {
            m.record_state(convergence);
        }
        let _ = origin;
        Ok(composed_mind)
    }

    /// §4.9 `Mind::recall_by_archetype`: over every state branching from
    /// `ground_state` whose `tt` matches `tick`, scan beliefs carrying
    /// `archetype_label`, group by subject, and for each requested trait
    /// accumulate a Fuzzy aggregate of what each branch observed.
    pub fn recall_by_archetype(
        &self,
        ground_state: StateId,
        archetype_label: &str,
        tick: Option<u64>,
        trait_names: &[String],
    ) -> Result<Vec<(Subject, Vec<(TraittypeId, TraitValue)>)>> {
        let archetype_id = self.archetype_by_label(archetype_label)?;
        let trait_ids: Vec<TraittypeId> = trait_names
            .iter()
            .map(|n| self.traittype_by_label(n))
            .collect::<Result<_>>()?;

        let branches = self.branches_matching_tick(ground_state, tick)?;

        let mut by_subject: HashMap<Subject, HashMap<TraittypeId, Vec<(TraitValue, f64)>>> =
            HashMap::new();
        for branch in branches {
            for belief_id in self.get_beliefs(branch)? {
                if !self.belief_carries(belief_id, archetype_id)? {
                    continue;
                }
                let subject = self.belief(belief_id)?.subject;
                for &tt_id in &trait_ids {
                    let value = self.get_trait(belief_id, branch, tt_id)?;
                    if value.is_null() {
                        continue;
                    }
                    by_subject
                        .entry(subject)
                        .or_default()
                        .entry(tt_id)
                        .or_default()
                        .push((value, 1.0));
                }
            }
        }

        let mut out = Vec::new();
        let mut subjects: Vec<Subject> = by_subject.keys().copied().collect();
        subjects.sort();
        for subject in subjects {
            let mut observations: Vec<(TraittypeId, TraitValue)> = Vec::new();
            for &tt_id in &trait_ids {
                let Some(observed) = by_subject.get(&subject).and_then(|m| m.get(&tt_id)) else {
                    continue;
                };
                observations.push((tt_id, aggregate_observations(observed)));
            }
            out.push((subject, observations));
        }
        Ok(out)
    }

    fn belief_carries(&self, belief_id: crate::ids::BeliefId, archetype_id: ArchetypeId) -> Result<bool> {
        Ok(self.get_archetypes(belief_id)?.contains(&archetype_id))
    }

    fn branches_matching_tick(&self, ground_state: StateId, tick: Option<u64>) -> Result<Vec<StateId>> {
        let ground = self.state(ground_state)?;
        let mut out = Vec::new();
        for branch in &ground.branches {
            let b = self.state(*branch)?;
            if tick.is_none() || b.tt() == tick {
                out.push(*branch);
            }
        }
        Ok(out)
    }
}

pub(crate) fn value_to_raw(value: TraitValue) -> RawValue {
    match value {
        TraitValue::Null => RawValue::Null,
        TraitValue::String(s) => RawValue::String(s),
        TraitValue::Number(n) => RawValue::Number(n),
        TraitValue::Boolean(b) => RawValue::Boolean(b),
        TraitValue::Subject(s) => RawValue::SubjectRef(s),
        TraitValue::Fuzzy(f) => RawValue::Fuzzy(f),
        TraitValue::Array(items) => RawValue::Array(items.into_iter().map(value_to_raw).collect()),
        // Mind/State structural values have no raw template form; they are
        // copied as Null placeholders rather than attempted re-resolution.
        TraitValue::Mind(_) | TraitValue::State(_) => RawValue::Null,
    }
}

fn aggregate_observations(observed: &[(TraitValue, f64)]) -> TraitValue {
    if observed.len() == 1 {
        return observed[0].0.clone();
    }
    let share = 1.0 / observed.len() as f64;
    let alternatives = observed
        .iter()
        .map(|(value, _)| FuzzyAlternative {
            value: Box::new(value.clone()),
            certainty: share,
        })
        .collect();
    TraitValue::Fuzzy(Fuzzy { alternatives })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::BeliefTemplate;
    use crate::traittype::{StructKind, TraitKind};

    #[test]
    fn world_mind_parents_under_materia() {
        let mut engine = Engine::new();
        let mind = engine.create_world_mind(Some("riverbend".into()), None).unwrap();
        assert_eq!(engine.mind(mind).unwrap().parent, Some(engine.cosmos().materia));
    }

    #[test]
    fn resolve_mind_template_copies_named_traits() {
        let mut engine = Engine::new();
        let mood_tt = engine
            .register_traittype(
                "mood",
                TraitKind::Literal(crate::traittype::Primitive::String),
                None,
                None,
                false,
                None,
                None,
                false,
            )
            .unwrap();
        engine
            .register_traittype(
                "knowledge",
                TraitKind::Struct(StructKind::Mind),
                None,
                None,
                false,
                None,
                None,
                false,
            )
            .unwrap();
        engine.register_archetype("Actor", vec![], vec![(mood_tt, None)]).unwrap();
        let mind = engine.create_world_mind(Some("test".into()), None).unwrap();
        let state = engine.mind(mind).unwrap().origin_state;
        let bartender = engine
            .add_belief(
                state,
                BeliefTemplate::new()
                    .with_base("Actor")
                    .with_label("bartender")
                    .with_trait("mood", crate::traittype::RawValue::String("cheerful".into())),
            )
            .unwrap();
        let _ = bartender;

        let mut spec = HashMap::new();
        spec.insert("bartender".to_string(), vec!["mood".to_string()]);
        let child_mind = engine
            .resolve_mind_template(mind, spec, Subject::new(99.into()), state)
            .unwrap();
        let child_origin = engine.mind(child_mind).unwrap().origin_state;
        let beliefs = engine.get_beliefs(child_origin).unwrap();
        assert_eq!(beliefs.len(), 1);
    }
}

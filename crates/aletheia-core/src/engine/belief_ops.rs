//! Belief construction, trait get/set, archetype walk (§4.6).
//!
//! `Belief` itself (`belief.rs`) is pure data; every algorithm here needs
//! registry context — other beliefs for inheritance walks, archetypes for
//! permission/default checks, traittypes for validation — so it lives on
//! [`super::Engine`].

use std::collections::{HashSet, VecDeque};

use crate::archetype::{archetype_chain_multi, TraitDefault};
use crate::belief::{Belief, BeliefBase, BeliefTemplate};
use crate::error::{EngineError, Result};
use crate::ids::{ArchetypeId, BeliefId, MindId, StateId, TraittypeId};
use crate::subject::Subject;
use crate::traittype::RawValue;
use crate::value::TraitValue;

use super::Engine;

impl Engine {
    /// Bare belief construction: a fresh id, a subject (new unless one is
    /// given — versioning reuses the old belief's subject), no own traits
    /// (§4.6 `new`).
    pub fn new_belief(
        &mut self,
        in_mind: Option<MindId>,
        subject: Option<Subject>,
        bases: Vec<BeliefBase>,
        creator_state: Option<StateId>,
    ) -> Result<BeliefId> {
        for base in &bases {
            if let BeliefBase::Belief(id) = base {
                self.belief(*id)?;
            }
            if let BeliefBase::Archetype(id) = base {
                self.archetype(*id)?;
            }
        }
        let subject = match subject {
            Some(s) => {
                self.get_or_create_sid(s.sid, in_mind);
                s
            }
            None => Subject::new(self.fresh_sid(in_mind)),
        };
        let id = BeliefId(self.next_id());
        let belief = Belief::new(id, subject, in_mind, creator_state, bases);
        self.beliefs.insert(id, belief);
        self.belief_by_subject
            .entry(subject.sid)
            .or_default()
            .push(id);
        self.freeze_schema();
        Ok(id)
    }

    /// §4.6 `from`: construct then apply a map of already-resolved-to-label
    /// raw trait values. Inherits the subject of its first belief base, if
    /// any (versioning, §3 invariant 3); otherwise mints a fresh subject.
    pub fn belief_from(
        &mut self,
        in_mind: Option<MindId>,
        bases: Vec<BeliefBase>,
        traits: Vec<(String, RawValue)>,
        creator_state: Option<StateId>,
    ) -> Result<BeliefId> {
        let subject = bases.iter().find_map(|b| match b {
            BeliefBase::Belief(id) => self.beliefs.get(id).map(|b| b.subject),
            BeliefBase::Archetype(_) => None,
        });
        let id = self.new_belief(in_mind, subject, bases, creator_state)?;
        for (label, raw) in traits {
            let tt_id = self.traittype_by_label(&label)?;
            self.set_trait(id, tt_id, raw, creator_state)?;
        }
        Ok(id)
    }

    /// §4.6 `from_template`: like `from`, but base strings resolve via
    /// label lookup (shared prototype, then archetype, then a belief's own
    /// label) rather than being pre-resolved ids.
    pub fn belief_from_template(
        &mut self,
        in_mind: Option<MindId>,
        template: BeliefTemplate,
        creator_state: Option<StateId>,
    ) -> Result<BeliefId> {
        let bases = self.resolve_base_labels(&template.bases, None)?;
        let mut traits = Vec::new();
        for (label, raw) in template.traits {
            traits.push((label, self.template_raw_to_value(raw)));
        }
        let id = self.belief_from(in_mind, bases, traits, creator_state)?;
        if let Some(label) = template.label {
            self.set_belief_label(id, label)?;
        }
        Ok(id)
    }

    /// §4.6 `create_shared_from_template`: a shared belief (`in_mind =
    /// origin_state = None`). `decider` resolves ambiguity when a base label
    /// names more than one candidate belief — default is first-match-wins
    /// (§9, resolved open question).
    pub fn create_shared_from_template(
        &mut self,
        base_labels: Vec<String>,
        traits: Vec<(String, RawValue)>,
        decider: Option<&dyn Fn(&[BeliefId]) -> BeliefId>,
    ) -> Result<BeliefId> {
        let bases = self.resolve_base_labels(&base_labels, decider)?;
        self.belief_from(None, bases, traits, None)
    }

    fn resolve_base_labels(
        &mut self,
        labels: &[String],
        decider: Option<&dyn Fn(&[BeliefId]) -> BeliefId>,
    ) -> Result<Vec<BeliefBase>> {
        let mut bases = Vec::with_capacity(labels.len());
        for label in labels {
            if let Some(archetype_id) = self.archetype_by_label.get(label) {
                bases.push(BeliefBase::Archetype(*archetype_id));
                continue;
            }
            if let Some(belief_id) = self.shared_belief_by_label.get(label) {
                bases.push(BeliefBase::Belief(*belief_id));
                continue;
            }
            if let Some(sid) = self.sid_by_label.get(label) {
                let candidates = self
                    .belief_by_subject
                    .get(sid)
                    .cloned()
                    .unwrap_or_default();
                let chosen = match candidates.as_slice() {
                    [] => None,
                    [one] => Some(*one),
                    many => Some(decider.map(|f| f(many)).unwrap_or(many[0])),
                };
                if let Some(id) = chosen {
                    bases.push(BeliefBase::Belief(id));
                    continue;
                }
            }
            return Err(EngineError::resolution(format!(
                "base label '{label}' names neither an archetype, a shared prototype, nor a belief"
            )));
        }
        Ok(bases)
    }

    fn template_raw_to_value(&self, raw: RawValue) -> RawValue {
        raw
    }

    /// §4.6 `set_trait`: assert unlocked, assert permitted, resolve, store.
    pub fn set_trait(
        &mut self,
        belief_id: BeliefId,
        traittype_id: TraittypeId,
        raw: RawValue,
        creator_state: Option<StateId>,
    ) -> Result<()> {
        if self.belief(belief_id)?.locked {
            return Err(EngineError::locked_belief(belief_id));
        }
        let traittype = self.traittype(traittype_id)?.clone();
        if !self.trait_permitted(belief_id, traittype_id)? {
            return Err(EngineError::trait_not_permitted(&traittype.label, belief_id));
        }
        let value = self.resolve_trait_value(belief_id, &traittype, raw, creator_state)?;
        traittype
            .validate_value(&value)
            .map_err(EngineError::type_error)?;
        self.beliefs
            .get_mut(&belief_id)
            .expect("checked above")
            .own_traits
            .insert(traittype_id, value);
        Ok(())
    }

    fn trait_permitted(&self, belief_id: BeliefId, traittype_id: TraittypeId) -> Result<bool> {
        let archetypes = self.get_archetypes(belief_id)?;
        Ok(archetypes
            .iter()
            .any(|a| self.archetypes[a].permits(traittype_id)))
    }

    /// §4.5: validate and convert a raw template value into a resolved
    /// [`TraitValue`].
    pub(crate) fn resolve_trait_value(
        &mut self,
        belief_id: BeliefId,
        traittype: &crate::traittype::Traittype,
        raw: RawValue,
        creator_state: Option<StateId>,
    ) -> Result<TraitValue> {
        use crate::traittype::Container;

        if matches!(raw, RawValue::Null) {
            return Ok(TraitValue::Null);
        }
        if matches!(traittype.container, Some(Container::Array)) {
            let RawValue::Array(items) = raw else {
                return Err(EngineError::type_error(format!(
                    "trait '{}' expects an array",
                    traittype.label
                )));
            };
            traittype
                .check_length(items.len())
                .map_err(EngineError::type_error)?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(self.resolve_scalar(belief_id, traittype, item, creator_state)?);
            }
            return Ok(TraitValue::Array(out));
        }
        self.resolve_scalar(belief_id, traittype, raw, creator_state)
    }

    fn resolve_scalar(
        &mut self,
        belief_id: BeliefId,
        traittype: &crate::traittype::Traittype,
        raw: RawValue,
        creator_state: Option<StateId>,
    ) -> Result<TraitValue> {
        use crate::traittype::{Primitive, StructKind, TraitKind};

        match raw {
            RawValue::Null => Ok(TraitValue::Null),
            RawValue::Fuzzy(fuzzy) => {
                if !fuzzy.is_well_formed() {
                    return Err(EngineError::type_error(format!(
                        "fuzzy value for trait '{}' is not well-formed (certainty out of range or sums over 1)",
                        traittype.label
                    )));
                }
                Ok(TraitValue::Fuzzy(fuzzy))
            }
            RawValue::String(s) => match &traittype.data_type {
                TraitKind::Literal(Primitive::String) => {
                    traittype
                        .check_enum_membership(&s)
                        .map_err(EngineError::type_error)?;
                    Ok(TraitValue::String(s))
                }
                TraitKind::Struct(StructKind::Subject) | TraitKind::ArchetypeRef(_) => {
                    self.resolve_label_to_subject(&s, traittype)
                }
                _ => Err(EngineError::type_error(format!(
                    "trait '{}' does not accept a string value",
                    traittype.label
                ))),
            },
            RawValue::Label(s) => self.resolve_label_to_subject(&s, traittype),
            RawValue::Number(n) => {
                if !matches!(traittype.data_type, TraitKind::Literal(Primitive::Number)) {
                    return Err(EngineError::type_error(format!(
                        "trait '{}' is not number-typed",
                        traittype.label
                    )));
                }
                Ok(TraitValue::Number(n))
            }
            RawValue::Boolean(b) => {
                if !matches!(traittype.data_type, TraitKind::Literal(Primitive::Boolean)) {
                    return Err(EngineError::type_error(format!(
                        "trait '{}' is not boolean-typed",
                        traittype.label
                    )));
                }
                Ok(TraitValue::Boolean(b))
            }
            RawValue::BeliefRef(bid) => {
                let belief = self.belief(bid)?;
                let subject = belief.subject;
                self.check_archetype_ref(subject, traittype)?;
                Ok(TraitValue::Subject(subject))
            }
            RawValue::SubjectRef(subject) => {
                self.check_archetype_ref(subject, traittype)?;
                Ok(TraitValue::Subject(subject))
            }
            RawValue::Array(_) => Err(EngineError::type_error(format!(
                "trait '{}' does not accept a nested array",
                traittype.label
            ))),
            RawValue::MindTemplate(spec) => {
                if !matches!(traittype.data_type, TraitKind::Struct(StructKind::Mind)) {
                    return Err(EngineError::type_error(format!(
                        "trait '{}' is not Mind-typed",
                        traittype.label
                    )));
                }
                let owner_subject = self.belief(belief_id)?.subject;
                let creator_state = creator_state.ok_or_else(|| {
                    EngineError::resolution(
                        "a Mind-template trait value requires a creator_state to resolve against",
                    )
                })?;
                let outer_mind = self.state(creator_state)?.in_mind;
                let mind_id =
                    self.resolve_mind_template(outer_mind, spec, owner_subject, creator_state)?;
                Ok(TraitValue::Mind(mind_id))
            }
        }
    }

    fn resolve_label_to_subject(
        &mut self,
        label: &str,
        traittype: &crate::traittype::Traittype,
    ) -> Result<TraitValue> {
        let belief_id = self
            .shared_belief_by_label
            .get(label)
            .copied()
            .or_else(|| {
                self.sid_by_label
                    .get(label)
                    .and_then(|sid| self.belief_by_subject.get(sid))
                    .and_then(|v| v.last().copied())
            })
            .ok_or_else(|| {
                EngineError::resolution(format!("no belief is labelled '{label}'"))
            })?;
        let subject = self.belief(belief_id)?.subject;
        self.check_archetype_ref(subject, traittype)?;
        Ok(TraitValue::Subject(subject))
    }

    fn check_archetype_ref(
        &self,
        subject: Subject,
        traittype: &crate::traittype::Traittype,
    ) -> Result<()> {
        if let crate::traittype::TraitKind::ArchetypeRef(required) = traittype.data_type {
            let belief_id = self
                .belief_by_subject
                .get(&subject.sid)
                .and_then(|v| v.last().copied())
                .ok_or_else(|| {
                    EngineError::resolution(format!(
                        "subject {} has no belief to check against archetype",
                        subject.sid
                    ))
                })?;
            let archetypes = self.get_archetypes(belief_id)?;
            if !archetypes.contains(&required) {
                return Err(EngineError::type_error(format!(
                    "trait '{}' requires archetype #{required}, belief #{belief_id} does not carry it",
                    traittype.label
                )));
            }
        }
        Ok(())
    }

    /// §4.6 `get_trait`: own → composed-from-bases → inherited → archetype
    /// default.
    pub fn get_trait(
        &self,
        belief_id: BeliefId,
        state: StateId,
        traittype_id: TraittypeId,
    ) -> Result<TraitValue> {
        let belief = self.belief(belief_id)?;
        let traittype = self.traittype(traittype_id)?;

        if let Some(own) = belief.own_traits.get(&traittype_id) {
            if traittype.composable {
                match own {
                    TraitValue::Null => return Ok(TraitValue::Null),
                    TraitValue::Array(items) => {
                        let mut acc = items.clone();
                        self.compose_from_bases(belief_id, state, traittype_id, &mut acc)?;
                        return Ok(TraitValue::Array(acc));
                    }
                    other => return Ok(other.clone()),
                }
            }
            return Ok(own.clone());
        }

        if traittype.composable {
            let mut acc = Vec::new();
            self.compose_from_bases(belief_id, state, traittype_id, &mut acc)?;
            return Ok(TraitValue::Array(acc));
        }

        if let Some(value) = self.inherited_trait(belief_id, traittype_id)? {
            return Ok(value);
        }

        self.archetype_default_trait(belief_id, traittype_id)
    }

    /// Breadth-first dedup collect of each belief base's latest value for
    /// `traittype_id`, appended into `acc` (§4.5 `compose`, §8 invariant 4).
    fn compose_from_bases(
        &self,
        belief_id: BeliefId,
        state: StateId,
        traittype_id: TraittypeId,
        acc: &mut Vec<TraitValue>,
    ) -> Result<()> {
        let mut seen_sids = HashSet::new();
        for existing in acc.iter() {
            let mut subs = Vec::new();
            existing.subjects(&mut subs);
            for s in subs {
                seen_sids.insert(s.sid);
            }
        }
        let belief = self.belief(belief_id)?;
        for base in belief.belief_bases() {
            let base_value = self.get_trait(base, state, traittype_id)?;
            if let TraitValue::Array(items) = base_value {
                for item in items {
                    let mut subs = Vec::new();
                    item.subjects(&mut subs);
                    let dup = subs.iter().any(|s| seen_sids.contains(&s.sid));
                    if !dup {
                        for s in &subs {
                            seen_sids.insert(s.sid);
                        }
                        acc.push(item);
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk belief bases breadth-first, returning the first own value found
    /// on a Belief base (§4.6, resolution step 3).
    fn inherited_trait(
        &self,
        belief_id: BeliefId,
        traittype_id: TraittypeId,
    ) -> Result<Option<TraitValue>> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<BeliefId> =
            self.belief(belief_id)?.belief_bases().collect();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            let base = self.belief(id)?;
            if let Some(value) = base.own_traits.get(&traittype_id) {
                return Ok(Some(value.clone()));
            }
            for next in base.belief_bases() {
                queue.push_back(next);
            }
        }
        Ok(None)
    }

    /// Consult the archetype defaults reachable from this belief (§4.6,
    /// resolution step 4). An `Archetype` marker default carries no
    /// concrete subject and resolves to `Null` (DESIGN.md).
    fn archetype_default_trait(
        &self,
        belief_id: BeliefId,
        traittype_id: TraittypeId,
    ) -> Result<TraitValue> {
        for archetype_id in self.get_archetypes(belief_id)? {
            if let Some(default) = self.archetypes[&archetype_id].trait_template.get(&traittype_id)
            {
                return Ok(match default {
                    Some(TraitDefault::Prototype(subject)) => TraitValue::Subject(*subject),
                    Some(TraitDefault::Archetype(_)) | None => TraitValue::Null,
                });
            }
        }
        Ok(TraitValue::Null)
    }

    /// §4.6 `get_traits`: own traits first, then inherited traits not
    /// shadowed.
    pub fn get_traits(&self, belief_id: BeliefId, state: StateId) -> Result<Vec<(TraittypeId, TraitValue)>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let belief = self.belief(belief_id)?;
        for (tt_id, value) in &belief.own_traits {
            seen.insert(*tt_id);
            out.push((*tt_id, value.clone()));
        }
        for slot in self.get_slots(belief_id)? {
            if seen.insert(slot) {
                let value = self.get_trait(belief_id, state, slot)?;
                if !value.is_null() {
                    out.push((slot, value));
                }
            }
        }
        Ok(out)
    }

    /// §4.6 `get_slots`: permitted trait names from archetype templates,
    /// deduplicated.
    pub fn get_slots(&self, belief_id: BeliefId) -> Result<Vec<TraittypeId>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for archetype_id in self.get_archetypes(belief_id)? {
            for tt_id in self.archetypes[&archetype_id].trait_template.keys() {
                if seen.insert(*tt_id) {
                    out.push(*tt_id);
                }
            }
        }
        Ok(out)
    }

    /// §4.6 `get_archetypes`: breadth-first walk of bases yielding each
    /// archetype exactly once; stops descending through archetype chains
    /// (archetype-to-archetype inheritance is handled by
    /// `archetype_chain_multi`, not re-walked per belief-base level).
    pub fn get_archetypes(&self, belief_id: BeliefId) -> Result<Vec<ArchetypeId>> {
        let belief = self.belief(belief_id)?;
        let mut roots: Vec<ArchetypeId> = belief.archetype_bases().collect();
        let mut visited: HashSet<BeliefId> = HashSet::new();
        let mut queue: VecDeque<BeliefId> = belief.belief_bases().collect();
        visited.insert(belief_id);
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            let b = self.belief(id)?;
            roots.extend(b.archetype_bases());
            for next in b.belief_bases() {
                queue.push_back(next);
            }
        }
        Ok(archetype_chain_multi(&self.archetypes, roots))
    }

    /// §4.6 `get_label` / `set_label`, via `label_by_sid`.
    pub fn belief_label(&self, belief_id: BeliefId) -> Result<Option<String>> {
        let belief = self.belief(belief_id)?;
        Ok(self.label_by_sid.get(&belief.subject.sid).cloned())
    }

    pub fn set_belief_label(&mut self, belief_id: BeliefId, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        let sid = self.belief(belief_id)?.subject.sid;
        if let Some(existing) = self.sid_by_label.get(&label) {
            if *existing != sid {
                return Err(EngineError::schema(format!(
                    "label '{label}' is already registered for a different subject"
                )));
            }
        }
        self.sid_by_label.insert(label.clone(), sid);
        self.label_by_sid.insert(sid, label.clone());
        if self.belief(belief_id)?.is_shared() {
            self.shared_belief_by_label.insert(label, belief_id);
        }
        Ok(())
    }

    /// §4.6 `sysdesig`: `"<label> [<edge archetypes>] (about <label>)? #<id> locked-or-not"`.
    pub fn sysdesig(&self, belief_id: BeliefId, state: Option<StateId>) -> Result<String> {
        let belief = self.belief(belief_id)?;
        let label = self
            .belief_label(belief_id)?
            .unwrap_or_else(|| format!("sid{}", belief.subject.sid));
        let archetypes: Vec<String> = belief
            .archetype_bases()
            .filter_map(|a| self.archetypes.get(&a).map(|a| a.label.clone()))
            .collect();
        let mut desig = format!("{label} [{}]", archetypes.join(", "));
        if let Some(state) = state {
            if let Ok(about_tt) = self.traittype_by_label("@about") {
                if let Some(TraitValue::Subject(about)) = belief.own_traits.get(&about_tt) {
                    let about_label = self
                        .label_by_sid
                        .get(&about.sid)
                        .cloned()
                        .unwrap_or_else(|| format!("sid{}", about.sid));
                    desig.push_str(&format!(" (about {about_label})"));
                }
            }
            let _ = state;
        }
        desig.push_str(&format!(" #{} {}", belief_id, if belief.locked { "\u{1F512}" } else { "\u{1F513}" }));
        Ok(desig)
    }
}

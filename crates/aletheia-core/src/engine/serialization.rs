//! Depth-first dump, two-phase load with ref patching (§2.12, §6.3).
//!
//! The wire format is a [`Document`]: flat sections for traittypes,
//! archetypes, minds, states, and beliefs, each keyed by the same `_id` the
//! runtime arena uses — never a shared pointer. Reference-typed values
//! appear as `{ "_type": "Belief"|"State"|"Mind", "_id": N }` almost
//! everywhere; the one exception is a belief's own `traits` map, where a
//! Subject-typed value appears as the bare `sid` integer.
//!
//! Loading is two-phase because the graph is cyclic (a state's `insert`
//! names beliefs; a belief's Mind-valued trait names a mind; that mind's
//! states name their `ground_state`, which may be the very state we started
//! from). Phase 1 allocates every entity shell and registers its label/id
//! indexes; phase 2 patches every reference — including re-deriving each
//! locked state's `rev_base` skip pointers, which are never serialized
//! (§9 memory discipline: caches are lazy and never carried over the wire).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::archetype::{Archetype, TraitDefault};
use crate::belief::{Belief, BeliefBase};
use crate::error::{EngineError, Result};
use crate::fuzzy::{Fuzzy, FuzzyAlternative};
use crate::ids::{ArchetypeId, BeliefId, MindId, Sid, StateId, TraittypeId};
use crate::mind::Mind;
use crate::state::{State, StateKind};
use crate::subject::{Subject, SubjectRecord};
use crate::traittype::{Constraints, Container, Modality, Primitive, StructKind, TraitKind, Traittype};
use crate::value::TraitValue;

use super::Engine;

/// A base, as it appears in [`BeliefDoc::bases`]: an archetype base
/// serializes as its label, a belief base as its raw id (§6.3: `"bases":
/// [label|id]"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaseRefDoc {
    ArchetypeLabel(String),
    BeliefId(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitDefaultDoc {
    pub archetype: Option<String>,
    pub prototype_sid: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeDoc {
    pub _id: u64,
    pub label: String,
    pub bases: Vec<String>,
    pub trait_template: Vec<(String, Option<TraitDefaultDoc>)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TraitKindDoc {
    Literal { primitive: Primitive },
    Struct { kind: StructKind },
    ArchetypeRef { label: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraittypeDoc {
    pub _id: u64,
    pub label: String,
    pub data_type: TraitKindDoc,
    pub container: Option<Container>,
    pub constraints: Option<Constraints>,
    pub composable: bool,
    pub values: Option<Vec<String>>,
    pub exposure: Option<Modality>,
    pub mind_scope: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindDoc {
    pub _type: String,
    pub _id: u64,
    pub label: Option<String>,
    pub parent: Option<u64>,
    pub origin_state: u64,
    pub states: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDoc {
    pub _type: String,
    pub _id: u64,
    pub tt: Option<u64>,
    pub vt: Option<u64>,
    pub base: Option<u64>,
    pub ground_state: Option<u64>,
    pub about_state: Option<u64>,
    #[serde(rename = "self")]
    pub self_subject: Option<u64>,
    pub component_states: Option<Vec<u64>>,
    pub insert: Vec<u64>,
    pub remove: Vec<u64>,
    pub in_mind: u64,
    pub locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeliefDoc {
    pub _type: String,
    pub _id: u64,
    pub sid: u64,
    pub label: Option<String>,
    pub about: Option<u64>,
    pub archetypes: Vec<String>,
    pub bases: Vec<BaseRefDoc>,
    pub traits: HashMap<String, Json>,
    pub in_mind: Option<u64>,
    pub origin_state: Option<u64>,
    pub ground_mind: Option<u64>,
    pub locked: bool,
}

/// The full wire document (§6.3): every section needed to reconstruct an
/// [`Engine`], plus `next_id` so the id sequence resumes exactly where the
/// dump left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub next_id: u64,
    pub traittypes: Vec<TraittypeDoc>,
    pub archetypes: Vec<ArchetypeDoc>,
    pub minds: Vec<MindDoc>,
    pub states: Vec<StateDoc>,
    pub beliefs: Vec<BeliefDoc>,
    /// Redundant with `beliefs[i].in_mind == null`, but kept as its own
    /// section per §6.3 ("sections for ... beliefs, and shared beliefs") so
    /// a loader can restore `shared_belief_by_label` without scanning every
    /// belief for one that happens to be unshared.
    pub shared_beliefs: Vec<u64>,
}

impl Engine {
    /// §2.12 `dump`: a depth-first walk of every registry into a
    /// [`Document`]. Order within each section is by ascending id, which is
    /// also creation order — this is what makes property 6 in §8
    /// ("serialize then load then serialize produces byte-equal JSON")
    /// checkable: loading never reorders a section.
    pub fn dump(&self) -> Document {
        let mut traittypes: Vec<&Traittype> = self.traittypes.values().collect();
        traittypes.sort_by_key(|t| t.id.raw());
        let traittypes = traittypes.into_iter().map(|t| self.dump_traittype(t)).collect();

        let mut archetypes: Vec<&Archetype> = self.archetypes.values().collect();
        archetypes.sort_by_key(|a| a.id.raw());
        let archetypes = archetypes.into_iter().map(|a| self.dump_archetype(a)).collect();

        let mut minds: Vec<&Mind> = self.minds.values().collect();
        minds.sort_by_key(|m| m.id.raw());
        let minds = minds.into_iter().map(|m| self.dump_mind(m)).collect();

        let mut states: Vec<&State> = self.states.values().collect();
        states.sort_by_key(|s| s.id.raw());
        let states = states.into_iter().map(|s| self.dump_state(s)).collect();

        let mut beliefs: Vec<&Belief> = self.beliefs.values().collect();
        beliefs.sort_by_key(|b| b.id.raw());
        let shared_beliefs = beliefs
            .iter()
            .filter(|b| b.is_shared())
            .map(|b| b.id.raw())
            .collect();
        let beliefs = beliefs.into_iter().map(|b| self.dump_belief(b)).collect();

        Document {
            next_id: self.ids.peek(),
            traittypes,
            archetypes,
            minds,
            states,
            beliefs,
            shared_beliefs,
        }
    }

    fn dump_traittype(&self, t: &Traittype) -> TraittypeDoc {
        let data_type = match t.data_type {
            TraitKind::Literal(primitive) => TraitKindDoc::Literal { primitive },
            TraitKind::Struct(kind) => TraitKindDoc::Struct { kind },
            TraitKind::ArchetypeRef(id) => TraitKindDoc::ArchetypeRef {
                label: self.archetypes[&id].label.clone(),
            },
        };
        TraittypeDoc {
            _id: t.id.raw(),
            label: t.label.clone(),
            data_type,
            container: t.container,
            constraints: t.constraints,
            composable: t.composable,
            values: t.values.clone(),
            exposure: t.exposure.clone(),
            mind_scope: t.mind_scope,
        }
    }

    fn dump_archetype(&self, a: &Archetype) -> ArchetypeDoc {
        let bases = a.bases.iter().map(|id| self.archetypes[id].label.clone()).collect();
        let trait_template = a
            .trait_template
            .iter()
            .map(|(tt_id, default)| {
                let label = self.traittypes[tt_id].label.clone();
                let doc = default.map(|d| match d {
                    TraitDefault::Archetype(id) => TraitDefaultDoc {
                        archetype: Some(self.archetypes[&id].label.clone()),
                        prototype_sid: None,
                    },
                    TraitDefault::Prototype(subject) => TraitDefaultDoc {
                        archetype: None,
                        prototype_sid: Some(subject.sid.raw()),
                    },
                });
                (label, doc)
            })
            .collect();
        ArchetypeDoc {
            _id: a.id.raw(),
            label: a.label.clone(),
            bases,
            trait_template,
        }
    }

    fn dump_mind(&self, m: &Mind) -> MindDoc {
        MindDoc {
            _type: "Mind".to_string(),
            _id: m.id.raw(),
            label: m.label.clone(),
            parent: m.parent.map(|p| p.raw()),
            origin_state: m.origin_state.raw(),
            states: m.states.iter().map(|s| s.raw()).collect(),
        }
    }

    fn dump_state(&self, s: &State) -> StateDoc {
        let (type_name, tt, vt, component_states) = match &s.kind {
            StateKind::Temporal { tt, vt } => ("State".to_string(), *tt, *vt, None),
            StateKind::Timeless => ("Timeless".to_string(), None, None, None),
            StateKind::Convergence { component_states } => (
                "Convergence".to_string(),
                None,
                None,
                Some(component_states.iter().map(|c| c.raw()).collect()),
            ),
        };
        StateDoc {
            _type: type_name,
            _id: s.id.raw(),
            tt,
            vt,
            base: s.base.map(|b| b.raw()),
            ground_state: s.ground_state.map(|g| g.raw()),
            about_state: s.about_state.map(|a| a.raw()),
            self_subject: s.self_subject.map(|subj| subj.sid.raw()),
            component_states,
            insert: s.insert.iter().map(|b| b.raw()).collect(),
            remove: s.remove.iter().map(|b| b.raw()).collect(),
            in_mind: s.in_mind.raw(),
            locked: s.locked,
        }
    }

    fn dump_belief(&self, b: &Belief) -> BeliefDoc {
        let archetypes = b
            .archetype_bases()
            .map(|id| self.archetypes[&id].label.clone())
            .collect();
        let bases = b
            .bases
            .iter()
            .map(|base| match base {
                BeliefBase::Belief(id) => BaseRefDoc::BeliefId(id.raw()),
                BeliefBase::Archetype(id) => BaseRefDoc::ArchetypeLabel(self.archetypes[id].label.clone()),
            })
            .collect();
        let about_tt = self.traittype_by_label("@about").ok();
        let about = about_tt.and_then(|tt| b.own_traits.get(&tt)).and_then(|v| v.as_subject()).map(|s| s.sid.raw());
        let traits = b
            .own_traits
            .iter()
            .map(|(tt_id, value)| (self.traittypes[tt_id].label.clone(), dump_value(value)))
            .collect();
        BeliefDoc {
            _type: "Belief".to_string(),
            _id: b.id.raw(),
            sid: b.subject.sid.raw(),
            label: self.label_by_sid.get(&b.subject.sid).cloned(),
            about,
            archetypes,
            bases,
            traits,
            in_mind: b.in_mind.map(|m| m.raw()),
            origin_state: b.origin_state.map(|s| s.raw()),
            ground_mind: self.subjects.get(&b.subject.sid).and_then(|r| r.ground_mind).map(|m| m.raw()),
            locked: b.locked,
        }
    }

    /// §6.3 load, phase 1 + phase 2. Returns a fresh [`Engine`] — the caller
    /// is expected to have called [`Engine::reset_registries`] on whatever
    /// engine they intend to keep using, per §7's load-failure policy ("a
    /// failed load aborts the load; the caller is expected to
    /// `reset_registries()` before retrying").
    pub fn load(document: Document) -> Result<Engine> {
        // `Engine::new()` already installs the three cosmos singletons under
        // ids 1-6, in the same deterministic order every `Engine` is built
        // in — so the document's own Logos/Eidos/Materia entries (produced
        // by the same bootstrap) land on exactly those ids and simply
        // overwrite them below, rather than colliding with them.
        let mut engine = Engine::new();

        // Phase 1: traittypes and archetypes (schema), then shells for
        // minds/states/beliefs, all registered under their serialized ids.
        for doc in &document.traittypes {
            engine.load_traittype_shell(doc)?;
        }
        for doc in &document.archetypes {
            engine.load_archetype_shell(doc)?;
        }
        // Archetype bases and trait defaults reference other archetypes —
        // patch once every archetype shell exists.
        for doc in &document.archetypes {
            engine.patch_archetype(doc)?;
        }
        for doc in &document.minds {
            engine.load_mind_shell(doc)?;
        }
        for doc in &document.states {
            engine.load_state_shell(doc)?;
        }
        for doc in &document.beliefs {
            engine.load_belief_shell(doc)?;
        }

        // Phase 2: patch every reference now that every id exists, then
        // finalize each belief's traits and rebuild branch lists.
        for doc in &document.beliefs {
            engine.patch_belief(doc)?;
        }
        engine.rebuild_branches();
        engine.rederive_skip_pointers(&document)?;

        for doc in &document.shared_beliefs {
            let id = BeliefId(*doc);
            let belief = engine.belief(id)?;
            if !belief.is_shared() {
                return Err(EngineError::invariant(format!(
                    "document lists belief #{id} as shared but in_mind/origin_state are set"
                )));
            }
            if let Some(label) = engine.label_by_sid.get(&belief.subject.sid).cloned() {
                engine.shared_belief_by_label.insert(label, id);
            }
        }

        engine.ids = crate::id::IdSequence::new();
        for _ in 1..document.next_id {
            engine.ids.next();
        }
        if !engine.beliefs.is_empty() {
            engine.schema_frozen = true;
        }
        Ok(engine)
    }

    fn load_traittype_shell(&mut self, doc: &TraittypeDoc) -> Result<()> {
        let data_type = match &doc.data_type {
            TraitKindDoc::Literal { primitive } => TraitKind::Literal(*primitive),
            TraitKindDoc::Struct { kind } => TraitKind::Struct(*kind),
            TraitKindDoc::ArchetypeRef { label } => {
                // Resolved in a second pass (`patch_archetype`), once every
                // archetype label is known.
                return self.defer_traittype(doc, label.clone());
            }
        };
        let id = TraittypeId(doc._id);
        self.traittypes.insert(
            id,
            Traittype {
                id,
                label: doc.label.clone(),
                data_type,
                container: doc.container,
                constraints: doc.constraints,
                composable: doc.composable,
                values: doc.values.clone(),
                exposure: doc.exposure.clone(),
                mind_scope: doc.mind_scope,
            },
        );
        self.traittype_by_label.insert(doc.label.clone(), id);
        Ok(())
    }

    /// `ArchetypeRef` traittypes are deferred to `patch_archetype` time,
    /// since the archetype they name may not have a shell yet.
    fn defer_traittype(&mut self, doc: &TraittypeDoc, archetype_label: String) -> Result<()> {
        let id = TraittypeId(doc._id);
        self.traittypes.insert(
            id,
            Traittype {
                id,
                label: doc.label.clone(),
                data_type: TraitKind::ArchetypeRef(ArchetypeId(0)),
                container: doc.container,
                constraints: doc.constraints,
                composable: doc.composable,
                values: doc.values.clone(),
                exposure: doc.exposure.clone(),
                mind_scope: doc.mind_scope,
            },
        );
        self.traittype_by_label.insert(doc.label.clone(), id);
        self.pending_archetype_refs.push((id, archetype_label));
        Ok(())
    }

    fn load_archetype_shell(&mut self, doc: &ArchetypeDoc) -> Result<()> {
        let id = ArchetypeId(doc._id);
        self.archetypes.insert(
            id,
            Archetype {
                id,
                label: doc.label.clone(),
                bases: Vec::new(),
                trait_template: HashMap::new(),
            },
        );
        self.archetype_by_label.insert(doc.label.clone(), id);
        Ok(())
    }

    fn patch_archetype(&mut self, doc: &ArchetypeDoc) -> Result<()> {
        let id = self.archetype_by_label(&doc.label)?;
        let bases = doc
            .bases
            .iter()
            .map(|label| self.archetype_by_label(label))
            .collect::<Result<Vec<_>>>()?;
        let mut trait_template = HashMap::new();
        for (label, default) in &doc.trait_template {
            let tt_id = self.traittype_by_label(label)?;
            let resolved = match default {
                None => None,
                Some(TraitDefaultDoc { archetype: Some(a), .. }) => {
                    Some(TraitDefault::Archetype(self.archetype_by_label(a)?))
                }
                Some(TraitDefaultDoc { prototype_sid: Some(sid), .. }) => {
                    Some(TraitDefault::Prototype(Subject::new(Sid(*sid))))
                }
                Some(_) => {
                    return Err(EngineError::resolution(format!(
                        "archetype '{}' trait default names neither an archetype nor a prototype",
                        doc.label
                    )))
                }
            };
            trait_template.insert(tt_id, resolved);
        }
        let archetype = self.archetypes.get_mut(&id).expect("shell inserted above");
        archetype.bases = bases;
        archetype.trait_template = trait_template;

        let pending = std::mem::take(&mut self.pending_archetype_refs);
        for (tt_id, label) in pending {
            if label == doc.label {
                if let Some(t) = self.traittypes.get_mut(&tt_id) {
                    t.data_type = TraitKind::ArchetypeRef(id);
                }
            } else {
                self.pending_archetype_refs.push((tt_id, label));
            }
        }
        Ok(())
    }

    fn load_mind_shell(&mut self, doc: &MindDoc) -> Result<()> {
        let id = MindId(doc._id);
        let mind = Mind {
            id,
            label: doc.label.clone(),
            parent: doc.parent.map(MindId),
            origin_state: StateId(doc.origin_state),
            states: doc.states.iter().map(|s| StateId(*s)).collect(),
            mind_traits: HashMap::new(),
        };
        self.minds.insert(id, mind);
        if doc._type == "Mind" && doc.label.as_deref() == Some("Logos") {
            self.cosmos.logos = id;
        }
        if doc.label.as_deref() == Some("Eidos") {
            self.cosmos.eidos = id;
        }
        if doc.label.as_deref() == Some("Materia") {
            self.cosmos.materia = id;
        }
        Ok(())
    }

    fn load_state_shell(&mut self, doc: &StateDoc) -> Result<()> {
        let id = StateId(doc._id);
        let kind = match doc._type.as_str() {
            "Timeless" => StateKind::Timeless,
            "Convergence" => StateKind::Convergence {
                component_states: doc
                    .component_states
                    .clone()
                    .unwrap_or_default()
                    .into_iter()
                    .map(StateId)
                    .collect(),
            },
            _ => StateKind::Temporal { tt: doc.tt, vt: doc.vt },
        };
        let state = State {
            id,
            in_mind: MindId(doc.in_mind),
            kind,
            base: doc.base.map(StateId),
            ground_state: doc.ground_state.map(StateId),
            self_subject: doc.self_subject.map(|sid| Subject::new(Sid(sid))),
            about_state: doc.about_state.map(StateId),
            insert: doc.insert.iter().map(|b| BeliefId(*b)).collect(),
            remove: doc.remove.iter().map(|b| BeliefId(*b)).collect(),
            branches: Vec::new(),
            locked: doc.locked,
            rev_base: HashMap::new(),
            touched: Default::default(),
            subject_cache: HashMap::new(),
        };
        self.states.insert(id, state);
        Ok(())
    }

    fn load_belief_shell(&mut self, doc: &BeliefDoc) -> Result<()> {
        let id = BeliefId(doc._id);
        let sid = Sid(doc.sid);
        self.subjects.insert(
            sid,
            SubjectRecord {
                sid,
                ground_mind: doc.ground_mind.map(MindId),
            },
        );
        self.belief_by_subject.entry(sid).or_default().push(id);
        let belief = Belief {
            id,
            subject: Subject::new(sid),
            in_mind: doc.in_mind.map(MindId),
            origin_state: doc.origin_state.map(StateId),
            bases: Vec::new(),
            own_traits: HashMap::new(),
            locked: doc.locked,
            label: doc.label.clone(),
        };
        self.beliefs.insert(id, belief);
        if let Some(label) = &doc.label {
            self.sid_by_label.insert(label.clone(), sid);
            self.label_by_sid.insert(sid, label.clone());
        }
        Ok(())
    }

    fn patch_belief(&mut self, doc: &BeliefDoc) -> Result<()> {
        let id = BeliefId(doc._id);
        let mut bases = Vec::with_capacity(doc.bases.len());
        for base in &doc.bases {
            bases.push(match base {
                BaseRefDoc::BeliefId(raw) => BeliefBase::Belief(BeliefId(*raw)),
                BaseRefDoc::ArchetypeLabel(label) => BeliefBase::Archetype(self.archetype_by_label(label)?),
            });
        }
        let mut own_traits = HashMap::new();
        for (label, json) in &doc.traits {
            let tt_id = self.traittype_by_label(label)?;
            let traittype = self.traittypes[&tt_id].clone();
            let value = self.load_value(&traittype, json)?;
            own_traits.insert(tt_id, value);
        }
        let belief = self.beliefs.get_mut(&id).expect("shell inserted in phase 1");
        belief.bases = bases;
        belief.own_traits = own_traits;
        Ok(())
    }

    /// Interprets one JSON trait value against its traittype's declared
    /// shape. A bare JSON number is a literal `Number` for a
    /// `Literal(Number)` traittype and a subject `sid` for every
    /// Subject-reference traittype — the ambiguity the wire format leaves
    /// implicit (§6.3) is resolved here using the schema, never guessed from
    /// the shape of the JSON alone.
    fn load_value(&self, traittype: &Traittype, json: &Json) -> Result<TraitValue> {
        if json.is_null() {
            return Ok(TraitValue::Null);
        }
        if matches!(traittype.container, Some(Container::Array)) {
            let Json::Array(items) = json else {
                return Err(EngineError::resolution(format!(
                    "trait '{}' expected a JSON array",
                    traittype.label
                )));
            };
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(self.load_scalar(traittype, item)?);
            }
            return Ok(TraitValue::Array(out));
        }
        self.load_scalar(traittype, json)
    }

    fn load_scalar(&self, traittype: &Traittype, json: &Json) -> Result<TraitValue> {
        if json.is_null() {
            return Ok(TraitValue::Null);
        }
        if let Some(obj) = json.as_object() {
            if let Some(Json::String(ty)) = obj.get("_type") {
                let raw_id = obj
                    .get("_id")
                    .and_then(Json::as_u64)
                    .ok_or_else(|| EngineError::resolution("tagged reference missing `_id`".to_string()))?;
                return match ty.as_str() {
                    "Mind" => Ok(TraitValue::Mind(MindId(raw_id))),
                    "State" => Ok(TraitValue::State(StateId(raw_id))),
                    other => Err(EngineError::resolution(format!("unknown tagged reference type '{other}'"))),
                };
            }
            if let Some(alternatives) = obj.get("alternatives").and_then(Json::as_array) {
                let mut out = Vec::with_capacity(alternatives.len());
                for alt in alternatives {
                    let certainty = alt
                        .get("certainty")
                        .and_then(Json::as_f64)
                        .ok_or_else(|| EngineError::resolution("fuzzy alternative missing certainty".to_string()))?;
                    let value = alt
                        .get("value")
                        .ok_or_else(|| EngineError::resolution("fuzzy alternative missing value".to_string()))?;
                    out.push(FuzzyAlternative {
                        value: Box::new(self.load_scalar(traittype, value)?),
                        certainty,
                    });
                }
                return Ok(TraitValue::Fuzzy(Fuzzy::new(out)));
            }
            return Err(EngineError::resolution(format!(
                "trait '{}' value is an unrecognized object shape",
                traittype.label
            )));
        }
        match json {
            Json::String(s) => Ok(TraitValue::String(s.clone())),
            Json::Bool(b) => Ok(TraitValue::Boolean(*b)),
            Json::Number(n) => {
                if traittype.is_subject_reference() {
                    let raw = n
                        .as_u64()
                        .ok_or_else(|| EngineError::resolution("subject sid must be a non-negative integer".to_string()))?;
                    Ok(TraitValue::Subject(Subject::new(Sid(raw))))
                } else {
                    Ok(TraitValue::Number(n.as_f64().unwrap_or_default()))
                }
            }
            _ => Err(EngineError::resolution(format!(
                "trait '{}' has an unsupported JSON value shape",
                traittype.label
            ))),
        }
    }

    /// Every state's `branches` list is derived, not serialized — rebuild it
    /// from every state's `base` pointer now that the whole chain exists
    /// (§6.3: "rebuild `State.branches` by linking every child to its
    /// base").
    fn rebuild_branches(&mut self) {
        let mut children: HashMap<StateId, Vec<StateId>> = HashMap::new();
        let mut ids: Vec<StateId> = self.states.keys().copied().collect();
        ids.sort_by_key(|s| s.raw());
        for id in &ids {
            if let Some(base) = self.states[id].base {
                children.entry(base).or_default().push(*id);
            }
        }
        for (base, kids) in children {
            if let Some(state) = self.states.get_mut(&base) {
                state.branches = kids;
            }
        }
    }

    /// Reverse-index skip pointers are a cache, never serialized (§9): they
    /// are rebuilt by replaying `mark_touched_for_belief` and
    /// `finalize_skip_pointers` for every state, in ascending id (= creation,
    /// = chain) order, against the belief graph phase 1/2 already restored.
    fn rederive_skip_pointers(&mut self, document: &Document) -> Result<()> {
        let mut ids: Vec<StateId> = document.states.iter().map(|s| StateId(s._id)).collect();
        ids.sort_by_key(|s| s.raw());
        for state_id in &ids {
            let (insert, remove) = {
                let s = self.state(*state_id)?;
                (s.insert.clone(), s.remove.clone())
            };
            for belief_id in insert.iter().chain(remove.iter()) {
                self.mark_touched_for_belief(*state_id, *belief_id)?;
            }
            if self.state(*state_id)?.locked {
                self.finalize_skip_pointers(*state_id)?;
            }
        }
        Ok(())
    }
}

fn dump_value(value: &TraitValue) -> Json {
    match value {
        TraitValue::Null => Json::Null,
        TraitValue::String(s) => Json::String(s.clone()),
        TraitValue::Number(n) => serde_json::Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        TraitValue::Boolean(b) => Json::Bool(*b),
        TraitValue::Subject(s) => Json::Number(s.sid.raw().into()),
        TraitValue::Mind(m) => serde_json::json!({"_type": "Mind", "_id": m.raw()}),
        TraitValue::State(s) => serde_json::json!({"_type": "State", "_id": s.raw()}),
        TraitValue::Fuzzy(f) => serde_json::json!({
            "alternatives": f.alternatives.iter().map(|a| serde_json::json!({
                "value": dump_value(&a.value),
                "certainty": a.certainty,
            })).collect::<Vec<_>>(),
        }),
        TraitValue::Array(items) => Json::Array(items.iter().map(dump_value).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::BeliefTemplate;
    use crate::traittype::{RawValue, StructKind};

    fn tavern_engine() -> (Engine, StateId) {
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
        engine.register_archetype("Location", vec![], vec![]).unwrap();
        engine
            .register_archetype("Actor", vec![], vec![(location_tt, None)])
            .unwrap();
        let mind = engine.create_world_mind(Some("test-world".into()), None).unwrap();
        let state = engine.mind(mind).unwrap().origin_state;
        let tavern = engine
            .add_belief(state, BeliefTemplate::new().with_base("Location").with_label("tavern"))
            .unwrap();
        engine
            .add_belief(
                state,
                BeliefTemplate::new()
                    .with_base("Actor")
                    .with_label("bartender")
                    .with_trait("location", RawValue::Label("tavern".into())),
            )
            .unwrap();
        let _ = tavern;
        engine.lock_state(state).unwrap();
        (engine, state)
    }

    #[test]
    fn round_trip_preserves_beliefs_and_locked_state() {
        let (engine, state) = tavern_engine();
        let doc = engine.dump();
        let loaded = Engine::load(doc).unwrap();

        let beliefs = loaded.get_beliefs(state).unwrap();
        assert_eq!(beliefs.len(), engine.get_beliefs(state).unwrap().len());
        assert!(loaded.state(state).unwrap().locked);
    }

    #[test]
    fn round_trip_preserves_rev_trait_result() {
        let (mut engine, state) = tavern_engine();
        let tavern_belief = engine.get_belief_by_label(state, "tavern").unwrap().unwrap();
        let tavern_subject = engine.belief(tavern_belief).unwrap().subject;
        let location_tt = engine.traittype_by_label("location").unwrap();
        let before = engine.rev_trait(state, tavern_subject, location_tt).unwrap();

        let doc = engine.dump();
        let loaded = Engine::load(doc).unwrap();
        let after = loaded.rev_trait(state, tavern_subject, location_tt).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn dump_is_stable_across_a_round_trip() {
        let (engine, _state) = tavern_engine();
        let doc = engine.dump();
        let loaded = Engine::load(doc.clone()).unwrap();
        let doc2 = loaded.dump();
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            serde_json::to_value(&doc2).unwrap()
        );
    }
}

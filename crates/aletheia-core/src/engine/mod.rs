//! The engine: registries, id sequence, cosmos singletons, and every
//! registry-aware operation from §4 (§2.2, §9 "Global mutable state").
//!
//! Nothing outside this module reaches into the registries directly — every
//! arena is private and every cross-entity algorithm (`get_trait`,
//! `rev_trait`, `lock`, `perceive`, load/dump) is a method on [`Engine`],
//! split across submodules by functional area:
//!
//! - [`schema`]: archetype/traittype registration (§4.4, §4.5 schema half)
//! - [`belief_ops`]: belief construction, trait get/set, archetype walk (§4.6)
//! - [`state_ops`]: state mutation, branch, lock, forward reads (§4.7)
//! - [`rev_index`]: the `rev_trait` skip-list query and its maintenance (§4.7)
//! - [`mind_ops`]: mind creation, template resolution, composition, recall (§4.9)
//! - [`perception_ops`]: `recognize`/`identify`/`perceive`/`learn_from`/`learn_about` (§4.10)
//! - [`serialization`]: dump/load (§4.14, §6.3)
//! - [`cosmos`]: the three singleton minds and `reset_registries` (§6.4)

mod belief_ops;
mod cosmos;
mod mind_ops;
mod perception_ops;
mod rev_index;
mod schema;
mod serialization;
mod state_ops;

pub use cosmos::Cosmos;
pub use perception_ops::EventPerception;
pub use serialization::Document;

use std::collections::HashMap;

use tracing::instrument;

use crate::archetype::Archetype;
use crate::belief::Belief;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::id::IdSequence;
use crate::ids::{ArchetypeId, BeliefId, MindId, Sid, StateId, TraittypeId};
use crate::mind::Mind;
use crate::state::State;
use crate::subject::SubjectRecord;
use crate::traittype::Traittype;

/// The one value every §4 operation is a method on (§9, "Global mutable
/// state"). Holds every arena and index by value — there is no ambient
/// `static`, and (per §5) no `Mutex`: the engine is driven by one cooperative
/// thread and every method below takes `&mut self`, which is the concrete,
/// checked-by-the-borrow-checker form of "no locking required" that §5 calls
/// for (see DESIGN.md for the tradeoff against interior-mutability styles).
#[derive(Debug)]
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) ids: IdSequence,

    pub(crate) beliefs: HashMap<BeliefId, Belief>,
    pub(crate) states: HashMap<StateId, State>,
    pub(crate) minds: HashMap<MindId, Mind>,
    pub(crate) archetypes: HashMap<ArchetypeId, Archetype>,
    pub(crate) traittypes: HashMap<TraittypeId, Traittype>,

    pub(crate) subjects: HashMap<Sid, SubjectRecord>,
    pub(crate) belief_by_subject: HashMap<Sid, Vec<BeliefId>>,
    pub(crate) archetype_by_label: HashMap<String, ArchetypeId>,
    pub(crate) traittype_by_label: HashMap<String, TraittypeId>,
    pub(crate) sid_by_label: HashMap<String, Sid>,
    pub(crate) label_by_sid: HashMap<Sid, String>,
    pub(crate) shared_belief_by_label: HashMap<String, BeliefId>,

    pub(crate) cosmos: Cosmos,

    /// Set the moment the first belief is constructed. Consulted by
    /// `register_archetype`/`register_traittype` when
    /// `config.strict_schema` is set (§3 invariant 7, §4.13).
    pub(crate) schema_frozen: bool,

    /// Load-time scratch space (§6.3): `ArchetypeRef` traittypes whose named
    /// archetype did not yet have a shell when the traittype's own shell was
    /// built. Drained by `patch_archetype` as each archetype it names comes
    /// online. Always empty outside of `Engine::load`.
    pub(crate) pending_archetype_refs: Vec<(TraittypeId, String)>,
}

impl Engine {
    /// `Engine::new()` per §4.13: default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Full constructor (§4.13).
    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = Self {
            config,
            ids: IdSequence::new(),
            beliefs: HashMap::new(),
            states: HashMap::new(),
            minds: HashMap::new(),
            archetypes: HashMap::new(),
            traittypes: HashMap::new(),
            subjects: HashMap::new(),
            belief_by_subject: HashMap::new(),
            archetype_by_label: HashMap::new(),
            traittype_by_label: HashMap::new(),
            sid_by_label: HashMap::new(),
            label_by_sid: HashMap::new(),
            shared_belief_by_label: HashMap::new(),
            cosmos: Cosmos::placeholder(),
            schema_frozen: false,
            pending_archetype_refs: Vec::new(),
        };
        engine.install_cosmos();
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cosmos(&self) -> &Cosmos {
        &self.cosmos
    }

    /// §6.4: clear every registry, zero the id sequence, and re-install the
    /// three cosmos singletons. Every call site that holds a stale `BeliefId`
    /// etc. across a reset is a caller bug, not an engine concern.
    #[instrument(skip(self))]
    pub fn reset_registries(&mut self) {
        self.ids.reset();
        self.beliefs.clear();
        self.states.clear();
        self.minds.clear();
        self.archetypes.clear();
        self.traittypes.clear();
        self.subjects.clear();
        self.belief_by_subject.clear();
        self.archetype_by_label.clear();
        self.traittype_by_label.clear();
        self.sid_by_label.clear();
        self.label_by_sid.clear();
        self.shared_belief_by_label.clear();
        self.schema_frozen = false;
        self.pending_archetype_refs.clear();
        self.install_cosmos();
        tracing::info!("engine registries reset");
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        self.ids.next()
    }

    pub(crate) fn get_or_create_sid(&mut self, sid: Sid, ground_mind: Option<MindId>) -> Sid {
        self.subjects
            .entry(sid)
            .or_insert_with(|| SubjectRecord { sid, ground_mind });
        sid
    }

    pub(crate) fn fresh_sid(&mut self, ground_mind: Option<MindId>) -> Sid {
        let sid = Sid(self.next_id());
        self.subjects.insert(sid, SubjectRecord { sid, ground_mind });
        sid
    }

    pub fn belief(&self, id: BeliefId) -> Result<&Belief> {
        self.beliefs.get(&id).ok_or_else(|| crate::error::EngineError::no_such_belief(id))
    }

    pub fn state(&self, id: StateId) -> Result<&State> {
        self.states.get(&id).ok_or_else(|| crate::error::EngineError::no_such_state(id))
    }

    pub fn mind(&self, id: MindId) -> Result<&Mind> {
        self.minds.get(&id).ok_or_else(|| crate::error::EngineError::no_such_mind(id))
    }

    pub fn archetype(&self, id: ArchetypeId) -> Result<&Archetype> {
        self.archetypes
            .get(&id)
            .ok_or_else(|| crate::error::EngineError::no_such_archetype(id))
    }

    pub fn traittype(&self, id: TraittypeId) -> Result<&Traittype> {
        self.traittypes
            .get(&id)
            .ok_or_else(|| crate::error::EngineError::no_such_traittype(id))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

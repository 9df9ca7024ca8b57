//! Cosmos singletons: `Logos` (root), `Eidos` (prototypes), `Materia`
//! (worlds) — §2.9, §6.4.
//!
//! These three minds are installed by [`super::Engine::new`] and
//! re-installed by [`super::Engine::reset_registries`]. They are plain
//! [`crate::mind::Mind`] values distinguished only by which `MindId` the
//! engine remembers playing each role — per the note in `mind.rs`, the
//! cosmos roles are not a `Mind` variant.

use crate::ids::MindId;

/// The three root minds every engine carries: `Logos` is the mind of all
/// minds (root of the parent chain), `Eidos` is where shared prototypes
/// live, `Materia` is the root under which world minds are created.
#[derive(Debug, Clone, Copy)]
pub struct Cosmos {
    pub logos: MindId,
    pub eidos: MindId,
    pub materia: MindId,
}

impl Cosmos {
    /// A cosmos with dummy ids, used only for the instant between
    /// `Engine`'s field initialization and `install_cosmos` filling it in
    /// for real — never observed by any caller.
    pub(crate) fn placeholder() -> Self {
        Self {
            logos: MindId(0),
            eidos: MindId(0),
            materia: MindId(0),
        }
    }
}

impl super::Engine {
    /// Creates the three singleton minds and records their ids on
    /// `self.cosmos`. Called from `Engine::with_config` and
    /// `reset_registries` (§6.4) — both contexts where every registry is
    /// already empty, so these always become `MindId(1..=3)` with origin
    /// states `StateId(1..=3)`.
    pub(crate) fn install_cosmos(&mut self) {
        let logos = self.create_timeless_mind(Some("Logos".into()), None);
        let eidos = self.create_timeless_mind(Some("Eidos".into()), Some(logos));
        let materia = self.create_timeless_mind(Some("Materia".into()), Some(logos));
        self.cosmos = Cosmos {
            logos,
            eidos,
            materia,
        };
    }

    /// Bootstrap helper: a timeless mind with a fresh, already-locked origin
    /// state. Used only for the cosmos roots, which never branch and never
    /// observe a `ground_state`.
    fn create_timeless_mind(&mut self, label: Option<String>, parent: Option<MindId>) -> MindId {
        let state_id = crate::ids::StateId(self.next_id());
        let mind_id = MindId(self.next_id());
        let mut state = crate::state::State::new_timeless(state_id, mind_id);
        state.locked = true;
        self.states.insert(state_id, state);
        let mind = crate::mind::Mind::new(mind_id, label, parent, state_id);
        self.minds.insert(mind_id, mind);
        mind_id
    }
}

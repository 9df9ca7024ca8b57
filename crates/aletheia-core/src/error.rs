//! Engine error kinds (§7).
//!
//! Every fallible engine operation returns [`Result<T>`]. The engine performs
//! no local recovery: a failed mutation on an unlocked state leaves that
//! state in an inconsistent shape and the caller must discard it (never lock
//! it, never branch from it). A failed load must be followed by
//! `Engine::reset_registries` before retrying.

use crate::ids::{ArchetypeId, BeliefId, MindId, StateId, TraittypeId};

/// The five error kinds of §7, each carrying a diagnostic string that names
/// the failing check and the id/label involved — in the spirit of the
/// source's `assert` messages, kept as context rather than as control flow.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown/duplicate archetype or traittype; label reused; belief can't
    /// carry a trait because no archetype in its chain permits it.
    #[error("schema error: {0}")]
    Schema(String),

    /// A trait value does not match its traittype (wrong primitive, missing
    /// archetype, wrong container, array length outside constraints, enum
    /// miss).
    #[error("type error: {0}")]
    Type(String),

    /// Attempt to mutate a locked belief or state; branch from an unlocked
    /// base; `Convergence::remove_beliefs`.
    #[error("state error: {0}")]
    State(String),

    /// A label/sid/id/reference could not be resolved during load or
    /// template resolution.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// An internal contract was violated (e.g. multiple shared beliefs
    /// matching the same subject at a transaction time).
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Coarse category recovered from an [`EngineError`], for callers (e.g. the
/// illustrative worker transport in `aletheia-worker`) that branch on kind
/// rather than message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    Type,
    State,
    Resolution,
    Invariant,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Schema(_) => ErrorKind::Schema,
            EngineError::Type(_) => ErrorKind::Type,
            EngineError::State(_) => ErrorKind::State,
            EngineError::Resolution(_) => ErrorKind::Resolution,
            EngineError::Invariant(_) => ErrorKind::Invariant,
        }
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        EngineError::Schema(msg.into())
    }

    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        EngineError::Type(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        EngineError::State(msg.into())
    }

    pub(crate) fn resolution(msg: impl Into<String>) -> Self {
        EngineError::Resolution(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        EngineError::Invariant(msg.into())
    }

    pub(crate) fn unknown_traittype(label: &str) -> Self {
        EngineError::Schema(format!("unknown traittype '{label}'"))
    }

    pub(crate) fn unknown_archetype(label: &str) -> Self {
        EngineError::Schema(format!("unknown archetype '{label}'"))
    }

    pub(crate) fn trait_not_permitted(trait_label: &str, belief: BeliefId) -> Self {
        EngineError::Schema(format!(
            "belief #{belief} carries no archetype that permits trait '{trait_label}'"
        ))
    }

    pub(crate) fn locked_belief(belief: BeliefId) -> Self {
        EngineError::State(format!("belief #{belief} is locked and cannot be mutated"))
    }

    pub(crate) fn locked_state(state: StateId) -> Self {
        EngineError::State(format!("state #{state} is locked and cannot be mutated"))
    }

    pub(crate) fn unlocked_base(state: StateId) -> Self {
        EngineError::State(format!(
            "cannot branch from state #{state}: base must be locked first"
        ))
    }

    pub(crate) fn no_such_belief(id: BeliefId) -> Self {
        EngineError::Resolution(format!("no belief with id #{id}"))
    }

    pub(crate) fn no_such_state(id: StateId) -> Self {
        EngineError::Resolution(format!("no state with id #{id}"))
    }

    pub(crate) fn no_such_mind(id: MindId) -> Self {
        EngineError::Resolution(format!("no mind with id #{id}"))
    }

    pub(crate) fn no_such_archetype(id: ArchetypeId) -> Self {
        EngineError::Resolution(format!("no archetype with id #{id}"))
    }

    pub(crate) fn no_such_traittype(id: TraittypeId) -> Self {
        EngineError::Resolution(format!("no traittype with id #{id}"))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

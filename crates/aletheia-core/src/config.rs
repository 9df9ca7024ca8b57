//! Engine-construction configuration (§4.13, ambient stack).

use crate::traittype::Modality;

/// Tunables fixed at `Engine` construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Modalities an observer perceives through when no explicit set is
    /// passed to `perceive` (§4.10.3). Defaults to `{visual}`.
    pub default_modalities: Vec<Modality>,

    /// Maximum candidates returned by `recognize`/`identify` (§4.10.1-2).
    pub max_candidates: usize,

    /// When `true`, registering an archetype or traittype after the schema
    /// has produced any belief is a hard [`crate::error::EngineError::Schema`]
    /// rather than a silent no-op. Invariant 7 says schema changes are
    /// "forbidden once the world is running" — this flag is how that
    /// prohibition is enforced rather than merely documented.
    pub strict_schema: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_modalities: vec![Modality::Visual],
            max_candidates: 3,
            strict_schema: true,
        }
    }
}

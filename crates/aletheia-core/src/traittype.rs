//! Traittype — schema for one trait name (§4.5).
//!
//! A traittype is pure schema: it does not reach into the engine's
//! registries itself. The orchestration that needs registry lookups —
//! resolving a string label to a belief, verifying an archetype, composing
//! across bases — lives on [`crate::engine::Engine`] (`resolve_trait_value`,
//! `compose_trait`), which consults the traittype for the parts that are
//! pure: type-checking, enum membership, and container-length bounds.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ids::{ArchetypeId, BeliefId, TraittypeId};
use crate::subject::Subject;
use crate::value::TraitValue;

/// Literal (non-structural) value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    String,
    Number,
    Boolean,
}

/// Structural value kinds that are not keyed to a specific archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructKind {
    Subject,
    Belief,
    State,
    Mind,
    Fuzzy,
}

/// The declared type of a traittype's values (§3, Traittype.data_type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraitKind {
    Literal(Primitive),
    Struct(StructKind),
    /// Denotes a Subject whose belief must bear this archetype.
    ArchetypeRef(ArchetypeId),
}

impl TraitKind {
    /// True for `Subject` and any archetype-labelled type — these are the
    /// kinds that participate in the reverse index (§4.5, `is_subject_reference`).
    pub fn is_subject_reference(&self) -> bool {
        matches!(
            self,
            TraitKind::Struct(StructKind::Subject)
                | TraitKind::Struct(StructKind::Belief)
                | TraitKind::ArchetypeRef(_)
        )
    }
}

/// Container wrapping a traittype's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Container {
    Array,
}

/// Inclusive length bounds for an `Array` container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Constraints {
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
}

/// Perceptual modality tag controlling what `perceive` records (§4.10.3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    Visual,
    Spatial,
    Tactile,
    Auditory,
    Internal,
    Custom(String),
}

/// Schema for one trait name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Traittype {
    pub id: TraittypeId,
    pub label: String,
    pub data_type: TraitKind,
    pub container: Option<Container>,
    pub constraints: Option<Constraints>,
    /// `true` enables breadth-first collect-and-dedup composition from bases (§4.5).
    pub composable: bool,
    /// Enum constraint for `Literal(String)` traittypes; `None` means unconstrained.
    pub values: Option<Vec<String>>,
    pub exposure: Option<Modality>,
    /// Marks the trait as resolved per-mind rather than per-belief (§3).
    /// No §4 operation currently reads this beyond preserving it through
    /// serialization — see DESIGN.md for why it is carried inert rather than
    /// given invented behavior.
    pub mind_scope: bool,
}

impl Traittype {
    pub fn is_subject_reference(&self) -> bool {
        self.data_type.is_subject_reference()
    }

    /// Length-check an already-resolved array value against `constraints`.
    pub fn check_length(&self, len: usize) -> Result<(), String> {
        if let Some(c) = &self.constraints {
            if let Some(min) = c.min_len {
                if len < min {
                    return Err(format!(
                        "array for trait '{}' has {len} elements, below minimum {min}",
                        self.label
                    ));
                }
            }
            if let Some(max) = c.max_len {
                if len > max {
                    return Err(format!(
                        "array for trait '{}' has {len} elements, above maximum {max}",
                        self.label
                    ));
                }
            }
        }
        Ok(())
    }

    /// Enum membership check for string-literal traittypes with `values` set.
    pub fn check_enum_membership(&self, candidate: &str) -> Result<(), String> {
        if let Some(values) = &self.values {
            if !values.iter().any(|v| v == candidate) {
                return Err(format!(
                    "'{candidate}' is not a permitted value for trait '{}' (expected one of {values:?})",
                    self.label
                ));
            }
        }
        Ok(())
    }

    /// Post-resolution structural check used by the serializer round-trip and
    /// by callers re-validating a value after a schema change check. Does not
    /// re-run label/belief lookups — it assumes `v` is already resolved.
    pub fn validate_value(&self, v: &TraitValue) -> Result<(), String> {
        if v.is_null() {
            return Ok(());
        }
        match (&self.container, v) {
            (Some(Container::Array), TraitValue::Array(items)) => {
                self.check_length(items.len())?;
                for item in items {
                    self.validate_scalar(item)?;
                }
                Ok(())
            }
            (Some(Container::Array), other) => Err(format!(
                "trait '{}' expects an array, found {:?}",
                self.label, other
            )),
            (None, TraitValue::Array(_)) => Err(format!(
                "trait '{}' does not accept an array",
                self.label
            )),
            (None, scalar) => self.validate_scalar(scalar),
        }
    }

    fn validate_scalar(&self, v: &TraitValue) -> Result<(), String> {
        match v {
            TraitValue::Fuzzy(_) => Ok(()), // Fuzzy passes through any literal/struct check (§4.5)
            TraitValue::String(s) => {
                if !matches!(self.data_type, TraitKind::Literal(Primitive::String)) {
                    return Err(format!("trait '{}' is not string-typed", self.label));
                }
                self.check_enum_membership(s)
            }
            TraitValue::Number(_) => {
                if !matches!(self.data_type, TraitKind::Literal(Primitive::Number)) {
                    return Err(format!("trait '{}' is not number-typed", self.label));
                }
                Ok(())
            }
            TraitValue::Boolean(_) => {
                if !matches!(self.data_type, TraitKind::Literal(Primitive::Boolean)) {
                    return Err(format!("trait '{}' is not boolean-typed", self.label));
                }
                Ok(())
            }
            TraitValue::Subject(_) => {
                if !self.is_subject_reference() {
                    return Err(format!(
                        "trait '{}' does not accept a Subject reference",
                        self.label
                    ));
                }
                Ok(())
            }
            TraitValue::Mind(_) => {
                if !matches!(self.data_type, TraitKind::Struct(StructKind::Mind)) {
                    return Err(format!("trait '{}' is not Mind-typed", self.label));
                }
                Ok(())
            }
            TraitValue::State(_) => {
                if !matches!(self.data_type, TraitKind::Struct(StructKind::State)) {
                    return Err(format!("trait '{}' is not State-typed", self.label));
                }
                Ok(())
            }
            TraitValue::Null | TraitValue::Array(_) => unreachable!("handled by caller"),
        }
    }
}

/// Raw, unresolved value as accepted from a belief template (§4.5) — the
/// input form before `Engine::resolve_trait_value` runs validation and
/// reference resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RawValue {
    Null,
    String(String),
    Number(f64),
    Boolean(bool),
    /// A label naming a belief, shared prototype, or archetype — resolved via
    /// `label_by_sid`/`shared_belief_by_label`/`archetype_by_label`.
    Label(String),
    BeliefRef(BeliefId),
    SubjectRef(Subject),
    Fuzzy(crate::fuzzy::Fuzzy),
    Array(Vec<RawValue>),
    /// A plain `label -> [trait names]` map, handled by
    /// `Mind::resolve_template` (§4.9) rather than by `Traittype` directly.
    MindTemplate(HashMap<String, Vec<String>>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_trait() -> Traittype {
        Traittype {
            id: TraittypeId(1),
            label: "mood".into(),
            data_type: TraitKind::Literal(Primitive::String),
            container: None,
            constraints: None,
            composable: false,
            values: Some(vec!["happy".into(), "sad".into()]),
            exposure: None,
            mind_scope: false,
        }
    }

    #[test]
    fn enum_membership_rejects_unlisted_value() {
        let tt = string_trait();
        assert!(tt.validate_value(&TraitValue::String("furious".into())).is_err());
        assert!(tt.validate_value(&TraitValue::String("happy".into())).is_ok());
    }

    #[test]
    fn array_container_checks_length_bounds() {
        let tt = Traittype {
            id: TraittypeId(2),
            label: "inventory".into(),
            data_type: TraitKind::Struct(StructKind::Subject),
            container: Some(Container::Array),
            constraints: Some(Constraints {
                min_len: Some(1),
                max_len: Some(2),
            }),
            composable: true,
            values: None,
            exposure: None,
            mind_scope: false,
        };
        let empty = TraitValue::Array(vec![]);
        assert!(tt.validate_value(&empty).is_err());
        let one = TraitValue::Array(vec![TraitValue::Subject(Subject::new(1.into()))]);
        assert!(tt.validate_value(&one).is_ok());
    }

    #[test]
    fn fuzzy_passes_through_literal_check() {
        let tt = string_trait();
        let fuzzy = TraitValue::Fuzzy(crate::fuzzy::Fuzzy::certain(TraitValue::String(
            "anything-at-all".into(),
        )));
        assert!(tt.validate_value(&fuzzy).is_ok());
    }
}

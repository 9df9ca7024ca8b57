//! Archetype / traittype registration — the schema half of §4.4 and §4.5.
//!
//! Archetype registration, traittype registration, and eidos-prototype
//! registration together form "the schema" (§3 invariant 7): schema changes
//! are forbidden once the world is running. `strict_schema` (§4.13) turns
//! that prohibition from documentation into an enforced
//! [`crate::error::EngineError::Schema`].

use crate::archetype::{Archetype, TraitDefault};
use crate::error::{EngineError, Result};
use crate::ids::{ArchetypeId, TraittypeId};
use crate::traittype::{Constraints, Container, Modality, Primitive, TraitKind, Traittype};

use super::Engine;

/// An unresolved archetype-template default, as supplied to
/// `register_archetype` before it is resolved to a [`TraitDefault`] (§3:
/// "Defaults are resolved once at registration").
#[derive(Debug, Clone)]
pub enum RawDefault {
    /// Names either a registered archetype or a registered shared
    /// prototype's label — whichever resolves first wins, archetype first.
    Label(String),
}

impl Engine {
    fn check_schema_open(&self) -> Result<()> {
        if self.config.strict_schema && self.schema_frozen {
            return Err(EngineError::schema(
                "schema is frozen: archetypes/traittypes may not be registered once any belief has been created",
            ));
        }
        Ok(())
    }

    /// Marks the schema frozen. Called exactly once, by the first belief
    /// construction of any kind (`belief_ops`).
    pub(crate) fn freeze_schema(&mut self) {
        self.schema_frozen = true;
    }

    /// Registers a named template: `bases` are the archetype's own bases
    /// (DAG, traversed breadth-first elsewhere); `trait_template` declares
    /// which trait names beliefs bearing this archetype may carry, each with
    /// an optional default resolved right now (§3).
    #[tracing::instrument(skip(self, trait_template))]
    pub fn register_archetype(
        &mut self,
        label: impl Into<String>,
        bases: Vec<ArchetypeId>,
        trait_template: Vec<(TraittypeId, Option<RawDefault>)>,
    ) -> Result<ArchetypeId> {
        self.check_schema_open()?;
        let label = label.into();
        if self.archetype_by_label.contains_key(&label) {
            return Err(EngineError::schema(format!(
                "archetype label '{label}' already registered"
            )));
        }
        for base in &bases {
            self.archetype(*base)?;
        }

        let mut resolved = std::collections::HashMap::new();
        for (tt_id, raw_default) in trait_template {
            self.traittype(tt_id)?;
            let default = match raw_default {
                None => None,
                Some(RawDefault::Label(label)) => Some(self.resolve_trait_default(&label)?),
            };
            resolved.insert(tt_id, default);
        }

        let id = ArchetypeId(self.next_id());
        let archetype = Archetype {
            id,
            label: label.clone(),
            bases,
            trait_template: resolved,
        };
        self.archetypes.insert(id, archetype);
        self.archetype_by_label.insert(label, id);
        tracing::info!(archetype = id.raw(), "archetype registered");
        Ok(id)
    }

    /// Reverse of template resolution (§4.4): a label names either a
    /// registered archetype (kept as a marker, §3) or a shared prototype's
    /// subject.
    fn resolve_trait_default(&self, label: &str) -> Result<TraitDefault> {
        if let Some(archetype_id) = self.archetype_by_label.get(label) {
            return Ok(TraitDefault::Archetype(*archetype_id));
        }
        if let Some(belief_id) = self.shared_belief_by_label.get(label) {
            let belief = self.belief(*belief_id)?;
            return Ok(TraitDefault::Prototype(belief.subject));
        }
        Err(EngineError::resolution(format!(
            "default '{label}' names neither a registered archetype nor a shared prototype"
        )))
    }

    /// Schema for one trait name (§4.5).
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip(self))]
    pub fn register_traittype(
        &mut self,
        label: impl Into<String>,
        data_type: TraitKind,
        container: Option<Container>,
        constraints: Option<Constraints>,
        composable: bool,
        values: Option<Vec<String>>,
        exposure: Option<Modality>,
        mind_scope: bool,
    ) -> Result<TraittypeId> {
        self.check_schema_open()?;
        let label = label.into();
        if self.traittype_by_label.contains_key(&label) {
            return Err(EngineError::schema(format!(
                "traittype label '{label}' already registered"
            )));
        }
        if values.is_some() && !matches!(data_type, TraitKind::Literal(Primitive::String)) {
            return Err(EngineError::schema(format!(
                "traittype '{label}' declares an enum `values` set but is not string-typed"
            )));
        }

        let id = TraittypeId(self.next_id());
        let traittype = Traittype {
            id,
            label: label.clone(),
            data_type,
            container,
            constraints,
            composable,
            values,
            exposure,
            mind_scope,
        };
        self.traittypes.insert(id, traittype);
        self.traittype_by_label.insert(label, id);
        tracing::info!(traittype = id.raw(), "traittype registered");
        Ok(id)
    }

    pub fn archetype_by_label(&self, label: &str) -> Result<ArchetypeId> {
        self.archetype_by_label
            .get(label)
            .copied()
            .ok_or_else(|| EngineError::unknown_archetype(label))
    }

    pub fn traittype_by_label(&self, label: &str) -> Result<TraittypeId> {
        self.traittype_by_label
            .get(label)
            .copied()
            .ok_or_else(|| EngineError::unknown_traittype(label))
    }

    /// The reserved `@about` traittype, registering it on first use. Every
    /// perception-produced belief carries this trait (§4.10, glossary).
    pub fn about_traittype(&mut self) -> Result<TraittypeId> {
        if let Ok(id) = self.traittype_by_label("@about") {
            return Ok(id);
        }
        self.register_reserved_traittype(
            "@about",
            TraitKind::Struct(crate::traittype::StructKind::Subject),
            None,
            false,
        )
    }

    /// Registers an engine-reserved traittype (`@about`, perception's
    /// `content`), bypassing `check_schema_open`: these are not user schema,
    /// they are ambient plumbing `perceive`/`recognize` need to exist the
    /// first time they run, which may be well after the world's own schema
    /// has frozen.
    pub(crate) fn register_reserved_traittype(
        &mut self,
        label: &str,
        data_type: TraitKind,
        container: Option<Container>,
        composable: bool,
    ) -> Result<TraittypeId> {
        if let Ok(id) = self.traittype_by_label(label) {
            return Ok(id);
        }
        let id = TraittypeId(self.next_id());
        let traittype = Traittype {
            id,
            label: label.to_string(),
            data_type,
            container,
            constraints: None,
            composable,
            values: None,
            exposure: None,
            mind_scope: false,
        };
        self.traittypes.insert(id, traittype);
        self.traittype_by_label.insert(label.to_string(), id);
        Ok(id)
    }

    /// Registers the engine-reserved `EventPerception` archetype on first
    /// use, bypassing `check_schema_open` for the same reason as
    /// `register_reserved_traittype`.
    pub(crate) fn event_perception_archetype(&mut self) -> Result<ArchetypeId> {
        if let Ok(id) = self.archetype_by_label("EventPerception") {
            return Ok(id);
        }
        let about = self.about_traittype()?;
        let content = self.register_reserved_traittype(
            "content",
            TraitKind::Struct(crate::traittype::StructKind::Subject),
            Some(Container::Array),
            true,
        )?;
        let id = ArchetypeId(self.next_id());
        let mut trait_template = std::collections::HashMap::new();
        trait_template.insert(about, None);
        trait_template.insert(content, None);
        let archetype = Archetype {
            id,
            label: "EventPerception".to_string(),
            bases: vec![],
            trait_template,
        };
        self.archetypes.insert(id, archetype);
        self.archetype_by_label.insert("EventPerception".to_string(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_archetype_label_is_rejected() {
        let mut engine = Engine::new();
        engine.register_archetype("Location", vec![], vec![]).unwrap();
        let err = engine.register_archetype("Location", vec![], vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn archetype_base_must_exist() {
        let mut engine = Engine::new();
        let err = engine.register_archetype("Ghost", vec![ArchetypeId(999)], vec![]);
        assert!(err.is_err());
    }

    #[test]
    fn strict_schema_blocks_registration_after_first_belief() {
        let mut engine = Engine::new();
        let archetype = engine.register_archetype("Actor", vec![], vec![]).unwrap();
        let mind = engine.create_world_mind(Some("test-world".into()), None).unwrap();
        let state = engine.mind(mind).unwrap().origin_state;
        engine
            .add_belief(state, crate::belief::BeliefTemplate::new().with_base("Actor"))
            .unwrap();
        let _ = archetype;
        let err = engine.register_archetype("TooLate", vec![], vec![]);
        assert!(err.is_err());
    }
}

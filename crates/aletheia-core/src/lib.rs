//! # Aletheia Core
//!
//! A bitemporal knowledge engine for interactive fiction: a versioned,
//! branching store of *beliefs* held by one or more *minds* about *subjects*,
//! with first-class support for prototype inheritance, trait composition,
//! uncertainty, and observation-driven knowledge propagation between minds.
//!
//! A mind models a world, an NPC, a player, or a cultural-knowledge
//! container. A state is an immutable snapshot of one mind at one
//! (transaction-time, valid-time) coordinate. A belief is a versioned record
//! carrying typed traits and inheritance links.
//!
//! ## Data flow
//!
//! All writes go through [`traittype::Traittype`] (validation + resolution)
//! into unlocked [`belief::Belief`]s held in an unlocked [`state::State`];
//! [`engine::Engine::lock_state`] cascades into the mind graph; queries walk
//! state chains, consulting belief bases and archetype slots;
//! [`engine::Engine::perceive`] produces a new locked state in the observer's
//! mind whose beliefs reference (via `@about`) subjects in the observed
//! state.
//!
//! ## Non-goals
//!
//! Multi-node replication, on-disk page management, transactional
//! durability, a query language, a rules engine, planning/AI. The engine is
//! in-memory, single-process, and single-threaded cooperative: [`Engine`]
//! carries every registry by value and is driven through `&mut self`, never
//! through ambient `static` state or a `Mutex`.
//!
//! ## Quick start
//!
//! ```rust
//! use aletheia_core::engine::Engine;
//! use aletheia_core::traittype::{Container, Primitive, TraitKind};
//! use aletheia_core::belief::BeliefTemplate;
//! use aletheia_core::traittype::RawValue;
//!
//! let mut engine = Engine::new();
//! let location_archetype = engine
//!     .register_archetype("Location", vec![], vec![])
//!     .unwrap();
//! let name_tt = engine
//!     .register_traittype("name", TraitKind::Literal(Primitive::String), None, None, false, None, None, false)
//!     .unwrap();
//! let _ = (location_archetype, name_tt, Container::Array, RawValue::Null);
//! ```
//!
//! [`Engine`]: engine::Engine

pub mod archetype;
pub mod belief;
pub mod config;
pub mod engine;
pub mod error;
pub mod fuzzy;
pub mod id;
pub mod ids;
pub mod mind;
pub mod state;
pub mod subject;
pub mod traittype;
pub mod value;

pub use belief::{Belief, BeliefBase, BeliefTemplate};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, ErrorKind, Result};
pub use fuzzy::{Fuzzy, FuzzyAlternative};
pub use ids::{ArchetypeId, BeliefId, MindId, Sid, StateId, TraittypeId};
pub use mind::Mind;
pub use state::{State, StateKind};
pub use subject::Subject;
pub use traittype::{Modality, Traittype};
pub use value::TraitValue;

//! Black-box coverage of the perception pipeline: recognize, identify,
//! modality-filtered perceive, and the learn_about bypass.

use aletheia_core::belief::BeliefTemplate;
use aletheia_core::traittype::{Modality, Primitive, RawValue, TraitKind};
use aletheia_core::Engine;

fn goblin_world() -> (Engine, aletheia_core::StateId, aletheia_core::BeliefId) {
    let mut engine = Engine::new();
    let mood_tt = engine
        .register_traittype(
            "mood",
            TraitKind::Literal(Primitive::String),
            None,
            None,
            false,
            None,
            Some(Modality::Visual),
            false,
        )
        .unwrap();
    let secret_tt = engine
        .register_traittype(
            "secret_thought",
            TraitKind::Literal(Primitive::String),
            None,
            None,
            false,
            None,
            Some(Modality::Internal),
            false,
        )
        .unwrap();
    engine
        .register_archetype("Actor", vec![], vec![(mood_tt, None), (secret_tt, None)])
        .unwrap();

    let world = engine.create_world_mind(Some("camp".into()), None).unwrap();
    let state = engine.mind(world).unwrap().origin_state;
    let goblin = engine
        .add_belief(
            state,
            BeliefTemplate::new()
                .with_base("Actor")
                .with_label("goblin")
                .with_trait("mood", RawValue::String("angry".into()))
                .with_trait("secret_thought", RawValue::String("plotting an ambush".into())),
        )
        .unwrap();
    engine.lock_state(state).unwrap();
    (engine, state, goblin)
}

#[test]
fn perceive_copies_visible_traits_but_not_internal_ones() {
    let (mut engine, world_state, goblin) = goblin_world();
    let _ = world_state;
    let goblin_subject = engine.belief(goblin).unwrap().subject;

    let observer = engine.create_world_mind(Some("scout".into()), None).unwrap();
    let observer_state = engine.mind(observer).unwrap().origin_state;

    let perception = engine.perceive(observer_state, vec![goblin]).unwrap();
    assert_eq!(perception.subjects.len(), 1);

    let known = engine
        .recognize(observer_state, goblin_subject)
        .unwrap()
        .first()
        .copied()
        .expect("perceive must leave a recognizable knowledge belief about the goblin");

    let mood_tt = engine.traittype_by_label("mood").unwrap();
    let secret_tt = engine.traittype_by_label("secret_thought").unwrap();
    let mood = engine.get_trait(known, observer_state, mood_tt).unwrap();
    let secret = engine.get_trait(known, observer_state, secret_tt).unwrap();

    assert!(mood.matches(&aletheia_core::TraitValue::String("angry".into())));
    assert!(secret.is_null(), "internal-modality trait must not cross into a Visual-only perceiver");
}

#[test]
fn repeated_perceive_of_an_unchanged_world_belief_is_idempotent() {
    let (mut engine, world_state, goblin) = goblin_world();
    let _ = world_state;
    let observer = engine.create_world_mind(Some("scout".into()), None).unwrap();
    let observer_state = engine.mind(observer).unwrap().origin_state;

    engine.perceive(observer_state, vec![goblin]).unwrap();
    let before = engine.get_beliefs(observer_state).unwrap().len();
    engine.perceive(observer_state, vec![goblin]).unwrap();
    let after = engine.get_beliefs(observer_state).unwrap().len();

    assert_eq!(before, after, "re-perceiving the same unchanged belief must not grow the observer's state");
}

#[test]
fn learn_about_copies_named_traits_directly_without_a_perception_wrapper() {
    let (mut engine, _world_state, goblin) = goblin_world();
    let goblin_subject = engine.belief(goblin).unwrap().subject;

    let observer = engine.create_world_mind(Some("scout".into()), None).unwrap();
    let observer_state = engine.mind(observer).unwrap().origin_state;

    let known = engine
        .learn_about(observer_state, goblin, &["mood".to_string(), "secret_thought".to_string()])
        .unwrap();

    let mood_tt = engine.traittype_by_label("mood").unwrap();
    let secret_tt = engine.traittype_by_label("secret_thought").unwrap();
    let mood = engine.get_trait(known, observer_state, mood_tt).unwrap();
    let secret = engine.get_trait(known, observer_state, secret_tt).unwrap();

    assert!(mood.matches(&aletheia_core::TraitValue::String("angry".into())));
    assert!(secret.matches(&aletheia_core::TraitValue::String("plotting an ambush".into())));

    let recognized = engine.recognize(observer_state, goblin_subject).unwrap();
    assert_eq!(recognized, vec![known]);
}

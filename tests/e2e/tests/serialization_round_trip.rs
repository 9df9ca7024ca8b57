//! A dump/load round trip across a richer graph than the unit tests in
//! `engine::serialization` cover: branching, a Mind-valued trait, and a
//! locked Convergence, checked for belief-set and rev_trait equivalence
//! before and after reload.

use aletheia_core::belief::{BeliefBase, BeliefTemplate};
use aletheia_core::traittype::{Container, RawValue, StructKind, TraitKind};
use aletheia_core::Engine;

#[test]
fn dump_and_load_preserves_branches_and_mind_valued_traits() {
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
    let inventory_tt = engine
        .register_traittype(
            "inventory",
            TraitKind::Struct(StructKind::Subject),
            Some(Container::Array),
            None,
            true,
            None,
            None,
            false,
        )
        .unwrap();
    engine.register_archetype("Location", vec![], vec![]).unwrap();
    engine
        .register_archetype("Actor", vec![], vec![(location_tt, None), (inventory_tt, None)])
        .unwrap();

    let world = engine.create_world_mind(Some("riverbend".into()), None).unwrap();
    let s1 = engine.mind(world).unwrap().origin_state;

    let tavern = engine
        .add_belief(s1, BeliefTemplate::new().with_base("Location").with_label("tavern"))
        .unwrap();
    let bartender = engine
        .add_belief(
            s1,
            BeliefTemplate::new()
                .with_base("Actor")
                .with_label("bartender")
                .with_trait("location", RawValue::Label("tavern".into()))
                .with_trait("inventory", RawValue::Array(vec![])),
        )
        .unwrap();
    engine.lock_state(s1).unwrap();

    let s2 = engine.branch(s1, None, None).unwrap();
    let bartender_v2 = engine
        .belief_from(
            Some(world),
            vec![BeliefBase::Belief(bartender)],
            vec![("inventory".into(), RawValue::Array(vec![RawValue::Label("tavern".into())]))],
            Some(s2),
        )
        .unwrap();
    engine.insert_beliefs(s2, vec![bartender_v2]).unwrap();
    engine.lock_state(s2).unwrap();

    let tavern_subject = engine.belief(tavern).unwrap().subject;
    let location_tt = engine.traittype_by_label("location").unwrap();
    let inventory_tt = engine.traittype_by_label("inventory").unwrap();

    let beliefs_before = engine.get_beliefs(s2).unwrap();
    let location_refs_before = engine.rev_trait(s2, tavern_subject, location_tt).unwrap();
    let inventory_refs_before = engine.rev_trait(s2, tavern_subject, inventory_tt).unwrap();

    let doc = engine.dump();
    let mut loaded = Engine::load(doc).unwrap();

    let beliefs_after = loaded.get_beliefs(s2).unwrap();
    let location_refs_after = loaded.rev_trait(s2, tavern_subject, location_tt).unwrap();
    let inventory_refs_after = loaded.rev_trait(s2, tavern_subject, inventory_tt).unwrap();

    assert_eq!(beliefs_before, beliefs_after);
    assert_eq!(location_refs_before, location_refs_after);
    assert_eq!(inventory_refs_before, inventory_refs_after);
    assert!(inventory_refs_after.contains(&bartender_v2));

    assert!(loaded.state(s1).unwrap().locked);
    assert!(loaded.state(s2).unwrap().locked);
    assert!(loaded.state(s1).unwrap().branches.contains(&s2));

    let _ = bartender;
}

#[test]
fn dump_and_load_preserves_a_locked_convergence() {
    let mut engine = Engine::new();
    engine.register_archetype("Actor", vec![], vec![]).unwrap();

    let left_mind = engine.create_world_mind(Some("left".into()), None).unwrap();
    let right_mind = engine.create_world_mind(Some("right".into()), None).unwrap();
    let left_state = engine.mind(left_mind).unwrap().origin_state;
    let right_state = engine.mind(right_mind).unwrap().origin_state;

    engine
        .add_belief(left_state, BeliefTemplate::new().with_base("Actor").with_label("left_actor"))
        .unwrap();
    engine
        .add_belief(right_state, BeliefTemplate::new().with_base("Actor").with_label("right_actor"))
        .unwrap();
    engine.lock_state(left_state).unwrap();
    engine.lock_state(right_state).unwrap();

    let composed = engine.compose_minds(left_mind, vec![left_mind, right_mind]).unwrap();
    let composed_origin = engine.mind(composed).unwrap().origin_state;
    // the origin state of a composed mind is plain; the convergence itself
    // is the second state recorded against that mind
    let convergence = engine.mind(composed).unwrap().states[1];

    let beliefs_before = engine.get_beliefs(convergence).unwrap();

    let doc = engine.dump();
    let loaded = Engine::load(doc).unwrap();
    let beliefs_after = loaded.get_beliefs(convergence).unwrap();

    assert_eq!(beliefs_before, beliefs_after);
    assert_eq!(beliefs_before.len(), 2);
    assert!(loaded.state(convergence).unwrap().is_convergence());
    let _ = composed_origin;
}

//! Combat integration tests
//!
//! Movement history recording under an active combat and turn preservation
//! across roster edits.

use arc_tabletop::combat::{Combatant, CombatantChanges};
use arc_tabletop::events::LoggedEvent;
use arc_tabletop::movement::MovementWaypointInput;
use arc_tabletop::scene::Scene;
use arc_tabletop::world::{UpdateOptions, World};

fn world() -> World {
    World::new(Scene::new("test", 4000.0, 3000.0).with_grid(100.0, 5.0))
}

#[test]
fn movement_history_recorded_during_combat() {
    let mut w = world();
    let token = w.create_token("fighter", 0.0, 0.0);

    let combat = w.start_combat();
    combat
        .combatants
        .push(Combatant::new("fighter", Some(token)).with_initiative(15.0));
    combat.begin();

    let outcome = w
        .move_token(
            token,
            vec![MovementWaypointInput::to(300.0, 0.0)],
            UpdateOptions::default(),
        )
        .unwrap();

    let op = outcome.movement.unwrap();
    assert!(op.recorded);

    let doc = w.token(token).unwrap();
    // Origin plus destination; intermediates are not persisted
    assert_eq!(doc.movement_history.len(), 2);
    assert_eq!(doc.movement_history[0].cost, 0.0);
    assert_eq!(doc.movement_history[1].cost, 15.0);
    assert_eq!(doc.movement_history[1].waypoint.position.x, 300.0);

    assert!(w
        .log
        .entries
        .iter()
        .any(|e| matches!(e.event, LoggedEvent::MovementRecorded { .. })));
}

#[test]
fn second_move_history_reflects_recorded_first() {
    let mut w = world();
    let token = w.create_token("fighter", 0.0, 0.0);

    let combat = w.start_combat();
    combat
        .combatants
        .push(Combatant::new("fighter", Some(token)).with_initiative(15.0));
    combat.begin();

    w.move_token(
        token,
        vec![MovementWaypointInput::to(200.0, 0.0)],
        UpdateOptions::default(),
    )
    .unwrap();

    let outcome = w
        .move_token(
            token,
            vec![MovementWaypointInput::to(400.0, 0.0)],
            UpdateOptions::default(),
        )
        .unwrap();

    let op = outcome.movement.unwrap();
    assert_eq!(op.history.recorded.distance, 10.0);
    assert_eq!(op.history.unrecorded.distance, 0.0);
    assert_eq!(op.history.distance, 10.0);
    assert_eq!(
        op.history.recorded.cost + op.history.unrecorded.cost,
        op.history.cost
    );
}

#[test]
fn tokens_outside_combat_are_not_recorded() {
    let mut w = world();
    let fighter = w.create_token("fighter", 0.0, 0.0);
    let bystander = w.create_token("bystander", 500.0, 500.0);

    let combat = w.start_combat();
    combat
        .combatants
        .push(Combatant::new("fighter", Some(fighter)).with_initiative(15.0));
    combat.begin();

    let outcome = w
        .move_token(
            bystander,
            vec![MovementWaypointInput::to(700.0, 500.0)],
            UpdateOptions::default(),
        )
        .unwrap();

    assert!(!outcome.movement.unwrap().recorded);
    assert!(w.token(bystander).unwrap().movement_history.is_empty());
}

#[test]
fn end_combat_clears_history() {
    let mut w = world();
    let token = w.create_token("fighter", 0.0, 0.0);

    let combat = w.start_combat();
    combat
        .combatants
        .push(Combatant::new("fighter", Some(token)).with_initiative(15.0));
    combat.begin();

    w.move_token(
        token,
        vec![MovementWaypointInput::to(300.0, 0.0)],
        UpdateOptions::default(),
    )
    .unwrap();
    assert!(!w.token(token).unwrap().movement_history.is_empty());

    w.end_combat();
    assert!(w.combat.is_none());
    assert!(w.token(token).unwrap().movement_history.is_empty());
}

#[test]
fn roster_addition_preserves_acting_combatant() {
    let mut w = world();
    let combat = w.start_combat();
    combat.combatants.push(Combatant::new("a", None).with_initiative(20.0));
    combat.combatants.push(Combatant::new("b", None).with_initiative(10.0));
    combat.begin();
    w.next_turn(); // acting: "b"

    w.add_combatants(vec![Combatant::new("c", None).with_initiative(30.0)]);

    let combat = w.combat.as_ref().unwrap();
    assert_eq!(combat.current().unwrap().name, "b");
    assert_eq!(combat.turn, Some(2));
}

#[test]
fn initiative_update_preserves_acting_combatant() {
    let mut w = world();
    let combat = w.start_combat();
    combat.combatants.push(Combatant::new("a", None).with_initiative(20.0));
    combat.combatants.push(Combatant::new("b", None).with_initiative(10.0));
    combat.begin(); // acting: "a"
    let slow = w.combat.as_ref().unwrap().turn_order()[1].id;

    w.update_combatants(&[(
        slow,
        CombatantChanges {
            initiative: Some(50.0),
            ..Default::default()
        },
    )]);

    let combat = w.combat.as_ref().unwrap();
    assert_eq!(combat.current().unwrap().name, "a");
    assert_eq!(combat.turn, Some(1));
}

#[test]
fn deleting_acting_combatant_advances_to_next_survivor() {
    let mut w = world();
    let combat = w.start_combat();
    combat.combatants.push(Combatant::new("a", None).with_initiative(30.0));
    combat.combatants.push(Combatant::new("b", None).with_initiative(20.0));
    combat.combatants.push(Combatant::new("c", None).with_initiative(10.0));
    combat.begin();
    w.next_turn(); // acting: "b"
    let acting = w.combat.as_ref().unwrap().current().unwrap().id;

    w.delete_combatants(&[acting]);

    let combat = w.combat.as_ref().unwrap();
    assert_eq!(combat.current().unwrap().name, "c");
}

#[test]
fn deleting_acting_combatant_skips_defeated_survivors() {
    let mut w = world();
    let combat = w.start_combat();
    combat.combatants.push(Combatant::new("a", None).with_initiative(40.0));
    combat.combatants.push(Combatant::new("b", None).with_initiative(30.0));
    combat.combatants.push(Combatant::new("c", None).with_initiative(20.0));
    combat.combatants.push(Combatant::new("d", None).with_initiative(10.0));
    combat.begin();
    w.next_turn(); // acting: "b"

    let (acting, defeated) = {
        let combat = w.combat.as_ref().unwrap();
        let order = combat.turn_order();
        (order[1].id, order[2].id)
    };
    w.combat
        .as_mut()
        .unwrap()
        .combatant_mut(defeated)
        .unwrap()
        .defeated = true;

    w.delete_combatants(&[acting]);

    // "c" is defeated, so "d" takes the turn
    let combat = w.combat.as_ref().unwrap();
    assert_eq!(combat.current().unwrap().name, "d");
}

#[test]
fn deleting_last_combatant_clears_turn() {
    let mut w = world();
    let combat = w.start_combat();
    combat.combatants.push(Combatant::new("only", None).with_initiative(10.0));
    combat.begin();
    let only = w.combat.as_ref().unwrap().combatants[0].id;

    w.delete_combatants(&[only]);
    let combat = w.combat.as_ref().unwrap();
    assert!(combat.turn.is_none());
    assert!(combat.combatants.is_empty());
}

#[test]
fn roster_edits_suppress_turn_change_events() {
    let mut w = world();
    let combat = w.start_combat();
    combat.combatants.push(Combatant::new("a", None).with_initiative(20.0));
    combat.combatants.push(Combatant::new("b", None).with_initiative(10.0));
    combat.begin();

    let before = w
        .log
        .entries
        .iter()
        .filter(|e| matches!(e.event, LoggedEvent::TurnChanged { .. }))
        .count();
    w.add_combatants(vec![Combatant::new("c", None).with_initiative(5.0)]);
    let after = w
        .log
        .entries
        .iter()
        .filter(|e| matches!(e.event, LoggedEvent::TurnChanged { .. }))
        .count();
    assert_eq!(before, after);

    // An explicit turn advance does log
    w.next_turn();
    let final_count = w
        .log
        .entries
        .iter()
        .filter(|e| matches!(e.event, LoggedEvent::TurnChanged { .. }))
        .count();
    assert_eq!(final_count, after + 1);
}

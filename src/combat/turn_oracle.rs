//! Combatant turn oracle
//!
//! Roster edits under an active combat must not shift whose turn it is. The
//! oracle clones the combat, applies the hypothetical change, recomputes the
//! turn order, and reports the index that keeps the currently-acting
//! combatant identified, together with a flag that suppresses the duplicate
//! turn-change event the index write would otherwise fire.

use super::{Combat, Combatant};
use crate::core::types::CombatantId;
use serde::{Deserialize, Serialize};

/// Turn index to write into the pending roster operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnUpdate {
    pub turn: usize,
    /// The index write preserves the acting combatant; no turn-change event
    /// should fire for it
    pub suppress_turn_events: bool,
}

/// Partial combatant update; `None` fields are unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatantChanges {
    pub initiative: Option<f64>,
    pub defeated: Option<bool>,
    pub name: Option<String>,
}

fn position_of(order: &[&Combatant], id: CombatantId) -> Option<usize> {
    order.iter().position(|c| c.id == id)
}

/// Simulate adding combatants; returns the turn index preserving the
/// current combatant
pub fn simulate_create(combat: &Combat, additions: &[Combatant]) -> Option<TurnUpdate> {
    let current = combat.current()?.id;

    let mut hypothetical = combat.clone();
    hypothetical.combatants.extend(additions.iter().cloned());

    let order = hypothetical.turn_order();
    position_of(&order, current).map(|turn| TurnUpdate {
        turn,
        suppress_turn_events: true,
    })
}

/// Simulate updating combatants; returns the turn index preserving the
/// current combatant
pub fn simulate_update(
    combat: &Combat,
    changes: &[(CombatantId, CombatantChanges)],
) -> Option<TurnUpdate> {
    let current = combat.current()?.id;

    let mut hypothetical = combat.clone();
    for (id, change) in changes {
        if let Some(combatant) = hypothetical.combatant_mut(*id) {
            if let Some(initiative) = change.initiative {
                combatant.initiative = Some(initiative);
            }
            if let Some(defeated) = change.defeated {
                combatant.defeated = defeated;
            }
            if let Some(name) = &change.name {
                combatant.name = name.clone();
            }
        }
    }

    let order = hypothetical.turn_order();
    position_of(&order, current).map(|turn| TurnUpdate {
        turn,
        suppress_turn_events: true,
    })
}

/// Simulate deleting combatants
///
/// If the acting combatant survives, its new index is reported. If it is
/// among the deleted, the turn passes to the nearest survivor in the old
/// order, preferring the next over the previous; defeated survivors are
/// skipped when `skip_defeated` is set, falling back to any survivor when
/// everyone left is defeated. `None` when nobody survives.
pub fn simulate_delete(
    combat: &Combat,
    deletions: &[CombatantId],
    skip_defeated: bool,
) -> Option<TurnUpdate> {
    let current = combat.current()?.id;

    let mut hypothetical = combat.clone();
    hypothetical.combatants.retain(|c| !deletions.contains(&c.id));

    if !deletions.contains(&current) {
        let order = hypothetical.turn_order();
        return position_of(&order, current).map(|turn| TurnUpdate {
            turn,
            suppress_turn_events: true,
        });
    }

    let old_order = combat.turn_order();
    let position = position_of(&old_order, current)?;
    let ids: Vec<CombatantId> = old_order.iter().map(|c| c.id).collect();

    let is_eligible = |id: CombatantId, require_standing: bool| {
        !deletions.contains(&id)
            && combat
                .combatant(id)
                .is_some_and(|c| !require_standing || !c.defeated)
    };
    let forward =
        |require: bool| ids[position + 1..].iter().copied().find(|id| is_eligible(*id, require));
    let backward =
        |require: bool| ids[..position].iter().rev().copied().find(|id| is_eligible(*id, require));

    let successor = forward(skip_defeated)
        .or_else(|| backward(skip_defeated))
        .or_else(|| forward(false))
        .or_else(|| backward(false))?;

    let order = hypothetical.turn_order();
    position_of(&order, successor).map(|turn| TurnUpdate {
        turn,
        suppress_turn_events: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combat_of(initiatives: &[f64]) -> Combat {
        let mut combat = Combat::new();
        for (index, initiative) in initiatives.iter().enumerate() {
            combat
                .combatants
                .push(Combatant::new(format!("c{index}"), None).with_initiative(*initiative));
        }
        combat.begin();
        combat
    }

    #[test]
    fn test_create_keeps_current() {
        let mut combat = combat_of(&[20.0, 10.0]);
        combat.turn = Some(1); // "c1" is acting

        // A faster combatant joins ahead of everyone
        let update = simulate_create(&combat, &[Combatant::new("new", None).with_initiative(30.0)])
            .unwrap();
        assert_eq!(update.turn, 2);
        assert!(update.suppress_turn_events);
    }

    #[test]
    fn test_update_reorders_but_keeps_current() {
        let combat = combat_of(&[20.0, 10.0]); // acting: c0
        let slow = combat.turn_order()[1].id;

        // The slow combatant re-rolls above the acting one
        let update = simulate_update(
            &combat,
            &[(
                slow,
                CombatantChanges {
                    initiative: Some(50.0),
                    ..Default::default()
                },
            )],
        )
        .unwrap();
        assert_eq!(update.turn, 1);
    }

    #[test]
    fn test_delete_non_current() {
        let mut combat = combat_of(&[20.0, 10.0, 5.0]);
        combat.turn = Some(1);
        let last = combat.turn_order()[2].id;

        let update = simulate_delete(&combat, &[last], true).unwrap();
        assert_eq!(update.turn, 1);
    }

    #[test]
    fn test_delete_current_advances_to_next() {
        let mut combat = combat_of(&[20.0, 10.0, 5.0]);
        combat.turn = Some(1);
        let acting = combat.turn_order()[1].id;

        // The next survivor in order takes the turn
        let update = simulate_delete(&combat, &[acting], true).unwrap();
        assert_eq!(update.turn, 1);
    }

    #[test]
    fn test_delete_current_falls_back_to_previous() {
        let mut combat = combat_of(&[20.0, 10.0]);
        combat.turn = Some(1);
        let acting = combat.turn_order()[1].id;

        let update = simulate_delete(&combat, &[acting], true).unwrap();
        assert_eq!(update.turn, 0);
    }

    #[test]
    fn test_delete_current_skips_defeated_successor() {
        let mut combat = combat_of(&[20.0, 10.0, 5.0, 1.0]);
        combat.turn = Some(1);
        let order: Vec<CombatantId> = combat.turn_order().iter().map(|c| c.id).collect();
        combat.combatant_mut(order[2]).unwrap().defeated = true;

        let update = simulate_delete(&combat, &[order[1]], true).unwrap();
        // order[2] is defeated, so order[3] takes the turn; after deletion it
        // sits at index 2
        assert_eq!(update.turn, 2);
    }

    #[test]
    fn test_delete_last_survivorless() {
        let combat = combat_of(&[10.0]);
        let only = combat.turn_order()[0].id;
        assert!(simulate_delete(&combat, &[only], true).is_none());
    }

    #[test]
    fn test_oracle_inert_without_active_turn() {
        let mut combat = Combat::new();
        combat.combatants.push(Combatant::new("idle", None));
        assert!(simulate_create(&combat, &[]).is_none());
    }
}

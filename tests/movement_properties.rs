//! Property tests for waypoint cleaning and history measurement

use arc_tabletop::combat::Combatant;
use arc_tabletop::core::types::TokenShape;
use arc_tabletop::movement::{
    clean_waypoints, ActionRegistry, MovementWaypointInput, TokenPosition,
};
use arc_tabletop::scene::Scene;
use arc_tabletop::world::{UpdateOptions, World};
use proptest::prelude::*;

fn origin() -> TokenPosition {
    TokenPosition {
        x: 0.0,
        y: 0.0,
        elevation: 0.0,
        width: 1.0,
        height: 1.0,
        shape: TokenShape::Rectangle1,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every omitted field is filled from the previous waypoint, cascading
    /// from the token's current position
    #[test]
    fn cleaning_cascades_defaults(
        fields in prop::collection::vec(
            (
                prop::option::of(-5000.0..5000.0f64),
                prop::option::of(-5000.0..5000.0f64),
                prop::option::of(-50.0..50.0f64),
            ),
            1..6,
        )
    ) {
        let registry = ActionRegistry::builtin();
        let inputs: Vec<MovementWaypointInput> = fields
            .iter()
            .map(|(x, y, elevation)| MovementWaypointInput {
                x: *x,
                y: *y,
                elevation: *elevation,
                ..Default::default()
            })
            .collect();

        let cleaned = clean_waypoints(&origin(), "walk", &registry, &inputs).unwrap();
        prop_assert_eq!(cleaned.len(), inputs.len());

        let mut previous = origin();
        for ((x, y, elevation), waypoint) in fields.iter().zip(&cleaned) {
            let expected_x = x.map(f64::round).unwrap_or(previous.x);
            let expected_y = y.map(f64::round).unwrap_or(previous.y);
            let expected_elevation = elevation.unwrap_or(previous.elevation);

            prop_assert_eq!(waypoint.position.x, expected_x);
            prop_assert_eq!(waypoint.position.y, expected_y);
            prop_assert_eq!(waypoint.position.elevation, expected_elevation);
            // Footprint cascades untouched from the origin
            prop_assert_eq!(waypoint.position.width, 1.0);
            prop_assert_eq!(waypoint.action.as_deref(), Some("walk"));
            prop_assert!(!waypoint.intermediate);

            previous = waypoint.position;
        }
    }

    /// recorded + unrecorded always equals the history totals, for any
    /// sequence of recorded moves
    #[test]
    fn history_totals_are_additive(
        steps in prop::collection::vec((-8..8i32, -8..8i32), 1..5)
    ) {
        let mut world = World::new(Scene::new("prop", 8000.0, 8000.0).with_grid(100.0, 5.0));
        let token = world.create_token("fighter", 0.0, 0.0);
        let combat = world.start_combat();
        combat
            .combatants
            .push(Combatant::new("fighter", Some(token)).with_initiative(10.0));
        combat.begin();

        let mut last = None;
        for (dx, dy) in steps {
            let doc = world.token(token).unwrap();
            let x = doc.x + dx as f64 * 100.0;
            let y = doc.y + dy as f64 * 100.0;
            let outcome = world
                .move_token(
                    token,
                    vec![MovementWaypointInput::to(x, y)],
                    UpdateOptions::default(),
                )
                .unwrap();
            if let Some(op) = outcome.movement {
                last = Some(op);
            }
        }

        if let Some(op) = last {
            let h = &op.history;
            prop_assert_eq!(h.recorded.distance + h.unrecorded.distance, h.distance);
            prop_assert_eq!(h.recorded.cost + h.unrecorded.cost, h.cost);
            prop_assert_eq!(h.recorded.spaces + h.unrecorded.spaces, h.spaces);
            prop_assert_eq!(h.recorded.diagonals + h.unrecorded.diagonals, h.diagonals);
        }
    }
}

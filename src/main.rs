//! Arc Tabletop - Entry Point
//!
//! Interactive demo of the movement core: builds a scene with a watched
//! region and a wall, spawns a token, and drives movement transactions from
//! a small REPL so region checkpoints and events can be observed.

use arc_tabletop::core::error::Result;
use arc_tabletop::grid::GridOffset;
use arc_tabletop::movement::waypoint::MovementWaypointInput;
use arc_tabletop::region::behavior::{RegionBehavior, RegionDocument, RegionEventType};
use arc_tabletop::region::boundary::RegionBoundary;
use arc_tabletop::scene::Scene;
use arc_tabletop::world::{UpdateOptions, World};

use std::io::{self, Write};
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("arc_tabletop=debug")
        .init();

    tracing::info!("Arc Tabletop starting...");

    // Continuations across region checkpoints are awaited on this runtime
    let rt = Runtime::new()?;

    let mut world = build_demo_world();
    let token = world.create_token("Scout", 0.0, 0.0);

    println!("\n=== ARC TABLETOP ===");
    println!("Movement core demo: one token, one watched region, one wall");
    println!();
    println!("Commands:");
    println!("  move <x> <y>    - Move the token (pixels)");
    println!("  status / s      - Show token status");
    println!("  events / e      - Show the event log");
    println!("  stop            - Stop the current movement");
    println!("  quit / q        - Exit");
    println!();

    loop {
        display_status(&world, token);

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "q" {
            break;
        }

        if input == "status" || input == "s" {
            display_detailed_status(&world, token);
            continue;
        }

        if input == "events" || input == "e" {
            for entry in &world.log.entries {
                println!("  [{}] {:?}", entry.id, entry.event);
            }
            continue;
        }

        if input == "stop" {
            match world.stop_movement(token) {
                Ok(()) => println!("Movement stopped."),
                Err(e) => println!("Cannot stop: {e}"),
            }
            continue;
        }

        if let Some(rest) = input.strip_prefix("move ") {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let coords = (
                parts.first().and_then(|p| p.parse::<f64>().ok()),
                parts.get(1).and_then(|p| p.parse::<f64>().ok()),
            );
            let (Some(x), Some(y)) = coords else {
                println!("Usage: move <x> <y>");
                continue;
            };

            let result = rt.block_on(world.move_token_to_completion(
                token,
                vec![MovementWaypointInput::to(x, y)],
                UpdateOptions::default(),
            ));
            match result {
                Ok(outcome) => {
                    if let Some(state) = outcome.state {
                        println!("Movement finished in state {state:?}");
                    } else if outcome.rejected {
                        println!("Movement rejected.");
                    }
                }
                Err(e) => println!("Movement failed: {e}"),
            }
            continue;
        }

        println!("Unknown command: {input}");
    }

    tracing::info!("Arc Tabletop shutting down");
    Ok(())
}

/// A small scene: a watched region on the right half, a wall across row 2
fn build_demo_world() -> World {
    let scene = Scene::new("Demo", 4000.0, 3000.0).with_grid(100.0, 5.0);
    let mut world = World::new(scene);

    world.add_region(
        RegionDocument::new(
            "Haunted Hall",
            RegionBoundary::from_points(
                &[(1000.0, 0.0), (2000.0, 0.0), (2000.0, 1000.0), (1000.0, 1000.0)],
                f64::NEG_INFINITY,
                f64::INFINITY,
            ),
        )
        .with_behavior(RegionBehavior::subscribed_to([
            RegionEventType::TokenEnter,
            RegionEventType::TokenExit,
        ])),
    );

    for j in 0..5 {
        world.obstacles.block(GridOffset::new(2, j));
    }
    world.install_obstacle_renderer();

    world
}

fn display_status(world: &World, token: arc_tabletop::core::types::TokenId) {
    if let Ok(doc) = world.token(token) {
        let movement = doc
            .movement()
            .map(|op| format!("{:?}", op.state()))
            .unwrap_or_else(|| "idle".into());
        println!(
            "[{}] at ({}, {}) elev {} | movement: {} | regions: {}",
            doc.name,
            doc.x,
            doc.y,
            doc.elevation,
            movement,
            doc.regions.len()
        );
    }
}

fn display_detailed_status(world: &World, token: arc_tabletop::core::types::TokenId) {
    if let Ok(doc) = world.token(token) {
        println!("Token: {}", doc.name);
        println!("  position: ({}, {}) elevation {}", doc.x, doc.y, doc.elevation);
        println!("  footprint: {}x{} {:?}", doc.width, doc.height, doc.shape);
        println!("  rotation: {}", doc.rotation);
        println!("  history entries: {}", doc.movement_history.len());
        if let Some(op) = doc.movement() {
            println!("  movement: {:?}", op.state());
            println!(
                "    passed: {} waypoints, {} distance, {} cost",
                op.passed.waypoints.len(),
                op.passed.distance,
                op.passed.cost
            );
            println!(
                "    pending: {} waypoints, {} distance",
                op.pending.waypoints.len(),
                op.pending.distance
            );
        }
        for region_id in &doc.regions {
            if let Some(region) = world.regions.get(region_id) {
                println!("  inside region: {}", region.name);
            }
        }
    }
}

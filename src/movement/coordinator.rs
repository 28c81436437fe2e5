//! Movement transaction coordinator
//!
//! Implements the pre-update/post-update protocol of one movement
//! transaction: clean the requested waypoints, reassemble history, split at
//! the first region checkpoint, constrain against obstacles, measure cost,
//! freeze the operation record, and determine the post-commit state. The
//! world's document-update path drives these hooks; everything here mutates
//! only the pending change set, the update options, and the token's
//! movement bookkeeping.

use crate::combat::Combat;
use crate::core::config::Settings;
use crate::core::error::Result;
use crate::core::types::{MovementId, RegionId, UserId};
use crate::events::{EventBus, EventLog, LoggedEvent, MoveEvent, PreMoveEvent};
use crate::grid::{GridMeasure, GridOffset, SegmentMeasurement};
use crate::movement::action::ActionRegistry;
use crate::movement::operation::{
    HistoryTotals, MovementHistorySection, MovementOperation, MovementSection, MovementState,
};
use crate::movement::path::{expand_path, measure_path, synthesize_cost_fn};
use crate::movement::splitter::split_at_first_checkpoint;
use crate::movement::waypoint::{clean_waypoints, MovementWaypoint, RecordedWaypoint};
use crate::region::behavior::RegionDocument;
use crate::world::obstacles::ObstacleMap;
use crate::world::{PlaceableSink, TokenChanges, TokenDocument, UpdateOptions};
use ahash::AHashMap;
use std::sync::Arc;

/// Everything a movement transaction reads from its surroundings
///
/// Passed explicitly so the coordinator is testable without a global
/// runtime.
pub(crate) struct MoveContext<'a> {
    pub grid: &'a dyn GridMeasure,
    pub settings: &'a Settings,
    pub registry: &'a ActionRegistry,
    pub regions: &'a AHashMap<RegionId, RegionDocument>,
    pub renderer: Option<&'a dyn PlaceableSink>,
    pub bus: &'a EventBus,
    pub obstacles: &'a ObstacleMap,
    pub combat: Option<&'a Combat>,
    pub user: UserId,
}

/// Result of the pre-update hook
pub(crate) enum PreUpdateOutcome {
    /// The change set is not a movement; nothing movement-related happens
    NotMovement,
    /// The movement was vetoed or fully obstructed; positional fields were
    /// stripped and the rest of the update proceeds
    Rejected,
    /// The movement goes through
    Movement(PreparedMovement),
}

/// A movement ready to commit
pub(crate) struct PreparedMovement {
    pub operation: Arc<MovementOperation>,
    pub history_append: Vec<RecordedWaypoint>,
    pub continuing: bool,
}

/// Heading of the last nonzero-length segment, scanning backward
///
/// Degrees in `[0, 360)`, 0 facing +y.
fn heading_of(waypoints: &[MovementWaypoint]) -> Option<f64> {
    for pair in waypoints.windows(2).rev() {
        let dx = pair[1].position.x - pair[0].position.x;
        let dy = pair[1].position.y - pair[0].position.y;
        if dx != 0.0 || dy != 0.0 {
            return Some(dx.atan2(dy).to_degrees().rem_euclid(360.0));
        }
    }
    None
}

/// Reassemble the history section from persisted entries and the unrecorded
/// waypoints carried by a prior continuation
fn build_history_section(
    grid: &dyn GridMeasure,
    registry: &ActionRegistry,
    recorded: &[RecordedWaypoint],
    unrecorded: &[MovementWaypoint],
) -> MovementHistorySection {
    let mut waypoints: Vec<MovementWaypoint> =
        recorded.iter().map(|r| r.waypoint.clone()).collect();
    waypoints.extend(unrecorded.iter().cloned());

    if waypoints.is_empty() {
        return MovementHistorySection::default();
    }

    let measurement = measure_path(grid, registry, &waypoints, None);
    let totals = measurement.totals();

    let recorded_len = recorded.len();
    let (recorded_measured, recorded_cost) = if recorded_len == 0 {
        (SegmentMeasurement::ZERO, 0.0)
    } else {
        let at = &measurement.waypoints[recorded_len - 1];
        (
            SegmentMeasurement {
                distance: at.distance,
                cost: at.cost,
                spaces: at.spaces,
                diagonals: at.diagonals,
            },
            recorded.iter().map(|r| r.cost).sum(),
        )
    };

    let recorded_totals = HistoryTotals {
        distance: recorded_measured.distance,
        cost: recorded_cost,
        spaces: recorded_measured.spaces,
        diagonals: recorded_measured.diagonals,
    };
    let unrecorded_totals = HistoryTotals {
        distance: totals.distance - recorded_measured.distance,
        cost: totals.cost - recorded_measured.cost,
        spaces: totals.spaces - recorded_measured.spaces,
        diagonals: totals.diagonals - recorded_measured.diagonals,
    };

    MovementHistorySection {
        waypoints,
        distance: recorded_totals.distance + unrecorded_totals.distance,
        cost: recorded_totals.cost + unrecorded_totals.cost,
        spaces: recorded_totals.spaces + unrecorded_totals.spaces,
        diagonals: recorded_totals.diagonals + unrecorded_totals.diagonals,
        recorded: recorded_totals,
        unrecorded: unrecorded_totals,
    }
}

/// Build the history entries for a recorded movement
///
/// Non-intermediate waypoints only; each entry carries the cost accumulated
/// since the previous entry, with Infinity substituted when the arriving
/// action is unmeasured.
fn build_history_append(
    registry: &ActionRegistry,
    history_empty: bool,
    expanded: &[MovementWaypoint],
    cumulative_cost: &[f64],
) -> Vec<RecordedWaypoint> {
    let mut append = Vec::new();
    let mut previous_cost = 0.0;

    for (index, waypoint) in expanded.iter().enumerate() {
        if waypoint.intermediate {
            continue;
        }
        if index == 0 {
            previous_cost = cumulative_cost[0];
            if history_empty {
                append.push(RecordedWaypoint {
                    waypoint: waypoint.clone(),
                    cost: 0.0,
                });
            }
            continue;
        }

        let cost = if registry.is_measured(waypoint.action.as_deref()) {
            Some(cumulative_cost[index] - previous_cost)
        } else {
            None
        };
        append.push(RecordedWaypoint {
            waypoint: waypoint.clone(),
            cost: cost.unwrap_or(f64::INFINITY),
        });
        previous_cost = cumulative_cost[index];
    }

    append
}

fn should_record(ctx: &MoveContext, token: &TokenDocument) -> bool {
    ctx.combat
        .is_some_and(|c| c.started && c.contains_token(token.id))
}

/// The movement pre-update hook
///
/// May mutate the change set (baking in the constrained destination and the
/// auto-rotation) and the options (movement updates never diff-suppress).
pub(crate) fn pre_update_movement(
    ctx: &MoveContext,
    token: &mut TokenDocument,
    changes: &mut TokenChanges,
    options: &mut UpdateOptions,
) -> Result<PreUpdateOutcome> {
    let origin = token.position();

    // 1. Not every token update is a movement
    if !changes.is_movement(&origin) {
        return Ok(PreUpdateOutcome::NotMovement);
    }

    // 2. Method defaults; paste/undo are always silent
    let method = options.method;
    let (auto_rotate, show_ruler) = if method.forces_silent() {
        (false, false)
    } else {
        (
            options.auto_rotate.unwrap_or(false),
            options.show_ruler.unwrap_or(method.default_show_ruler()),
        )
    };

    // 3. Clean and validate the requested waypoints
    let inputs = match &changes.waypoints {
        Some(waypoints) => waypoints.clone(),
        None => vec![changes.positional_waypoint()],
    };
    let targets = clean_waypoints(&origin, &ctx.settings.default_action, ctx.registry, &inputs)?;
    if targets.is_empty() {
        return Ok(PreUpdateOutcome::NotMovement);
    }

    let mut origin_waypoint =
        MovementWaypoint::at(origin, ctx.settings.default_action.clone());
    origin_waypoint.checkpoint = true;
    let mut full_path = vec![origin_waypoint];
    full_path.extend(targets);

    // 4. History reassembly, bridging any unpersisted gap to the token's
    // actual position
    let continuing = options
        .continued_from
        .is_some_and(|id| token.continuation.movement_id() == Some(id));
    let mut unrecorded: Vec<MovementWaypoint> = if continuing {
        token.continuation.unrecorded_waypoints.clone()
    } else {
        Vec::new()
    };
    let history_tail = unrecorded
        .last()
        .map(|w| w.position)
        .or_else(|| token.movement_history.last().map(|r| r.waypoint.position));
    if let Some(tail) = history_tail {
        if tail != origin {
            unrecorded.push(MovementWaypoint::at(
                origin,
                ctx.settings.default_action.clone(),
            ));
        }
    }
    let history =
        build_history_section(ctx.grid, ctx.registry, &token.movement_history, &unrecorded);

    // 5. Region checkpoint split and obstacle constraint; paste/undo replay
    // positions verbatim
    let mut constrained = false;
    let (mut passed, pending) = if method.bypasses_regions() {
        (full_path, Vec::new())
    } else {
        let checkpoint_regions: Vec<&RegionDocument> = ctx
            .regions
            .values()
            .filter(|r| r.requires_movement_checkpoint())
            .collect();
        let split = split_at_first_checkpoint(
            ctx.grid,
            &checkpoint_regions,
            ctx.registry,
            &full_path,
            ctx.settings.segmentize_samples_per_cell,
            ctx.settings.crossing_tolerance,
        );
        let mut passed = split.passed;
        let mut pending = split.pending;

        if let Some(renderer) = ctx.renderer {
            let (constrained_path, was_constrained) = renderer.constrain_movement_path(
                ctx.grid,
                ctx.registry,
                &passed,
                &options.constrain,
            );
            passed = constrained_path;
            if was_constrained {
                constrained = true;
                pending.clear();
            }
        }
        (passed, pending)
    };

    // 6. A movement whose passed section holds no actual travel is rejected
    if passed.len() <= 1 {
        tracing::debug!(token = %token.name, "movement fully obstructed, rejecting");
        changes.strip_movement_fields();
        stop_active_continuation(token, continuing);
        return Ok(PreUpdateOutcome::Rejected);
    }

    // 7. The committed tail is always a checkpoint and becomes the outgoing
    // document position
    let tail = {
        let tail = passed.last_mut().unwrap();
        tail.checkpoint = true;
        tail.clone()
    };
    changes.x = Some(tail.position.x);
    changes.y = Some(tail.position.y);
    changes.elevation = Some(tail.position.elevation);
    changes.width = Some(tail.position.width);
    changes.height = Some(tail.position.height);
    changes.shape = Some(tail.position.shape);

    // 8. Expand and measure: true cost for passed, preview cost for pending
    let mut passed_expanded = expand_path(ctx.grid, ctx.registry, &passed);
    if let Some(renderer) = ctx.renderer {
        passed_expanded = renderer.create_terrain_movement_path(ctx.grid, &passed_expanded);
    }

    let obstacles = ctx.obstacles;
    let cell_cost =
        move |from: GridOffset, to: GridOffset, distance: f64| obstacles.step_cost(from, to, distance);
    let cost_fn = synthesize_cost_fn(
        ctx.grid,
        tail.position.shape,
        tail.position.width,
        tail.position.height,
        &cell_cost,
        None,
    );

    let passed_measurement = measure_path(ctx.grid, ctx.registry, &passed_expanded, Some(&*cost_fn));
    let cumulative_cost: Vec<f64> = passed_measurement
        .waypoints
        .iter()
        .map(|w| w.cost)
        .collect();
    let passed_section =
        MovementSection::new(passed_expanded.clone(), passed_measurement.totals());

    let pending_section = if pending.is_empty() {
        MovementSection::default()
    } else {
        let mut preview_path = vec![tail.clone()];
        preview_path.extend(pending.iter().cloned());
        let preview_expanded = if ctx.renderer.is_some() {
            expand_path(ctx.grid, ctx.registry, &preview_path)
        } else {
            preview_path
        };
        let preview = measure_path(ctx.grid, ctx.registry, &preview_expanded, Some(&*cost_fn));
        MovementSection::new(preview_expanded[1..].to_vec(), preview.totals())
    };

    // 9. Freeze the operation and give observers their veto
    let recorded = should_record(ctx, token);
    let chain = if continuing {
        token
            .movement
            .as_ref()
            .map(|op| {
                let mut chain = op.chain.clone();
                chain.push(op.id);
                chain
            })
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    let operation = MovementOperation::new(
        MovementId::new(),
        chain,
        origin,
        tail.position,
        passed_section,
        pending_section,
        history,
        constrained,
        recorded,
        method,
        options.constrain,
        ctx.user,
        options.clone(),
        auto_rotate,
        show_ruler,
        MovementState::Pending,
    );

    if !ctx.bus.call_pre_move(&PreMoveEvent {
        token: token.id,
        movement: &operation,
    }) {
        tracing::debug!(token = %token.name, "movement vetoed by observer");
        changes.strip_movement_fields();
        stop_active_continuation(token, continuing);
        return Ok(PreUpdateOutcome::Rejected);
    }

    // 10. Bake the heading of the final nonzero segment into the update
    if auto_rotate {
        if let Some(rotation) = heading_of(&operation.passed.waypoints) {
            changes.rotation = Some(rotation);
        }
    }

    // 11. Persist the committed waypoints while combat is running
    let history_append = if recorded {
        build_history_append(
            ctx.registry,
            token.movement_history.is_empty() && unrecorded.is_empty(),
            &operation.passed.waypoints,
            &cumulative_cost,
        )
    } else {
        Vec::new()
    };

    // 12. Movement transactions always commit, even when the destination
    // equals a prior position
    options.diff = false;

    tracing::debug!(
        token = %token.name,
        passed = operation.passed.waypoints.len(),
        pending = operation.pending.waypoints.len(),
        constrained,
        "movement prepared"
    );

    Ok(PreUpdateOutcome::Movement(PreparedMovement {
        operation: Arc::new(operation),
        history_append,
        continuing,
    }))
}

/// Stop the continuation owning this token when a rejection interrupts the
/// chain it belongs to
fn stop_active_continuation(token: &mut TokenDocument, continuing: bool) {
    if !continuing {
        return;
    }
    if let Some(op) = &token.movement {
        if !op.state().is_terminal() {
            op.transition(MovementState::Stopped);
        }
    }
    token.continuation.finish(false);
}

/// The movement post-update hook: bookkeeping and state determination
///
/// Returns the post-commit state. The continuation handle is created by the
/// world after region events have fired.
pub(crate) fn post_update_movement(
    bus: &EventBus,
    log: &mut EventLog,
    token: &mut TokenDocument,
    prepared: &PreparedMovement,
) -> MovementState {
    let op = &prepared.operation;

    // A new owning movement supersedes any unfinished predecessor
    if let Some(previous) = &token.movement {
        if !previous.state().is_terminal() && previous.id != op.id {
            if !prepared.continuing {
                tracing::warn!(token = %token.name, "superseding unfinished movement");
            }
            previous.transition(MovementState::Stopped);
        }
    }

    token.continuation.begin(op.id, prepared.continuing);

    // Unrecorded passed waypoints are carried for later history reassembly
    if !op.recorded {
        let skip = usize::from(prepared.continuing);
        token.continuation.unrecorded_waypoints.extend(
            op.passed
                .waypoints
                .iter()
                .filter(|w| !w.intermediate)
                .skip(skip)
                .cloned(),
        );
    } else {
        token.continuation.unrecorded_waypoints.clear();
    }

    let state = if op.constrained {
        MovementState::Stopped
    } else if !op.pending.waypoints.is_empty() {
        MovementState::Pending
    } else {
        MovementState::Completed
    };
    if state != MovementState::Pending {
        op.transition(state);
    }

    token.movement = Some(Arc::clone(op));

    bus.emit_move(&MoveEvent {
        token: token.id,
        movement: Arc::clone(op),
        user: op.user,
    });
    log.add(LoggedEvent::MovementCommitted {
        token: token.id,
        movement: op.id,
        state,
    });

    if op.recorded {
        bus.emit_record(token.id);
        log.add(LoggedEvent::MovementRecorded { token: token.id });
    }

    match state {
        MovementState::Stopped => {
            token.continuation.finish(false);
            bus.emit_stop(token.id);
            log.add(LoggedEvent::MovementStopped { token: token.id });
        }
        MovementState::Completed => {
            token.continuation.finish(true);
        }
        _ => {}
    }

    state
}

//! Region event dispatcher
//!
//! After a token update commits, containment changes are turned into region
//! events. Ordering is fixed: EXIT then ENTER for boundary changes, then
//! MOVE_OUT / MOVE_IN / MOVE_WITHIN for the movement itself. Region sets are
//! iterated in id order so dispatch is deterministic.

use crate::core::types::{RegionId, TokenId};
use crate::events::{EventBus, EventLog, LoggedEvent, RegionEvent};
use crate::movement::operation::MovementOperation;
use crate::region::behavior::{RegionDocument, RegionEventType};
use ahash::{AHashMap, AHashSet};
use std::sync::Arc;

/// One planned event dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionTransition {
    pub event: RegionEventType,
    pub region: RegionId,
}

fn sorted_difference(a: &AHashSet<RegionId>, b: &AHashSet<RegionId>) -> Vec<RegionId> {
    let mut out: Vec<RegionId> = a.difference(b).copied().collect();
    out.sort();
    out
}

/// Plan the ordered event list for one containment change
///
/// `moved` is false for creates and deletes, which fire boundary events
/// only. When membership changed, MOVE_WITHIN iterates the regions the
/// token was in before the update, so the movement is represented relative
/// to the pre-update containment.
pub fn plan_region_events(
    old: &AHashSet<RegionId>,
    new: &AHashSet<RegionId>,
    moved: bool,
) -> Vec<RegionTransition> {
    let removed = sorted_difference(old, new);
    let added = sorted_difference(new, old);
    let changed = !removed.is_empty() || !added.is_empty();

    let mut plan = Vec::new();

    for region in &removed {
        plan.push(RegionTransition {
            event: RegionEventType::TokenExit,
            region: *region,
        });
    }
    for region in &added {
        plan.push(RegionTransition {
            event: RegionEventType::TokenEnter,
            region: *region,
        });
    }

    if !moved {
        return plan;
    }

    for region in &removed {
        plan.push(RegionTransition {
            event: RegionEventType::TokenMoveOut,
            region: *region,
        });
    }
    for region in &added {
        plan.push(RegionTransition {
            event: RegionEventType::TokenMoveIn,
            region: *region,
        });
    }

    let mut within: Vec<RegionId> = if changed {
        old.iter().copied().collect()
    } else {
        new.iter().copied().collect()
    };
    within.sort();
    for region in within {
        plan.push(RegionTransition {
            event: RegionEventType::TokenMoveWithin,
            region,
        });
    }

    plan
}

/// Fire region events for one token update and maintain region membership
///
/// Runs after the transaction has committed, so observers can never block
/// it.
#[allow(clippy::too_many_arguments)]
pub(crate) fn dispatch_token_region_events(
    regions: &mut AHashMap<RegionId, RegionDocument>,
    bus: &EventBus,
    log: &mut EventLog,
    token: TokenId,
    old: &AHashSet<RegionId>,
    new: &AHashSet<RegionId>,
    moved: bool,
    movement: Option<&Arc<MovementOperation>>,
) {
    for region_id in sorted_difference(old, new) {
        if let Some(region) = regions.get_mut(&region_id) {
            region.tokens.remove(&token);
        }
    }
    for region_id in sorted_difference(new, old) {
        if let Some(region) = regions.get_mut(&region_id) {
            region.tokens.insert(token);
        }
    }

    for transition in plan_region_events(old, new, moved) {
        if !regions.contains_key(&transition.region) {
            continue;
        }
        bus.emit_region_event(&RegionEvent {
            event: transition.event,
            region: transition.region,
            token,
            movement: movement.cloned(),
        });
        log.add(LoggedEvent::Region {
            event: transition.event,
            region: transition.region,
            token,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[RegionId]) -> AHashSet<RegionId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_plan_enter_only() {
        let r = RegionId::new();
        let plan = plan_region_events(&set(&[]), &set(&[r]), true);
        let events: Vec<_> = plan.iter().map(|t| t.event).collect();
        assert_eq!(
            events,
            vec![RegionEventType::TokenEnter, RegionEventType::TokenMoveIn]
        );
    }

    #[test]
    fn test_plan_exit_before_enter() {
        let a = RegionId::new();
        let b = RegionId::new();
        let plan = plan_region_events(&set(&[a]), &set(&[b]), true);
        assert_eq!(plan[0].event, RegionEventType::TokenExit);
        assert_eq!(plan[0].region, a);
        assert_eq!(plan[1].event, RegionEventType::TokenEnter);
        assert_eq!(plan[1].region, b);
    }

    #[test]
    fn test_plan_move_within_uses_pre_update_set_on_change() {
        let stayed = RegionId::new();
        let left = RegionId::new();
        let old = set(&[stayed, left]);
        let new = set(&[stayed]);

        let plan = plan_region_events(&old, &new, true);
        let within: Vec<_> = plan
            .iter()
            .filter(|t| t.event == RegionEventType::TokenMoveWithin)
            .map(|t| t.region)
            .collect();
        assert_eq!(within.len(), 2);
        assert!(within.contains(&stayed));
        assert!(within.contains(&left));
    }

    #[test]
    fn test_plan_move_within_uses_current_set_when_unchanged() {
        let r = RegionId::new();
        let plan = plan_region_events(&set(&[r]), &set(&[r]), true);
        assert_eq!(
            plan,
            vec![RegionTransition {
                event: RegionEventType::TokenMoveWithin,
                region: r,
            }]
        );
    }

    #[test]
    fn test_plan_not_moved_fires_boundary_events_only() {
        let r = RegionId::new();
        let plan = plan_region_events(&set(&[]), &set(&[r]), false);
        assert_eq!(
            plan,
            vec![RegionTransition {
                event: RegionEventType::TokenEnter,
                region: r,
            }]
        );
    }

    #[test]
    fn test_plan_per_region_ordering() {
        let r = RegionId::new();
        let plan = plan_region_events(&set(&[]), &set(&[r]), true);
        let enter = plan
            .iter()
            .position(|t| t.event == RegionEventType::TokenEnter)
            .unwrap();
        let move_in = plan
            .iter()
            .position(|t| t.event == RegionEventType::TokenMoveIn)
            .unwrap();
        assert!(enter < move_in);
    }
}

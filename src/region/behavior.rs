//! Region documents and behaviors

use crate::core::types::{BehaviorId, RegionId, TokenId};
use crate::region::boundary::RegionBoundary;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// Event types a region behavior can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionEventType {
    TokenEnter,
    TokenExit,
    TokenMoveIn,
    TokenMoveOut,
    TokenMoveWithin,
}

impl RegionEventType {
    pub const ALL: [RegionEventType; 5] = [
        RegionEventType::TokenEnter,
        RegionEventType::TokenExit,
        RegionEventType::TokenMoveIn,
        RegionEventType::TokenMoveOut,
        RegionEventType::TokenMoveWithin,
    ];
}

/// A behavior attached to a region, reacting to a set of event types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionBehavior {
    pub id: BehaviorId,
    pub name: String,
    pub events: AHashSet<RegionEventType>,
    pub disabled: bool,
}

impl RegionBehavior {
    pub fn subscribed_to(events: impl IntoIterator<Item = RegionEventType>) -> Self {
        Self {
            id: BehaviorId::new(),
            name: String::new(),
            events: events.into_iter().collect(),
            disabled: false,
        }
    }
}

/// A region document: a boundary, its behaviors, and the tokens inside it
///
/// `tokens` is a back-reference maintained by the region event dispatcher;
/// everything else reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDocument {
    pub id: RegionId,
    pub name: String,
    pub boundary: RegionBoundary,
    pub behaviors: Vec<RegionBehavior>,
    pub tokens: AHashSet<TokenId>,
}

impl RegionDocument {
    pub fn new(name: impl Into<String>, boundary: RegionBoundary) -> Self {
        Self {
            id: RegionId::new(),
            name: name.into(),
            boundary,
            behaviors: Vec::new(),
            tokens: AHashSet::new(),
        }
    }

    pub fn with_behavior(mut self, behavior: RegionBehavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Whether any enabled behavior subscribes to the given event
    pub fn subscribes_to(&self, event: RegionEventType) -> bool {
        self.behaviors
            .iter()
            .any(|b| !b.disabled && b.events.contains(&event))
    }

    /// Whether crossing this region's boundary must break movement into a
    /// separate transaction
    pub fn requires_movement_checkpoint(&self) -> bool {
        RegionEventType::ALL.iter().any(|e| self.subscribes_to(*e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::boundary::RegionBoundary;

    fn square_region() -> RegionDocument {
        RegionDocument::new(
            "test",
            RegionBoundary::from_points(
                &[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)],
                f64::NEG_INFINITY,
                f64::INFINITY,
            ),
        )
    }

    #[test]
    fn test_no_behaviors_no_checkpoint() {
        let region = square_region();
        assert!(!region.requires_movement_checkpoint());
    }

    #[test]
    fn test_subscribed_behavior_requires_checkpoint() {
        let region = square_region()
            .with_behavior(RegionBehavior::subscribed_to([RegionEventType::TokenMoveIn]));
        assert!(region.requires_movement_checkpoint());
        assert!(region.subscribes_to(RegionEventType::TokenMoveIn));
        assert!(!region.subscribes_to(RegionEventType::TokenExit));
    }

    #[test]
    fn test_disabled_behavior_ignored() {
        let mut behavior = RegionBehavior::subscribed_to([RegionEventType::TokenEnter]);
        behavior.disabled = true;
        let region = square_region().with_behavior(behavior);
        assert!(!region.requires_movement_checkpoint());
    }
}

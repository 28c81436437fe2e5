//! Token documents and update change sets

use crate::core::types::{RegionId, TokenId, TokenShape};
use crate::movement::continuation::MovementContinuation;
use crate::movement::operation::MovementOperation;
use crate::movement::waypoint::{MovementWaypointInput, RecordedWaypoint, TokenPosition};
use ahash::AHashSet;
use std::sync::Arc;

/// A token document
///
/// Position fields are the durable document state; `movement` and the
/// continuation bookkeeping exist only while a movement operation is live.
#[derive(Debug)]
pub struct TokenDocument {
    pub id: TokenId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub elevation: f64,
    pub width: f64,
    pub height: f64,
    pub shape: TokenShape,
    pub rotation: f64,
    /// Movement persisted while combat is running
    pub movement_history: Vec<RecordedWaypoint>,
    /// Regions containing this token, maintained by the event dispatcher
    pub regions: AHashSet<RegionId>,
    pub(crate) movement: Option<Arc<MovementOperation>>,
    pub(crate) continuation: MovementContinuation,
}

impl TokenDocument {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: TokenId::new(),
            name: name.into(),
            x,
            y,
            elevation: 0.0,
            width: 1.0,
            height: 1.0,
            shape: TokenShape::default(),
            rotation: 0.0,
            movement_history: Vec::new(),
            regions: AHashSet::new(),
            movement: None,
            continuation: MovementContinuation::new(),
        }
    }

    /// Current source position snapshot
    pub fn position(&self) -> TokenPosition {
        TokenPosition {
            x: self.x,
            y: self.y,
            elevation: self.elevation,
            width: self.width,
            height: self.height,
            shape: self.shape,
        }
    }

    pub(crate) fn set_position(&mut self, position: &TokenPosition) {
        self.x = position.x;
        self.y = position.y;
        self.elevation = position.elevation;
        self.width = position.width;
        self.height = position.height;
        self.shape = position.shape;
    }

    /// The movement operation currently owning this token, if any
    pub fn movement(&self) -> Option<&Arc<MovementOperation>> {
        self.movement.as_ref()
    }

    /// Drop all persisted movement history
    pub fn clear_movement_history(&mut self) {
        self.movement_history.clear();
    }
}

/// Pending change set of a token update
///
/// Pre-update hooks may mutate this; movement fields are stripped when the
/// movement is vetoed or fully obstructed while the rest of the update
/// proceeds.
#[derive(Debug, Clone, Default)]
pub struct TokenChanges {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub elevation: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub shape: Option<TokenShape>,
    pub rotation: Option<f64>,
    pub name: Option<String>,
    /// Explicit movement path; takes precedence over positional fields
    pub waypoints: Option<Vec<MovementWaypointInput>>,
}

impl TokenChanges {
    pub fn move_to(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn along(waypoints: Vec<MovementWaypointInput>) -> Self {
        Self {
            waypoints: Some(waypoints),
            ..Default::default()
        }
    }

    /// Whether this change set constitutes a movement relative to the
    /// given position
    pub fn is_movement(&self, current: &TokenPosition) -> bool {
        if self.waypoints.as_ref().is_some_and(|w| !w.is_empty()) {
            return true;
        }
        self.x.is_some_and(|v| v != current.x)
            || self.y.is_some_and(|v| v != current.y)
            || self.elevation.is_some_and(|v| v != current.elevation)
            || self.width.is_some_and(|v| v != current.width)
            || self.height.is_some_and(|v| v != current.height)
            || self.shape.is_some_and(|v| v != current.shape)
    }

    /// Remove every movement-related field, leaving the rest of the update
    pub fn strip_movement_fields(&mut self) {
        self.x = None;
        self.y = None;
        self.elevation = None;
        self.width = None;
        self.height = None;
        self.shape = None;
        self.waypoints = None;
    }

    /// Positional waypoint input derived from the plain fields
    pub(crate) fn positional_waypoint(&self) -> MovementWaypointInput {
        MovementWaypointInput {
            x: self.x,
            y: self.y,
            elevation: self.elevation,
            width: self.width,
            height: self.height,
            shape: self.shape,
            ..Default::default()
        }
    }

    /// Apply the non-movement and positional fields to the document
    pub(crate) fn apply_to(&self, token: &mut TokenDocument) {
        if let Some(x) = self.x {
            token.x = x;
        }
        if let Some(y) = self.y {
            token.y = y;
        }
        if let Some(elevation) = self.elevation {
            token.elevation = elevation;
        }
        if let Some(width) = self.width {
            token.width = width;
        }
        if let Some(height) = self.height {
            token.height = height;
        }
        if let Some(shape) = self.shape {
            token.shape = shape;
        }
        if let Some(rotation) = self.rotation {
            token.rotation = rotation;
        }
        if let Some(name) = &self.name {
            token.name = name.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_movement_detects_position_change() {
        let token = TokenDocument::new("t", 0.0, 0.0);
        assert!(TokenChanges::move_to(100.0, 0.0).is_movement(&token.position()));
        // Same position is not a movement
        assert!(!TokenChanges::move_to(0.0, 0.0).is_movement(&token.position()));
    }

    #[test]
    fn test_is_movement_detects_resize() {
        let token = TokenDocument::new("t", 0.0, 0.0);
        let changes = TokenChanges {
            width: Some(2.0),
            ..Default::default()
        };
        assert!(changes.is_movement(&token.position()));
    }

    #[test]
    fn test_rotation_is_not_movement() {
        let token = TokenDocument::new("t", 0.0, 0.0);
        let changes = TokenChanges {
            rotation: Some(90.0),
            ..Default::default()
        };
        assert!(!changes.is_movement(&token.position()));
    }

    #[test]
    fn test_strip_keeps_non_movement_fields() {
        let mut changes = TokenChanges::move_to(100.0, 100.0);
        changes.name = Some("renamed".into());
        changes.strip_movement_fields();
        assert!(changes.x.is_none());
        assert!(!changes.is_movement(&TokenDocument::new("t", 0.0, 0.0).position()));
        assert_eq!(changes.name.as_deref(), Some("renamed"));
    }

    #[test]
    fn test_apply_to() {
        let mut token = TokenDocument::new("t", 0.0, 0.0);
        let mut changes = TokenChanges::move_to(100.0, 200.0);
        changes.rotation = Some(45.0);
        changes.apply_to(&mut token);
        assert_eq!(token.x, 100.0);
        assert_eq!(token.y, 200.0);
        assert_eq!(token.rotation, 45.0);
    }
}

//! Token positions and movement waypoints
//!
//! Raw waypoint input arrives as partial data; [`clean_waypoints`] fills in
//! the blanks from the previous waypoint (or the token's current position)
//! and validates every field, raising a distinct error per violation.

use crate::core::error::{Result, TabletopError};
use crate::core::types::TokenShape;
use crate::movement::action::ActionRegistry;
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a token's placement and footprint
///
/// `x`/`y` are integer pixel coordinates of the top-left corner; `width` and
/// `height` are measured in grid spaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPosition {
    pub x: f64,
    pub y: f64,
    pub elevation: f64,
    pub width: f64,
    pub height: f64,
    pub shape: TokenShape,
}

impl TokenPosition {
    /// Footprint center in pixels, given the grid cell size
    pub fn center(&self, cell_size: f64) -> DVec2 {
        DVec2::new(
            self.x + self.width * cell_size / 2.0,
            self.y + self.height * cell_size / 2.0,
        )
    }

    /// Whether two positions share the same footprint (width/height/shape)
    pub fn same_footprint(&self, other: &TokenPosition) -> bool {
        self.width == other.width && self.height == other.height && self.shape == other.shape
    }
}

/// A fully-populated movement waypoint
///
/// `action` is `None` only on synthetic resize pseudo-waypoints, which are
/// skipped by measurement; cleaning always produces a concrete action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementWaypoint {
    pub position: TokenPosition,
    pub action: Option<String>,
    /// Terrain difficulty attached by the terrain-path consumer
    pub terrain: Option<f64>,
    pub snapped: bool,
    pub explicit: bool,
    pub checkpoint: bool,
    /// Synthetic waypoint inserted for interpolation; never user-editable
    pub intermediate: bool,
}

impl MovementWaypoint {
    pub fn at(position: TokenPosition, action: impl Into<String>) -> Self {
        Self {
            position,
            action: Some(action.into()),
            terrain: None,
            snapped: false,
            explicit: false,
            checkpoint: false,
            intermediate: false,
        }
    }

    /// Whether this waypoint occupies the same position and footprint
    pub fn same_position(&self, position: &TokenPosition) -> bool {
        self.position == *position
    }
}

/// A waypoint persisted into a token's movement history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedWaypoint {
    pub waypoint: MovementWaypoint,
    pub cost: f64,
}

/// Partial waypoint input, as supplied by callers
///
/// Fields left `None` inherit the previous waypoint's value (positional
/// fields and action) or default to false (flags). Unknown keys in
/// serialized input are dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementWaypointInput {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub elevation: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub shape: Option<TokenShape>,
    pub action: Option<String>,
    pub terrain: Option<f64>,
    pub snapped: Option<bool>,
    pub explicit: Option<bool>,
    pub checkpoint: Option<bool>,
}

impl MovementWaypointInput {
    pub fn to(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn as_checkpoint(mut self) -> Self {
        self.checkpoint = Some(true);
        self
    }
}

impl From<&MovementWaypoint> for MovementWaypointInput {
    fn from(waypoint: &MovementWaypoint) -> Self {
        Self {
            x: Some(waypoint.position.x),
            y: Some(waypoint.position.y),
            elevation: Some(waypoint.position.elevation),
            width: Some(waypoint.position.width),
            height: Some(waypoint.position.height),
            shape: Some(waypoint.position.shape),
            action: waypoint.action.clone(),
            terrain: waypoint.terrain,
            snapped: Some(waypoint.snapped),
            explicit: Some(waypoint.explicit),
            checkpoint: Some(waypoint.checkpoint),
        }
    }
}

fn validate_coordinate(field: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(TabletopError::NonFiniteCoordinate { field, value });
    }
    Ok(value.round())
}

fn validate_footprint(field: &'static str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TabletopError::InvalidFootprint { field, value });
    }
    Ok(value)
}

/// Clean and validate a list of partial waypoints
///
/// Positional fields and the action cascade from the previous waypoint,
/// seeded by the token's current source position and the given default
/// action. Flags default to false.
pub fn clean_waypoints(
    origin: &TokenPosition,
    default_action: &str,
    registry: &ActionRegistry,
    inputs: &[MovementWaypointInput],
) -> Result<Vec<MovementWaypoint>> {
    let mut previous_position = *origin;
    let mut previous_action = default_action.to_string();
    let mut cleaned = Vec::with_capacity(inputs.len());

    for input in inputs {
        let x = validate_coordinate("x", input.x.unwrap_or(previous_position.x))?;
        let y = validate_coordinate("y", input.y.unwrap_or(previous_position.y))?;

        let elevation = input.elevation.unwrap_or(previous_position.elevation);
        if !elevation.is_finite() {
            return Err(TabletopError::NonFiniteElevation(elevation));
        }

        let width = validate_footprint("width", input.width.unwrap_or(previous_position.width))?;
        let height = validate_footprint("height", input.height.unwrap_or(previous_position.height))?;
        let shape = input.shape.unwrap_or(previous_position.shape);

        let action = input.action.clone().unwrap_or_else(|| previous_action.clone());
        if !registry.contains(&action) {
            return Err(TabletopError::UnknownAction(action));
        }

        if let Some(terrain) = input.terrain {
            if !terrain.is_finite() || terrain <= 0.0 {
                return Err(TabletopError::InvalidFootprint {
                    field: "terrain",
                    value: terrain,
                });
            }
        }

        let position = TokenPosition {
            x,
            y,
            elevation,
            width,
            height,
            shape,
        };

        cleaned.push(MovementWaypoint {
            position,
            action: Some(action.clone()),
            terrain: input.terrain,
            snapped: input.snapped.unwrap_or(false),
            explicit: input.explicit.unwrap_or(false),
            checkpoint: input.checkpoint.unwrap_or(false),
            intermediate: false,
        });

        previous_position = position;
        previous_action = action;
    }

    Ok(cleaned)
}

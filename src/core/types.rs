//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for token documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub Uuid);

impl TokenId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for region documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionId(pub Uuid);

impl RegionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for region behaviors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BehaviorId(pub Uuid);

impl BehaviorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BehaviorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for users (connected clients)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for one movement operation
///
/// A continued movement gets a fresh id; the prior ids are carried in the
/// operation's `chain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MovementId(pub Uuid);

impl MovementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for combatants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

/// Token footprint shape
///
/// The two variants of each family differ in which way an even-sized
/// footprint rounds when centered on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenShape {
    Rectangle1,
    Rectangle2,
    Ellipse1,
    Ellipse2,
}

impl TokenShape {
    /// Whether the footprint covers the full bounding rectangle of cells
    pub fn is_rectangle(&self) -> bool {
        matches!(self, TokenShape::Rectangle1 | TokenShape::Rectangle2)
    }
}

impl Default for TokenShape {
    fn default() -> Self {
        TokenShape::Rectangle1
    }
}

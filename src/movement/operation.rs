//! The movement operation record
//!
//! One [`MovementOperation`] is the authoritative description of a single
//! movement transaction. It is built once by the coordinator, shared behind
//! an `Arc`, and never mutated afterwards; the only live parts are the state
//! and the two presentation toggles, which are atomics so the owning
//! machinery can flip them without touching the frozen record.

use crate::core::types::{MovementId, UserId};
use crate::grid::SegmentMeasurement;
use crate::movement::waypoint::{MovementWaypoint, TokenPosition};
use crate::world::UpdateOptions;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Lifecycle state of a movement operation
///
/// `Stopped` and `Completed` are terminal; only `Pending` may pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementState {
    Pending,
    Paused,
    Completed,
    Stopped,
}

impl MovementState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MovementState::Completed | MovementState::Stopped)
    }

    /// Whether the state machine permits this transition
    pub fn can_transition(&self, to: MovementState) -> bool {
        match (self, to) {
            (MovementState::Pending, MovementState::Paused) => true,
            (MovementState::Paused, MovementState::Pending) => true,
            (MovementState::Pending, MovementState::Completed) => true,
            (MovementState::Pending, MovementState::Stopped) => true,
            (MovementState::Paused, MovementState::Stopped) => true,
            _ => false,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            MovementState::Pending => 0,
            MovementState::Paused => 1,
            MovementState::Completed => 2,
            MovementState::Stopped => 3,
        }
    }

    fn from_u8(raw: u8) -> MovementState {
        match raw {
            0 => MovementState::Pending,
            1 => MovementState::Paused,
            2 => MovementState::Completed,
            _ => MovementState::Stopped,
        }
    }
}

/// Live state slot on an otherwise frozen operation
#[derive(Debug)]
pub struct MovementStateCell(AtomicU8);

impl MovementStateCell {
    pub fn new(state: MovementState) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    pub fn get(&self) -> MovementState {
        MovementState::from_u8(self.0.load(Ordering::Relaxed))
    }

    /// Apply a transition if the state machine allows it
    pub fn transition(&self, to: MovementState) -> bool {
        let current = self.get();
        if !current.can_transition(to) {
            return false;
        }
        self.0.store(to.to_u8(), Ordering::Relaxed);
        true
    }
}

/// How a movement was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMethod {
    Api,
    Config,
    Dragging,
    Keyboard,
    Paste,
    Undo,
}

impl MovementMethod {
    /// Paste and undo replay prior positions: no region checkpoints, no
    /// obstacle constraint
    pub fn bypasses_regions(&self) -> bool {
        matches!(self, MovementMethod::Paste | MovementMethod::Undo)
    }

    pub fn default_show_ruler(&self) -> bool {
        matches!(self, MovementMethod::Dragging)
    }

    /// Paste/undo never auto-rotate or show a ruler, whatever the caller
    /// asked for
    pub fn forces_silent(&self) -> bool {
        self.bypasses_regions()
    }
}

impl Default for MovementMethod {
    fn default() -> Self {
        MovementMethod::Api
    }
}

/// Options forwarded to the obstacle constrainer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstrainOptions {
    /// Skip wall collision entirely
    pub ignore_walls: bool,
}

/// One measured path section of an operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementSection {
    pub waypoints: Vec<MovementWaypoint>,
    pub distance: f64,
    pub cost: f64,
    pub spaces: u32,
    pub diagonals: u32,
}

impl MovementSection {
    pub fn new(waypoints: Vec<MovementWaypoint>, totals: SegmentMeasurement) -> Self {
        Self {
            waypoints,
            distance: totals.distance,
            cost: totals.cost,
            spaces: totals.spaces,
            diagonals: totals.diagonals,
        }
    }

    /// A section whose first waypoint is the position the token already
    /// occupies holds movement only when something follows it
    pub fn has_movement(&self) -> bool {
        self.waypoints.len() > 1
    }
}

/// Sub-totals of the history section
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HistoryTotals {
    pub distance: f64,
    pub cost: f64,
    pub spaces: u32,
    pub diagonals: u32,
}

impl From<SegmentMeasurement> for HistoryTotals {
    fn from(m: SegmentMeasurement) -> Self {
        Self {
            distance: m.distance,
            cost: m.cost,
            spaces: m.spaces,
            diagonals: m.diagonals,
        }
    }
}

/// The movement already behind the token when this operation began,
/// split by whether it is persisted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementHistorySection {
    pub waypoints: Vec<MovementWaypoint>,
    pub recorded: HistoryTotals,
    pub unrecorded: HistoryTotals,
    pub distance: f64,
    pub cost: f64,
    pub spaces: u32,
    pub diagonals: u32,
}

/// The frozen record of one movement transaction
#[derive(Debug)]
pub struct MovementOperation {
    pub id: MovementId,
    /// Ids of the prior operations this one continues, oldest first
    pub chain: Vec<MovementId>,
    pub origin: TokenPosition,
    pub destination: TokenPosition,
    pub passed: MovementSection,
    pub pending: MovementSection,
    pub history: MovementHistorySection,
    /// Was the path shortened by obstacle constraint
    pub constrained: bool,
    /// Is the passed movement persisted into the token's history
    pub recorded: bool,
    pub method: MovementMethod,
    pub constrain_options: ConstrainOptions,
    pub user: UserId,
    pub update_options: UpdateOptions,
    auto_rotate: AtomicBool,
    show_ruler: AtomicBool,
    state: MovementStateCell,
}

impl MovementOperation {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: MovementId,
        chain: Vec<MovementId>,
        origin: TokenPosition,
        destination: TokenPosition,
        passed: MovementSection,
        pending: MovementSection,
        history: MovementHistorySection,
        constrained: bool,
        recorded: bool,
        method: MovementMethod,
        constrain_options: ConstrainOptions,
        user: UserId,
        update_options: UpdateOptions,
        auto_rotate: bool,
        show_ruler: bool,
        state: MovementState,
    ) -> Self {
        Self {
            id,
            chain,
            origin,
            destination,
            passed,
            pending,
            history,
            constrained,
            recorded,
            method,
            constrain_options,
            user,
            update_options,
            auto_rotate: AtomicBool::new(auto_rotate),
            show_ruler: AtomicBool::new(show_ruler),
            state: MovementStateCell::new(state),
        }
    }

    pub fn state(&self) -> MovementState {
        self.state.get()
    }

    pub(crate) fn transition(&self, to: MovementState) -> bool {
        self.state.transition(to)
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate.load(Ordering::Relaxed)
    }

    pub fn set_auto_rotate(&self, value: bool) {
        self.auto_rotate.store(value, Ordering::Relaxed);
    }

    pub fn show_ruler(&self) -> bool {
        self.show_ruler.load(Ordering::Relaxed)
    }

    pub fn set_show_ruler(&self, value: bool) {
        self.show_ruler.store(value, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        assert!(MovementState::Pending.can_transition(MovementState::Paused));
        assert!(MovementState::Paused.can_transition(MovementState::Pending));
        assert!(MovementState::Pending.can_transition(MovementState::Completed));
        assert!(MovementState::Paused.can_transition(MovementState::Stopped));

        // Terminal states never move
        assert!(!MovementState::Completed.can_transition(MovementState::Pending));
        assert!(!MovementState::Stopped.can_transition(MovementState::Pending));
        // Only pending work can complete
        assert!(!MovementState::Paused.can_transition(MovementState::Completed));
    }

    #[test]
    fn test_state_cell_rejects_illegal_transition() {
        let cell = MovementStateCell::new(MovementState::Completed);
        assert!(!cell.transition(MovementState::Pending));
        assert_eq!(cell.get(), MovementState::Completed);
    }

    #[test]
    fn test_state_cell_applies_legal_transition() {
        let cell = MovementStateCell::new(MovementState::Pending);
        assert!(cell.transition(MovementState::Paused));
        assert!(cell.transition(MovementState::Pending));
        assert!(cell.transition(MovementState::Stopped));
        assert!(cell.get().is_terminal());
    }

    #[test]
    fn test_method_defaults() {
        assert!(MovementMethod::Dragging.default_show_ruler());
        assert!(!MovementMethod::Api.default_show_ruler());
        assert!(MovementMethod::Paste.bypasses_regions());
        assert!(MovementMethod::Undo.forces_silent());
        assert!(!MovementMethod::Keyboard.bypasses_regions());
    }

    #[test]
    fn test_section_has_movement() {
        use crate::core::types::TokenShape;
        use crate::movement::waypoint::MovementWaypoint;

        let position = TokenPosition {
            x: 0.0,
            y: 0.0,
            elevation: 0.0,
            width: 1.0,
            height: 1.0,
            shape: TokenShape::Rectangle1,
        };
        let origin_only = MovementSection::new(
            vec![MovementWaypoint::at(position, "walk")],
            SegmentMeasurement::ZERO,
        );
        assert!(!origin_only.has_movement());
    }
}

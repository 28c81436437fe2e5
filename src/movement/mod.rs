//! Token movement: waypoints, path building, and the transaction machinery

pub mod action;
pub mod continuation;
pub(crate) mod coordinator;
pub mod operation;
pub mod path;
pub mod splitter;
pub mod waypoint;

pub use action::{ActionProfile, ActionRegistry};
pub use continuation::{ContinuationHandle, MovementContinuation, PauseGuard, ResumeWaiter};
pub use operation::{
    ConstrainOptions, MovementHistorySection, MovementMethod, MovementOperation, MovementSection,
    MovementState,
};
pub use path::{expand_path, measure_path, synthesize_cost_fn, CostAggregator};
pub use splitter::{split_at_first_checkpoint, PathSplit};
pub use waypoint::{
    clean_waypoints, MovementWaypoint, MovementWaypointInput, RecordedWaypoint, TokenPosition,
};

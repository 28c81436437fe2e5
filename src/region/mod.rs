//! Regions: boundaries, behaviors, and containment-driven events

pub mod behavior;
pub mod boundary;
pub mod events;

pub use behavior::{RegionBehavior, RegionDocument, RegionEventType};
pub use boundary::{PathPoint, RegionBoundary, RegionMovementSegment, RegionSegmentKind};
pub use events::plan_region_events;

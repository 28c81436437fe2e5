//! Grid measurement service
//!
//! The movement core consumes grids through the [`GridMeasure`] trait: offset
//! conversion, direct paths between cells, footprint offset tables, and path
//! measurement with a pluggable per-step cost function. Two implementations
//! are provided: [`SquareGrid`] and [`Gridless`].

pub mod footprint;
pub mod gridless;
pub mod square;

pub use gridless::Gridless;
pub use square::{DiagonalRule, SquareGrid};

use crate::core::types::TokenShape;
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A grid cell address: `i` is the row (y), `j` the column (x)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridOffset {
    pub i: i32,
    pub j: i32,
}

impl GridOffset {
    pub fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Translate by another offset
    pub fn translated(self, by: GridOffset) -> Self {
        Self {
            i: self.i + by.i,
            j: self.j + by.j,
        }
    }
}

/// Per-step movement cost function
///
/// Receives the step's from/to offsets and its measured distance; returns the
/// cost of taking that step. The default (no function) is cost = distance.
pub type CellCostFn<'a> = dyn Fn(GridOffset, GridOffset, f64) -> f64 + 'a;

/// One point of a path handed to [`GridMeasure::measure_path`]
///
/// `center` is the footprint center in pixels. A point with `measure` false
/// contributes a zero segment; a `teleport` point is measured as a direct
/// jump with no spaces travelled.
#[derive(Debug, Clone, Copy)]
pub struct MeasurePoint {
    pub center: DVec2,
    pub elevation: f64,
    pub teleport: bool,
    pub measure: bool,
}

impl MeasurePoint {
    pub fn new(center: DVec2, elevation: f64) -> Self {
        Self {
            center,
            elevation,
            teleport: false,
            measure: true,
        }
    }
}

/// Measured quantities of one path segment
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeasurement {
    pub distance: f64,
    pub cost: f64,
    pub spaces: u32,
    pub diagonals: u32,
}

impl SegmentMeasurement {
    pub const ZERO: SegmentMeasurement = SegmentMeasurement {
        distance: 0.0,
        cost: 0.0,
        spaces: 0,
        diagonals: 0,
    };

    pub fn add(&mut self, other: &SegmentMeasurement) {
        self.distance += other.distance;
        self.cost += other.cost;
        self.spaces += other.spaces;
        self.diagonals += other.diagonals;
    }
}

/// Cumulative measurement at one waypoint, with links to its neighbors
#[derive(Debug, Clone, Default)]
pub struct WaypointMeasurement {
    /// Totals from the path start up to this waypoint
    pub distance: f64,
    pub cost: f64,
    pub spaces: u32,
    pub diagonals: u32,
    /// Segment arriving at this waypoint (absent on the first)
    pub backward: Option<SegmentMeasurement>,
    /// Segment leaving this waypoint (absent on the last)
    pub forward: Option<SegmentMeasurement>,
}

/// Result of measuring a path
#[derive(Debug, Clone, Default)]
pub struct PathMeasurement {
    pub waypoints: Vec<WaypointMeasurement>,
    pub segments: Vec<SegmentMeasurement>,
}

impl PathMeasurement {
    /// Totals over the whole path
    pub fn totals(&self) -> SegmentMeasurement {
        let mut acc = SegmentMeasurement::ZERO;
        for segment in &self.segments {
            acc.add(segment);
        }
        acc
    }
}

/// Grid measurement service consumed by the movement core
pub trait GridMeasure {
    /// True when the grid imposes no cell structure
    fn is_gridless(&self) -> bool {
        false
    }

    /// Cell edge length in pixels
    fn cell_size(&self) -> f64;

    /// Distance units represented by one cell (or, gridless, by
    /// `cell_size()` pixels)
    fn distance(&self) -> f64;

    /// Pixels per distance unit
    fn pixels_per_unit(&self) -> f64 {
        self.cell_size() / self.distance()
    }

    /// Cell containing the given pixel point
    fn offset(&self, point: DVec2) -> GridOffset;

    /// Center of the given cell in pixels
    fn center(&self, offset: GridOffset) -> DVec2;

    /// All cells crossed moving from one cell to another, endpoints included
    fn direct_path(&self, from: GridOffset, to: GridOffset) -> Vec<GridOffset>;

    /// Relative offsets of the cells covered by a footprint anchored at its
    /// top-left cell
    fn footprint_offsets(&self, shape: TokenShape, width: f64, height: f64) -> Vec<GridOffset>;

    /// Measure a path of footprint centers
    fn measure_path(&self, path: &[MeasurePoint], cost_fn: Option<&CellCostFn>) -> PathMeasurement;
}

/// Assemble a [`PathMeasurement`] from per-segment results
///
/// Shared by the grid implementations: fills cumulative waypoint totals and
/// backward/forward links.
pub(crate) fn assemble_measurement(segments: Vec<SegmentMeasurement>) -> PathMeasurement {
    let mut waypoints = Vec::with_capacity(segments.len() + 1);
    let mut acc = SegmentMeasurement::ZERO;

    waypoints.push(WaypointMeasurement {
        forward: segments.first().copied(),
        ..Default::default()
    });

    for (idx, segment) in segments.iter().enumerate() {
        acc.add(segment);
        waypoints.push(WaypointMeasurement {
            distance: acc.distance,
            cost: acc.cost,
            spaces: acc.spaces,
            diagonals: acc.diagonals,
            backward: Some(*segment),
            forward: segments.get(idx + 1).copied(),
        });
    }

    PathMeasurement { waypoints, segments }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_translate() {
        let a = GridOffset::new(2, 3);
        let b = a.translated(GridOffset::new(-1, 4));
        assert_eq!(b, GridOffset::new(1, 7));
    }

    #[test]
    fn test_segment_add() {
        let mut a = SegmentMeasurement {
            distance: 5.0,
            cost: 10.0,
            spaces: 1,
            diagonals: 0,
        };
        a.add(&SegmentMeasurement {
            distance: 7.5,
            cost: 7.5,
            spaces: 1,
            diagonals: 1,
        });
        assert_eq!(a.distance, 12.5);
        assert_eq!(a.cost, 17.5);
        assert_eq!(a.spaces, 2);
        assert_eq!(a.diagonals, 1);
    }

    #[test]
    fn test_assemble_measurement_links() {
        let measurement = assemble_measurement(vec![
            SegmentMeasurement {
                distance: 5.0,
                cost: 5.0,
                spaces: 1,
                diagonals: 0,
            },
            SegmentMeasurement {
                distance: 10.0,
                cost: 15.0,
                spaces: 2,
                diagonals: 1,
            },
        ]);

        assert_eq!(measurement.waypoints.len(), 3);
        assert!(measurement.waypoints[0].backward.is_none());
        assert!(measurement.waypoints[2].forward.is_none());
        assert_eq!(measurement.waypoints[1].distance, 5.0);
        assert_eq!(measurement.waypoints[2].distance, 15.0);
        assert_eq!(measurement.waypoints[2].cost, 20.0);
        assert_eq!(measurement.totals().spaces, 3);
    }
}

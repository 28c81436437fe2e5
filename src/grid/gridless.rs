//! Gridless (free movement) measurement

use super::{
    assemble_measurement, CellCostFn, GridMeasure, GridOffset, MeasurePoint, PathMeasurement,
    SegmentMeasurement,
};
use crate::core::types::TokenShape;
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A scene with no cell structure: distances are Euclidean, nothing snaps
///
/// `size` keeps the meaning it has on gridded scenes (pixels representing
/// `distance` units) so pixel/unit conversion stays uniform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gridless {
    /// Pixels representing `distance` units
    pub size: f64,
    /// Distance units per `size` pixels
    pub distance: f64,
}

impl Gridless {
    pub fn new(size: f64, distance: f64) -> Self {
        Self { size, distance }
    }
}

impl GridMeasure for Gridless {
    fn is_gridless(&self) -> bool {
        true
    }

    fn cell_size(&self) -> f64 {
        self.size
    }

    fn distance(&self) -> f64 {
        self.distance
    }

    fn offset(&self, point: DVec2) -> GridOffset {
        GridOffset {
            i: (point.y / self.size).floor() as i32,
            j: (point.x / self.size).floor() as i32,
        }
    }

    fn center(&self, offset: GridOffset) -> DVec2 {
        DVec2::new(
            (offset.j as f64 + 0.5) * self.size,
            (offset.i as f64 + 0.5) * self.size,
        )
    }

    /// No cells to cross: the direct path is just the two endpoints
    fn direct_path(&self, from: GridOffset, to: GridOffset) -> Vec<GridOffset> {
        if from == to {
            vec![from]
        } else {
            vec![from, to]
        }
    }

    fn footprint_offsets(&self, _shape: TokenShape, _width: f64, _height: f64) -> Vec<GridOffset> {
        vec![GridOffset::new(0, 0)]
    }

    fn measure_path(&self, path: &[MeasurePoint], cost_fn: Option<&CellCostFn>) -> PathMeasurement {
        let mut segments = Vec::new();

        for pair in path.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);

            if !b.measure {
                segments.push(SegmentMeasurement::ZERO);
                continue;
            }

            let planar = (b.center - a.center).length() / self.size * self.distance;
            let vertical = (b.elevation - a.elevation).abs();
            let distance = (planar * planar + vertical * vertical).sqrt();

            // The cost function is invoked once per segment: no cells to step
            let cost = match cost_fn {
                Some(f) => f(self.offset(a.center), self.offset(b.center), distance),
                None => distance,
            };

            segments.push(SegmentMeasurement {
                distance,
                cost,
                spaces: 0,
                diagonals: 0,
            });
        }

        assemble_measurement(segments)
    }
}

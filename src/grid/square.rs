//! Square grid measurement

use super::{
    assemble_measurement, footprint, CellCostFn, GridMeasure, GridOffset, MeasurePoint,
    PathMeasurement, SegmentMeasurement,
};
use crate::core::types::TokenShape;
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// How diagonal steps are charged on a square grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagonalRule {
    /// Diagonals cost the same as straight steps
    Equidistant,
    /// Diagonals alternate between one and two steps (the 5-10-5 rule);
    /// the alternation carries across segments of one path
    Alternating,
    /// Diagonals cost sqrt(2) steps
    Exact,
}

impl Default for DiagonalRule {
    fn default() -> Self {
        DiagonalRule::Equidistant
    }
}

/// A square grid with a fixed cell size and distance scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquareGrid {
    /// Cell edge length in pixels
    pub size: f64,
    /// Distance units per cell
    pub distance: f64,
    /// Diagonal pricing rule
    pub diagonals: DiagonalRule,
}

impl SquareGrid {
    pub fn new(size: f64, distance: f64) -> Self {
        Self {
            size,
            distance,
            diagonals: DiagonalRule::default(),
        }
    }

    pub fn with_diagonals(mut self, diagonals: DiagonalRule) -> Self {
        self.diagonals = diagonals;
        self
    }

    /// Distance charged for the n-th diagonal of a path (1-based)
    fn diagonal_distance(&self, nth: u32) -> f64 {
        match self.diagonals {
            DiagonalRule::Equidistant => self.distance,
            DiagonalRule::Alternating => {
                if nth % 2 == 1 {
                    self.distance
                } else {
                    2.0 * self.distance
                }
            }
            DiagonalRule::Exact => self.distance * std::f64::consts::SQRT_2,
        }
    }

    /// Grid distance between two cells including vertical travel, charging
    /// diagonals starting from the given prior diagonal count
    fn jump_distance(&self, from: GridOffset, to: GridOffset, delta_elevation: f64, prior_diagonals: u32) -> f64 {
        let di = (to.i - from.i).unsigned_abs();
        let dj = (to.j - from.j).unsigned_abs();
        let dk = (delta_elevation.abs() / self.distance).round() as u32;

        let diag = di.min(dj);
        let planar = di.max(dj);
        let straight = planar - diag;
        let vertical_extra = dk.saturating_sub(planar);

        let mut total = (straight + vertical_extra) as f64 * self.distance;
        for n in 1..=diag {
            total += self.diagonal_distance(prior_diagonals + n);
        }
        total
    }
}

impl GridMeasure for SquareGrid {
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

    fn direct_path(&self, from: GridOffset, to: GridOffset) -> Vec<GridOffset> {
        let mut path = vec![from];
        let mut current = from;
        while current != to {
            current.i += (to.i - current.i).signum();
            current.j += (to.j - current.j).signum();
            path.push(current);
        }
        path
    }

    fn footprint_offsets(&self, shape: TokenShape, width: f64, height: f64) -> Vec<GridOffset> {
        footprint::compute_offsets(shape, width, height)
    }

    fn measure_path(&self, path: &[MeasurePoint], cost_fn: Option<&CellCostFn>) -> PathMeasurement {
        let mut segments = Vec::new();
        // Alternating diagonals carry their parity across the whole path
        let mut diagonals_so_far: u32 = 0;

        for pair in path.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);

            if !b.measure {
                segments.push(SegmentMeasurement::ZERO);
                continue;
            }

            let from = self.offset(a.center);
            let to = self.offset(b.center);
            let delta_elevation = b.elevation - a.elevation;

            if b.teleport {
                // A direct jump: measured, but no spaces travelled
                let distance = self.jump_distance(from, to, delta_elevation, diagonals_so_far);
                let cost = match cost_fn {
                    Some(f) => f(from, to, distance),
                    None => distance,
                };
                segments.push(SegmentMeasurement {
                    distance,
                    cost,
                    spaces: 0,
                    diagonals: 0,
                });
                continue;
            }

            let steps = self.direct_path(from, to);
            let mut segment = SegmentMeasurement::ZERO;

            for step in steps.windows(2) {
                let (s, t) = (step[0], step[1]);
                let is_diagonal = s.i != t.i && s.j != t.j;
                let step_distance = if is_diagonal {
                    diagonals_so_far += 1;
                    segment.diagonals += 1;
                    self.diagonal_distance(diagonals_so_far)
                } else {
                    self.distance
                };
                segment.spaces += 1;
                segment.distance += step_distance;
                segment.cost += match cost_fn {
                    Some(f) => f(s, t, step_distance),
                    None => step_distance,
                };
            }

            // Vertical travel beyond what the planar steps already cover
            let planar = (steps.len() - 1) as u32;
            let dk = (delta_elevation.abs() / self.distance).round() as u32;
            let vertical_extra = dk.saturating_sub(planar);
            if vertical_extra > 0 {
                let extra_distance = vertical_extra as f64 * self.distance;
                segment.spaces += vertical_extra;
                segment.distance += extra_distance;
                segment.cost += match cost_fn {
                    Some(f) => f(to, to, extra_distance),
                    None => extra_distance,
                };
            }

            segments.push(segment);
        }

        assemble_measurement(segments)
    }
}

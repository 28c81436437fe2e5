//! Blocked cells and terrain for movement constraint
//!
//! Cell-based blocking with O(1) lookup, plus per-cell terrain cost
//! multipliers. Backs the default renderer-side movement-path constrainer
//! and the terrain-aware cost function.

use crate::grid::{GridMeasure, GridOffset};
use crate::movement::action::ActionRegistry;
use crate::movement::operation::ConstrainOptions;
use crate::movement::waypoint::MovementWaypoint;
use crate::world::PlaceableSink;
use ahash::{AHashMap, AHashSet};
use glam::DVec2;

/// Set of blocked grid cells and terrain multipliers
#[derive(Debug, Clone)]
pub struct ObstacleMap {
    blocked: AHashSet<GridOffset>,
    terrain: AHashMap<GridOffset, f64>,
    cell_size: f64,
}

impl ObstacleMap {
    /// Create an empty map with the given cell size
    pub fn new(cell_size: f64) -> Self {
        Self {
            blocked: AHashSet::new(),
            terrain: AHashMap::new(),
            cell_size,
        }
    }

    /// Block a cell
    pub fn block(&mut self, offset: GridOffset) {
        self.blocked.insert(offset);
    }

    /// Unblock a cell
    pub fn unblock(&mut self, offset: GridOffset) {
        self.blocked.remove(&offset);
    }

    pub fn is_blocked(&self, offset: GridOffset) -> bool {
        self.blocked.contains(&offset)
    }

    /// Check if a world position is blocked
    pub fn is_position_blocked(&self, pos: DVec2) -> bool {
        self.is_blocked(self.world_to_cell(pos))
    }

    /// Convert world position to cell coordinates
    pub fn world_to_cell(&self, pos: DVec2) -> GridOffset {
        GridOffset {
            i: (pos.y / self.cell_size).floor() as i32,
            j: (pos.x / self.cell_size).floor() as i32,
        }
    }

    /// Terrain difficulty multiplier of a cell (1.0 when unset)
    pub fn terrain_multiplier(&self, offset: GridOffset) -> f64 {
        self.terrain.get(&offset).copied().unwrap_or(1.0)
    }

    /// Set the terrain difficulty multiplier of a cell
    pub fn set_terrain(&mut self, offset: GridOffset, multiplier: f64) {
        if multiplier == 1.0 {
            self.terrain.remove(&offset);
        } else {
            self.terrain.insert(offset, multiplier);
        }
    }

    /// Block all cells covered by a polygon footprint
    pub fn block_footprint(&mut self, footprint: &[DVec2]) {
        if footprint.is_empty() {
            return;
        }

        let mut min = footprint[0];
        let mut max = footprint[0];
        for p in footprint {
            min = min.min(*p);
            max = max.max(*p);
        }

        let start = self.world_to_cell(min);
        let end = self.world_to_cell(max);

        for i in start.i..=end.i {
            for j in start.j..=end.j {
                let center = DVec2::new(
                    (j as f64 + 0.5) * self.cell_size,
                    (i as f64 + 0.5) * self.cell_size,
                );
                if point_in_polygon(center, footprint) {
                    self.block(GridOffset::new(i, j));
                }
            }
        }
    }

    /// Clear all blocked cells and terrain
    pub fn clear(&mut self) {
        self.blocked.clear();
        self.terrain.clear();
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    /// Per-step cost: distance scaled by the target cell's terrain
    pub fn step_cost(&self, _from: GridOffset, to: GridOffset, distance: f64) -> f64 {
        distance * self.terrain_multiplier(to)
    }
}

/// Check if a point is inside a polygon using ray casting
pub fn point_in_polygon(point: DVec2, polygon: &[DVec2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = polygon.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }

        j = i;
    }

    inside
}

/// Renderer-side path constrainer backed by an [`ObstacleMap`]
///
/// Walks each segment cell by cell and truncates the path in front of the
/// first blocked cell. Teleporting actions skip constraint entirely.
#[derive(Debug, Clone)]
pub struct GridObstacleConstrainer {
    pub obstacles: ObstacleMap,
}

impl GridObstacleConstrainer {
    pub fn new(obstacles: ObstacleMap) -> Self {
        Self { obstacles }
    }

    fn footprint_blocked(
        &self,
        grid: &dyn GridMeasure,
        waypoint: &MovementWaypoint,
        center: DVec2,
    ) -> bool {
        let cell = grid.cell_size();
        let position = center
            - DVec2::new(
                waypoint.position.width * cell / 2.0,
                waypoint.position.height * cell / 2.0,
            );
        let anchor = grid.offset(position + DVec2::splat(cell / 2.0));
        grid.footprint_offsets(
            waypoint.position.shape,
            waypoint.position.width,
            waypoint.position.height,
        )
        .iter()
        .any(|o| self.obstacles.is_blocked(anchor.translated(*o)))
    }
}

impl PlaceableSink for GridObstacleConstrainer {
    fn constrain_movement_path(
        &self,
        grid: &dyn GridMeasure,
        registry: &ActionRegistry,
        path: &[MovementWaypoint],
        options: &ConstrainOptions,
    ) -> (Vec<MovementWaypoint>, bool) {
        let Some(first) = path.first() else {
            return (Vec::new(), false);
        };
        let mut result = vec![first.clone()];

        if options.ignore_walls {
            result.extend(path[1..].iter().cloned());
            return (result, false);
        }

        let cell = grid.cell_size();

        for pair in path.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);

            if registry.is_teleport(b.action.as_deref()) {
                result.push(b.clone());
                continue;
            }

            let from = grid.offset(a.position.center(cell));
            let to = grid.offset(b.position.center(cell));
            let steps = grid.direct_path(from, to);

            let mut blocked_at = None;
            for (k, step) in steps.iter().enumerate().skip(1) {
                if self.footprint_blocked(grid, b, grid.center(*step)) {
                    blocked_at = Some(k);
                    break;
                }
            }

            let Some(k) = blocked_at else {
                result.push(b.clone());
                continue;
            };

            // Movement stops on the last free cell of this segment; every
            // later waypoint is discarded
            if k > 1 {
                let t = (k - 1) as f64 / (steps.len() - 1) as f64;
                let elevation =
                    a.position.elevation + t * (b.position.elevation - a.position.elevation);
                let center = grid.center(steps[k - 1]);
                let mut truncated = b.clone();
                truncated.position.x = (center.x - b.position.width * cell / 2.0).round();
                truncated.position.y = (center.y - b.position.height * cell / 2.0).round();
                truncated.position.elevation = elevation;
                truncated.snapped = true;
                truncated.explicit = false;
                result.push(truncated);
            }
            return (result, true);
        }

        (result, false)
    }

    fn create_terrain_movement_path(
        &self,
        grid: &dyn GridMeasure,
        path: &[MovementWaypoint],
    ) -> Vec<MovementWaypoint> {
        let cell = grid.cell_size();
        path.iter()
            .map(|w| {
                let mut out = w.clone();
                let anchor = grid.offset(w.position.center(cell));
                let multiplier = self.obstacles.terrain_multiplier(anchor);
                if multiplier != 1.0 {
                    out.terrain = Some(multiplier);
                }
                out
            })
            .collect()
    }
}

//! Region checkpoint splitter
//!
//! Walks a waypoint path pairwise and finds the first point at which the
//! movement must break into a separate transaction: either a region
//! boundary crossing of a checkpoint-requiring region, or a waypoint the
//! caller explicitly marked as a checkpoint. Everything up to and including
//! the split point is passed; everything after is pending.

use crate::core::types::RegionId;
use crate::grid::GridMeasure;
use crate::movement::action::ActionRegistry;
use crate::movement::waypoint::{MovementWaypoint, TokenPosition};
use crate::region::behavior::RegionDocument;
use crate::region::boundary::{PathPoint, RegionSegmentKind};
use glam::DVec2;
use ordered_float::OrderedFloat;

/// Result of splitting a path at its first checkpoint
#[derive(Debug, Clone)]
pub struct PathSplit {
    pub passed: Vec<MovementWaypoint>,
    pub pending: Vec<MovementWaypoint>,
}

impl PathSplit {
    fn whole(path: &[MovementWaypoint]) -> Self {
        Self {
            passed: path.to_vec(),
            pending: Vec::new(),
        }
    }
}

/// Containment sample offsets of a footprint, relative to the token position
pub(crate) fn footprint_samples(grid: &dyn GridMeasure, position: &TokenPosition) -> Vec<DVec2> {
    let cell = grid.cell_size();
    if grid.is_gridless() {
        return vec![DVec2::new(
            position.width * cell / 2.0,
            position.height * cell / 2.0,
        )];
    }
    grid.footprint_offsets(position.shape, position.width, position.height)
        .iter()
        .map(|o| {
            DVec2::new(
                (o.j as f64 + 0.5) * cell,
                (o.i as f64 + 0.5) * cell,
            )
        })
        .collect()
}

struct Crossing {
    region: RegionId,
    point: PathPoint,
    weighted_dist_sq: f64,
}

/// Split a cleaned waypoint path at the first region checkpoint
///
/// `regions` must already be filtered to those requiring a movement
/// checkpoint. When two regions are crossed at the same weighted distance
/// on one segment, the lexically smallest region id wins.
pub fn split_at_first_checkpoint(
    grid: &dyn GridMeasure,
    regions: &[&RegionDocument],
    registry: &ActionRegistry,
    path: &[MovementWaypoint],
    samples_per_cell: u32,
    tolerance: f64,
) -> PathSplit {
    if path.len() < 2 {
        return PathSplit::whole(path);
    }

    let px_per_unit = grid.pixels_per_unit();
    let sample_step = grid.cell_size() / samples_per_cell as f64;

    for k in 0..path.len() - 1 {
        let a = &path[k];
        let b = &path[k + 1];

        // Teleports cross no boundaries in between
        if !registry.is_teleport(b.action.as_deref()) && !regions.is_empty() {
            let samples = footprint_samples(grid, &b.position);
            let segment = [
                PathPoint::new(
                    DVec2::new(a.position.x, a.position.y),
                    a.position.elevation,
                ),
                PathPoint::new(
                    DVec2::new(b.position.x, b.position.y),
                    b.position.elevation,
                ),
            ];

            let mut nearest: Option<Crossing> = None;
            for region in regions {
                let pieces = region.boundary.segmentize_movement_path(
                    &segment,
                    &samples,
                    sample_step,
                    tolerance,
                );
                let Some(crossing) = pieces.iter().find(|s| {
                    matches!(s.kind, RegionSegmentKind::Enter | RegionSegmentKind::Exit)
                }) else {
                    continue;
                };

                let point = crossing.from;
                // Skip crossings that coincide with the segment start: the
                // token already stands on that boundary
                if point.point.round() == segment[0].point.round()
                    && (point.elevation - segment[0].elevation).abs() < f64::EPSILON
                {
                    continue;
                }

                let delta = point.point - segment[0].point;
                let dz = (point.elevation - segment[0].elevation) * px_per_unit;
                let weighted_dist_sq = delta.length_squared() + dz * dz;

                let closer = match &nearest {
                    None => true,
                    Some(best) => {
                        (OrderedFloat(weighted_dist_sq), region.id)
                            < (OrderedFloat(best.weighted_dist_sq), best.region)
                    }
                };
                if closer {
                    nearest = Some(Crossing {
                        region: region.id,
                        point,
                        weighted_dist_sq,
                    });
                }
            }

            if let Some(crossing) = nearest {
                let x = crossing.point.point.x.round();
                let y = crossing.point.point.y.round();

                // Reuse the segment end when the crossing lands on it
                if x == b.position.x
                    && y == b.position.y
                    && (crossing.point.elevation - b.position.elevation).abs() < 1e-9
                {
                    let mut passed: Vec<MovementWaypoint> = path[..=k + 1].to_vec();
                    passed.last_mut().unwrap().checkpoint = true;
                    return PathSplit {
                        passed,
                        pending: path[k + 2..].to_vec(),
                    };
                }

                let mut checkpoint = b.clone();
                checkpoint.position.x = x;
                checkpoint.position.y = y;
                checkpoint.position.elevation = crossing.point.elevation;
                checkpoint.snapped = false;
                checkpoint.explicit = false;
                checkpoint.checkpoint = true;
                checkpoint.intermediate = false;

                let mut passed: Vec<MovementWaypoint> = path[..=k].to_vec();
                passed.push(checkpoint);
                return PathSplit {
                    passed,
                    pending: path[k + 1..].to_vec(),
                };
            }
        }

        // An explicit checkpoint waypoint forces a split even without a
        // boundary crossing
        if b.checkpoint && k + 2 < path.len() {
            return PathSplit {
                passed: path[..=k + 1].to_vec(),
                pending: path[k + 2..].to_vec(),
            };
        }
    }

    PathSplit::whole(path)
}

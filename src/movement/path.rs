//! Path expansion and cost synthesis
//!
//! Expansion turns a cleaned waypoint list into the complete path a token
//! travels: every grid cell crossed between consecutive non-teleporting
//! waypoints becomes a synthetic intermediate waypoint, and a footprint
//! change inserts a non-measured resize pseudo-waypoint that preserves the
//! footprint center exactly.

use crate::core::types::TokenShape;
use crate::grid::{CellCostFn, GridMeasure, MeasurePoint, PathMeasurement};
use crate::movement::action::ActionRegistry;
use crate::movement::waypoint::{MovementWaypoint, TokenPosition};

/// Folds per-subcell costs plus the travelled distance into one scalar
pub type CostAggregator<'a> = dyn Fn(&[f64], f64) -> f64 + 'a;

/// Position whose footprint center coincides with the given pixel center
fn recenter(
    center: glam::DVec2,
    elevation: f64,
    width: f64,
    height: f64,
    shape: TokenShape,
    cell_size: f64,
) -> TokenPosition {
    TokenPosition {
        x: (center.x - width * cell_size / 2.0).round(),
        y: (center.y - height * cell_size / 2.0).round(),
        elevation,
        width,
        height,
        shape,
    }
}

/// Expand a waypoint path with intermediate cell crossings and resize
/// pseudo-waypoints
pub fn expand_path(
    grid: &dyn GridMeasure,
    registry: &ActionRegistry,
    waypoints: &[MovementWaypoint],
) -> Vec<MovementWaypoint> {
    let cell = grid.cell_size();
    let mut expanded: Vec<MovementWaypoint> = Vec::with_capacity(waypoints.len());

    let Some(first) = waypoints.first() else {
        return expanded;
    };
    expanded.push(first.clone());

    for pair in waypoints.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let mut from_position = a.position;

        // A footprint change happens in place before the travel: the new
        // footprint keeps the old center
        if !a.position.same_footprint(&b.position) {
            let resized = recenter(
                a.position.center(cell),
                a.position.elevation,
                b.position.width,
                b.position.height,
                b.position.shape,
                cell,
            );
            expanded.push(MovementWaypoint {
                position: resized,
                action: None,
                terrain: None,
                snapped: false,
                explicit: false,
                checkpoint: false,
                intermediate: true,
            });
            from_position = resized;
        }

        if !registry.is_teleport(b.action.as_deref()) {
            let from = grid.offset(from_position.center(cell));
            let to = grid.offset(b.position.center(cell));
            let steps = grid.direct_path(from, to);

            if steps.len() > 2 {
                let interior = steps.len() - 2;
                for (index, offset) in steps[1..steps.len() - 1].iter().enumerate() {
                    let t = (index + 1) as f64 / (interior + 1) as f64;
                    let elevation = from_position.elevation
                        + t * (b.position.elevation - from_position.elevation);
                    let position = recenter(
                        grid.center(*offset),
                        elevation,
                        b.position.width,
                        b.position.height,
                        b.position.shape,
                        cell,
                    );
                    expanded.push(MovementWaypoint {
                        position,
                        action: b.action.clone(),
                        terrain: None,
                        snapped: false,
                        explicit: false,
                        checkpoint: false,
                        intermediate: true,
                    });
                }
            }
        }

        expanded.push(b.clone());
    }

    expanded
}

/// Convert waypoints to measurement input
pub fn measure_points(
    registry: &ActionRegistry,
    waypoints: &[MovementWaypoint],
    cell_size: f64,
) -> Vec<MeasurePoint> {
    waypoints
        .iter()
        .map(|w| MeasurePoint {
            center: w.position.center(cell_size),
            elevation: w.position.elevation,
            teleport: registry.is_teleport(w.action.as_deref()),
            measure: registry.is_measured(w.action.as_deref()),
        })
        .collect()
}

/// Measure a waypoint path
pub fn measure_path(
    grid: &dyn GridMeasure,
    registry: &ActionRegistry,
    waypoints: &[MovementWaypoint],
    cost_fn: Option<&CellCostFn>,
) -> PathMeasurement {
    let points = measure_points(registry, waypoints, grid.cell_size());
    grid.measure_path(&points, cost_fn)
}

/// Build a footprint-level cost function from a single-cell one
///
/// Single-cell footprints and gridless grids use the raw function directly.
/// Larger footprints invoke it once per covered sub-cell offset and fold the
/// results through the aggregator; the default takes the maximum, so the
/// slowest limb wins.
pub fn synthesize_cost_fn<'a>(
    grid: &'a dyn GridMeasure,
    shape: TokenShape,
    width: f64,
    height: f64,
    cell_cost: &'a CellCostFn<'a>,
    aggregator: Option<&'a CostAggregator<'a>>,
) -> Box<CellCostFn<'a>> {
    if grid.is_gridless() || (width <= 1.0 && height <= 1.0) {
        return Box::new(move |from, to, distance| cell_cost(from, to, distance));
    }

    let offsets = grid.footprint_offsets(shape, width, height);
    Box::new(move |from, to, distance| {
        let costs: Vec<f64> = offsets
            .iter()
            .map(|o| cell_cost(from.translated(*o), to.translated(*o), distance))
            .collect();
        match aggregator {
            Some(f) => f(&costs, distance),
            None => costs.iter().copied().fold(0.0, f64::max),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridOffset, SquareGrid};
    use crate::movement::waypoint::MovementWaypoint;

    fn grid() -> SquareGrid {
        SquareGrid::new(100.0, 5.0)
    }

    fn waypoint(x: f64, y: f64) -> MovementWaypoint {
        MovementWaypoint::at(
            TokenPosition {
                x,
                y,
                elevation: 0.0,
                width: 1.0,
                height: 1.0,
                shape: TokenShape::Rectangle1,
            },
            "walk",
        )
    }

    #[test]
    fn test_expand_inserts_intermediates() {
        let g = grid();
        let registry = ActionRegistry::builtin();
        let path = expand_path(&g, &registry, &[waypoint(0.0, 0.0), waypoint(300.0, 0.0)]);

        // origin, two crossed cells, destination
        assert_eq!(path.len(), 4);
        assert!(path[1].intermediate);
        assert!(path[2].intermediate);
        assert_eq!(path[1].position.x, 100.0);
        assert_eq!(path[2].position.x, 200.0);
        assert!(!path[3].intermediate);
    }

    #[test]
    fn test_expand_adjacent_cells_no_intermediates() {
        let g = grid();
        let registry = ActionRegistry::builtin();
        let path = expand_path(&g, &registry, &[waypoint(0.0, 0.0), waypoint(100.0, 0.0)]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_expand_teleport_skips_interpolation() {
        let g = grid();
        let registry = ActionRegistry::builtin();
        let mut target = waypoint(500.0, 0.0);
        target.action = Some("blink".into());
        let path = expand_path(&g, &registry, &[waypoint(0.0, 0.0), target]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_expand_resize_preserves_center() {
        let g = grid();
        let registry = ActionRegistry::builtin();
        let mut grown = waypoint(0.0, 0.0);
        grown.position.width = 2.0;
        grown.position.height = 2.0;

        let path = expand_path(&g, &registry, &[waypoint(0.0, 0.0), grown]);
        let resize = &path[1];
        assert!(resize.intermediate);
        assert!(resize.action.is_none());
        // 1x1 at (0,0) has center (50,50); the 2x2 footprint centered there
        // sits at (-50,-50)
        assert_eq!(resize.position.x, -50.0);
        assert_eq!(resize.position.y, -50.0);
        assert_eq!(resize.position.center(100.0), glam::DVec2::new(50.0, 50.0));
    }

    #[test]
    fn test_intermediates_have_concrete_neighbors() {
        let g = grid();
        let registry = ActionRegistry::builtin();
        let path = expand_path(
            &g,
            &registry,
            &[waypoint(0.0, 0.0), waypoint(300.0, 0.0), waypoint(300.0, 200.0)],
        );
        assert!(!path.first().unwrap().intermediate);
        assert!(!path.last().unwrap().intermediate);
    }

    #[test]
    fn test_measure_skips_resize_pseudo_waypoint() {
        let g = grid();
        let registry = ActionRegistry::builtin();
        let mut grown = waypoint(0.0, 0.0);
        grown.position.width = 2.0;
        grown.position.height = 2.0;
        let path = expand_path(&g, &registry, &[waypoint(0.0, 0.0), grown]);

        let measurement = measure_path(&g, &registry, &path, None);
        assert_eq!(measurement.totals().distance, 0.0);
        assert_eq!(measurement.totals().spaces, 0);
    }

    #[test]
    fn test_synthesized_cost_single_cell_passthrough() {
        let g = grid();
        let cell_cost = |_: GridOffset, _: GridOffset, d: f64| d * 3.0;
        let synthesized = synthesize_cost_fn(
            &g,
            TokenShape::Rectangle1,
            1.0,
            1.0,
            &cell_cost,
            None,
        );
        assert_eq!(
            synthesized(GridOffset::new(0, 0), GridOffset::new(0, 1), 5.0),
            15.0
        );
    }

    #[test]
    fn test_synthesized_cost_footprint_max() {
        let g = grid();
        // Row 1 is swamp: triple cost
        let cell_cost = |_: GridOffset, to: GridOffset, d: f64| {
            if to.i == 1 {
                d * 3.0
            } else {
                d
            }
        };
        let synthesized = synthesize_cost_fn(
            &g,
            TokenShape::Rectangle1,
            2.0,
            2.0,
            &cell_cost,
            None,
        );
        // A 2x2 token stepping right from (0,0): its bottom row touches the
        // swamp, and the slowest limb wins
        assert_eq!(
            synthesized(GridOffset::new(0, 0), GridOffset::new(0, 1), 5.0),
            15.0
        );
    }

    #[test]
    fn test_synthesized_cost_custom_aggregator() {
        let g = grid();
        let cell_cost = |_: GridOffset, to: GridOffset, d: f64| if to.i == 1 { d * 3.0 } else { d };
        let average = |costs: &[f64], _d: f64| costs.iter().sum::<f64>() / costs.len() as f64;
        let synthesized = synthesize_cost_fn(
            &g,
            TokenShape::Rectangle1,
            2.0,
            2.0,
            &cell_cost,
            Some(&average),
        );
        assert_eq!(
            synthesized(GridOffset::new(0, 0), GridOffset::new(0, 1), 5.0),
            10.0
        );
    }
}

//! Footprint offset tables
//!
//! A multi-cell token occupies a set of cells relative to its top-left
//! anchor cell. Rectangles cover the full bounding box; ellipses cover the
//! cells whose centers fall inside the inscribed diamond mask, the
//! square-grid analogue of the rounded hex footprint (a 3x3 ellipse is a
//! plus shape). The paired shape variants differ only on hex grids; on a
//! square grid they cover the same cells.

use super::GridOffset;
use crate::core::types::TokenShape;

/// Cells covered by a footprint, relative to the top-left anchor cell
pub fn compute_offsets(shape: TokenShape, width: f64, height: f64) -> Vec<GridOffset> {
    let w = width.ceil().max(1.0) as i32;
    let h = height.ceil().max(1.0) as i32;

    if shape.is_rectangle() || (w <= 2 && h <= 2) {
        return rectangle_offsets(w, h);
    }
    ellipse_offsets(w, h)
}

fn rectangle_offsets(w: i32, h: i32) -> Vec<GridOffset> {
    let mut offsets = Vec::with_capacity((w * h) as usize);
    for i in 0..h {
        for j in 0..w {
            offsets.push(GridOffset::new(i, j));
        }
    }
    offsets
}

fn ellipse_offsets(w: i32, h: i32) -> Vec<GridOffset> {
    let rx = w as f64 / 2.0;
    let ry = h as f64 / 2.0;
    let mut offsets = Vec::new();
    for i in 0..h {
        for j in 0..w {
            let dx = (j as f64 + 0.5 - rx) / rx;
            let dy = (i as f64 + 0.5 - ry) / ry;
            if dx.abs() + dy.abs() <= 1.0 + 1e-9 {
                offsets.push(GridOffset::new(i, j));
            }
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cell() {
        assert_eq!(
            compute_offsets(TokenShape::Rectangle1, 1.0, 1.0),
            vec![GridOffset::new(0, 0)]
        );
    }

    #[test]
    fn test_rectangle_two_by_two() {
        let offsets = compute_offsets(TokenShape::Rectangle1, 2.0, 2.0);
        assert_eq!(offsets.len(), 4);
    }

    #[test]
    fn test_fractional_size_rounds_up() {
        let offsets = compute_offsets(TokenShape::Rectangle1, 1.5, 1.0);
        assert_eq!(offsets.len(), 2);
    }

    #[test]
    fn test_small_ellipse_equals_rectangle() {
        // Up to 2x2 the ellipse mask degenerates to the full box
        let offsets = compute_offsets(TokenShape::Ellipse1, 2.0, 2.0);
        assert_eq!(offsets.len(), 4);
    }

    #[test]
    fn test_large_ellipse_drops_corners() {
        let offsets = compute_offsets(TokenShape::Ellipse1, 3.0, 3.0);
        assert_eq!(offsets.len(), 5);
        assert!(!offsets.contains(&GridOffset::new(0, 0)));
        assert!(offsets.contains(&GridOffset::new(1, 1)));
        assert!(offsets.contains(&GridOffset::new(0, 1)));
    }

    #[test]
    fn test_ellipse_variants_agree_on_square_grids() {
        let a = compute_offsets(TokenShape::Ellipse1, 3.0, 3.0);
        let b = compute_offsets(TokenShape::Ellipse2, 3.0, 3.0);
        assert_eq!(a, b);
    }
}

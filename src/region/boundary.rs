//! Region containment oracle
//!
//! A region boundary is a polygon extruded through an elevation band. The
//! oracle answers point containment and segmentizes a movement path into
//! move/enter/exit pieces; boundary crossings are located by scanning the
//! segment at a fixed sample resolution and bisecting each sign change down
//! to a sub-pixel tolerance.

use geo::{Intersects, LineString, Point, Polygon};
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// One point of a path being segmentized, in token-position space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub point: DVec2,
    pub elevation: f64,
}

impl PathPoint {
    pub fn new(point: DVec2, elevation: f64) -> Self {
        Self { point, elevation }
    }

    fn lerp(&self, other: &PathPoint, t: f64) -> PathPoint {
        PathPoint {
            point: self.point.lerp(other.point, t),
            elevation: self.elevation + (other.elevation - self.elevation) * t,
        }
    }
}

/// Kind of a segmentized piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSegmentKind {
    /// Travel strictly inside the region
    Move,
    /// Boundary crossing from outside to inside (zero length)
    Enter,
    /// Boundary crossing from inside to outside (zero length)
    Exit,
}

/// One piece of a segmentized movement path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionMovementSegment {
    pub kind: RegionSegmentKind,
    pub from: PathPoint,
    pub to: PathPoint,
}

/// A polygonal region boundary with an elevation band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionBoundary {
    exterior: Vec<(f64, f64)>,
    pub bottom: f64,
    pub top: f64,
    #[serde(skip, default)]
    polygon: Option<Polygon<f64>>,
}

impl RegionBoundary {
    pub fn from_points(points: &[(f64, f64)], bottom: f64, top: f64) -> Self {
        let mut boundary = Self {
            exterior: points.to_vec(),
            bottom,
            top,
            polygon: None,
        };
        boundary.polygon = Some(boundary.build_polygon());
        boundary
    }

    fn build_polygon(&self) -> Polygon<f64> {
        Polygon::new(LineString::from(self.exterior.clone()), vec![])
    }

    /// Point containment, elevation band included; boundary points count
    /// as inside, so a token standing on a checkpoint crossing is contained
    pub fn test_point(&self, point: DVec2, elevation: f64) -> bool {
        if elevation < self.bottom || elevation > self.top {
            return false;
        }
        let point = Point::new(point.x, point.y);
        match &self.polygon {
            Some(p) => p.intersects(&point),
            // Deserialized boundaries rebuild on demand
            None => self.build_polygon().intersects(&point),
        }
    }

    /// Whether a token at `position` with the given footprint sample offsets
    /// is inside: any sample point inside counts
    pub fn test_samples(&self, position: &PathPoint, samples: &[DVec2]) -> bool {
        samples
            .iter()
            .any(|s| self.test_point(position.point + *s, position.elevation))
    }

    /// Segmentize a movement path into move/enter/exit pieces
    ///
    /// `sample_step` is the pixel distance between containment probes along
    /// a segment; `tolerance` the bisection precision of crossing points.
    pub fn segmentize_movement_path(
        &self,
        path: &[PathPoint],
        samples: &[DVec2],
        sample_step: f64,
        tolerance: f64,
    ) -> Vec<RegionMovementSegment> {
        let mut segments = Vec::new();

        for pair in path.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let length = (b.point - a.point).length().max((b.elevation - a.elevation).abs());
            let probes = ((length / sample_step).ceil() as usize).max(1);

            let mut inside = self.test_samples(a, samples);
            let mut piece_start = *a;
            let mut t_prev = 0.0;

            for p in 1..=probes {
                let t = p as f64 / probes as f64;
                let probe = a.lerp(b, t);
                let probe_inside = self.test_samples(&probe, samples);
                if probe_inside == inside {
                    t_prev = t;
                    continue;
                }

                // Bisect [t_prev, t] down to the crossing
                let t_cross = self.bisect(a, b, samples, t_prev, t, inside, tolerance);
                let crossing = a.lerp(b, t_cross);

                if inside {
                    segments.push(RegionMovementSegment {
                        kind: RegionSegmentKind::Move,
                        from: piece_start,
                        to: crossing,
                    });
                    segments.push(RegionMovementSegment {
                        kind: RegionSegmentKind::Exit,
                        from: crossing,
                        to: crossing,
                    });
                } else {
                    segments.push(RegionMovementSegment {
                        kind: RegionSegmentKind::Enter,
                        from: crossing,
                        to: crossing,
                    });
                }

                inside = probe_inside;
                piece_start = crossing;
                t_prev = t;
            }

            if inside {
                segments.push(RegionMovementSegment {
                    kind: RegionSegmentKind::Move,
                    from: piece_start,
                    to: *b,
                });
            }
        }

        segments
    }

    fn bisect(
        &self,
        a: &PathPoint,
        b: &PathPoint,
        samples: &[DVec2],
        mut lo: f64,
        mut hi: f64,
        lo_inside: bool,
        tolerance: f64,
    ) -> f64 {
        let span = (b.point - a.point).length().max(1.0);
        while (hi - lo) * span > tolerance {
            let mid = (lo + hi) / 2.0;
            let mid_inside = self.test_samples(&a.lerp(b, mid), samples);
            if mid_inside == lo_inside {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi
    }
}

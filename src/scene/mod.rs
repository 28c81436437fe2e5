//! Scene document: canvas dimensions and grid configuration

use crate::grid::{DiagonalRule, GridMeasure, Gridless, SquareGrid};
use serde::{Deserialize, Serialize};

/// Grid family of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    Square,
    Gridless,
}

/// A scene document
///
/// `grid_size` pixels represent `grid_distance` distance units; the ratio
/// is the pixels-per-unit factor used to weight elevation against planar
/// movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    /// Canvas width in pixels
    pub width: f64,
    /// Canvas height in pixels
    pub height: f64,
    pub grid_kind: GridKind,
    pub grid_size: f64,
    pub grid_distance: f64,
    pub diagonals: DiagonalRule,
}

impl Scene {
    pub fn new(name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            grid_kind: GridKind::Square,
            grid_size: 100.0,
            grid_distance: 5.0,
            diagonals: DiagonalRule::default(),
        }
    }

    pub fn gridless(mut self) -> Self {
        self.grid_kind = GridKind::Gridless;
        self
    }

    pub fn with_grid(mut self, size: f64, distance: f64) -> Self {
        self.grid_size = size;
        self.grid_distance = distance;
        self
    }

    pub fn with_diagonals(mut self, diagonals: DiagonalRule) -> Self {
        self.diagonals = diagonals;
        self
    }

    /// Pixels per distance unit
    pub fn pixels_per_unit(&self) -> f64 {
        self.grid_size / self.grid_distance
    }

    /// Build the measurement service for this scene's grid
    pub fn build_grid(&self) -> Box<dyn GridMeasure> {
        match self.grid_kind {
            GridKind::Square => Box::new(
                SquareGrid::new(self.grid_size, self.grid_distance)
                    .with_diagonals(self.diagonals),
            ),
            GridKind::Gridless => Box::new(Gridless::new(self.grid_size, self.grid_distance)),
        }
    }
}

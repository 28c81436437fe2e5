//! Movement core configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

use serde::Deserialize;

/// Configuration for the movement and region-event systems
///
/// These values have been tuned against typical scene scales (100px cells,
/// 5 distance units per cell). Changing them affects checkpoint placement
/// precision and turn-order behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === MOVEMENT ===
    /// Movement action assumed when a waypoint omits one and no previous
    /// waypoint supplies it
    ///
    /// Must name a key of the movement-action registry.
    pub default_action: String,

    /// Maximum recorded movement-history waypoints retained per token
    ///
    /// Oldest entries are dropped first. At 0 the history is unbounded,
    /// which is safe because history is cleared when combat ends.
    pub history_limit: usize,

    // === REGION BOUNDARY DETECTION ===
    /// Containment samples per grid cell of segment length when scanning a
    /// movement segment for boundary crossings
    ///
    /// Higher values catch narrower region slivers at the cost of more
    /// point-in-polygon tests. At 4, a sliver narrower than a quarter cell
    /// can be stepped over.
    pub segmentize_samples_per_cell: u32,

    /// Bisection tolerance for locating a boundary crossing (pixels)
    ///
    /// Crossing positions are rounded to integer pixels afterwards, so
    /// anything below 0.5 only buys determinism, not visible precision.
    pub crossing_tolerance: f64,

    // === COMBAT ===
    /// Whether advancing past a deleted active combatant skips defeated
    /// survivors when picking the replacement turn holder
    pub skip_defeated: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_action: "walk".into(),
            history_limit: 0,
            segmentize_samples_per_cell: 4,
            crossing_tolerance: 0.1,
            skip_defeated: true,
        }
    }
}

impl Settings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.default_action.is_empty() {
            return Err("default_action must not be empty".into());
        }

        if self.segmentize_samples_per_cell == 0 {
            return Err("segmentize_samples_per_cell must be at least 1".into());
        }

        // Sub-pixel tolerance is required: crossings round to integer pixels
        if !(self.crossing_tolerance > 0.0 && self.crossing_tolerance <= 0.5) {
            return Err(format!(
                "crossing_tolerance ({}) must be in (0, 0.5]",
                self.crossing_tolerance
            ));
        }

        Ok(())
    }
}

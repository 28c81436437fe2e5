//! Movement action profiles and registry
//!
//! Every waypoint names a movement action. The profile decides whether the
//! action teleports (no intermediate interpolation, no obstacle constraint)
//! and whether it is measured at all. The registry ships the built-in
//! actions and can be extended at runtime or from TOML definitions.

use crate::core::error::{Result, TabletopError};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Profile of one movement action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionProfile {
    /// Display label
    pub label: String,
    /// Teleporting actions skip intermediate interpolation and obstacle
    /// constraint
    #[serde(default)]
    pub teleport: bool,
    /// Unmeasured actions contribute nothing to distance or cost
    #[serde(default = "default_true")]
    pub measure: bool,
}

fn default_true() -> bool {
    true
}

impl ActionProfile {
    pub fn walking(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            teleport: false,
            measure: true,
        }
    }
}

/// Registry of movement actions keyed by name
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    actions: AHashMap<String, ActionProfile>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            actions: AHashMap::new(),
        }
    }

    /// The built-in action set
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for key in ["walk", "fly", "swim", "climb", "crawl", "burrow", "jump"] {
            registry.register(key, ActionProfile::walking(key));
        }
        registry.register(
            "blink",
            ActionProfile {
                label: "blink".into(),
                teleport: true,
                measure: true,
            },
        );
        registry.register(
            "displace",
            ActionProfile {
                label: "displace".into(),
                teleport: true,
                measure: false,
            },
        );
        registry
    }

    /// Register or replace an action profile
    pub fn register(&mut self, key: impl Into<String>, profile: ActionProfile) {
        self.actions.insert(key.into(), profile);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.actions.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ActionProfile> {
        self.actions.get(key)
    }

    /// Look up an action, erroring on unknown keys
    pub fn require(&self, key: &str) -> Result<&ActionProfile> {
        self.actions
            .get(key)
            .ok_or_else(|| TabletopError::UnknownAction(key.to_string()))
    }

    /// Whether the waypoint action (absent on resize pseudo-waypoints)
    /// teleports
    pub fn is_teleport(&self, action: Option<&str>) -> bool {
        action
            .and_then(|a| self.actions.get(a))
            .map(|p| p.teleport)
            .unwrap_or(false)
    }

    /// Whether the waypoint action is measured; resize pseudo-waypoints
    /// (no action) are not
    pub fn is_measured(&self, action: Option<&str>) -> bool {
        action
            .and_then(|a| self.actions.get(a))
            .map(|p| p.measure)
            .unwrap_or(false)
    }

    /// Load additional action definitions from a TOML table of profiles
    pub fn load_toml_str(&mut self, content: &str) -> Result<usize> {
        let parsed: AHashMap<String, ActionProfile> = toml::from_str(content)
            .map_err(|e| TabletopError::ActionRegistryParse(e.to_string()))?;
        let count = parsed.len();
        for (key, profile) in parsed {
            self.actions.insert(key, profile);
        }
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_actions() {
        let registry = ActionRegistry::builtin();
        assert!(registry.contains("walk"));
        assert!(registry.contains("fly"));
        assert!(registry.contains("displace"));
        assert!(!registry.contains("moonwalk"));
    }

    #[test]
    fn test_teleport_profiles() {
        let registry = ActionRegistry::builtin();
        assert!(!registry.is_teleport(Some("walk")));
        assert!(registry.is_teleport(Some("blink")));
        assert!(registry.is_teleport(Some("displace")));
    }

    #[test]
    fn test_measure_profiles() {
        let registry = ActionRegistry::builtin();
        assert!(registry.is_measured(Some("walk")));
        assert!(registry.is_measured(Some("blink")));
        assert!(!registry.is_measured(Some("displace")));
        // Resize pseudo-waypoints carry no action and are never measured
        assert!(!registry.is_measured(None));
    }

    #[test]
    fn test_require_unknown_errors() {
        let registry = ActionRegistry::builtin();
        assert!(matches!(
            registry.require("teleport-spam"),
            Err(TabletopError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_load_toml() {
        let mut registry = ActionRegistry::builtin();
        let count = registry
            .load_toml_str(
                r#"
                [phase]
                label = "Phase Step"
                teleport = true

                [slither]
                label = "Slither"
                "#,
            )
            .unwrap();
        assert_eq!(count, 2);
        assert!(registry.is_teleport(Some("phase")));
        assert!(registry.is_measured(Some("slither")));
    }

    #[test]
    fn test_load_toml_rejects_garbage() {
        let mut registry = ActionRegistry::builtin();
        assert!(matches!(
            registry.load_toml_str("not [valid"),
            Err(TabletopError::ActionRegistryParse(_))
        ));
    }
}

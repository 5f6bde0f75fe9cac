//! Controller configuration with defaults and RON loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        DEFAULT_MAX_SUBSTEPS, DEFAULT_RADIUS, DEFAULT_SCRATCH_LAYER, MAX_PUSHBACK_ITERATIONS,
    },
    error::ConfigError,
    layers::{Layer, LayerMask, QueryFilter, TriggerPolicy},
    sphere::CollisionSphere,
    surface::SurfaceType,
    types::ColliderId,
};

/// How `Controller::update` splits a host frame into ticks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Timestep {
    /// One tick per frame, with the frame's delta.
    #[default]
    Variable,
    /// Whole fixed steps, then one partial step for the remainder.
    Fixed { updates_per_second: u32 },
}

impl Timestep {
    /// Length of one fixed step, or `None` for the variable timestep.
    pub fn fixed_delta(&self) -> Option<f32> {
        match *self {
            Timestep::Variable => None,
            Timestep::Fixed { updates_per_second } if updates_per_second > 0 => {
                Some(1.0 / updates_per_second as f32)
            }
            Timestep::Fixed { .. } => None,
        }
    }
}

/// Per-controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub timestep: Timestep,
    /// Upper bound on fixed steps run for one frame. Excess time is dropped.
    pub max_substeps: u32,
    /// Radius shared by every collision sphere (meters).
    pub radius: f32,
    /// Sphere layout, bottom to top. Needs one feet and one head sphere.
    pub spheres: Vec<CollisionSphere>,
    /// Layers the controller stands on and collides with.
    pub walkable: LayerMask,
    pub trigger_interaction: TriggerPolicy,
    /// Layer colliders are parked on while they must be ignored or singled out.
    pub scratch_layer: Layer,
    /// Extra pushback passes after the first.
    pub max_pushback_depth: u32,
    /// Follow the ground or platform the controller is clamped to when it moves.
    pub clamp_to_moving_ground: bool,
    /// The controller's own body collider, ignored by every query.
    pub own_collider: Option<ColliderId>,
    /// Surface used for colliders without their own.
    pub default_surface: SurfaceType,
    pub debug: DebugConfig,
}

/// Diagnostic logging switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Trace every ground hit after each tick.
    pub grounding: bool,
    /// Log every pushback contact.
    pub pushback: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let mut walkable = LayerMask::ALL;
        walkable.remove(DEFAULT_SCRATCH_LAYER);

        Self {
            timestep: Timestep::Variable,
            max_substeps: DEFAULT_MAX_SUBSTEPS,
            radius: DEFAULT_RADIUS,
            spheres: vec![
                CollisionSphere::new(0.5, true, false),
                CollisionSphere::new(1.0, false, false),
                CollisionSphere::new(1.5, false, true),
            ],
            walkable,
            trigger_interaction: TriggerPolicy::Ignore,
            scratch_layer: DEFAULT_SCRATCH_LAYER,
            max_pushback_depth: MAX_PUSHBACK_ITERATIONS,
            clamp_to_moving_ground: false,
            own_collider: None,
            default_surface: SurfaceType::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Load and validate a config from a RON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config = Self::from_ron(&contents)?;
        log::info!("Loaded controller config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a config from RON text.
    pub fn from_ron(contents: &str) -> Result<Self, ConfigError> {
        let config: ControllerConfig = ron::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.spheres.iter().any(|s| s.is_feet) {
            return Err(ConfigError::MissingFeet);
        }
        if !self.spheres.iter().any(|s| s.is_head) {
            return Err(ConfigError::MissingHead);
        }
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(ConfigError::NonPositiveRadius(self.radius));
        }
        if matches!(self.timestep, Timestep::Fixed { updates_per_second: 0 }) {
            return Err(ConfigError::ZeroUpdateRate);
        }
        if self.walkable.contains(self.scratch_layer) {
            return Err(ConfigError::ScratchLayerWalkable(self.scratch_layer));
        }
        Ok(())
    }

    /// Filter for walkable-layer queries.
    pub fn walkable_filter(&self) -> QueryFilter {
        QueryFilter::new(self.walkable, self.trigger_interaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ControllerConfig::default();
        config.validate().unwrap();
        assert!(!config.walkable.contains(config.scratch_layer));
        assert_eq!(config.spheres.len(), 3);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config = ControllerConfig::from_ron("(radius: 0.4, timestep: Fixed(updates_per_second: 50))")
            .unwrap();
        assert_eq!(config.radius, 0.4);
        assert_eq!(config.timestep, Timestep::Fixed { updates_per_second: 50 });
        assert_eq!(config.timestep.fixed_delta(), Some(0.02));
        assert_eq!(config.spheres, ControllerConfig::default().spheres);
        assert_eq!(config.default_surface, SurfaceType::default());
    }

    #[test]
    fn parses_layout_masks_and_surface() {
        let text = r#"
            // Two-sphere body on layers 0 and 2.
            (
                spheres: [
                    (offset: 0.5, is_feet: true),
                    (offset: 1.3, is_head: true),
                ],
                walkable: 5,
                trigger_interaction: Collide,
                scratch_layer: 30,
                own_collider: Some(7),
                default_surface: (stand_angle: 45.0),
                debug: (grounding: true),
            )
        "#;
        let config = ControllerConfig::from_ron(text).unwrap();

        assert_eq!(config.spheres[1], CollisionSphere::new(1.3, false, true));
        assert!(config.walkable.contains(Layer(0)));
        assert!(config.walkable.contains(Layer(2)));
        assert!(!config.walkable.contains(Layer(1)));
        assert_eq!(config.trigger_interaction, TriggerPolicy::Collide);
        assert_eq!(config.scratch_layer, Layer(30));
        assert_eq!(config.own_collider, Some(ColliderId(7)));
        assert_eq!(config.default_surface, SurfaceType::new(45.0, 80.0));
        assert!(config.debug.grounding && !config.debug.pushback);
    }

    #[test]
    fn validation_rejects_bad_configs() {
        let no_head = "(spheres: [(offset: 0.5, is_feet: true)])";
        assert!(matches!(
            ControllerConfig::from_ron(no_head),
            Err(ConfigError::MissingHead)
        ));

        let no_feet = "(spheres: [(offset: 1.5, is_head: true)])";
        assert!(matches!(
            ControllerConfig::from_ron(no_feet),
            Err(ConfigError::MissingFeet)
        ));

        assert!(matches!(
            ControllerConfig::from_ron("(radius: 0.0)"),
            Err(ConfigError::NonPositiveRadius(_))
        ));

        assert!(matches!(
            ControllerConfig::from_ron("(timestep: Fixed(updates_per_second: 0))"),
            Err(ConfigError::ZeroUpdateRate)
        ));

        assert!(matches!(
            ControllerConfig::from_ron("(walkable: 4294967295)"),
            Err(ConfigError::ScratchLayerWalkable(Layer(31)))
        ));
    }

    #[test]
    fn invalid_ron_is_a_parse_error() {
        assert!(matches!(
            ControllerConfig::from_ron("{{not valid}}"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.ron");
        std::fs::write(&path, "(radius: 0.35, clamp_to_moving_ground: true)").unwrap();

        let config = ControllerConfig::load(&path).unwrap();
        assert_eq!(config.radius, 0.35);
        assert!(config.clamp_to_moving_ground);

        assert!(matches!(
            ControllerConfig::load(&dir.path().join("missing.ron")),
            Err(ConfigError::Read(_))
        ));
    }

    #[test]
    fn default_round_trips_through_ron() {
        let config = ControllerConfig::default();
        let text = ron::to_string(&config).unwrap();
        assert_eq!(ControllerConfig::from_ron(&text).unwrap(), config);
    }
}

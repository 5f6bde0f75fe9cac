//! Error types for the controller.

use thiserror::Error;

use crate::{layers::Layer, types::Point3};

/// Errors returned while building or ticking a controller.
#[derive(Debug, Error)]
pub enum KccError {
    /// No ground could be found below the controller, not even by a plain raycast.
    #[error("controller at {position} escaped the level: nothing below it")]
    EscapedLevel { position: Point3 },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid or unreadable controller configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sphere layout has no feet sphere")]
    MissingFeet,

    #[error("sphere layout has no head sphere")]
    MissingHead,

    #[error("radius must be positive, got {0}")]
    NonPositiveRadius(f32),

    #[error("fixed timestep needs a non-zero update rate")]
    ZeroUpdateRate,

    #[error("walkable mask includes the scratch layer {0:?}")]
    ScratchLayerWalkable(Layer),

    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] ron::error::SpannedError),
}

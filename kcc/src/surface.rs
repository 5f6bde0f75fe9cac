//! Per-surface walkability properties.
//!
//! A collider may carry a [`SurfaceType`]; colliders without one fall back to the
//! controller's configured default.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SLOPE_LIMIT_DEG, DEFAULT_STAND_ANGLE_DEG};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceType {
    /// Maximum angle (degrees) between the surface normal and up that still counts as ground.
    pub stand_angle: f32,
    /// Angle (degrees) above which the controller is stopped from climbing further.
    pub slope_limit: f32,
}

impl SurfaceType {
    pub const fn new(stand_angle: f32, slope_limit: f32) -> Self {
        Self {
            stand_angle,
            slope_limit,
        }
    }

    /// Resolve an optional per-collider surface against a shared default.
    #[inline]
    pub fn or_default(surface: Option<SurfaceType>, default: SurfaceType) -> SurfaceType {
        surface.unwrap_or(default)
    }
}

impl Default for SurfaceType {
    fn default() -> Self {
        Self::new(DEFAULT_STAND_ANGLE_DEG, DEFAULT_SLOPE_LIMIT_DEG)
    }
}

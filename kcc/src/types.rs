/*!
Core math aliases and query result types shared by the controller submodules.

This module intentionally contains no algorithms. It defines the data exchanged between:
- the physics world contract (`world`) and its in-memory implementation (`query_world`)
- ground probing (`ground`)
- pushback resolution (`pushback`)
- the tick loop (`controller`)
*/

use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Point3 = na::Point3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// Stable identity of a collider inside a physics world.
///
/// Ids are assigned by the world on insertion and never reused while the world lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColliderId(pub u32);

/// A single hit returned by a ray cast or a shape cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Collider that was hit.
    pub collider: ColliderId,
    /// World-space contact point on the hit surface.
    pub point: Point3,
    /// World-space outward surface normal at `point` (unit length).
    pub normal: Vec3,
    /// Distance travelled along the cast direction until contact (meters).
    pub distance: f32,
}

/// A rigid transform (isometry) in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::identity())
    }

    /// Convert to nalgebra `Isometry3` for use with parry queries.
    #[inline]
    pub fn iso(&self) -> Iso {
        Iso::from_parts(na::Translation3::from(self.translation), self.rotation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::zeros())
    }
}

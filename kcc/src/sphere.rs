//! The stack of collision spheres that stands in for the character's body.

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    types::{Point3, Vec3},
};

/// One sphere of the stack, placed `offset` meters up from the controller's base.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionSphere {
    pub offset: f32,
    #[serde(default)]
    pub is_feet: bool,
    #[serde(default)]
    pub is_head: bool,
}

impl CollisionSphere {
    pub const fn new(offset: f32, is_feet: bool, is_head: bool) -> Self {
        Self {
            offset,
            is_feet,
            is_head,
        }
    }

    /// World-space centre for a controller whose base is at `base`.
    ///
    /// Offsets of every sphere but the feet scale with `height_scale`.
    #[inline]
    pub fn position(&self, base: Point3, up: Vec3, height_scale: f32) -> Point3 {
        if self.is_feet {
            base + up * self.offset
        } else {
            base + up * (self.offset * height_scale)
        }
    }
}

/// Ordered, fixed sphere layout with one designated feet and one designated head sphere.
///
/// When several spheres carry the same flag, the last one wins.
#[derive(Clone, Debug, PartialEq)]
pub struct SphereSet {
    spheres: Vec<CollisionSphere>,
    feet: usize,
    head: usize,
}

impl SphereSet {
    pub fn new(spheres: Vec<CollisionSphere>) -> Result<Self, ConfigError> {
        let feet = spheres
            .iter()
            .rposition(|s| s.is_feet)
            .ok_or(ConfigError::MissingFeet)?;
        let head = spheres
            .iter()
            .rposition(|s| s.is_head)
            .ok_or(ConfigError::MissingHead)?;
        Ok(Self {
            spheres,
            feet,
            head,
        })
    }

    pub fn feet(&self) -> &CollisionSphere {
        &self.spheres[self.feet]
    }

    pub fn head(&self) -> &CollisionSphere {
        &self.spheres[self.head]
    }

    pub fn feet_index(&self) -> usize {
        self.feet
    }

    pub fn head_index(&self) -> usize {
        self.head
    }

    pub fn get(&self, index: usize) -> Option<&CollisionSphere> {
        self.spheres.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionSphere> {
        self.spheres.iter()
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }
}

impl Default for SphereSet {
    /// Feet at 0.5, a mid sphere at 1.0, head at 1.5.
    fn default() -> Self {
        Self {
            spheres: vec![
                CollisionSphere::new(0.5, true, false),
                CollisionSphere::new(1.0, false, false),
                CollisionSphere::new(1.5, false, true),
            ],
            feet: 0,
            head: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn requires_feet_and_head() {
        let no_feet = vec![CollisionSphere::new(1.5, false, true)];
        assert!(matches!(SphereSet::new(no_feet), Err(ConfigError::MissingFeet)));

        let no_head = vec![CollisionSphere::new(0.5, true, false)];
        assert!(matches!(SphereSet::new(no_head), Err(ConfigError::MissingHead)));
    }

    #[test]
    fn last_flagged_sphere_wins() {
        let set = SphereSet::new(vec![
            CollisionSphere::new(0.5, true, false),
            CollisionSphere::new(0.7, true, false),
            CollisionSphere::new(1.5, false, true),
        ])
        .unwrap();
        assert_eq!(set.feet_index(), 1);
        assert_eq!(set.feet().offset, 0.7);
        assert_eq!(set.head_index(), 2);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn a_single_sphere_can_be_feet_and_head() {
        let set = SphereSet::new(vec![CollisionSphere::new(0.5, true, true)]).unwrap();
        assert_eq!(set.feet_index(), set.head_index());
    }

    #[test]
    fn position_scales_all_but_feet() {
        let base = Point3::new(1.0, 2.0, 3.0);
        let up = Vec3::y();
        let feet = CollisionSphere::new(0.5, true, false);
        let head = CollisionSphere::new(1.5, false, true);

        assert_relative_eq!(feet.position(base, up, 2.0), Point3::new(1.0, 2.5, 3.0));
        assert_relative_eq!(head.position(base, up, 2.0), Point3::new(1.0, 5.0, 3.0));
        assert_relative_eq!(head.position(base, -up, 1.0), Point3::new(1.0, 0.5, 3.0));
    }
}

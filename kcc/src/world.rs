//! The physics world contract the controller runs its queries against.
//!
//! The controller never assumes a specific engine. Anything that can answer these queries
//! (the in-crate [`crate::QueryWorld`], or an adapter over a host engine) can drive it.
//!
//! Conventions
//! - Cast directions need not be normalized; implementations normalize them and report
//!   `distance` in meters along the normalized direction.
//! - Casts ignore colliders that already contain the cast origin (rays) or overlap the cast
//!   shape at its start (sphere/capsule casts). Such colliders cannot be "hit" by moving
//!   away from inside them.
//! - Every query honours the given [`QueryFilter`].

use crate::{
    layers::{Layer, QueryFilter},
    surface::SurfaceType,
    types::{ColliderId, Point3, RayHit, Vec3},
};

pub trait PhysicsWorld {
    /// Closest hit of a ray from `origin` along `direction` within `max_distance`.
    fn ray_cast(
        &self,
        origin: Point3,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<RayHit>;

    /// Closest hit of a sphere swept from `origin` along `direction` within `max_distance`.
    ///
    /// `distance` is how far the sphere centre travelled; `point` is the contact point on the
    /// hit surface.
    fn sphere_cast(
        &self,
        origin: Point3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<RayHit>;

    /// Closest hit of a capsule with segment `a..b` swept along `direction`.
    fn capsule_cast(
        &self,
        a: Point3,
        b: Point3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<RayHit>;

    /// Every collider intersecting the sphere, in a stable order.
    fn overlap_sphere(&self, center: Point3, radius: f32, filter: QueryFilter) -> Vec<ColliderId>;

    /// Closest point on the surface of `collider` to `center`.
    ///
    /// Returns `None` if the collider is unknown or the point can't be computed for its shape.
    /// `radius` is the radius of the querying sphere; implementations may use it to bound the
    /// search.
    fn closest_point_on_surface(
        &self,
        collider: ColliderId,
        center: Point3,
        radius: f32,
    ) -> Option<Point3>;

    /// Current layer of `collider`, or `None` if it doesn't exist.
    fn layer(&self, collider: ColliderId) -> Option<Layer>;

    /// Move `collider` onto `layer`. Unknown colliders are ignored.
    fn set_layer(&mut self, collider: ColliderId, layer: Layer);

    /// World-space translation of `collider`, used to follow moving platforms.
    fn collider_translation(&self, collider: ColliderId) -> Option<Vec3>;

    /// Surface properties attached to `collider`, if any.
    fn surface(&self, _collider: ColliderId) -> Option<SurfaceType> {
        None
    }
}

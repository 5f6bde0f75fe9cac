//! In-memory collider set answering the controller's physics queries.
//!
//! Colliders are parry shapes (re-exported through `rapier3d`) with a pose, a layer, a trigger
//! flag, and an optional [`SurfaceType`]. Every query walks the collider list in insertion
//! order, so results are deterministic for a given scene.
//!
//! Conventions
//! - Units are meters.
//! - Rotation is a unit quaternion.
//! - Planes are half-spaces whose outward normal is `rotation * +Y`, placed
//!   `offset_along_normal` along that normal from the translation.
//! - Ray casts are solid: a ray starting inside a collider reports a hit at distance zero, which
//!   the world contract discards.

// Re-export parry so hosts can build their own shapes against the same version.
pub use rapier3d::parry;

use log::trace;
use nalgebra as na;
use rapier3d::parry::{
    query::{self, Ray, ShapeCastOptions},
    shape::{Ball, Capsule, HalfSpace, Shape, SharedShape},
};

use crate::{
    constants::DIST_EPS,
    layers::{Layer, QueryFilter},
    surface::SurfaceType,
    types::{ColliderId, Iso, Point3, Quat, RayHit, Transform, Vec3},
    world::PhysicsWorld,
};

/// Supported collider shapes.
#[derive(Clone, Debug, PartialEq)]
pub enum ColliderShapeDef {
    /// Infinite plane (half-space), solid below.
    Plane {
        /// Offset along the plane normal (meters).
        offset_along_normal: f32,
    },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vec3 },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },

    /// Y-aligned capsule (meters).
    CapsuleY { radius: f32, half_height: f32 },

    /// Y-aligned cylinder (meters).
    CylinderY { radius: f32, half_height: f32 },

    /// Rounded cuboid (meters).
    ///
    /// `border_radius` rounds all edges/corners.
    RoundCuboid {
        half_extents: Vec3,
        border_radius: f32,
    },
}

impl ColliderShapeDef {
    fn build(&self) -> (SharedShape, Iso) {
        match *self {
            ColliderShapeDef::Plane {
                offset_along_normal,
            } => (
                SharedShape::new(HalfSpace::new(Vec3::y_axis())),
                Iso::translation(0.0, offset_along_normal, 0.0),
            ),
            ColliderShapeDef::Cuboid { half_extents } => (
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z),
                Iso::identity(),
            ),
            ColliderShapeDef::Sphere { radius } => (SharedShape::ball(radius), Iso::identity()),
            ColliderShapeDef::CapsuleY {
                radius,
                half_height,
            } => (SharedShape::capsule_y(half_height, radius), Iso::identity()),
            ColliderShapeDef::CylinderY {
                radius,
                half_height,
            } => (SharedShape::cylinder(half_height, radius), Iso::identity()),
            ColliderShapeDef::RoundCuboid {
                half_extents,
                border_radius,
            } => (
                SharedShape::round_cuboid(
                    half_extents.x,
                    half_extents.y,
                    half_extents.z,
                    border_radius,
                ),
                Iso::identity(),
            ),
        }
    }
}

/// Definition of a collider to insert into a [`QueryWorld`].
#[derive(Clone, Debug, PartialEq)]
pub struct ColliderDef {
    pub shape: ColliderShapeDef,
    pub transform: Transform,
    pub layer: Layer,
    pub is_trigger: bool,
    pub surface: Option<SurfaceType>,
}

impl ColliderDef {
    pub fn new(shape: ColliderShapeDef) -> Self {
        Self {
            shape,
            transform: Transform::default(),
            layer: Layer::DEFAULT,
            is_trigger: false,
            surface: None,
        }
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.transform.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.transform.rotation = rotation;
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_surface(mut self, surface: SurfaceType) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }
}

struct WorldCollider {
    id: ColliderId,
    shape: SharedShape,
    /// Offset of the shape inside its transform (non-identity for planes).
    local: Iso,
    transform: Transform,
    layer: Layer,
    is_trigger: bool,
    surface: Option<SurfaceType>,
}

impl WorldCollider {
    #[inline]
    fn pose(&self) -> Iso {
        self.transform.iso() * self.local
    }
}

/// Collider set with linear-scan queries.
#[derive(Default)]
pub struct QueryWorld {
    colliders: Vec<WorldCollider>,
}

impl QueryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a collider and return its id. Ids follow insertion order.
    pub fn insert(&mut self, def: ColliderDef) -> ColliderId {
        let id = ColliderId(self.colliders.len() as u32);
        let (shape, local) = def.shape.build();
        self.colliders.push(WorldCollider {
            id,
            shape,
            local,
            transform: def.transform,
            layer: def.layer,
            is_trigger: def.is_trigger,
            surface: def.surface,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Move a collider (e.g. a platform). Unknown ids are ignored.
    pub fn set_translation(&mut self, collider: ColliderId, translation: Vec3) {
        if let Some(c) = self.get_mut(collider) {
            c.transform.translation = translation;
        }
    }

    pub fn set_rotation(&mut self, collider: ColliderId, rotation: Quat) {
        if let Some(c) = self.get_mut(collider) {
            c.transform.rotation = rotation;
        }
    }

    pub fn set_trigger(&mut self, collider: ColliderId, is_trigger: bool) {
        if let Some(c) = self.get_mut(collider) {
            c.is_trigger = is_trigger;
        }
    }

    pub fn set_surface(&mut self, collider: ColliderId, surface: Option<SurfaceType>) {
        if let Some(c) = self.get_mut(collider) {
            c.surface = surface;
        }
    }

    fn get(&self, id: ColliderId) -> Option<&WorldCollider> {
        self.colliders.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: ColliderId) -> Option<&mut WorldCollider> {
        self.colliders.get_mut(id.0 as usize)
    }

    fn candidates(&self, filter: QueryFilter) -> impl Iterator<Item = &WorldCollider> {
        self.colliders
            .iter()
            .filter(move |c| filter.accepts(c.layer, c.is_trigger))
    }

    /// Sweep `shape` from `pose` along unit `dir` and keep the closest hit with positive distance.
    fn closest_shape_cast(
        &self,
        pose: &Iso,
        shape: &dyn Shape,
        dir: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for collider in self.candidates(filter) {
            let collider_pose = collider.pose();
            let options = ShapeCastOptions::with_max_time_of_impact(max_distance);
            let hit = match query::cast_shapes(
                pose,
                &dir,
                shape,
                &collider_pose,
                &Vec3::zeros(),
                collider.shape.as_ref(),
                options,
            ) {
                Ok(Some(hit)) => hit,
                Ok(None) => continue,
                Err(_) => {
                    trace!("shape cast unsupported against collider {:?}", collider.id);
                    continue;
                }
            };

            // Overlapping at the start of the sweep.
            if hit.time_of_impact <= 0.0 {
                continue;
            }
            if best.is_some_and(|b| hit.time_of_impact >= b.distance) {
                continue;
            }

            best = Some(RayHit {
                collider: collider.id,
                point: collider_pose * hit.witness2,
                normal: collider_pose * hit.normal2.into_inner(),
                distance: hit.time_of_impact,
            });
        }
        best
    }
}

impl PhysicsWorld for QueryWorld {
    fn ray_cast(
        &self,
        origin: Point3,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<RayHit> {
        let dir = direction.try_normalize(DIST_EPS)?;
        let ray = Ray::new(origin, dir);

        let mut best: Option<RayHit> = None;
        for collider in self.candidates(filter) {
            let Some(hit) =
                collider
                    .shape
                    .cast_ray_and_get_normal(&collider.pose(), &ray, max_distance, true)
            else {
                continue;
            };
            if hit.time_of_impact <= 0.0 {
                continue;
            }
            if best.is_some_and(|b| hit.time_of_impact >= b.distance) {
                continue;
            }
            best = Some(RayHit {
                collider: collider.id,
                point: ray.point_at(hit.time_of_impact),
                normal: hit.normal,
                distance: hit.time_of_impact,
            });
        }
        best
    }

    fn sphere_cast(
        &self,
        origin: Point3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<RayHit> {
        let dir = direction.try_normalize(DIST_EPS)?;
        let ball = Ball::new(radius);
        let pose = Iso::from_parts(na::Translation3::from(origin.coords), Quat::identity());
        self.closest_shape_cast(&pose, &ball, dir, max_distance, filter)
    }

    fn capsule_cast(
        &self,
        a: Point3,
        b: Point3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<RayHit> {
        let dir = direction.try_normalize(DIST_EPS)?;
        let capsule = Capsule::new(a, b, radius);
        self.closest_shape_cast(&Iso::identity(), &capsule, dir, max_distance, filter)
    }

    fn overlap_sphere(&self, center: Point3, radius: f32, filter: QueryFilter) -> Vec<ColliderId> {
        let ball = Ball::new(radius);
        let pose = Iso::from_parts(na::Translation3::from(center.coords), Quat::identity());
        self.candidates(filter)
            .filter(|c| {
                query::intersection_test(&pose, &ball, &c.pose(), c.shape.as_ref())
                    .unwrap_or(false)
            })
            .map(|c| c.id)
            .collect()
    }

    fn closest_point_on_surface(
        &self,
        collider: ColliderId,
        center: Point3,
        _radius: f32,
    ) -> Option<Point3> {
        let c = self.get(collider)?;
        let projection = c.shape.project_point(&c.pose(), &center, false);
        let point = projection.point;
        (point.x.is_finite() && point.y.is_finite() && point.z.is_finite()).then_some(point)
    }

    fn layer(&self, collider: ColliderId) -> Option<Layer> {
        self.get(collider).map(|c| c.layer)
    }

    fn set_layer(&mut self, collider: ColliderId, layer: Layer) {
        if let Some(c) = self.get_mut(collider) {
            c.layer = layer;
        }
    }

    fn collider_translation(&self, collider: ColliderId) -> Option<Vec3> {
        self.get(collider).map(|c| c.transform.translation)
    }

    fn surface(&self, collider: ColliderId) -> Option<SurfaceType> {
        self.get(collider).and_then(|c| c.surface)
    }
}

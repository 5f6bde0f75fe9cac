//! Iterative collision pushback.
//!
//! Every sphere of the stack is tested against the walkable colliders it overlaps. Each overlap
//! moves the whole controller just far enough to separate that sphere from the collider, and
//! records a [`Contact`]. Passes repeat while they keep finding contacts, up to a maximum depth.

use log::{debug, warn};

use crate::{
    constants::{MAX_QUERY_DISTANCE, TINY_TOLERANCE},
    layers::{Layer, QueryFilter},
    math::normalize_or_zero,
    scratch::ScratchLayer,
    sphere::SphereSet,
    surface::SurfaceType,
    types::{ColliderId, Point3, Vec3},
    world::PhysicsWorld,
};

/// One resolved overlap between a collision sphere and a collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Index of the sphere in the controller's [`SphereSet`].
    pub sphere: usize,
    pub surface: SurfaceType,
    pub collider: ColliderId,
    /// Closest point on the collider's surface.
    pub point: Point3,
    /// Surface normal at the contact, falling back to the push direction.
    pub normal: Vec3,
}

/// Controller parameters a pushback pass needs.
#[derive(Clone, Copy, Debug)]
pub struct PushbackContext<'a> {
    pub spheres: &'a SphereSet,
    pub up: Vec3,
    pub height_scale: f32,
    pub radius: f32,
    pub filter: QueryFilter,
    pub scratch: Layer,
    pub default_surface: SurfaceType,
    /// Colliders hidden from the overlap queries (the controller's own body).
    pub ignored: &'a [ColliderId],
    /// Log every contact point at debug level.
    pub debug: bool,
}

/// Push the controller out of overlapping colliders.
///
/// `position` is the controller's base. Runs one pass at `depth` and recurses while a pass
/// produced contacts and `depth < max_depth`.
pub fn recursive_pushback<W: PhysicsWorld + ?Sized>(
    world: &mut W,
    ctx: &PushbackContext<'_>,
    position: &mut Point3,
    contacts: &mut Vec<Contact>,
    depth: u32,
    max_depth: u32,
) {
    let contact = pushback_pass(world, ctx, position, contacts);

    if depth < max_depth && contact {
        recursive_pushback(world, ctx, position, contacts, depth + 1, max_depth);
    }
}

/// Returns whether the pass moved the controller. An aborted pass reports no contact.
fn pushback_pass<W: PhysicsWorld + ?Sized>(
    world: &mut W,
    ctx: &PushbackContext<'_>,
    position: &mut Point3,
    contacts: &mut Vec<Contact>,
) -> bool {
    let target_filter = QueryFilter::only(ctx.scratch);
    let mut contact = false;

    for (index, sphere) in ctx.spheres.iter().enumerate() {
        let overlapping = {
            let hidden = ScratchLayer::acquire(&mut *world, ctx.scratch, ctx.ignored.iter().copied());
            let center = sphere.position(*position, ctx.up, ctx.height_scale);
            hidden.overlap_sphere(center, ctx.radius, ctx.filter)
        };

        for collider in overlapping {
            let center = sphere.position(*position, ctx.up, ctx.height_scale);
            let Some(contact_point) = world.closest_point_on_surface(collider, center, ctx.radius)
            else {
                warn!("no closest point on collider {collider:?}; aborting pushback pass");
                return false;
            };

            if ctx.debug {
                debug!("pushback: sphere {index} against {collider:?} at {contact_point}");
            }

            let v = contact_point - center;
            if v == Vec3::zeros() {
                continue;
            }
            let distance = v.norm();
            let dir = v / distance;

            // A tiny sphere reaching the surface means the centre is outside the collider.
            let facing_normal = {
                let target = ScratchLayer::acquire(&mut *world, ctx.scratch, [collider]);
                target
                    .sphere_cast(center, TINY_TOLERANCE, dir, distance + TINY_TOLERANCE, target_filter)
                    .is_some()
            };

            let push = if facing_normal {
                if distance < ctx.radius {
                    -dir * (ctx.radius - distance)
                } else {
                    continue;
                }
            } else {
                dir * (ctx.radius + distance)
            };

            contact = true;
            *position += push;

            let moved = center + push;
            let normal = {
                let target = ScratchLayer::acquire(&mut *world, ctx.scratch, [collider]);
                target
                    .sphere_cast(
                        moved,
                        TINY_TOLERANCE,
                        contact_point - moved,
                        MAX_QUERY_DISTANCE,
                        target_filter,
                    )
                    .map(|hit| hit.normal)
            }
            .unwrap_or_else(|| normalize_or_zero(push));

            contacts.push(Contact {
                sphere: index,
                surface: SurfaceType::or_default(world.surface(collider), ctx.default_surface),
                collider,
                point: contact_point,
                normal,
            });
        }
    }

    contact
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layers::{LayerMask, TriggerPolicy},
        query_world::{ColliderDef, ColliderShapeDef, QueryWorld},
        sphere::CollisionSphere,
        types::RayHit,
    };
    use approx::assert_relative_eq;

    const SCRATCH: Layer = Layer(31);

    fn walkable() -> QueryFilter {
        QueryFilter::new(
            LayerMask::from_layers(&[Layer(0), Layer(1)]),
            TriggerPolicy::Ignore,
        )
    }

    fn ctx<'a>(spheres: &'a SphereSet, ignored: &'a [ColliderId]) -> PushbackContext<'a> {
        PushbackContext {
            spheres,
            up: Vec3::y(),
            height_scale: 1.0,
            radius: 0.5,
            filter: walkable(),
            scratch: SCRATCH,
            default_surface: SurfaceType::default(),
            ignored,
            debug: true,
        }
    }

    fn feet_and_head() -> SphereSet {
        SphereSet::new(vec![
            CollisionSphere::new(0.5, true, false),
            CollisionSphere::new(1.5, false, true),
        ])
        .unwrap()
    }

    fn ball(world: &mut QueryWorld, x: f32, y: f32) -> ColliderId {
        world.insert(
            ColliderDef::new(ColliderShapeDef::Sphere { radius: 0.5 })
                .with_translation(Vec3::new(x, y, 0.0)),
        )
    }

    #[test]
    fn single_wall_is_resolved() {
        let mut world = QueryWorld::new();
        // Wall face at x = 0.3.
        let wall = world.insert(
            ColliderDef::new(ColliderShapeDef::Cuboid {
                half_extents: Vec3::new(0.5, 3.0, 3.0),
            })
            .with_translation(Vec3::new(0.8, 0.0, 0.0)),
        );
        let spheres = SphereSet::default();
        let ctx = ctx(&spheres, &[]);

        let mut position = Point3::origin();
        let mut contacts = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut contacts, 0, 2);

        assert_relative_eq!(position.x, -0.2, epsilon = 1.0e-4);
        assert_relative_eq!(position.y, 0.0, epsilon = 1.0e-5);
        assert!(!contacts.is_empty());
        assert!(contacts.iter().all(|c| c.collider == wall));
        assert_relative_eq!(contacts[0].normal, -Vec3::x(), epsilon = 1.0e-3);
        assert_eq!(contacts[0].sphere, 0);

        // Converged: another run leaves the controller where it is.
        let mut again = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut again, 0, 2);
        assert_relative_eq!(position.x, -0.2, epsilon = 1.0e-4);
    }

    #[test]
    fn centre_inside_collider_pushes_through_the_near_face() {
        let mut world = QueryWorld::new();
        // Thin slab whose top face is 0.1 above the feet centre.
        world.insert(
            ColliderDef::new(ColliderShapeDef::Cuboid {
                half_extents: Vec3::new(2.0, 0.3, 2.0),
            })
            .with_translation(Vec3::new(0.0, 0.3, 0.0)),
        );
        let spheres = feet_and_head();
        let ctx = ctx(&spheres, &[]);

        let mut position = Point3::origin();
        let mut contacts = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut contacts, 0, 2);

        // Feet centre ends one radius above the slab top.
        assert_relative_eq!(position.y + 0.5, 1.1, epsilon = 1.0e-3);
        assert_relative_eq!(contacts[0].normal, Vec3::y(), epsilon = 1.0e-3);
    }

    #[test]
    fn opposing_obstacles_stay_bounded() {
        let mut world = QueryWorld::new();
        let a = ball(&mut world, 0.9, 0.5);
        let b = ball(&mut world, -0.9, 0.5);
        let spheres = feet_and_head();
        let ctx = ctx(&spheres, &[]);

        let mut position = Point3::origin();
        let mut contacts = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut contacts, 0, 2);

        assert!(position.x.abs() <= 0.1 + 1.0e-4, "moved to {}", position.x);
        assert!(contacts.iter().any(|c| c.collider == a));
        assert!(contacts.iter().any(|c| c.collider == b));
        assert!(contacts.len() <= 2 * 3);
    }

    #[test]
    fn corner_walls_converge_within_max_depth() {
        let mut world = QueryWorld::new();
        // Wall faces at x = 0.3 and z = 0.35.
        let east = world.insert(
            ColliderDef::new(ColliderShapeDef::Cuboid {
                half_extents: Vec3::new(0.5, 3.0, 3.0),
            })
            .with_translation(Vec3::new(0.8, 0.0, 0.0)),
        );
        let north = world.insert(
            ColliderDef::new(ColliderShapeDef::Cuboid {
                half_extents: Vec3::new(3.0, 3.0, 0.5),
            })
            .with_translation(Vec3::new(0.0, 0.0, 0.85)),
        );
        let spheres = SphereSet::default();
        let ctx = ctx(&spheres, &[]);

        let mut position = Point3::origin();
        let mut contacts = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut contacts, 0, 2);

        assert_relative_eq!(position, Point3::new(-0.2, 0.0, -0.15), epsilon = 1.0e-4);
        assert_eq!(contacts.len(), 2);
        assert!(contacts.iter().any(|c| c.collider == east));
        assert!(contacts.iter().any(|c| c.collider == north));

        let settled = position;
        let mut again = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut again, 0, 2);
        assert_relative_eq!(position, settled, epsilon = 1.0e-4);
    }

    #[test]
    fn opposing_unit_spheres_roughly_cancel() {
        let mut world = QueryWorld::new();
        // Each ball reaches 0.1 into the feet sphere from either side.
        let mut unit_ball = |x: f32| {
            world.insert(
                ColliderDef::new(ColliderShapeDef::Sphere { radius: 1.0 })
                    .with_translation(Vec3::new(x, 0.5, 0.0)),
            )
        };
        let a = unit_ball(1.4);
        let b = unit_ball(-1.4);
        let spheres = SphereSet::default();
        let ctx = ctx(&spheres, &[]);

        let max_depth = 2;
        let mut position = Point3::origin();
        let mut contacts = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut contacts, 0, max_depth);

        // Corrections alternate between passes, so the net move is bounded by the
        // penetration rather than exactly zero. The mid sphere grazes both balls too.
        let net = position - Point3::origin();
        assert!(net.x.abs() <= 0.1 + 1.0e-4, "net {net}");
        assert!(net.norm() <= 0.2, "net {net}");
        assert!(contacts.iter().any(|c| c.collider == a));
        assert!(contacts.iter().any(|c| c.collider == b));
        assert!(contacts.len() <= (max_depth as usize + 1) * spheres.len() * world.len());
    }

    #[test]
    fn wedge_terminates() {
        let mut world = QueryWorld::new();
        for tilt in [35f32, -35.0] {
            world.insert(
                ColliderDef::new(ColliderShapeDef::Plane {
                    offset_along_normal: 0.0,
                })
                .with_rotation(crate::types::Quat::from_axis_angle(
                    &Vec3::z_axis(),
                    tilt.to_radians(),
                )),
            );
        }
        let spheres = SphereSet::default();
        let ctx = ctx(&spheres, &[]);

        let max_depth = 2;
        let mut position = Point3::new(0.0, 0.1, 0.0);
        let mut contacts = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut contacts, 0, max_depth);

        let bound = (max_depth as usize + 1) * spheres.len() * world.len();
        assert!(contacts.len() <= bound);
        assert!(position.y > 0.1);
    }

    #[test]
    fn ignored_colliders_are_skipped_and_restored() {
        let mut world = QueryWorld::new();
        let own = world.insert(
            ColliderDef::new(ColliderShapeDef::CapsuleY {
                radius: 0.5,
                half_height: 0.5,
            })
            .with_translation(Vec3::new(0.0, 1.0, 0.0))
            .with_layer(Layer(1)),
        );
        let spheres = SphereSet::default();
        let ignored = [own];
        let ctx = ctx(&spheres, &ignored);

        let mut position = Point3::origin();
        let mut contacts = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut contacts, 0, 2);

        assert!(contacts.is_empty());
        assert_eq!(position, Point3::origin());
        assert_eq!(world.layer(own), Some(Layer(1)));
    }

    #[test]
    fn scratch_layer_is_invisible_to_walkable_queries() {
        let mut world = QueryWorld::new();
        world.insert(
            ColliderDef::new(ColliderShapeDef::Sphere { radius: 0.5 })
                .with_translation(Vec3::new(0.6, 0.5, 0.0))
                .with_layer(SCRATCH),
        );
        let spheres = SphereSet::default();
        let ctx = ctx(&spheres, &[]);

        let mut position = Point3::origin();
        let mut contacts = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut contacts, 0, 2);
        assert!(contacts.is_empty());
    }

    /// Delegates to a [`QueryWorld`] but can't compute closest points.
    struct NoClosestPoint(QueryWorld);

    impl PhysicsWorld for NoClosestPoint {
        fn ray_cast(&self, o: Point3, d: Vec3, max: f32, f: QueryFilter) -> Option<RayHit> {
            self.0.ray_cast(o, d, max, f)
        }

        fn sphere_cast(
            &self,
            o: Point3,
            r: f32,
            d: Vec3,
            max: f32,
            f: QueryFilter,
        ) -> Option<RayHit> {
            self.0.sphere_cast(o, r, d, max, f)
        }

        fn capsule_cast(
            &self,
            a: Point3,
            b: Point3,
            r: f32,
            d: Vec3,
            max: f32,
            f: QueryFilter,
        ) -> Option<RayHit> {
            self.0.capsule_cast(a, b, r, d, max, f)
        }

        fn overlap_sphere(&self, c: Point3, r: f32, f: QueryFilter) -> Vec<ColliderId> {
            self.0.overlap_sphere(c, r, f)
        }

        fn closest_point_on_surface(&self, _: ColliderId, _: Point3, _: f32) -> Option<Point3> {
            None
        }

        fn layer(&self, c: ColliderId) -> Option<Layer> {
            self.0.layer(c)
        }

        fn set_layer(&mut self, c: ColliderId, layer: Layer) {
            self.0.set_layer(c, layer)
        }

        fn collider_translation(&self, c: ColliderId) -> Option<Vec3> {
            self.0.collider_translation(c)
        }
    }

    #[test]
    fn missing_closest_point_aborts_pass() {
        let mut inner = QueryWorld::new();
        ball(&mut inner, 0.6, 0.5);
        let own = inner.insert(
            ColliderDef::new(ColliderShapeDef::Sphere { radius: 0.2 })
                .with_translation(Vec3::new(0.0, 1.0, 0.0))
                .with_layer(Layer(1)),
        );
        let mut world = NoClosestPoint(inner);
        let spheres = SphereSet::default();
        let ignored = [own];
        let ctx = ctx(&spheres, &ignored);

        let mut position = Point3::origin();
        let mut contacts = Vec::new();
        recursive_pushback(&mut world, &ctx, &mut position, &mut contacts, 0, 2);

        assert!(contacts.is_empty());
        assert_eq!(position, Point3::origin());
        assert_eq!(world.layer(own), Some(Layer(1)));
    }
}

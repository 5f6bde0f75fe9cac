/*!
Ground probing and classification.

Each probe resets and recomputes five optional ground hits below the controller:

- `primary`: a slightly shrunk sphere cast straight down from the feet sphere, corrected by a
  simulated sphere cast so its distance is the vertical gap below the body.
- `near` / `far`: short raycasts just inside and just outside the primary contact, used to
  tell ledges and steps from solid ground.
- `flush`: on ground steeper than the stand angle, the surface found by sliding down the slope.
- `step`: the surface found past a steep or distant near hit.

`Ground::is_grounded` then decides whether the controller stands on walkable ground and which
normal to report.
*/

use log::{debug, error, trace};
use nalgebra as na;

use crate::{
    constants::{
        FAR_PROBE_ROTATION_DEG, FAR_PROBE_SCALE, GROUNDING_MAX_PERCENT_FROM_CENTER,
        GROUNDING_MIN_PERCENT_FROM_CENTER, GROUNDING_UPPER_BOUND_ANGLE, MAX_QUERY_DISTANCE,
        TINY_TOLERANCE, TOLERANCE,
    },
    error::KccError,
    layers::QueryFilter,
    math::{angle_deg, lerp_clamped, normalize_or_zero, project_point_on_plane, project_vector_on_plane},
    surface::SurfaceType,
    types::{ColliderId, Point3, Quat, RayHit, Vec3},
    world::PhysicsWorld,
};

/// A single ground sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundHit {
    pub point: Point3,
    pub normal: Vec3,
    /// Distance from the probe origin to `point` along the probe direction.
    pub distance: f32,
}

impl From<RayHit> for GroundHit {
    fn from(hit: RayHit) -> Self {
        Self {
            point: hit.point,
            normal: hit.normal,
            distance: hit.distance,
        }
    }
}

/// Controller parameters a probe needs.
#[derive(Clone, Copy, Debug)]
pub struct ProbeContext {
    /// Unit up axis.
    pub up: Vec3,
    pub radius: f32,
    /// Walkable layers and trigger policy.
    pub filter: QueryFilter,
    /// Surface used for colliders that don't carry their own.
    pub default_surface: SurfaceType,
}

impl ProbeContext {
    #[inline]
    fn down(&self) -> Vec3 {
        -self.up
    }

    fn surface_of<W: PhysicsWorld + ?Sized>(&self, world: &W, collider: ColliderId) -> SurfaceType {
        SurfaceType::or_default(world.surface(collider), self.default_surface)
    }

    fn ray_down<W: PhysicsWorld + ?Sized>(&self, world: &W, origin: Point3) -> Option<RayHit> {
        world.ray_cast(origin, self.down(), MAX_QUERY_DISTANCE, self.filter)
    }
}

/// Ground classification state, rebuilt on every probe.
#[derive(Clone, Debug)]
pub struct Ground {
    primary: Option<GroundHit>,
    near: Option<GroundHit>,
    far: Option<GroundHit>,
    flush: Option<GroundHit>,
    step: Option<GroundHit>,
    surface: SurfaceType,
    collider: Option<ColliderId>,

    // Geometry of the last probe, for the grounded query.
    up: Vec3,
    radius: f32,
    center: Point3,
}

impl Ground {
    pub fn new(up: Vec3, radius: f32, surface: SurfaceType) -> Self {
        Self {
            primary: None,
            near: None,
            far: None,
            flush: None,
            step: None,
            surface,
            collider: None,
            up,
            radius,
            center: Point3::origin(),
        }
    }

    fn reset(&mut self, ctx: &ProbeContext, origin: Point3) {
        self.primary = None;
        self.near = None;
        self.far = None;
        self.flush = None;
        self.step = None;
        self.collider = None;
        self.surface = ctx.default_surface;
        self.up = ctx.up;
        self.radius = ctx.radius;
        self.center = origin;
    }

    /// Probe the ground below the feet sphere centred at `origin`.
    ///
    /// Fails with [`KccError::EscapedLevel`] when nothing at all lies below the controller.
    pub fn probe<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &W,
        ctx: &ProbeContext,
        origin: Point3,
    ) -> Result<(), KccError> {
        self.reset(ctx, origin);

        let up = ctx.up;
        let down = ctx.down();
        let o = origin + up * TOLERANCE;
        let smaller_radius = ctx.radius - TOLERANCE * TOLERANCE;

        if let Some(hit) =
            world.sphere_cast(o, smaller_radius, down, MAX_QUERY_DISTANCE, ctx.filter)
        {
            let surface = ctx.surface_of(world, hit.collider);
            self.surface = surface;
            self.collider = Some(hit.collider);

            let primary = simulate_sphere_cast(world, ctx, origin, hit.normal).unwrap_or(GroundHit {
                point: hit.point,
                normal: hit.normal,
                distance: hit.distance - TOLERANCE - TOLERANCE * TOLERANCE,
            });
            self.primary = Some(primary);

            // Flat ground right below the centreline.
            let on_line = project_point_on_plane(up, origin, primary.point);
            if na::distance(&on_line, &origin) < TINY_TOLERANCE {
                return Ok(());
            }

            let to_center =
                project_vector_on_plane(up, normalize_or_zero(origin - primary.point) * TINY_TOLERANCE);
            let Some(axis) = na::Unit::try_new(to_center.cross(&up), f32::EPSILON) else {
                return Ok(());
            };
            let away_from_center =
                Quat::from_axis_angle(&axis, FAR_PROBE_ROTATION_DEG.to_radians()) * -to_center;

            let near_origin = primary.point + to_center + up * TINY_TOLERANCE;
            let far_origin = primary.point + away_from_center * FAR_PROBE_SCALE;

            let near_hit = ctx.ray_down(world, near_origin);
            self.near = near_hit.map(GroundHit::from);
            self.far = ctx.ray_down(world, far_origin).map(GroundHit::from);

            if angle_deg(primary.normal, up) > surface.stand_angle {
                let r = primary.normal.cross(&down);
                let v = r.cross(&primary.normal);
                let flush_origin = primary.point + primary.normal * TINY_TOLERANCE;

                if let Some(flush_hit) =
                    world.ray_cast(flush_origin, v, MAX_QUERY_DISTANCE, ctx.filter)
                {
                    self.flush = simulate_sphere_cast(world, ctx, origin, flush_hit.normal);
                }
            }

            if let Some(near_hit) = near_hit {
                let near_angle = angle_deg(near_hit.normal, up);
                if near_angle > surface.stand_angle || near_hit.distance > TOLERANCE {
                    let near_surface = ctx.surface_of(world, near_hit.collider);
                    if near_angle > near_surface.stand_angle {
                        let r = near_hit.normal.cross(&down);
                        let v = r.cross(&near_hit.normal);
                        self.step = world
                            .ray_cast(near_origin, v, MAX_QUERY_DISTANCE, ctx.filter)
                            .map(GroundHit::from);
                    } else {
                        self.step = Some(near_hit.into());
                    }
                }
            }

            Ok(())
        } else if let Some(hit) = ctx.ray_down(world, o) {
            self.surface = ctx.surface_of(world, hit.collider);
            self.collider = Some(hit.collider);
            self.primary =
                Some(simulate_sphere_cast(world, ctx, origin, hit.normal).unwrap_or(hit.into()));
            Ok(())
        } else {
            error!("no ground was found below the controller at {origin}; it has escaped the level");
            Err(KccError::EscapedLevel { position: origin })
        }
    }

    /// Whether the controller stands on walkable ground within `tolerance`, and on which normal.
    ///
    /// `_currently_grounded` is accepted so callers can pass their current state; it doesn't
    /// change the answer.
    pub fn is_grounded(&self, _currently_grounded: bool, tolerance: f32) -> Option<Vec3> {
        let primary = self.primary?;
        if primary.distance > tolerance {
            return None;
        }

        let stand = self.surface.stand_angle;

        if let Some(far) = self.far {
            if angle_deg(far.normal, self.up) > stand {
                return self
                    .flush
                    .filter(|flush| angle_deg(flush.normal, self.up) < stand && flush.distance < tolerance)
                    .map(|flush| flush.normal);
            }

            if !self.on_steady_ground(far.normal, primary.point) {
                if let Some(near) = self.near {
                    if near.distance < tolerance
                        && angle_deg(near.normal, self.up) < stand
                        && !self.on_steady_ground(near.normal, near.point)
                    {
                        return Some(near.normal);
                    }
                }

                return self
                    .step
                    .filter(|step| step.distance < tolerance && angle_deg(step.normal, self.up) < stand)
                    .map(|step| step.normal);
            }

            return Some(far.normal);
        }

        Some(primary.normal)
    }

    /// Steady when `point` sits close enough to the centreline for the slope of `normal`.
    ///
    /// The allowed horizontal offset grows from half the radius on flat ground to 85% of it at
    /// the upper bound angle.
    fn on_steady_ground(&self, normal: Vec3, point: Point3) -> bool {
        let angle = angle_deg(normal, self.up);
        let ratio = lerp_clamped(
            GROUNDING_MIN_PERCENT_FROM_CENTER,
            GROUNDING_MAX_PERCENT_FROM_CENTER,
            angle / GROUNDING_UPPER_BOUND_ANGLE,
        );
        let p = project_point_on_plane(self.up, self.center, point);
        na::distance(&p, &self.center) <= ratio * self.radius
    }

    pub fn primary(&self) -> Option<&GroundHit> {
        self.primary.as_ref()
    }

    pub fn near(&self) -> Option<&GroundHit> {
        self.near.as_ref()
    }

    pub fn far(&self) -> Option<&GroundHit> {
        self.far.as_ref()
    }

    pub fn flush(&self) -> Option<&GroundHit> {
        self.flush.as_ref()
    }

    pub fn step(&self) -> Option<&GroundHit> {
        self.step.as_ref()
    }

    pub fn primary_normal(&self) -> Option<Vec3> {
        self.primary.map(|p| p.normal)
    }

    /// Gap between the body and the primary ground.
    pub fn distance(&self) -> Option<f32> {
        self.primary.map(|p| p.distance)
    }

    /// Surface type of the primary ground (the default when nothing was hit).
    pub fn surface(&self) -> SurfaceType {
        self.surface
    }

    /// Collider the primary probe hit.
    pub fn collider(&self) -> Option<ColliderId> {
        self.collider
    }

    /// Dump every present ground hit at trace level.
    pub fn trace_hits(&self) {
        let slots = [
            ("primary", self.primary),
            ("near", self.near),
            ("far", self.far),
            ("flush", self.flush),
            ("step", self.step),
        ];
        for (name, hit) in slots {
            if let Some(hit) = hit {
                trace!(
                    "ground {name}: point {} normal {} distance {:.4}",
                    hit.point, hit.normal, hit.distance
                );
            }
        }
    }
}

/// Correct a sphere contact on a slope of `ground_normal`.
///
/// A sphere resting on a slope touches it uphill of its lowest point. Casting a ray from where
/// that contact would be gives the true vertical gap below the body.
fn simulate_sphere_cast<W: PhysicsWorld + ?Sized>(
    world: &W,
    ctx: &ProbeContext,
    origin: Point3,
    ground_normal: Vec3,
) -> Option<GroundHit> {
    let up = ctx.up;
    let ground_angle = angle_deg(ground_normal, up).to_radians();

    let mut secondary_origin = origin - up * ctx.radius + up * TOLERANCE;

    if ground_angle.abs() > f32::EPSILON {
        let horizontal = ground_angle.sin() * ctx.radius;
        let vertical = (1.0 - ground_angle.cos()) * ctx.radius;

        let r2 = ground_normal.cross(&ctx.down());
        let v2 = -r2.cross(&ground_normal);

        secondary_origin +=
            normalize_or_zero(project_vector_on_plane(up, v2)) * horizontal + up * vertical;
    }

    let hit = ctx.ray_down(world, secondary_origin);
    if hit.is_none() {
        debug!("simulated sphere cast from {secondary_origin} found nothing");
    }
    hit.map(|hit| GroundHit {
        point: hit.point,
        normal: hit.normal,
        // The ray starts TOLERANCE above the sphere bottom, so this is the exact gap and a
        // clamp lands flush rather than hovering TINY_TOLERANCE above the ground.
        distance: hit.distance - TOLERANCE,
    })
}

/*!
The controller: owns the sphere stack and runs one tick of collision resolution at a time.

A tick runs, in order:
1. Follow the moving ground it is clamped to (when enabled).
2. Probe the ground, then hand control to the [`Motor`] for this tick's movement.
3. Push the spheres out of overlapping colliders and probe again.
4. Stop the controller from climbing slopes steeper than the surface's slope limit.
5. Probe once more and clamp down onto the ground (when enabled).
6. Remember the platform position and notify listeners.

The controller never owns the physics world; every tick borrows it mutably, so no other code
can observe the scratch layer while a tick is running.
*/

use std::mem;

use log::{debug, warn};

use crate::{
    config::{ControllerConfig, DebugConfig, Timestep},
    error::KccError,
    ground::{Ground, ProbeContext},
    layers::{Layer, QueryFilter},
    math::{angle_deg, normalize_or_zero, project_point_on_line, project_vector_on_plane},
    pushback::{Contact, PushbackContext, recursive_pushback},
    scratch::ScratchLayer,
    sphere::{CollisionSphere, SphereSet},
    surface::SurfaceType,
    types::{ColliderId, Point3, Vec3},
    world::PhysicsWorld,
};

/// Movement logic driven by the controller once per tick, after the first ground probe.
///
/// Implementations read the ground state and move the controller; the controller then resolves
/// whatever collisions the move produced.
pub trait Motor {
    fn super_update(&mut self, controller: &mut Controller, dt: f32);
}

impl<F: FnMut(&mut Controller, f32)> Motor for F {
    fn super_update(&mut self, controller: &mut Controller, dt: f32) {
        self(controller, dt)
    }
}

type Listener = Box<dyn FnMut(&Controller)>;

pub struct Controller {
    position: Point3,
    up: Vec3,
    radius: f32,
    height_scale: f32,
    spheres: SphereSet,

    filter: QueryFilter,
    scratch: Layer,
    ignored: Vec<ColliderId>,
    default_surface: SurfaceType,
    max_pushback_depth: u32,

    timestep: Timestep,
    max_substeps: u32,
    manual_update_only: bool,
    delta_time: f32,

    clamping: bool,
    slope_limiting: bool,
    clamp_to_moving_ground: bool,
    currently_clamped_to: Option<ColliderId>,
    last_ground_position: Option<(ColliderId, Vec3)>,
    initial_position: Point3,

    ground: Ground,
    contacts: Vec<Contact>,
    listeners: Vec<Listener>,
    debug: DebugConfig,
}

impl Controller {
    /// Build a controller with its base at `position`.
    pub fn new(config: &ControllerConfig, position: Point3) -> Result<Self, KccError> {
        config.validate()?;
        let spheres = SphereSet::new(config.spheres.clone())?;
        let up = Vec3::y();

        Ok(Self {
            position,
            up,
            radius: config.radius,
            height_scale: 1.0,
            spheres,
            filter: config.walkable_filter(),
            scratch: config.scratch_layer,
            ignored: config.own_collider.into_iter().collect(),
            default_surface: config.default_surface,
            max_pushback_depth: config.max_pushback_depth,
            timestep: config.timestep,
            max_substeps: config.max_substeps,
            manual_update_only: false,
            delta_time: 0.0,
            clamping: true,
            slope_limiting: true,
            clamp_to_moving_ground: config.clamp_to_moving_ground,
            currently_clamped_to: None,
            last_ground_position: None,
            initial_position: position,
            ground: Ground::new(up, config.radius, config.default_surface),
            contacts: Vec::new(),
            listeners: Vec::new(),
            debug: config.debug.clone(),
        })
    }

    /// Advance by one host frame of `frame_delta` seconds and return the number of ticks run.
    ///
    /// With a fixed timestep the frame is split into whole steps plus one partial step, at
    /// most `max_substeps` in total (0 means unbounded). Does nothing while
    /// [`Controller::set_manual_update_only`] is set.
    pub fn update<W, M>(
        &mut self,
        world: &mut W,
        motor: &mut M,
        frame_delta: f32,
    ) -> Result<u32, KccError>
    where
        W: PhysicsWorld + ?Sized,
        M: Motor + ?Sized,
    {
        if self.manual_update_only {
            return Ok(0);
        }

        let Some(fixed) = self.timestep.fixed_delta() else {
            self.single_update(world, motor, frame_delta)?;
            return Ok(1);
        };

        let mut delta = frame_delta;
        let mut ticks = 0;
        while delta > 0.0 {
            if self.max_substeps != 0 && ticks >= self.max_substeps {
                debug!("dropping {delta:.4}s of frame time after {ticks} fixed steps");
                break;
            }
            let step = if delta > fixed { fixed } else { delta };
            self.single_update(world, motor, step)?;
            delta -= step;
            ticks += 1;
        }
        Ok(ticks)
    }

    /// Run exactly one tick of `dt` seconds, regardless of the timestep mode.
    pub fn manual_update<W, M>(
        &mut self,
        world: &mut W,
        motor: &mut M,
        dt: f32,
    ) -> Result<(), KccError>
    where
        W: PhysicsWorld + ?Sized,
        M: Motor + ?Sized,
    {
        self.single_update(world, motor, dt)
    }

    fn single_update<W, M>(
        &mut self,
        world: &mut W,
        motor: &mut M,
        dt: f32,
    ) -> Result<(), KccError>
    where
        W: PhysicsWorld + ?Sized,
        M: Motor + ?Sized,
    {
        self.delta_time = dt;

        if self.clamp_to_moving_ground {
            self.follow_moving_ground(&*world);
        }

        self.initial_position = self.position;

        self.probe_ground(world)?;

        motor.super_update(self, dt);

        self.contacts.clear();
        self.pushback(world);

        self.probe_ground(world)?;

        if self.slope_limiting {
            self.slope_limit(world);
        }

        self.probe_ground(world)?;

        if self.clamping {
            self.clamp_to_ground();
        }

        self.track_moving_ground(&*world);

        if self.debug.grounding {
            self.ground.trace_hits();
        }

        self.notify_listeners();
        Ok(())
    }

    fn clamp_target(&self) -> Option<ColliderId> {
        self.currently_clamped_to.or(self.ground.collider())
    }

    fn is_clamping_to_ground(&self) -> bool {
        self.clamping || self.currently_clamped_to.is_some()
    }

    fn follow_moving_ground<W: PhysicsWorld + ?Sized>(&mut self, world: &W) {
        if !self.is_clamping_to_ground() {
            return;
        }
        let (Some(target), Some((last_id, last_position))) =
            (self.clamp_target(), self.last_ground_position)
        else {
            return;
        };
        if target != last_id {
            return;
        }
        if let Some(now) = world.collider_translation(target) {
            let delta = now - last_position;
            if delta != Vec3::zeros() {
                self.position += delta;
            }
        }
    }

    fn track_moving_ground<W: PhysicsWorld + ?Sized>(&mut self, world: &W) {
        self.last_ground_position = if self.is_clamping_to_ground() {
            self.clamp_target()
                .and_then(|id| world.collider_translation(id).map(|t| (id, t)))
        } else {
            None
        };
    }

    fn probe_context(&self) -> ProbeContext {
        ProbeContext {
            up: self.up,
            radius: self.radius,
            filter: self.filter,
            default_surface: self.default_surface,
        }
    }

    fn probe_ground<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> Result<(), KccError> {
        let ctx = self.probe_context();
        let origin = self.feet_position();
        let hidden = ScratchLayer::acquire(world, self.scratch, self.ignored.iter().copied());
        self.ground.probe(&*hidden, &ctx, origin)
    }

    fn pushback<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) {
        let ctx = PushbackContext {
            spheres: &self.spheres,
            up: self.up,
            height_scale: self.height_scale,
            radius: self.radius,
            filter: self.filter,
            scratch: self.scratch,
            default_surface: self.default_surface,
            ignored: &self.ignored,
            debug: self.debug.pushback,
        };
        recursive_pushback(
            world,
            &ctx,
            &mut self.position,
            &mut self.contacts,
            0,
            self.max_pushback_depth,
        );
    }

    /// Undo movement up a slope steeper than the ground's slope limit.
    ///
    /// Returns whether the position was corrected.
    fn slope_limit<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> bool {
        let Some(n) = self.ground.primary_normal() else {
            return false;
        };
        if angle_deg(n, self.up) <= self.ground.surface().slope_limit {
            return false;
        }

        let absolute_move = project_vector_on_plane(n, self.position - self.initial_position);

        let r = n.cross(&self.down());
        let v = r.cross(&n);

        // Moving down or across the slope is fine.
        if angle_deg(absolute_move, v) <= 90.0 {
            return false;
        }

        let resolved = project_point_on_line(self.initial_position, r, self.position);
        let direction = project_vector_on_plane(n, resolved - self.position);

        let hit = {
            let hidden = ScratchLayer::acquire(&mut *world, self.scratch, self.ignored.iter().copied());
            hidden.capsule_cast(
                self.feet_position(),
                self.head_position(),
                self.radius,
                direction,
                direction.norm(),
                self.filter,
            )
        };

        match hit {
            Some(hit) => self.position += normalize_or_zero(v) * hit.distance,
            None => self.position += direction,
        }
        true
    }

    fn clamp_to_ground(&mut self) {
        if let Some(d) = self.ground.distance() {
            self.position -= self.up * d;
        }
    }

    fn notify_listeners(&mut self) {
        let mut listeners = mem::take(&mut self.listeners);
        for listener in listeners.iter_mut() {
            listener(self);
        }
        self.listeners = listeners;
    }

    /// Register a callback run after every tick, in registration order.
    pub fn add_listener(&mut self, listener: impl FnMut(&Controller) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // --- Position and shape ---

    /// Base of the controller.
    pub fn position(&self) -> Point3 {
        self.position
    }

    pub fn set_position(&mut self, position: Point3) {
        self.position = position;
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn down(&self) -> Vec3 {
        -self.up
    }

    /// Change the up axis. Zero vectors are ignored.
    pub fn set_up(&mut self, up: Vec3) {
        match up.try_normalize(f32::EPSILON) {
            Some(up) => self.up = up,
            None => warn!("ignoring zero up axis"),
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn height_scale(&self) -> f32 {
        self.height_scale
    }

    pub fn set_height_scale(&mut self, height_scale: f32) {
        self.height_scale = height_scale;
    }

    /// Distance between the feet and head centres plus both caps.
    pub fn height(&self) -> f32 {
        nalgebra::distance(&self.head_position(), &self.feet_position()) + self.radius * 2.0
    }

    pub fn spheres(&self) -> &SphereSet {
        &self.spheres
    }

    pub fn sphere_position(&self, sphere: &CollisionSphere) -> Point3 {
        sphere.position(self.position, self.up, self.height_scale)
    }

    pub fn feet_position(&self) -> Point3 {
        self.sphere_position(self.spheres.feet())
    }

    pub fn head_position(&self) -> Point3 {
        self.sphere_position(self.spheres.head())
    }

    /// Whether `point` lies below the head sphere's horizon.
    pub fn point_below_head(&self, point: Point3) -> bool {
        angle_deg(point - self.head_position(), self.up) > 89.0
    }

    /// Whether `point` lies above the feet sphere's horizon.
    pub fn point_above_feet(&self, point: Point3) -> bool {
        angle_deg(point - self.feet_position(), self.down()) > 89.0
    }

    // --- Tick state ---

    pub fn ground(&self) -> &Ground {
        &self.ground
    }

    /// Contacts resolved during the last tick's pushback.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Length of the tick currently running (or the last one).
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    // --- Switches ---

    pub fn enable_clamping(&mut self) {
        self.clamping = true;
    }

    pub fn disable_clamping(&mut self) {
        self.clamping = false;
    }

    pub fn is_clamping(&self) -> bool {
        self.clamping
    }

    pub fn enable_slope_limit(&mut self) {
        self.slope_limiting = true;
    }

    pub fn disable_slope_limit(&mut self) {
        self.slope_limiting = false;
    }

    pub fn is_slope_limiting(&self) -> bool {
        self.slope_limiting
    }

    pub fn currently_clamped_to(&self) -> Option<ColliderId> {
        self.currently_clamped_to
    }

    /// Pin ground following to a specific collider instead of whatever is below.
    pub fn set_currently_clamped_to(&mut self, collider: Option<ColliderId>) {
        self.currently_clamped_to = collider;
    }

    pub fn manual_update_only(&self) -> bool {
        self.manual_update_only
    }

    pub fn set_manual_update_only(&mut self, manual: bool) {
        self.manual_update_only = manual;
    }

    // --- Ignored colliders ---

    pub fn ignore_collider(&mut self, collider: ColliderId) {
        if !self.ignored.contains(&collider) {
            self.ignored.push(collider);
        }
    }

    pub fn remove_ignored_collider(&mut self, collider: ColliderId) {
        self.ignored.retain(|&c| c != collider);
    }

    pub fn clear_ignored_colliders(&mut self) {
        self.ignored.clear();
    }

    pub fn ignored_colliders(&self) -> &[ColliderId] {
        &self.ignored
    }
}

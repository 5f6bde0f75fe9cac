//! Reference movement state machine: idle, walk, roll, and fall.
//!
//! The machine is the controller's [`Motor`]. Each tick it picks a move direction from the
//! current state and input, then translates the controller by it.

use kcc::{Controller, Motor, Vec3, math::project_vector_on_plane};
use log::debug;
use serde::{Deserialize, Serialize};

/// Movement tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerTuning {
    pub walk_speed: f32,
    pub walk_acceleration: f32,
    pub gravity: f32,
    pub roll_speed: f32,
    pub roll_duration: f32,
    /// Ground distance that counts as landing while falling.
    pub acquire_ground_tolerance: f32,
    /// Ground distance that keeps a grounded state grounded.
    pub maintain_ground_tolerance: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            walk_speed: 4.0,
            walk_acceleration: 30.0,
            gravity: 25.0,
            roll_speed: 10.0,
            roll_duration: 0.5,
            acquire_ground_tolerance: 0.01,
            maintain_ground_tolerance: 0.5,
        }
    }
}

/// Input sampled for the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    /// Local move axes: `x` strafes right, `z` moves forward.
    pub move_input: Vec3,
    /// Roll was pressed this frame.
    pub roll: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Walk,
    Roll,
    Fall,
}

pub struct PlayerMachine {
    tuning: PlayerTuning,
    state: PlayerState,
    input: PlayerInput,
    move_direction: Vec3,
    look_direction: Vec3,
    roll_timer: f32,
    roll_direction: Vec3,
}

impl PlayerMachine {
    pub fn new(tuning: PlayerTuning) -> Self {
        Self {
            tuning,
            state: PlayerState::Idle,
            input: PlayerInput::default(),
            move_direction: Vec3::zeros(),
            look_direction: Vec3::z(),
            roll_timer: 0.0,
            roll_direction: Vec3::zeros(),
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn move_direction(&self) -> Vec3 {
        self.move_direction
    }

    pub fn set_input(&mut self, input: PlayerInput) {
        self.input = input;
    }

    fn acquiring_ground(&self, controller: &Controller) -> bool {
        controller
            .ground()
            .is_grounded(false, self.tuning.acquire_ground_tolerance)
            .is_some()
    }

    fn maintaining_ground(&self, controller: &Controller) -> bool {
        controller
            .ground()
            .is_grounded(true, self.tuning.maintain_ground_tolerance)
            .is_some()
    }

    fn local_movement(&self, controller: &Controller) -> Vec3 {
        let right = controller.up().cross(&self.look_direction);
        let mut local = Vec3::zeros();
        if self.input.move_input.x != 0.0 {
            local += right * self.input.move_input.x;
        }
        if self.input.move_input.z != 0.0 {
            local += self.look_direction * self.input.move_input.z;
        }
        local.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)
    }

    fn has_move_input(&self) -> bool {
        self.input.move_input != Vec3::zeros()
    }

    fn transition(&mut self, controller: &mut Controller, next: PlayerState) {
        debug!("player: {:?} -> {:?}", self.state, next);
        self.state = next;
        match next {
            PlayerState::Idle => {
                controller.enable_slope_limit();
                controller.enable_clamping();
            }
            PlayerState::Roll | PlayerState::Fall => {
                controller.disable_clamping();
                controller.disable_slope_limit();
            }
            PlayerState::Walk => {}
        }
    }

    fn start_roll(&mut self, controller: &mut Controller) {
        self.roll_direction = self.local_movement(controller);
        self.roll_timer = self.tuning.roll_duration;
        self.transition(controller, PlayerState::Roll);
    }

    fn idle(&mut self, controller: &mut Controller, dt: f32) {
        if !self.maintaining_ground(controller) {
            return self.transition(controller, PlayerState::Fall);
        }
        if self.input.roll && self.has_move_input() {
            return self.start_roll(controller);
        }
        if self.has_move_input() {
            return self.transition(controller, PlayerState::Walk);
        }
        self.move_direction = move_towards(self.move_direction, Vec3::zeros(), 10.0 * dt);
    }

    fn walk(&mut self, controller: &mut Controller, dt: f32) {
        if !self.maintaining_ground(controller) {
            return self.transition(controller, PlayerState::Fall);
        }
        if self.input.roll && self.has_move_input() {
            return self.start_roll(controller);
        }
        if self.has_move_input() {
            let target = self.local_movement(controller) * self.tuning.walk_speed;
            self.move_direction =
                move_towards(self.move_direction, target, self.tuning.walk_acceleration * dt);
        } else {
            self.transition(controller, PlayerState::Idle);
        }
    }

    fn roll(&mut self, controller: &mut Controller, dt: f32) {
        self.roll_timer -= dt;
        self.move_direction = self.roll_direction * self.tuning.roll_speed;
        if self.roll_timer <= 0.0 || !self.has_move_input() {
            self.transition(controller, PlayerState::Idle);
        }
    }

    fn fall(&mut self, controller: &mut Controller, dt: f32) {
        if self.acquiring_ground(controller) {
            self.move_direction = project_vector_on_plane(controller.up(), self.move_direction);
            return self.transition(controller, PlayerState::Idle);
        }
        self.move_direction -= controller.up() * self.tuning.gravity * dt;
    }
}

impl Motor for PlayerMachine {
    fn super_update(&mut self, controller: &mut Controller, dt: f32) {
        match self.state {
            PlayerState::Idle => self.idle(controller, dt),
            PlayerState::Walk => self.walk(controller, dt),
            PlayerState::Roll => self.roll(controller, dt),
            PlayerState::Fall => self.fall(controller, dt),
        }
        controller.translate(self.move_direction * dt);
    }
}

/// Move `current` toward `target` by at most `max_delta`.
fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let to_target = target - current;
    let distance = to_target.norm();
    if distance <= max_delta || distance == 0.0 {
        target
    } else {
        current + to_target / distance * max_delta
    }
}

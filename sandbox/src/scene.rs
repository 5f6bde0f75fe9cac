//! RON scene description: colliders, spawn point, player tuning and a scripted input track.

use std::path::Path;

use kcc::{
    ColliderDef, ColliderId, ColliderShapeDef, ConfigError, ControllerConfig, Layer, Quat,
    QueryWorld, SurfaceType, Vec3,
};
use serde::{Deserialize, Serialize};

use crate::player::{PlayerInput, PlayerTuning};

type Tuple3 = (f32, f32, f32);

fn vec3((x, y, z): Tuple3) -> Vec3 {
    Vec3::new(x, y, z)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SceneShape {
    Plane { offset_along_normal: f32 },
    Cuboid { half_extents: Tuple3 },
    Sphere { radius: f32 },
    CapsuleY { radius: f32, half_height: f32 },
    CylinderY { radius: f32, half_height: f32 },
    RoundCuboid { half_extents: Tuple3, border_radius: f32 },
}

impl From<&SceneShape> for ColliderShapeDef {
    fn from(shape: &SceneShape) -> Self {
        match *shape {
            SceneShape::Plane {
                offset_along_normal,
            } => ColliderShapeDef::Plane {
                offset_along_normal,
            },
            SceneShape::Cuboid { half_extents } => ColliderShapeDef::Cuboid {
                half_extents: vec3(half_extents),
            },
            SceneShape::Sphere { radius } => ColliderShapeDef::Sphere { radius },
            SceneShape::CapsuleY {
                radius,
                half_height,
            } => ColliderShapeDef::CapsuleY {
                radius,
                half_height,
            },
            SceneShape::CylinderY {
                radius,
                half_height,
            } => ColliderShapeDef::CylinderY {
                radius,
                half_height,
            },
            SceneShape::RoundCuboid {
                half_extents,
                border_radius,
            } => ColliderShapeDef::RoundCuboid {
                half_extents: vec3(half_extents),
                border_radius,
            },
        }
    }
}

/// Back-and-forth motion along an axis, used for moving platforms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Oscillation {
    pub axis: Tuple3,
    pub amplitude: f32,
    /// Seconds per full cycle.
    pub period: f32,
}

impl Oscillation {
    pub fn offset(&self, time: f32) -> Vec3 {
        let phase = std::f32::consts::TAU * time / self.period.max(f32::EPSILON);
        vec3(self.axis) * self.amplitude * phase.sin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneCollider {
    pub shape: SceneShape,
    #[serde(default)]
    pub translation: Tuple3,
    /// Euler angles (roll, pitch, yaw) in degrees.
    #[serde(default)]
    pub rotation_deg: Tuple3,
    #[serde(default)]
    pub layer: Layer,
    #[serde(default)]
    pub trigger: bool,
    #[serde(default)]
    pub surface: Option<SurfaceType>,
    #[serde(default)]
    pub motion: Option<Oscillation>,
}

impl SceneCollider {
    fn def(&self) -> ColliderDef {
        let (roll, pitch, yaw) = self.rotation_deg;
        let rotation = Quat::from_euler_angles(roll.to_radians(), pitch.to_radians(), yaw.to_radians());
        let mut def = ColliderDef::new((&self.shape).into())
            .with_translation(vec3(self.translation))
            .with_rotation(rotation)
            .with_layer(self.layer);
        if let Some(surface) = self.surface {
            def = def.with_surface(surface);
        }
        if self.trigger {
            def = def.trigger();
        }
        def
    }
}

/// One stretch of held input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub duration: f32,
    #[serde(default)]
    pub move_input: Tuple3,
    /// Press roll on the first frame of the segment.
    #[serde(default)]
    pub roll: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Scene {
    pub controller: ControllerConfig,
    pub player: PlayerTuning,
    pub spawn: Tuple3,
    /// Host frame length (seconds).
    pub frame_delta: f32,
    pub colliders: Vec<SceneCollider>,
    pub script: Vec<Segment>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            player: PlayerTuning::default(),
            spawn: (0.0, 0.0, 0.0),
            frame_delta: 1.0 / 60.0,
            colliders: Vec::new(),
            script: Vec::new(),
        }
    }
}

/// A collider that moves over time.
pub struct MovingCollider {
    pub id: ColliderId,
    pub origin: Vec3,
    pub motion: Oscillation,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let scene = Self::from_ron(&contents)?;
        log::info!(
            "Loaded scene from {} ({} colliders, {} script segments)",
            path.display(),
            scene.colliders.len(),
            scene.script.len()
        );
        Ok(scene)
    }

    pub fn from_ron(contents: &str) -> Result<Self, ConfigError> {
        let scene: Scene = ron::from_str(contents).map_err(ConfigError::Parse)?;
        scene.controller.validate()?;
        Ok(scene)
    }

    pub fn spawn(&self) -> kcc::Point3 {
        vec3(self.spawn).into()
    }

    /// Populate a query world and return the colliders that need per-frame motion.
    pub fn build_world(&self) -> (QueryWorld, Vec<MovingCollider>) {
        let mut world = QueryWorld::new();
        let mut moving = Vec::new();
        for collider in &self.colliders {
            let id = world.insert(collider.def());
            if let Some(motion) = &collider.motion {
                moving.push(MovingCollider {
                    id,
                    origin: vec3(collider.translation),
                    motion: motion.clone(),
                });
            }
        }
        (world, moving)
    }

    /// Input for each frame of the script, in order.
    pub fn frames(&self) -> Vec<PlayerInput> {
        let mut frames = Vec::new();
        for segment in &self.script {
            let count = (segment.duration / self.frame_delta).round() as usize;
            for i in 0..count {
                frames.push(PlayerInput {
                    move_input: vec3(segment.move_input),
                    roll: segment.roll && i == 0,
                });
            }
        }
        frames
    }
}

pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod ground;
pub mod layers;
pub mod math;
pub mod pushback;
pub mod query_world;
pub mod scratch;
pub mod sphere;
pub mod surface;
pub mod types;
pub mod world;

pub use config::{ControllerConfig, DebugConfig, Timestep};
pub use constants::{TINY_TOLERANCE, TOLERANCE};
pub use controller::{Controller, Motor};
pub use error::{ConfigError, KccError};
pub use ground::{Ground, GroundHit, ProbeContext};
pub use layers::{Layer, LayerMask, QueryFilter, TriggerPolicy};
pub use pushback::{Contact, PushbackContext, recursive_pushback};
pub use query_world::{ColliderDef, ColliderShapeDef, QueryWorld};
pub use scratch::ScratchLayer;
pub use sphere::{CollisionSphere, SphereSet};
pub use surface::SurfaceType;
pub use types::{ColliderId, Point3, Quat, RayHit, Transform, Vec3};
pub use world::PhysicsWorld;

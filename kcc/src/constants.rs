/*!
Controller tolerances and tuning constants.

Notes
- Distances are in meters, angles in degrees, time in seconds.
- Per-controller values (radius, sphere layout, layers, timestep) live in
  `config::ControllerConfig`; these are the fixed numbers the probing and pushback
  algorithms are tuned around.
*/

use crate::layers::Layer;

/// Vertical lift applied to probe origins so they start clear of the surface being probed.
pub const TOLERANCE: f32 = 0.05;

/// Small offset used for auxiliary probe origins and the pushback direction test.
pub const TINY_TOLERANCE: f32 = 0.01;

/// Default number of extra pushback passes after the first one.
pub const MAX_PUSHBACK_ITERATIONS: u32 = 2;

/// Layer reserved for scratch queries unless the config picks another.
pub const DEFAULT_SCRATCH_LAYER: Layer = Layer(31);

/// Length used for "unbounded" casts.
///
/// Worlds are finite; anything farther than this is treated as no hit.
pub const MAX_QUERY_DISTANCE: f32 = 10_000.0;

/// Ground angle (degrees) at which the steady-ground ratio reaches its maximum.
pub const GROUNDING_UPPER_BOUND_ANGLE: f32 = 60.0;

/// Fraction of the radius a point may sit from the centreline on steep (upper bound) ground.
pub const GROUNDING_MAX_PERCENT_FROM_CENTER: f32 = 0.85;

/// Fraction of the radius a point may sit from the centreline on flat ground.
pub const GROUNDING_MIN_PERCENT_FROM_CENTER: f32 = 0.50;

/// Rotation (degrees) applied to the outward direction when placing the far probe.
pub const FAR_PROBE_ROTATION_DEG: f32 = -80.0;

/// Multiplier applied to the rotated outward offset when placing the far probe.
pub const FAR_PROBE_SCALE: f32 = 3.0;

/// Surface stand angle (degrees) for colliders without their own surface type.
pub const DEFAULT_STAND_ANGLE_DEG: f32 = 80.0;

/// Surface slope limit (degrees) for colliders without their own surface type.
pub const DEFAULT_SLOPE_LIMIT_DEG: f32 = 80.0;

/// Default controller radius (meters).
pub const DEFAULT_RADIUS: f32 = 0.5;

/// Default fixed update rate when the fixed timestep is selected (Hz).
pub const DEFAULT_FIXED_UPDATES_PER_SECOND: u32 = 60;

/// Default bound on fixed sub-steps run for one host frame.
pub const DEFAULT_MAX_SUBSTEPS: u32 = 8;

/// Practical small distance for comparisons (meters).
pub const DIST_EPS: f32 = 1.0e-6;

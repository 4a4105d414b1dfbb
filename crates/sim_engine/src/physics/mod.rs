//! Physics state management
//!
//! Backend selection is made once at scene construction: either the rapier
//! rigid-body world or the kinematic no-physics fallback. The fallback keeps
//! the whole pose surface usable (scene-graph transforms) while physics-only
//! queries fail with `UnsupportedOperation`.

pub mod query;
pub mod rapier_world;

pub use query::{Ray, RaycastHit, RaycastResults};
pub use rapier_world::RapierWorld;

use std::str::FromStr;

use crate::core::error::SimError;
use crate::foundation::math::{Quat, RigidState, Vec3};

/// How an object participates in simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionType {
    /// Immovable but collidable
    Static,
    /// Moved by explicit pose or velocity-control targets, unaffected by
    /// forces
    Kinematic,
    /// Fully simulated
    Dynamic,
}

impl MotionType {
    /// Parse a motion type from its integer encoding
    pub fn from_index(index: i32) -> Result<Self, SimError> {
        match index {
            0 => Ok(Self::Static),
            1 => Ok(Self::Kinematic),
            2 => Ok(Self::Dynamic),
            other => Err(SimError::InvalidArgument(format!(
                "unrecognized motion type index {other}"
            ))),
        }
    }
}

impl FromStr for MotionType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" | "STATIC" => Ok(Self::Static),
            "kinematic" | "KINEMATIC" => Ok(Self::Kinematic),
            "dynamic" | "DYNAMIC" => Ok(Self::Dynamic),
            other => Err(SimError::InvalidArgument(format!(
                "unrecognized motion type '{other}'"
            ))),
        }
    }
}

/// Identity of the physics implementation behind a scene
///
/// Lets callers detect physics-query availability before issuing
/// backend-only operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsSimulationLibrary {
    /// No backend; kinematic scene-graph fallback
    None,
    /// rapier3d rigid-body backend
    Rapier,
}

/// Constant velocity-control targets applied to an object each fixed step
///
/// Targets drive `Kinematic` objects by pose integration and `Dynamic`
/// objects by velocity writes; they do nothing for `Static` objects.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityControl {
    /// Target linear velocity
    pub linear_velocity: Vec3,
    /// Target angular velocity (axis scaled by rad/s)
    pub angular_velocity: Vec3,
    /// Apply the linear target
    pub controlling_lin_vel: bool,
    /// Apply the angular target
    pub controlling_ang_vel: bool,
    /// Interpret the linear target in the object's local frame
    pub lin_vel_is_local: bool,
    /// Interpret the angular target in the object's local frame
    pub ang_vel_is_local: bool,
}

impl Default for VelocityControl {
    fn default() -> Self {
        Self {
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            controlling_lin_vel: false,
            controlling_ang_vel: false,
            lin_vel_is_local: false,
            ang_vel_is_local: false,
        }
    }
}

impl VelocityControl {
    /// Whether any target is active
    pub fn is_active(&self) -> bool {
        self.controlling_lin_vel || self.controlling_ang_vel
    }

    /// The world-frame linear velocity this control requests at `pose`
    pub fn world_linear_velocity(&self, pose: &RigidState) -> Vec3 {
        if self.lin_vel_is_local {
            pose.rotation * self.linear_velocity
        } else {
            self.linear_velocity
        }
    }

    /// The world-frame angular velocity this control requests at `pose`
    pub fn world_angular_velocity(&self, pose: &RigidState) -> Vec3 {
        if self.ang_vel_is_local {
            pose.rotation * self.angular_velocity
        } else {
            self.angular_velocity
        }
    }

    /// Integrate `pose` forward by `dt` under the active targets
    pub fn integrate(&self, dt: f32, pose: &RigidState) -> RigidState {
        let mut result = pose.clone();

        if self.controlling_lin_vel {
            result.translation += self.world_linear_velocity(pose) * dt;
        }

        if self.controlling_ang_vel {
            let omega = self.world_angular_velocity(pose) * dt;
            let angle = omega.norm();
            if angle > f32::EPSILON {
                let axis = nalgebra::Unit::new_normalize(omega);
                let dq = Quat::from_axis_angle(&axis, angle);
                result.rotation = dq * result.rotation;
            }
        }

        result
    }
}

/// Fixed-timestep accumulator
///
/// Requested time is added to a remainder; whole fixed steps are consumed
/// per call, bounded by `max_substeps`. The leftover remainder persists
/// across calls, so the time actually advanced may differ from the request.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    fixed_dt: f32,
    max_substeps: u32,
    remainder: f32,
}

impl FixedStepClock {
    /// Create a clock with the given integrator parameters
    pub fn new(fixed_dt: f32, max_substeps: u32) -> Self {
        Self {
            fixed_dt,
            max_substeps: max_substeps.max(1),
            remainder: 0.0,
        }
    }

    /// The fixed integrator timestep
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Discard any carried remainder
    pub fn reset(&mut self) {
        self.remainder = 0.0;
    }

    /// Consume up to `max_substeps` whole fixed steps from `dt` plus the
    /// carried remainder, returning the number of steps to integrate
    ///
    /// When the cap is hit, excess time beyond one extra step is discarded so
    /// a long stall cannot snowball into an unbounded catch-up burst.
    pub fn consume(&mut self, dt: f32) -> u32 {
        self.remainder += dt.max(0.0);

        let mut steps = (self.remainder / self.fixed_dt) as u32;
        if steps > self.max_substeps {
            log::trace!(
                "step request of {:.4}s exceeds {} substeps; discarding excess",
                dt,
                self.max_substeps
            );
            steps = self.max_substeps;
        }

        self.remainder -= steps as f32 * self.fixed_dt;
        if self.remainder > self.fixed_dt {
            self.remainder = self.fixed_dt;
        }
        steps
    }
}

/// The per-scene physics backend, chosen once at scene construction
#[derive(Debug)]
pub enum PhysicsBackend {
    /// No physics; poses live on scene-graph nodes only
    NoPhysics {
        /// Scene gravity, stored for accessor symmetry with the rapier
        /// backend (nothing integrates against it)
        gravity: Vec3,
    },
    /// rapier3d rigid-body world
    Rapier(RapierWorld),
}

impl PhysicsBackend {
    /// Identity of the backend implementation
    pub fn library(&self) -> PhysicsSimulationLibrary {
        match self {
            Self::NoPhysics { .. } => PhysicsSimulationLibrary::None,
            Self::Rapier(_) => PhysicsSimulationLibrary::Rapier,
        }
    }

    /// Whether physics-only queries are available
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Rapier(_))
    }

    /// Scene gravity vector
    pub fn gravity(&self) -> Vec3 {
        match self {
            Self::NoPhysics { gravity } => *gravity,
            Self::Rapier(world) => world.gravity(),
        }
    }

    /// Set the scene gravity vector
    pub fn set_gravity(&mut self, gravity: Vec3) {
        match self {
            Self::NoPhysics { gravity: g } => *g = gravity,
            Self::Rapier(world) => world.set_gravity(gravity),
        }
    }
}

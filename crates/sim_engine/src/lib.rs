//! # Sim Engine
//!
//! An embodied-agent simulation core: scenes of rigid objects instanced
//! from template registries, driven by a fixed-step physics backend with a
//! kinematic fallback, with navmesh and lighting registries alongside.
//!
//! ## Features
//!
//! - **Template registries**: Named blueprints for assets, objects, stages,
//!   and physics configuration, instanced by snapshot
//! - **Scene graph**: Hierarchical transforms with world-space get/set
//! - **Physics**: rapier3d rigid-body backend or a no-physics kinematic
//!   fallback, selected per session
//! - **Velocity control**: Constant-velocity targets integrated each fixed
//!   step for kinematic and dynamic objects
//! - **Navigation**: Occupancy-grid navmesh rebuilt from stage bounds and
//!   static obstacles
//! - **Lighting**: Named light setups shared by key across scenes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sim_engine::prelude::*;
//!
//! fn main() -> SimResult<()> {
//!     let config = SimulatorConfiguration {
//!         enable_physics: true,
//!         ..Default::default()
//!     };
//!     let mut sim = Simulator::new(config)?;
//!     let scene = sim.default_scene_id();
//!
//!     sim.templates_mut()
//!         .objects
//!         .register("crate", ObjectTemplate::default());
//!     let object = sim.add_object_by_handle("crate", scene, None)?;
//!     sim.set_translation(Vec3::new(0.0, 2.0, 0.0), object, scene)?;
//!
//!     for _ in 0..60 {
//!         sim.step_world(scene, 1.0 / 60.0)?;
//!     }
//!     println!("settled at {:?}", sim.translation(object, scene)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]
#![allow(clippy::missing_errors_doc, clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

pub mod core;
pub mod foundation;
pub mod lighting;
pub mod nav;
pub mod physics;
pub mod scene;
pub mod sim;
pub mod templates;

pub use crate::core::config::SimulatorConfiguration;
pub use crate::core::error::{ConfigError, SimError, SimResult};
pub use crate::sim::Simulator;

/// Common imports for simulator users
pub mod prelude {
    pub use crate::{
        core::config::SimulatorConfiguration,
        core::error::{SimError, SimResult},
        foundation::math::{Aabb, Point3, Quat, RigidState, Transform, Vec3},
        lighting::{LightInfo, LightPositionModel, LightSetup, DEFAULT_LIGHTING_KEY, NO_LIGHT_KEY},
        nav::{NavMeshSettings, PathFinder},
        physics::{MotionType, PhysicsSimulationLibrary, Ray, RaycastHit, RaycastResults, VelocityControl},
        scene::{ObjectId, Scene, SceneId},
        sim::Simulator,
        templates::{
            AssetTemplate, CollisionShape, ObjectTemplate, PhysicsTemplate, StageTemplate,
            TemplateId, TemplateRegistry,
        },
    };
}

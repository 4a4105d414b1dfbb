//! Scenes, scene graphs, and object instances
//!
//! A [`Scene`] exclusively owns its [`SceneGraph`], its object instances,
//! and its physics backend; teardown destroys physics bodies before scene
//! nodes. Scenes are logically independent but share the process-wide
//! template and light registries owned by the simulator.

pub mod scene_graph;

mod object;
#[allow(clippy::module_inception)]
mod scene;

pub use object::ObjectInstance;
pub use scene::Scene;
pub use scene_graph::{NodeId, SceneGraph, SceneNode};

use serde::{Deserialize, Serialize};

/// Per-scene identifier of an instanced object
///
/// Unique within a scene and never reused while the scene is live.
pub type ObjectId = u32;

/// Identifier of a scene within a simulator
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SceneId(pub u64);

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

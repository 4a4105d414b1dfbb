//! Object instance records

use rapier3d::prelude::RigidBodyHandle;

use crate::physics::{MotionType, VelocityControl};
use crate::scene::scene_graph::NodeId;
use crate::scene::ObjectId;
use crate::templates::ObjectTemplate;

/// An instanced object inside one scene
///
/// Created from a template snapshot copied at creation time; later edits to
/// the registered template never affect this record. The instance roots a
/// scene-graph subtree (root node plus a visual node for render assets) and
/// optionally owns a physics body.
#[derive(Debug)]
pub struct ObjectInstance {
    pub(crate) object_id: ObjectId,
    pub(crate) template: ObjectTemplate,
    pub(crate) root_node: NodeId,
    pub(crate) visual_node: NodeId,
    pub(crate) motion_type: MotionType,
    pub(crate) body: Option<RigidBodyHandle>,
    pub(crate) semantic_id: u32,
    pub(crate) light_setup_key: String,
    pub(crate) velocity_control: VelocityControl,
    pub(crate) bb_draw: bool,
}

impl ObjectInstance {
    /// This instance's id within its scene
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// The template snapshot frozen at creation time
    pub fn template(&self) -> &ObjectTemplate {
        &self.template
    }

    /// Root node of this instance's scene-graph subtree
    pub fn root_node(&self) -> NodeId {
        self.root_node
    }

    /// Node the instance's render assets attach to
    pub fn visual_node(&self) -> NodeId {
        self.visual_node
    }

    /// Current motion type
    pub fn motion_type(&self) -> MotionType {
        self.motion_type
    }

    /// Semantic id applied to the instance's visual nodes
    pub fn semantic_id(&self) -> u32 {
        self.semantic_id
    }

    /// Key of the light setup this instance's drawables reference
    pub fn light_setup_key(&self) -> &str {
        &self.light_setup_key
    }

    /// Velocity-control targets applied each fixed step
    pub fn velocity_control(&self) -> &VelocityControl {
        &self.velocity_control
    }

    /// Whether bounding-box visualization is enabled
    pub fn bb_draw(&self) -> bool {
        self.bb_draw
    }
}

//! Per-scene spatial node tree
//!
//! Every object instance roots a subtree of [`SceneNode`]s. Nodes hold local
//! transforms; a parent exclusively owns its children, so removing a subtree
//! removes every descendant. Node keys come from a slotmap arena, which makes
//! stale keys detectable instead of dangling.

use slotmap::{new_key_type, SlotMap};

use crate::core::error::{SimError, SimResult};
use crate::foundation::math::Transform;

new_key_type! {
    /// Stable key of a node in a [`SceneGraph`]
    pub struct NodeId;
}

/// A node in the spatial hierarchy carrying a local transform
#[derive(Debug, Clone)]
pub struct SceneNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    transform: Transform,
    semantic_id: u32,
}

impl SceneNode {
    fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            transform: Transform::identity(),
            semantic_id: 0,
        }
    }

    /// Local transform relative to the parent node
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Parent node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes owned by this node
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Semantic id attached to this node
    pub fn semantic_id(&self) -> u32 {
        self.semantic_id
    }
}

/// Tree of spatial nodes for one scene
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,
}

impl SceneGraph {
    /// Create a graph containing only the root node
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new(None));
        Self { nodes, root }
    }

    /// The root node of this graph
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether a node key is still live in this graph
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds only the root
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Create a child node under `parent`
    pub fn create_child(&mut self, parent: NodeId) -> SimResult<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(SimError::NotFound("parent scene node is not live".into()));
        }
        let child = self.nodes.insert(SceneNode::new(Some(parent)));
        self.nodes[parent].children.push(child);
        Ok(child)
    }

    /// Borrow a node
    pub fn node(&self, node: NodeId) -> SimResult<&SceneNode> {
        self.nodes
            .get(node)
            .ok_or_else(|| SimError::NotFound("scene node is not live".into()))
    }

    /// Local transform of a node
    pub fn transform(&self, node: NodeId) -> SimResult<&Transform> {
        Ok(&self.node(node)?.transform)
    }

    /// Set the local transform of a node
    pub fn set_transform(&mut self, node: NodeId, transform: Transform) -> SimResult<()> {
        let entry = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| SimError::NotFound("scene node is not live".into()))?;
        entry.transform = transform;
        Ok(())
    }

    /// World transform of a node (composition of the ancestor chain)
    pub fn world_transform(&self, node: NodeId) -> SimResult<Transform> {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let entry = self.node(id)?;
            chain.push(&entry.transform);
            current = entry.parent;
        }

        let mut world = Transform::identity();
        for local in chain.iter().rev() {
            world = world.combine(local);
        }
        Ok(world)
    }

    /// Set a node's local transform such that its world transform becomes
    /// `world`
    pub fn set_world_transform(&mut self, node: NodeId, world: &Transform) -> SimResult<()> {
        let parent_world = match self.node(node)?.parent {
            Some(parent) => self.world_transform(parent)?,
            None => Transform::identity(),
        };
        self.set_transform(node, parent_world.inverse().combine(world))
    }

    /// Remove a node and its entire subtree
    ///
    /// The root cannot be removed. Keys of removed nodes become stale and
    /// fail subsequent lookups.
    pub fn remove_subtree(&mut self, node: NodeId) -> SimResult<()> {
        if node == self.root {
            return Err(SimError::InvalidArgument(
                "the scene graph root cannot be removed".into(),
            ));
        }
        let entry = self
            .nodes
            .remove(node)
            .ok_or_else(|| SimError::NotFound("scene node is not live".into()))?;

        if let Some(parent) = entry.parent {
            if let Some(parent_entry) = self.nodes.get_mut(parent) {
                parent_entry.children.retain(|&child| child != node);
            }
        }

        let mut stack = entry.children;
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.nodes.remove(id) {
                stack.extend(removed.children);
            }
        }
        Ok(())
    }

    /// Set the semantic id of a node and every descendant
    pub fn set_subtree_semantic_id(&mut self, node: NodeId, semantic_id: u32) -> SimResult<()> {
        if !self.nodes.contains_key(node) {
            return Err(SimError::NotFound("scene node is not live".into()));
        }
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.nodes.get_mut(id) {
                entry.semantic_id = semantic_id;
                stack.extend(entry.children.iter().copied());
            }
        }
        Ok(())
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Vec3};
    use approx::assert_relative_eq;

    #[test]
    fn test_create_and_remove_subtree() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = graph.create_child(root).unwrap();
        let b = graph.create_child(a).unwrap();
        let c = graph.create_child(b).unwrap();
        assert_eq!(graph.len(), 4);

        graph.remove_subtree(a).unwrap();

        assert_eq!(graph.len(), 1);
        assert!(!graph.contains(a));
        assert!(!graph.contains(b));
        assert!(!graph.contains(c));
        assert!(graph.node(root).unwrap().children().is_empty());
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut graph = SceneGraph::new();
        let root = graph.root();

        assert!(matches!(
            graph.remove_subtree(root),
            Err(SimError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_world_transform_composes_ancestors() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_child(graph.root()).unwrap();
        let child = graph.create_child(parent).unwrap();

        graph
            .set_transform(parent, Transform::from_position(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        graph
            .set_transform(child, Transform::from_position(Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();

        let world = graph.world_transform(child).unwrap();
        assert_relative_eq!(world.position, Vec3::new(1.0, 2.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_set_world_transform_under_rotated_parent() {
        let mut graph = SceneGraph::new();
        let parent = graph.create_child(graph.root()).unwrap();
        let child = graph.create_child(parent).unwrap();

        graph
            .set_transform(
                parent,
                Transform::from_position_rotation(
                    Vec3::new(0.0, 1.0, 0.0),
                    Quat::from_euler_angles(0.0, std::f32::consts::FRAC_PI_2, 0.0),
                ),
            )
            .unwrap();

        let target = Transform::from_position(Vec3::new(3.0, 1.0, -2.0));
        graph.set_world_transform(child, &target).unwrap();

        let world = graph.world_transform(child).unwrap();
        assert_relative_eq!(world.position, target.position, epsilon = 1e-5);
    }

    #[test]
    fn test_subtree_semantic_id() {
        let mut graph = SceneGraph::new();
        let a = graph.create_child(graph.root()).unwrap();
        let b = graph.create_child(a).unwrap();

        graph.set_subtree_semantic_id(a, 17).unwrap();

        assert_eq!(graph.node(a).unwrap().semantic_id(), 17);
        assert_eq!(graph.node(b).unwrap().semantic_id(), 17);
        assert_eq!(graph.node(graph.root()).unwrap().semantic_id(), 0);
    }

    #[test]
    fn test_stale_key_fails_not_found() {
        let mut graph = SceneGraph::new();
        let a = graph.create_child(graph.root()).unwrap();
        graph.remove_subtree(a).unwrap();

        assert!(matches!(graph.transform(a), Err(SimError::NotFound(_))));
    }
}

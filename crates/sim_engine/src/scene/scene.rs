//! Scene: object instance registry and physics-state synchronization
//!
//! The scene keeps three parallel representations consistent: the
//! scene-graph transform, the physics-body state (when a backend is
//! enabled), and presentation metadata. Pose writes are teleports pushed
//! into the body immediately; stepping integrates the backend and writes
//! resulting poses back into the graph.

use std::collections::BTreeMap;

use rapier3d::prelude::RigidBodyHandle;

use crate::core::error::{SimError, SimResult};
use crate::foundation::math::{Aabb, Quat, RigidState, Transform, Vec3};
use crate::nav::{build_navmesh, NavMeshSettings, PathFinder};
use crate::physics::{
    FixedStepClock, MotionType, PhysicsBackend, PhysicsSimulationLibrary, Ray, RaycastResults,
    VelocityControl,
};
use crate::physics::rapier_world::RapierWorld;
use crate::scene::object::ObjectInstance;
use crate::scene::scene_graph::{NodeId, SceneGraph, SceneNode};
use crate::scene::{ObjectId, SceneId};
use crate::templates::{ObjectTemplate, PhysicsTemplate, StageTemplate};

/// One independent simulation scene
///
/// Exclusively owns its scene graph, object instances, physics backend, and
/// default pathfinder. Object ids ascend in insertion order and are never
/// reused while the scene is live.
#[derive(Debug)]
pub struct Scene {
    id: SceneId,
    graph: SceneGraph,
    objects: BTreeMap<ObjectId, ObjectInstance>,
    next_object_id: ObjectId,
    backend: PhysicsBackend,
    clock: FixedStepClock,
    world_time: f64,
    pathfinder: PathFinder,
    stage: StageTemplate,
}

impl Scene {
    /// Build a scene from a stage template snapshot
    ///
    /// With physics enabled the stage's static collision geometry is
    /// instanced into a fresh rapier world; otherwise the scene runs the
    /// kinematic no-physics fallback.
    pub fn new(
        id: SceneId,
        stage: StageTemplate,
        physics_config: &PhysicsTemplate,
        enable_physics: bool,
    ) -> Self {
        let backend = if enable_physics {
            let mut world = RapierWorld::new(physics_config.gravity, physics_config.fixed_dt);
            for def in &stage.statics {
                world.add_stage_collider(def, stage.friction, stage.restitution);
            }
            PhysicsBackend::Rapier(world)
        } else {
            PhysicsBackend::NoPhysics {
                gravity: physics_config.gravity,
            }
        };

        log::info!(
            "scene {} created ({} backend, {} stage colliders)",
            id,
            match backend.library() {
                PhysicsSimulationLibrary::None => "no-physics",
                PhysicsSimulationLibrary::Rapier => "rapier",
            },
            stage.statics.len()
        );

        Self {
            id,
            graph: SceneGraph::new(),
            objects: BTreeMap::new(),
            next_object_id: 0,
            backend,
            clock: FixedStepClock::new(physics_config.fixed_dt, physics_config.max_substeps),
            world_time: 0.0,
            pathfinder: PathFinder::new(),
            stage,
        }
    }

    /// This scene's id
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Identity of the physics implementation behind this scene
    pub fn physics_library(&self) -> PhysicsSimulationLibrary {
        self.backend.library()
    }

    /// Borrow this scene's graph; valid for the scene's lifetime
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The stage template snapshot this scene was built from
    pub fn stage(&self) -> &StageTemplate {
        &self.stage
    }

    /// Borrow the scene-owned pathfinder; valid for the scene's lifetime
    pub fn pathfinder(&self) -> &PathFinder {
        &self.pathfinder
    }

    /// Mutably borrow the scene-owned pathfinder
    pub fn pathfinder_mut(&mut self) -> &mut PathFinder {
        &mut self.pathfinder
    }

    // ---------------------------------------------------------------------
    // Object lifecycle
    // ---------------------------------------------------------------------

    /// Instance an object from a template snapshot
    ///
    /// The snapshot is copied into the instance record; later template edits
    /// never affect it. The object roots a new subtree (root node + visual
    /// node) under `parent` or the graph root, initially at the origin.
    pub fn add_object(
        &mut self,
        template: ObjectTemplate,
        light_setup_key: &str,
        parent: Option<NodeId>,
    ) -> SimResult<ObjectId> {
        let parent = parent.unwrap_or_else(|| self.graph.root());
        let root_node = self.graph.create_child(parent)?;
        let visual_node = self.graph.create_child(root_node)?;

        self.graph.set_transform(
            root_node,
            Transform {
                scale: template.scale,
                ..Transform::identity()
            },
        )?;
        self.graph
            .set_subtree_semantic_id(visual_node, template.semantic_id)?;

        let object_id = self.next_object_id;
        self.next_object_id += 1;

        let (body, motion_type) = match &mut self.backend {
            PhysicsBackend::Rapier(world) => {
                let handle = world.create_body(object_id, &template, &RigidState::default());
                (Some(handle), MotionType::Dynamic)
            }
            PhysicsBackend::NoPhysics { .. } => (None, MotionType::Kinematic),
        };

        let semantic_id = template.semantic_id;
        self.objects.insert(
            object_id,
            ObjectInstance {
                object_id,
                template,
                root_node,
                visual_node,
                motion_type,
                body,
                semantic_id,
                light_setup_key: light_setup_key.to_string(),
                velocity_control: VelocityControl::default(),
                bb_draw: false,
            },
        );

        log::info!("scene {}: object {} instanced", self.id, object_id);
        Ok(object_id)
    }

    /// Remove an object instance
    ///
    /// The physics body is destroyed before any scene node is pruned. The
    /// node flags optionally leave the root or visual subtree in place for
    /// external observers; deleting a root that still carries foreign child
    /// nodes (an attached agent, for example) logs a non-fatal warning.
    pub fn remove_object(
        &mut self,
        object_id: ObjectId,
        delete_root_node: bool,
        delete_visual_node: bool,
    ) -> SimResult<()> {
        let instance = self
            .objects
            .remove(&object_id)
            .ok_or_else(|| SimError::unknown_object(object_id))?;

        if let (PhysicsBackend::Rapier(world), Some(handle)) = (&mut self.backend, instance.body) {
            world.destroy_body(handle);
        }

        if delete_root_node {
            let foreign_children = self
                .graph
                .node(instance.root_node)?
                .children()
                .iter()
                .any(|&child| child != instance.visual_node);
            if foreign_children {
                log::warn!(
                    "scene {}: removing object {} deletes nodes still referenced by attachments",
                    self.id,
                    object_id
                );
            }
            self.graph.remove_subtree(instance.root_node)?;
        } else if delete_visual_node {
            self.graph.remove_subtree(instance.visual_node)?;
        }

        log::info!("scene {}: object {} removed", self.id, object_id);
        Ok(())
    }

    /// Ids of all instanced objects, ascending insertion order
    pub fn existing_object_ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    /// Borrow an instance record; valid until the object is removed
    pub fn object(&self, object_id: ObjectId) -> SimResult<&ObjectInstance> {
        self.objects
            .get(&object_id)
            .ok_or_else(|| SimError::unknown_object(object_id))
    }

    fn object_mut(&mut self, object_id: ObjectId) -> SimResult<&mut ObjectInstance> {
        self.objects
            .get_mut(&object_id)
            .ok_or_else(|| SimError::unknown_object(object_id))
    }

    /// Borrow an object's root scene node; valid for the scene's lifetime
    pub fn object_scene_node(&self, object_id: ObjectId) -> SimResult<&SceneNode> {
        let node = self.object(object_id)?.root_node;
        self.graph.node(node)
    }

    /// Copy of the template snapshot frozen when the object was instanced
    pub fn object_template_snapshot(&self, object_id: ObjectId) -> SimResult<ObjectTemplate> {
        Ok(self.object(object_id)?.template.clone())
    }

    // ---------------------------------------------------------------------
    // Motion type
    // ---------------------------------------------------------------------

    /// Current motion type of an object
    pub fn object_motion_type(&self, object_id: ObjectId) -> SimResult<MotionType> {
        Ok(self.object(object_id)?.motion_type)
    }

    /// Change an object's motion type
    ///
    /// Applied atomically with backend body reconfiguration; a Dynamic to
    /// Static transition zeroes velocities and freezes the body.
    pub fn set_object_motion_type(
        &mut self,
        object_id: ObjectId,
        motion_type: MotionType,
    ) -> SimResult<()> {
        let body = self.object(object_id)?.body;
        if let (PhysicsBackend::Rapier(world), Some(handle)) = (&mut self.backend, body) {
            world.set_motion_type(handle, motion_type)?;
        }
        self.object_mut(object_id)?.motion_type = motion_type;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Pose group
    // ---------------------------------------------------------------------

    fn object_pose(&self, object_id: ObjectId) -> SimResult<RigidState> {
        let instance = self.object(object_id)?;
        match (&self.backend, instance.body) {
            (PhysicsBackend::Rapier(world), Some(handle)) => world.body_pose(handle),
            _ => Ok(RigidState::from(
                &self.graph.world_transform(instance.root_node)?,
            )),
        }
    }

    /// Teleport an object to `pose`: the scene node is updated and the pose
    /// is pushed into the physics body immediately, without interpolation
    fn set_object_pose(&mut self, object_id: ObjectId, pose: &RigidState) -> SimResult<()> {
        let (root_node, scale, body) = {
            let instance = self.object(object_id)?;
            (instance.root_node, instance.template.scale, instance.body)
        };

        self.graph.set_world_transform(
            root_node,
            &Transform {
                position: pose.translation,
                rotation: pose.rotation,
                scale,
            },
        )?;
        if let (PhysicsBackend::Rapier(world), Some(handle)) = (&mut self.backend, body) {
            world.set_body_pose(handle, pose)?;
        }
        Ok(())
    }

    /// Full transform of an object's root node
    pub fn transformation(&self, object_id: ObjectId) -> SimResult<Transform> {
        let scale = self.object(object_id)?.template.scale;
        let pose = self.object_pose(object_id)?;
        Ok(Transform {
            position: pose.translation,
            rotation: pose.rotation,
            scale,
        })
    }

    /// Set the full transform of an object's root node (teleport semantics)
    pub fn set_transformation(&mut self, object_id: ObjectId, transform: &Transform) -> SimResult<()> {
        self.set_object_pose(object_id, &RigidState::from(transform))
    }

    /// Pose of an object as a rigid state
    pub fn rigid_state(&self, object_id: ObjectId) -> SimResult<RigidState> {
        self.object_pose(object_id)
    }

    /// Set an object's pose from a rigid state (teleport semantics)
    pub fn set_rigid_state(&mut self, object_id: ObjectId, state: &RigidState) -> SimResult<()> {
        self.set_object_pose(object_id, state)
    }

    /// Translation of an object
    pub fn translation(&self, object_id: ObjectId) -> SimResult<Vec3> {
        Ok(self.object_pose(object_id)?.translation)
    }

    /// Set an object's translation, keeping its rotation
    pub fn set_translation(&mut self, object_id: ObjectId, translation: Vec3) -> SimResult<()> {
        let mut pose = self.object_pose(object_id)?;
        pose.translation = translation;
        self.set_object_pose(object_id, &pose)
    }

    /// Rotation of an object
    pub fn rotation(&self, object_id: ObjectId) -> SimResult<Quat> {
        Ok(self.object_pose(object_id)?.rotation)
    }

    /// Set an object's rotation, keeping its translation
    pub fn set_rotation(&mut self, object_id: ObjectId, rotation: Quat) -> SimResult<()> {
        let mut pose = self.object_pose(object_id)?;
        pose.rotation = rotation;
        self.set_object_pose(object_id, &pose)
    }

    // ---------------------------------------------------------------------
    // Velocity and forces (Dynamic-gated; silent no-ops otherwise)
    // ---------------------------------------------------------------------

    /// Linear velocity; zero for non-Dynamic objects and without physics
    pub fn linear_velocity(&self, object_id: ObjectId) -> SimResult<Vec3> {
        let instance = self.object(object_id)?;
        match (&self.backend, instance.body) {
            (PhysicsBackend::Rapier(world), Some(handle)) => world.linear_velocity(handle),
            _ => Ok(Vec3::zeros()),
        }
    }

    /// Set the linear velocity of a Dynamic object; no-op otherwise
    pub fn set_linear_velocity(&mut self, object_id: ObjectId, velocity: Vec3) -> SimResult<()> {
        let (motion, body) = {
            let instance = self.object(object_id)?;
            (instance.motion_type, instance.body)
        };
        if motion != MotionType::Dynamic {
            log::trace!("set_linear_velocity ignored for non-dynamic object {object_id}");
            return Ok(());
        }
        if let (PhysicsBackend::Rapier(world), Some(handle)) = (&mut self.backend, body) {
            world.set_linear_velocity(handle, velocity)?;
        }
        Ok(())
    }

    /// Angular velocity; zero for non-Dynamic objects and without physics
    pub fn angular_velocity(&self, object_id: ObjectId) -> SimResult<Vec3> {
        let instance = self.object(object_id)?;
        match (&self.backend, instance.body) {
            (PhysicsBackend::Rapier(world), Some(handle)) => world.angular_velocity(handle),
            _ => Ok(Vec3::zeros()),
        }
    }

    /// Set the angular velocity of a Dynamic object; no-op otherwise
    pub fn set_angular_velocity(&mut self, object_id: ObjectId, velocity: Vec3) -> SimResult<()> {
        let (motion, body) = {
            let instance = self.object(object_id)?;
            (instance.motion_type, instance.body)
        };
        if motion != MotionType::Dynamic {
            log::trace!("set_angular_velocity ignored for non-dynamic object {object_id}");
            return Ok(());
        }
        if let (PhysicsBackend::Rapier(world), Some(handle)) = (&mut self.backend, body) {
            world.set_angular_velocity(handle, velocity)?;
        }
        Ok(())
    }

    /// Accumulate a force on a Dynamic object at an offset from its center
    /// of mass (global frame); integrated by the next consumed step
    pub fn apply_force(
        &mut self,
        object_id: ObjectId,
        force: Vec3,
        relative_position: Vec3,
    ) -> SimResult<()> {
        let (motion, body) = {
            let instance = self.object(object_id)?;
            (instance.motion_type, instance.body)
        };
        if motion != MotionType::Dynamic {
            log::trace!("apply_force ignored for non-dynamic object {object_id}");
            return Ok(());
        }
        if let (PhysicsBackend::Rapier(world), Some(handle)) = (&mut self.backend, body) {
            world.apply_force(handle, force, relative_position)?;
        }
        Ok(())
    }

    /// Accumulate a torque on a Dynamic object; integrated by the next
    /// consumed step
    pub fn apply_torque(&mut self, object_id: ObjectId, torque: Vec3) -> SimResult<()> {
        let (motion, body) = {
            let instance = self.object(object_id)?;
            (instance.motion_type, instance.body)
        };
        if motion != MotionType::Dynamic {
            log::trace!("apply_torque ignored for non-dynamic object {object_id}");
            return Ok(());
        }
        if let (PhysicsBackend::Rapier(world), Some(handle)) = (&mut self.backend, body) {
            world.apply_torque(handle, torque)?;
        }
        Ok(())
    }

    /// Copy of an object's velocity-control targets
    pub fn velocity_control(&self, object_id: ObjectId) -> SimResult<VelocityControl> {
        Ok(self.object(object_id)?.velocity_control.clone())
    }

    /// Mutably borrow an object's velocity-control record; valid until the
    /// object is removed
    pub fn velocity_control_mut(&mut self, object_id: ObjectId) -> SimResult<&mut VelocityControl> {
        Ok(&mut self.object_mut(object_id)?.velocity_control)
    }

    /// Replace an object's velocity-control targets
    pub fn set_velocity_control(
        &mut self,
        object_id: ObjectId,
        control: VelocityControl,
    ) -> SimResult<()> {
        self.object_mut(object_id)?.velocity_control = control;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Stepping
    // ---------------------------------------------------------------------

    /// Advance the world by `dt` through the fixed-step accumulator
    ///
    /// Returns the time actually integrated, which may differ from `dt`;
    /// read [`Self::world_time`] rather than assuming exact advancement.
    /// Velocity-control targets are applied each substep; accumulated
    /// forces are cleared after a call that consumed at least one substep.
    pub fn step(&mut self, dt: f32) -> SimResult<f32> {
        let substeps = self.clock.consume(dt);
        if substeps == 0 {
            return Ok(0.0);
        }
        let fixed_dt = self.clock.fixed_dt();

        struct Controlled {
            root_node: NodeId,
            body: Option<RigidBodyHandle>,
            motion_type: MotionType,
            control: VelocityControl,
        }
        let controlled: Vec<Controlled> = self
            .objects
            .values()
            .filter(|o| o.velocity_control.is_active() && o.motion_type != MotionType::Static)
            .map(|o| Controlled {
                root_node: o.root_node,
                body: o.body,
                motion_type: o.motion_type,
                control: o.velocity_control.clone(),
            })
            .collect();

        for _ in 0..substeps {
            for entry in &controlled {
                match (entry.motion_type, entry.body) {
                    (MotionType::Kinematic, Some(handle)) => {
                        if let PhysicsBackend::Rapier(world) = &mut self.backend {
                            let pose = world.body_pose(handle)?;
                            let next = entry.control.integrate(fixed_dt, &pose);
                            world.set_next_kinematic_pose(handle, &next)?;
                        }
                    }
                    (MotionType::Kinematic, None) => {
                        let current = self.graph.world_transform(entry.root_node)?;
                        let next = entry
                            .control
                            .integrate(fixed_dt, &RigidState::from(&current));
                        self.graph.set_world_transform(
                            entry.root_node,
                            &Transform {
                                position: next.translation,
                                rotation: next.rotation,
                                scale: current.scale,
                            },
                        )?;
                    }
                    (MotionType::Dynamic, Some(handle)) => {
                        if let PhysicsBackend::Rapier(world) = &mut self.backend {
                            let pose = world.body_pose(handle)?;
                            if entry.control.controlling_lin_vel {
                                world.set_linear_velocity(
                                    handle,
                                    entry.control.world_linear_velocity(&pose),
                                )?;
                            }
                            if entry.control.controlling_ang_vel {
                                world.set_angular_velocity(
                                    handle,
                                    entry.control.world_angular_velocity(&pose),
                                )?;
                            }
                        }
                    }
                    _ => {}
                }
            }

            if let PhysicsBackend::Rapier(world) = &mut self.backend {
                world.substep();
            }
        }

        if let PhysicsBackend::Rapier(world) = &mut self.backend {
            world.clear_accumulated_forces();
        }
        self.sync_poses_from_physics()?;

        let advanced = substeps as f32 * fixed_dt;
        self.world_time += f64::from(advanced);
        Ok(advanced)
    }

    /// Write every physics body's pose back into its scene node
    fn sync_poses_from_physics(&mut self) -> SimResult<()> {
        let PhysicsBackend::Rapier(world) = &self.backend else {
            return Ok(());
        };

        let mut updates = Vec::with_capacity(self.objects.len());
        for instance in self.objects.values() {
            if let Some(handle) = instance.body {
                let pose = world.body_pose(handle)?;
                updates.push((instance.root_node, pose, instance.template.scale));
            }
        }
        for (node, pose, scale) in updates {
            self.graph.set_world_transform(
                node,
                &Transform {
                    position: pose.translation,
                    rotation: pose.rotation,
                    scale,
                },
            )?;
        }
        Ok(())
    }

    /// Accumulated world time in seconds
    pub fn world_time(&self) -> f64 {
        self.world_time
    }

    /// Scene gravity vector
    pub fn gravity(&self) -> Vec3 {
        self.backend.gravity()
    }

    /// Set the scene gravity vector
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.backend.set_gravity(gravity);
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Narrow-phase overlap check of an object at its current pose
    ///
    /// No world mutation is observable. Requires physics.
    pub fn contact_test(&mut self, object_id: ObjectId) -> SimResult<bool> {
        let body = self.object(object_id)?.body;
        match (&mut self.backend, body) {
            (PhysicsBackend::Rapier(world), Some(handle)) => world.contact_test(handle),
            (PhysicsBackend::NoPhysics { .. }, _) => Err(SimError::UnsupportedOperation(
                "contact_test requires a physics backend".into(),
            )),
            _ => Err(SimError::InvalidState(
                "object has no physics body".into(),
            )),
        }
    }

    /// Cast a ray into the collidable scene; hits are ordered nearest first.
    /// Requires physics.
    pub fn cast_ray(&mut self, ray: &Ray, max_distance: f32) -> SimResult<RaycastResults> {
        match &mut self.backend {
            PhysicsBackend::Rapier(world) => world.cast_ray(ray, max_distance),
            PhysicsBackend::NoPhysics { .. } => Err(SimError::UnsupportedOperation(
                "cast_ray requires a physics backend".into(),
            )),
        }
    }

    // ---------------------------------------------------------------------
    // Navmesh
    // ---------------------------------------------------------------------

    /// Rebuild a navmesh into `pathfinder` from this scene's stage bounds
    ///
    /// With `include_static_objects`, the world-space footprints of all
    /// current Static-motion instances become navigation obstacles. The
    /// pathfinder's mesh is replaced in one swap only after the rebuild
    /// fully succeeds.
    pub fn recompute_navmesh_into(
        &self,
        pathfinder: &mut PathFinder,
        settings: &NavMeshSettings,
        include_static_objects: bool,
    ) -> SimResult<()> {
        let mut obstacles = Vec::new();
        if include_static_objects {
            for instance in self.objects.values() {
                if instance.motion_type != MotionType::Static {
                    continue;
                }
                let local = instance.template.collision_shape.local_aabb();
                let scaled_extents = local.extents().component_mul(&instance.template.scale);
                let pose = self.object_pose(instance.object_id)?;
                // Conservative world AABB of the rotated shape.
                let world_extents =
                    pose.rotation.to_rotation_matrix().into_inner().abs() * scaled_extents;
                obstacles.push(Aabb::from_center_extents(pose.translation, world_extents));
            }
        }

        let mesh = build_navmesh(settings, &self.stage.bounds, &obstacles)?;
        pathfinder.replace_mesh(mesh);
        Ok(())
    }

    /// Rebuild the scene-owned pathfinder's navmesh
    pub fn recompute_navmesh(
        &mut self,
        settings: &NavMeshSettings,
        include_static_objects: bool,
    ) -> SimResult<()> {
        let mut pathfinder = std::mem::take(&mut self.pathfinder);
        let result = self.recompute_navmesh_into(&mut pathfinder, settings, include_static_objects);
        self.pathfinder = pathfinder;
        result
    }

    // ---------------------------------------------------------------------
    // Presentation metadata
    // ---------------------------------------------------------------------

    /// Toggle bounding-box visualization for an object
    pub fn set_object_bb_draw(&mut self, object_id: ObjectId, draw: bool) -> SimResult<()> {
        self.object_mut(object_id)?.bb_draw = draw;
        Ok(())
    }

    /// Set the semantic id on all of an object's visual nodes
    pub fn set_object_semantic_id(&mut self, object_id: ObjectId, semantic_id: u32) -> SimResult<()> {
        let visual_node = self.object(object_id)?.visual_node;
        self.graph.set_subtree_semantic_id(visual_node, semantic_id)?;
        self.object_mut(object_id)?.semantic_id = semantic_id;
        Ok(())
    }

    /// Point an object's drawables at a different light setup key
    ///
    /// The key is resolved at use time, so it does not need to be registered
    /// yet.
    pub fn set_object_light_setup(&mut self, object_id: ObjectId, key: &str) -> SimResult<()> {
        self.object_mut(object_id)?.light_setup_key = key.to_string();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Teardown
    // ---------------------------------------------------------------------

    /// Remove every object instance (bodies before nodes) and zero the clock
    pub(crate) fn reset(&mut self) {
        let ids = self.existing_object_ids();
        for object_id in ids {
            // Instances were just listed; removal cannot fail here.
            if let Err(error) = self.remove_object(object_id, true, true) {
                log::error!("scene {}: reset failed to remove object: {error}", self.id);
            }
        }
        self.clock.reset();
        self.world_time = 0.0;
    }
}

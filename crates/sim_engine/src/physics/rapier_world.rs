//! rapier3d rigid-body world
//!
//! Owns the full rapier stepping set for one scene and maps between the
//! simulator's object-level contract (template snapshots, rigid states,
//! motion types) and rapier bodies/colliders. Collider and body `user_data`
//! carry the owning object id so query hits can be attributed; stage statics
//! carry a sentinel instead.

use rapier3d::prelude::{
    CCDSolver, Collider, ColliderBuilder, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline, QueryFilter, QueryPipeline,
    Ray as RapierRay, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, RigidBodyType,
};

use crate::core::error::{SimError, SimResult};
use crate::foundation::math::{Point3, RigidState, Vec3};
use crate::physics::query::{Ray, RaycastHit, RaycastResults};
use crate::physics::MotionType;
use crate::scene::ObjectId;
use crate::templates::{CollisionShape, ObjectTemplate, StaticColliderDef};

/// `user_data` sentinel marking stage geometry
const STAGE_USER_DATA: u128 = u128::MAX;

/// Per-scene rapier world
pub struct RapierWorld {
    gravity: Vec3,
    integration_parameters: rapier3d::prelude::IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl std::fmt::Debug for RapierWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish()
    }
}

impl RapierWorld {
    /// Create an empty world with the given gravity and fixed timestep
    pub fn new(gravity: Vec3, fixed_dt: f32) -> Self {
        let mut integration_parameters = rapier3d::prelude::IntegrationParameters::default();
        integration_parameters.dt = fixed_dt;

        Self {
            gravity,
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Current gravity vector
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Replace the gravity vector
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Insert one piece of static stage geometry
    pub fn add_stage_collider(
        &mut self,
        def: &StaticColliderDef,
        friction: f32,
        restitution: f32,
    ) {
        let collider = collider_from_shape(&def.shape, &Vec3::new(1.0, 1.0, 1.0))
            .position(RigidState::new(def.translation, def.rotation).to_isometry())
            .friction(friction)
            .restitution(restitution)
            .user_data(STAGE_USER_DATA)
            .build();
        self.colliders.insert(collider);
    }

    /// Create a dynamic body for an object instance from its template
    /// snapshot at `pose`
    pub fn create_body(
        &mut self,
        object_id: ObjectId,
        template: &ObjectTemplate,
        pose: &RigidState,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .position(pose.to_isometry())
            .user_data(u128::from(object_id))
            .build();
        let handle = self.bodies.insert(body);

        let collider = collider_from_shape(&template.collision_shape, &template.scale)
            .friction(template.friction)
            .restitution(template.restitution)
            .mass(template.mass)
            .sensor(!template.is_collidable)
            .user_data(u128::from(object_id))
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        handle
    }

    /// Destroy a body and its attached colliders
    pub fn destroy_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn body(&self, handle: RigidBodyHandle) -> SimResult<&rapier3d::prelude::RigidBody> {
        self.bodies
            .get(handle)
            .ok_or_else(|| SimError::InvalidState("physics body handle is stale".into()))
    }

    fn body_mut(&mut self, handle: RigidBodyHandle) -> SimResult<&mut rapier3d::prelude::RigidBody> {
        self.bodies
            .get_mut(handle)
            .ok_or_else(|| SimError::InvalidState("physics body handle is stale".into()))
    }

    /// Current pose of a body
    pub fn body_pose(&self, handle: RigidBodyHandle) -> SimResult<RigidState> {
        Ok(RigidState::from_isometry(self.body(handle)?.position()))
    }

    /// Teleport a body to `pose` (no interpolation)
    pub fn set_body_pose(&mut self, handle: RigidBodyHandle, pose: &RigidState) -> SimResult<()> {
        self.body_mut(handle)?.set_position(pose.to_isometry(), true);
        Ok(())
    }

    /// Queue a kinematic target pose for the next substep
    pub fn set_next_kinematic_pose(
        &mut self,
        handle: RigidBodyHandle,
        pose: &RigidState,
    ) -> SimResult<()> {
        self.body_mut(handle)?
            .set_next_kinematic_position(pose.to_isometry());
        Ok(())
    }

    /// Linear velocity of a body
    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> SimResult<Vec3> {
        Ok(*self.body(handle)?.linvel())
    }

    /// Set the linear velocity of a body
    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) -> SimResult<()> {
        self.body_mut(handle)?.set_linvel(velocity, true);
        Ok(())
    }

    /// Angular velocity of a body
    pub fn angular_velocity(&self, handle: RigidBodyHandle) -> SimResult<Vec3> {
        Ok(*self.body(handle)?.angvel())
    }

    /// Set the angular velocity of a body
    pub fn set_angular_velocity(
        &mut self,
        handle: RigidBodyHandle,
        velocity: Vec3,
    ) -> SimResult<()> {
        self.body_mut(handle)?.set_angvel(velocity, true);
        Ok(())
    }

    /// Accumulate a force applied at `relative_position` from the body's
    /// center of mass (global frame)
    ///
    /// Forces persist until cleared after the next consumed step.
    pub fn apply_force(
        &mut self,
        handle: RigidBodyHandle,
        force: Vec3,
        relative_position: Vec3,
    ) -> SimResult<()> {
        let point = Point3::from(self.body(handle)?.position().translation.vector + relative_position);
        self.body_mut(handle)?.add_force_at_point(force, point, true);
        Ok(())
    }

    /// Accumulate a torque
    pub fn apply_torque(&mut self, handle: RigidBodyHandle, torque: Vec3) -> SimResult<()> {
        self.body_mut(handle)?.add_torque(torque, true);
        Ok(())
    }

    /// Clear every body's accumulated forces and torques
    pub fn clear_accumulated_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }
    }

    /// Reconfigure a body for a new motion type
    ///
    /// Dynamic to Static freezes the body with zeroed velocities.
    pub fn set_motion_type(&mut self, handle: RigidBodyHandle, motion: MotionType) -> SimResult<()> {
        let body = self.body_mut(handle)?;
        let body_type = match motion {
            MotionType::Static => RigidBodyType::Fixed,
            MotionType::Kinematic => RigidBodyType::KinematicPositionBased,
            MotionType::Dynamic => RigidBodyType::Dynamic,
        };

        if body_type != RigidBodyType::Dynamic {
            body.set_linvel(Vec3::zeros(), false);
            body.set_angvel(Vec3::zeros(), false);
            body.reset_forces(false);
            body.reset_torques(false);
        }
        body.set_body_type(body_type, true);
        Ok(())
    }

    /// Advance the world by exactly one fixed timestep
    pub fn substep(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Cast a ray against everything collidable, returning hits ordered
    /// nearest first
    pub fn cast_ray(&mut self, ray: &Ray, max_distance: f32) -> SimResult<RaycastResults> {
        ray.validate()?;
        if max_distance <= 0.0 {
            return Err(SimError::InvalidArgument(
                "ray max_distance must be positive".into(),
            ));
        }

        // Teleports may have moved bodies since the last step.
        self.bodies
            .propagate_modified_body_positions_to_colliders(&mut self.colliders);
        self.query_pipeline.update(&self.bodies, &self.colliders);

        let direction = ray.direction.normalize();
        let rapier_ray = RapierRay::new(ray.origin, direction);

        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_ray(
            &self.bodies,
            &self.colliders,
            &rapier_ray,
            max_distance,
            true,
            QueryFilter::default(),
            |handle, intersection| {
                let object_id = match self.colliders[handle].user_data {
                    STAGE_USER_DATA => None,
                    id => Some(id as ObjectId),
                };
                hits.push(RaycastHit {
                    object_id,
                    point: rapier_ray.point_at(intersection.time_of_impact),
                    normal: intersection.normal,
                    fraction: intersection.time_of_impact / max_distance,
                });
                true
            },
        );
        hits.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));

        Ok(RaycastResults {
            ray: Some(ray.clone()),
            hits,
        })
    }

    /// Narrow-phase overlap check of a body's collider at its current pose
    /// against the rest of the scene, without mutating the world
    pub fn contact_test(&mut self, handle: RigidBodyHandle) -> SimResult<bool> {
        self.bodies
            .propagate_modified_body_positions_to_colliders(&mut self.colliders);
        self.query_pipeline.update(&self.bodies, &self.colliders);

        let collider_handle = *self
            .body(handle)?
            .colliders()
            .first()
            .ok_or_else(|| SimError::InvalidState("physics body has no collider".into()))?;
        let collider: &Collider = &self.colliders[collider_handle];
        let pose = *collider.position();

        let mut overlapping = false;
        self.query_pipeline.intersections_with_shape(
            &self.bodies,
            &self.colliders,
            &pose,
            collider.shape(),
            QueryFilter::default().exclude_rigid_body(handle),
            |_| {
                overlapping = true;
                false
            },
        );
        Ok(overlapping)
    }
}

/// Build a collider for a collision shape with an instance scale applied
fn collider_from_shape(shape: &CollisionShape, scale: &Vec3) -> ColliderBuilder {
    match shape {
        CollisionShape::Cuboid { half_extents } => {
            let he = half_extents.component_mul(scale);
            ColliderBuilder::cuboid(he.x, he.y, he.z)
        }
        CollisionShape::Sphere { radius } => ColliderBuilder::ball(radius * scale.x),
        CollisionShape::CapsuleY {
            radius,
            half_height,
        } => ColliderBuilder::capsule_y(half_height * scale.y, radius * scale.x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    fn flat_world() -> RapierWorld {
        let mut world = RapierWorld::new(Vec3::new(0.0, -9.8, 0.0), 1.0 / 60.0);
        world.add_stage_collider(
            &StaticColliderDef {
                shape: CollisionShape::Cuboid {
                    half_extents: Vec3::new(10.0, 0.5, 10.0),
                },
                translation: Vec3::new(0.0, -0.5, 0.0),
                rotation: Quat::identity(),
            },
            0.7,
            0.0,
        );
        world
    }

    fn unit_box() -> ObjectTemplate {
        ObjectTemplate {
            collision_shape: CollisionShape::Cuboid {
                half_extents: Vec3::new(0.5, 0.5, 0.5),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_body_pose_round_trip() {
        let mut world = flat_world();
        let pose = RigidState::new(Vec3::new(1.0, 2.0, 3.0), Quat::identity());
        let handle = world.create_body(0, &unit_box(), &pose);

        assert_relative_eq!(
            world.body_pose(handle).unwrap().translation,
            pose.translation,
            epsilon = 1e-6
        );

        let moved = RigidState::new(Vec3::new(-4.0, 1.0, 0.0), Quat::identity());
        world.set_body_pose(handle, &moved).unwrap();
        assert_relative_eq!(
            world.body_pose(handle).unwrap().translation,
            moved.translation,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_dynamic_body_falls_under_gravity() {
        let mut world = flat_world();
        let start = RigidState::new(Vec3::new(0.0, 5.0, 0.0), Quat::identity());
        let handle = world.create_body(0, &unit_box(), &start);

        for _ in 0..30 {
            world.substep();
        }

        let pose = world.body_pose(handle).unwrap();
        assert!(pose.translation.y < start.translation.y);
    }

    #[test]
    fn test_static_motion_type_freezes_body() {
        let mut world = flat_world();
        let handle = world.create_body(
            0,
            &unit_box(),
            &RigidState::new(Vec3::new(0.0, 5.0, 0.0), Quat::identity()),
        );
        world
            .set_linear_velocity(handle, Vec3::new(0.0, -3.0, 0.0))
            .unwrap();

        world.set_motion_type(handle, MotionType::Static).unwrap();

        assert_relative_eq!(
            world.linear_velocity(handle).unwrap(),
            Vec3::zeros(),
            epsilon = 1e-6
        );
        let before = world.body_pose(handle).unwrap();
        for _ in 0..10 {
            world.substep();
        }
        let after = world.body_pose(handle).unwrap();
        assert_relative_eq!(after.translation, before.translation, epsilon = 1e-6);
    }

    #[test]
    fn test_cast_ray_hits_nearest_first() {
        let mut world = flat_world();
        let near = world.create_body(
            1,
            &unit_box(),
            &RigidState::new(Vec3::new(0.0, 2.0, 0.0), Quat::identity()),
        );
        let _far = world.create_body(
            2,
            &unit_box(),
            &RigidState::new(Vec3::new(0.0, 6.0, 0.0), Quat::identity()),
        );
        // No stepping happens, so poses stay exact.
        world.set_motion_type(near, MotionType::Static).unwrap();

        let ray = Ray::new(Point3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let results = world.cast_ray(&ray, 20.0).unwrap();

        assert!(results.hits.len() >= 3); // two boxes plus the ground slab
        assert_eq!(results.hits[0].object_id, Some(2));
        assert_eq!(results.hits[1].object_id, Some(1));
        assert!(results
            .hits
            .windows(2)
            .all(|pair| pair[0].fraction <= pair[1].fraction));
        assert!(results.hits.iter().all(|h| (0.0..=1.0).contains(&h.fraction)));
    }

    #[test]
    fn test_contact_test_detects_overlap() {
        let mut world = flat_world();
        let a = world.create_body(
            1,
            &unit_box(),
            &RigidState::new(Vec3::new(0.0, 2.0, 0.0), Quat::identity()),
        );
        let _b = world.create_body(
            2,
            &unit_box(),
            &RigidState::new(Vec3::new(0.25, 2.25, 0.0), Quat::identity()),
        );

        assert!(world.contact_test(a).unwrap());

        world
            .set_body_pose(a, &RigidState::new(Vec3::new(50.0, 2.0, 0.0), Quat::identity()))
            .unwrap();
        assert!(!world.contact_test(a).unwrap());
    }
}

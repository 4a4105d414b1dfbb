//! Simulator session orchestration
//!
//! The [`Simulator`] owns the shared template and light registries, the set
//! of live scenes, and a seeded random number generator. Scene-level
//! operations resolve a [`SceneId`] and delegate; template resolution
//! happens here so scenes only ever see snapshots.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::core::config::SimulatorConfiguration;
use crate::core::error::{SimError, SimResult};
use crate::foundation::math::{Quat, RigidState, Transform, Vec3};
use crate::lighting::{LightSetup, LightSetupRegistry};
use crate::nav::{NavMeshSettings, PathFinder};
use crate::physics::{
    MotionType, PhysicsSimulationLibrary, Ray, RaycastResults, VelocityControl,
};
use crate::scene::{ObjectId, Scene, SceneId};
use crate::templates::{ObjectTemplate, PhysicsTemplate, StageTemplate, TemplateId, TemplateRegistry};

/// A complete simulation session
///
/// Holds every scene alive for the session plus the registries they share.
/// All operations fail with `InvalidState` after [`Simulator::close`].
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfiguration,
    physics_template: PhysicsTemplate,
    templates: TemplateRegistry,
    lights: LightSetupRegistry,
    scenes: BTreeMap<SceneId, Scene>,
    next_scene_id: u64,
    default_scene: SceneId,
    rng: StdRng,
    closed: bool,
}

impl Simulator {
    /// Construct a session from a configuration
    ///
    /// Loads the physics configuration named by the config (or built-in
    /// defaults), seeds the random number generator, and creates the
    /// default scene. A `scene_path` of `"NONE"` means an empty flat stage;
    /// any other value must already be registered as a stage template.
    pub fn new(config: SimulatorConfiguration) -> SimResult<Self> {
        Self::with_templates(config, TemplateRegistry::new())
    }

    /// Construct a session reusing an existing template registry
    ///
    /// This is how stage templates registered ahead of time become
    /// resolvable from `config.scene_path` at construction.
    pub fn with_templates(
        config: SimulatorConfiguration,
        templates: TemplateRegistry,
    ) -> SimResult<Self> {
        config.validate()?;
        let physics_template = if config.physics_config_path.is_empty() {
            PhysicsTemplate::default()
        } else {
            PhysicsTemplate::load_from_file(&config.physics_config_path)?
        };

        let mut sim = Self {
            rng: StdRng::seed_from_u64(config.random_seed),
            config,
            physics_template,
            templates,
            lights: LightSetupRegistry::new(),
            scenes: BTreeMap::new(),
            next_scene_id: 0,
            default_scene: SceneId::default(),
            closed: false,
        };
        let stage = sim.resolve_stage(&sim.config.scene_path.clone())?;
        sim.default_scene = sim.create_scene_from(stage);
        log::info!(
            "simulator created (physics {}, default scene {})",
            sim.config.enable_physics,
            sim.default_scene
        );
        Ok(sim)
    }

    fn ensure_open(&self) -> SimResult<()> {
        if self.closed {
            return Err(SimError::InvalidState(
                "simulator has been closed".to_string(),
            ));
        }
        Ok(())
    }

    fn resolve_stage(&self, handle: &str) -> SimResult<StageTemplate> {
        if handle == "NONE" {
            return Ok(StageTemplate::default());
        }
        self.templates.stages.get_by_handle(handle).cloned()
    }

    fn create_scene_from(&mut self, stage: StageTemplate) -> SceneId {
        let id = SceneId(self.next_scene_id);
        self.next_scene_id += 1;
        let scene = Scene::new(id, stage, &self.physics_template, self.config.enable_physics);
        self.scenes.insert(id, scene);
        id
    }

    // ---------------------------------------------------------------------
    // Session lifecycle
    // ---------------------------------------------------------------------

    /// The configuration this session was built from
    pub fn configuration(&self) -> &SimulatorConfiguration {
        &self.config
    }

    /// Apply a new configuration
    ///
    /// A configuration equal to the current one is a no-op that preserves
    /// all scenes and instances. A differing configuration tears the scenes
    /// down and rebuilds the default scene; registries survive.
    pub fn reconfigure(&mut self, config: SimulatorConfiguration) -> SimResult<()> {
        self.ensure_open()?;
        if config == self.config {
            log::debug!("reconfigure with identical configuration; nothing to do");
            return Ok(());
        }
        config.validate()?;

        self.physics_template = if config.physics_config_path.is_empty() {
            PhysicsTemplate::default()
        } else {
            PhysicsTemplate::load_from_file(&config.physics_config_path)?
        };
        let stage = {
            let previous = std::mem::replace(&mut self.config, config);
            match self.resolve_stage(&self.config.scene_path.clone()) {
                Ok(stage) => stage,
                Err(error) => {
                    self.config = previous;
                    return Err(error);
                }
            }
        };

        self.scenes.clear();
        self.rng = StdRng::seed_from_u64(self.config.random_seed);
        self.default_scene = self.create_scene_from(stage);
        log::info!("simulator reconfigured (default scene {})", self.default_scene);
        Ok(())
    }

    /// Reset every scene to its just-constructed state
    ///
    /// Removes all object instances and zeroes world time; template and
    /// light registries and any built navmeshes are retained. The random
    /// number generator is reseeded from the configured seed.
    pub fn reset(&mut self) -> SimResult<()> {
        self.ensure_open()?;
        for scene in self.scenes.values_mut() {
            scene.reset();
        }
        self.rng = StdRng::seed_from_u64(self.config.random_seed);
        log::info!("simulator reset ({} scenes)", self.scenes.len());
        Ok(())
    }

    /// Reseed the random number generator
    pub fn seed(&mut self, seed: u64) -> SimResult<()> {
        self.ensure_open()?;
        self.config.random_seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
        Ok(())
    }

    /// Mutably borrow the session random number generator
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Release all scenes and mark the session closed
    ///
    /// Idempotent; every subsequent operation fails with `InvalidState`.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        // Bodies go before nodes, same as scene-level removal.
        for scene in self.scenes.values_mut() {
            scene.reset();
        }
        self.scenes.clear();
        self.closed = true;
        log::info!("simulator closed");
    }

    // ---------------------------------------------------------------------
    // Registries
    // ---------------------------------------------------------------------

    /// Borrow the shared template registry
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Mutably borrow the shared template registry
    pub fn templates_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.templates
    }

    /// Copy of the light setup registered under `key`
    pub fn get_light_setup(&self, key: &str) -> SimResult<LightSetup> {
        self.ensure_open()?;
        self.lights.get(key)
    }

    /// Register a light setup under `key`, replacing any existing one
    pub fn set_light_setup(&mut self, setup: LightSetup, key: &str) -> SimResult<()> {
        self.ensure_open()?;
        self.lights.set(setup, key);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Scenes
    // ---------------------------------------------------------------------

    /// Id of the default scene created at construction
    pub fn default_scene_id(&self) -> SceneId {
        self.default_scene
    }

    /// Ids of all live scenes in creation order
    pub fn scene_ids(&self) -> Vec<SceneId> {
        self.scenes.keys().copied().collect()
    }

    /// Create an additional scene from a registered stage handle
    /// (or `"NONE"` for an empty flat stage)
    pub fn create_scene(&mut self, stage_handle: &str) -> SimResult<SceneId> {
        self.ensure_open()?;
        let stage = self.resolve_stage(stage_handle)?;
        Ok(self.create_scene_from(stage))
    }

    /// Destroy a scene and everything in it
    ///
    /// The default scene cannot be destroyed while the session is open.
    pub fn destroy_scene(&mut self, scene_id: SceneId) -> SimResult<()> {
        self.ensure_open()?;
        if scene_id == self.default_scene {
            return Err(SimError::InvalidArgument(
                "the default scene cannot be destroyed".to_string(),
            ));
        }
        self.scenes
            .remove(&scene_id)
            .map(|_| ())
            .ok_or_else(|| SimError::unknown_scene(scene_id.0))
    }

    /// Borrow a scene; valid until the scene is destroyed
    pub fn scene(&self, scene_id: SceneId) -> SimResult<&Scene> {
        self.ensure_open()?;
        self.scenes
            .get(&scene_id)
            .ok_or_else(|| SimError::unknown_scene(scene_id.0))
    }

    /// Mutably borrow a scene
    pub fn scene_mut(&mut self, scene_id: SceneId) -> SimResult<&mut Scene> {
        self.ensure_open()?;
        self.scenes
            .get_mut(&scene_id)
            .ok_or_else(|| SimError::unknown_scene(scene_id.0))
    }

    /// Identity of the physics implementation behind a scene
    pub fn physics_simulation_library(
        &self,
        scene_id: SceneId,
    ) -> SimResult<PhysicsSimulationLibrary> {
        Ok(self.scene(scene_id)?.physics_library())
    }

    // ---------------------------------------------------------------------
    // Object lifecycle
    // ---------------------------------------------------------------------

    /// Instance an object into a scene from a registered template id
    ///
    /// `light_setup_key` defaults to the configured scene light setup.
    pub fn add_object(
        &mut self,
        template_id: TemplateId,
        scene_id: SceneId,
        light_setup_key: Option<&str>,
    ) -> SimResult<ObjectId> {
        self.ensure_open()?;
        let template = self.templates.objects.get(template_id)?.clone();
        let key = light_setup_key
            .unwrap_or(&self.config.scene_light_setup_key)
            .to_string();
        self.scene_mut(scene_id)?.add_object(template, &key, None)
    }

    /// Instance an object into a scene from a registered template handle
    pub fn add_object_by_handle(
        &mut self,
        handle: &str,
        scene_id: SceneId,
        light_setup_key: Option<&str>,
    ) -> SimResult<ObjectId> {
        let template_id = self.templates.objects.id_for_handle(handle)?;
        self.add_object(template_id, scene_id, light_setup_key)
    }

    /// Remove an object instance from a scene
    pub fn remove_object(
        &mut self,
        object_id: ObjectId,
        scene_id: SceneId,
        delete_object_node: bool,
        delete_visual_node: bool,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .remove_object(object_id, delete_object_node, delete_visual_node)
    }

    /// Ids of all objects instanced in a scene, ascending insertion order
    pub fn existing_object_ids(&self, scene_id: SceneId) -> SimResult<Vec<ObjectId>> {
        Ok(self.scene(scene_id)?.existing_object_ids())
    }

    /// Copy of the template snapshot an object was instanced from
    pub fn object_initialization_template(
        &self,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<ObjectTemplate> {
        self.scene(scene_id)?.object_template_snapshot(object_id)
    }

    /// Current motion type of an object
    pub fn object_motion_type(
        &self,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<MotionType> {
        self.scene(scene_id)?.object_motion_type(object_id)
    }

    /// Change an object's motion type
    pub fn set_object_motion_type(
        &mut self,
        motion_type: MotionType,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .set_object_motion_type(object_id, motion_type)
    }

    // ---------------------------------------------------------------------
    // Stepping and gravity
    // ---------------------------------------------------------------------

    /// Advance a scene's world by `dt` seconds, returning the accumulated
    /// world time
    ///
    /// Whole fixed steps are consumed through the accumulator; the actual
    /// advancement may differ from `dt`, so callers should read the
    /// returned world time rather than assuming exact advancement.
    pub fn step_world(&mut self, scene_id: SceneId, dt: f32) -> SimResult<f64> {
        let scene = self.scene_mut(scene_id)?;
        scene.step(dt)?;
        Ok(scene.world_time())
    }

    /// Accumulated world time of a scene in seconds
    pub fn get_world_time(&self, scene_id: SceneId) -> SimResult<f64> {
        Ok(self.scene(scene_id)?.world_time())
    }

    /// Gravity vector of a scene
    pub fn gravity(&self, scene_id: SceneId) -> SimResult<Vec3> {
        Ok(self.scene(scene_id)?.gravity())
    }

    /// Set the gravity vector of a scene
    pub fn set_gravity(&mut self, gravity: Vec3, scene_id: SceneId) -> SimResult<()> {
        self.scene_mut(scene_id)?.set_gravity(gravity);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Pose group
    // ---------------------------------------------------------------------

    /// Full transform of an object's root node
    pub fn transformation(&self, object_id: ObjectId, scene_id: SceneId) -> SimResult<Transform> {
        self.scene(scene_id)?.transformation(object_id)
    }

    /// Set the full transform of an object's root node (teleport semantics)
    pub fn set_transformation(
        &mut self,
        transform: &Transform,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .set_transformation(object_id, transform)
    }

    /// Pose of an object as a rigid state
    pub fn rigid_state(&self, object_id: ObjectId, scene_id: SceneId) -> SimResult<RigidState> {
        self.scene(scene_id)?.rigid_state(object_id)
    }

    /// Set an object's pose from a rigid state (teleport semantics)
    pub fn set_rigid_state(
        &mut self,
        state: &RigidState,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?.set_rigid_state(object_id, state)
    }

    /// Translation of an object
    pub fn translation(&self, object_id: ObjectId, scene_id: SceneId) -> SimResult<Vec3> {
        self.scene(scene_id)?.translation(object_id)
    }

    /// Set an object's translation, keeping its rotation
    pub fn set_translation(
        &mut self,
        translation: Vec3,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .set_translation(object_id, translation)
    }

    /// Rotation of an object
    pub fn rotation(&self, object_id: ObjectId, scene_id: SceneId) -> SimResult<Quat> {
        self.scene(scene_id)?.rotation(object_id)
    }

    /// Set an object's rotation, keeping its translation
    pub fn set_rotation(
        &mut self,
        rotation: Quat,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?.set_rotation(object_id, rotation)
    }

    // ---------------------------------------------------------------------
    // Velocities, forces, velocity control
    // ---------------------------------------------------------------------

    /// Linear velocity of an object; zero unless it is Dynamic under physics
    pub fn linear_velocity(&self, object_id: ObjectId, scene_id: SceneId) -> SimResult<Vec3> {
        self.scene(scene_id)?.linear_velocity(object_id)
    }

    /// Set the linear velocity of a Dynamic object; silent no-op otherwise
    pub fn set_linear_velocity(
        &mut self,
        velocity: Vec3,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .set_linear_velocity(object_id, velocity)
    }

    /// Angular velocity of an object; zero unless it is Dynamic under physics
    pub fn angular_velocity(&self, object_id: ObjectId, scene_id: SceneId) -> SimResult<Vec3> {
        self.scene(scene_id)?.angular_velocity(object_id)
    }

    /// Set the angular velocity of a Dynamic object; silent no-op otherwise
    pub fn set_angular_velocity(
        &mut self,
        velocity: Vec3,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .set_angular_velocity(object_id, velocity)
    }

    /// Accumulate a force on a Dynamic object at an offset from its center
    /// of mass (global frame)
    pub fn apply_force(
        &mut self,
        force: Vec3,
        relative_position: Vec3,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .apply_force(object_id, force, relative_position)
    }

    /// Accumulate a torque on a Dynamic object
    pub fn apply_torque(
        &mut self,
        torque: Vec3,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?.apply_torque(object_id, torque)
    }

    /// Copy of an object's velocity-control targets
    pub fn velocity_control(
        &self,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<VelocityControl> {
        self.scene(scene_id)?.velocity_control(object_id)
    }

    /// Replace an object's velocity-control targets
    pub fn set_velocity_control(
        &mut self,
        control: VelocityControl,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .set_velocity_control(object_id, control)
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Whether an object overlaps any other collidable at its current pose
    pub fn contact_test(&mut self, object_id: ObjectId, scene_id: SceneId) -> SimResult<bool> {
        self.scene_mut(scene_id)?.contact_test(object_id)
    }

    /// Cast a ray into a scene; hits are ordered nearest first
    pub fn cast_ray(
        &mut self,
        ray: &Ray,
        max_distance: f32,
        scene_id: SceneId,
    ) -> SimResult<RaycastResults> {
        self.scene_mut(scene_id)?.cast_ray(ray, max_distance)
    }

    // ---------------------------------------------------------------------
    // Navmesh
    // ---------------------------------------------------------------------

    /// Rebuild a scene's navmesh into its own pathfinder
    pub fn recompute_navmesh(
        &mut self,
        scene_id: SceneId,
        settings: &NavMeshSettings,
        include_static_objects: bool,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .recompute_navmesh(settings, include_static_objects)
    }

    /// Rebuild a scene's navmesh into an external pathfinder
    pub fn recompute_navmesh_into(
        &self,
        pathfinder: &mut PathFinder,
        scene_id: SceneId,
        settings: &NavMeshSettings,
        include_static_objects: bool,
    ) -> SimResult<()> {
        self.scene(scene_id)?
            .recompute_navmesh_into(pathfinder, settings, include_static_objects)
    }

    /// Borrow a scene's pathfinder
    pub fn pathfinder(&self, scene_id: SceneId) -> SimResult<&PathFinder> {
        Ok(self.scene(scene_id)?.pathfinder())
    }

    // ---------------------------------------------------------------------
    // Presentation metadata
    // ---------------------------------------------------------------------

    /// Toggle bounding-box visualization for an object
    ///
    /// Touches drawables, so it requires a session configured with
    /// `create_renderer`.
    pub fn set_object_bb_draw(
        &mut self,
        draw: bool,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        if !self.config.create_renderer {
            return Err(SimError::InvalidState(
                "bounding-box drawing requires a renderer".to_string(),
            ));
        }
        self.scene_mut(scene_id)?.set_object_bb_draw(object_id, draw)
    }

    /// Set the semantic id on all of an object's visual nodes
    pub fn set_object_semantic_id(
        &mut self,
        semantic_id: u32,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .set_object_semantic_id(object_id, semantic_id)
    }

    /// Point an object's drawables at a different light setup key
    pub fn set_object_light_setup(
        &mut self,
        key: &str,
        object_id: ObjectId,
        scene_id: SceneId,
    ) -> SimResult<()> {
        self.scene_mut(scene_id)?
            .set_object_light_setup(object_id, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::LightInfo;
    use crate::templates::CollisionShape;
    use approx::assert_relative_eq;
    use rand::Rng;

    fn physics_config() -> SimulatorConfiguration {
        SimulatorConfiguration {
            enable_physics: true,
            ..Default::default()
        }
    }

    fn box_template() -> ObjectTemplate {
        ObjectTemplate {
            collision_shape: CollisionShape::Cuboid {
                half_extents: Vec3::new(0.5, 0.5, 0.5),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_session_has_one_empty_scene() {
        let sim = Simulator::new(SimulatorConfiguration::default()).unwrap();
        let scene_id = sim.default_scene_id();

        assert_eq!(sim.scene_ids(), vec![scene_id]);
        assert!(sim.existing_object_ids(scene_id).unwrap().is_empty());
        assert_eq!(
            sim.physics_simulation_library(scene_id).unwrap(),
            PhysicsSimulationLibrary::None
        );
        assert_eq!(sim.get_world_time(scene_id).unwrap(), 0.0);
    }

    #[test]
    fn test_physics_config_selects_rapier_backend() {
        let sim = Simulator::new(physics_config()).unwrap();
        assert_eq!(
            sim.physics_simulation_library(sim.default_scene_id()).unwrap(),
            PhysicsSimulationLibrary::Rapier
        );
    }

    #[test]
    fn test_unregistered_scene_path_fails_not_found() {
        let config = SimulatorConfiguration {
            scene_path: "missing_warehouse".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Simulator::new(config),
            Err(SimError::NotFound(_))
        ));
    }

    #[test]
    fn test_registered_scene_path_resolves_at_construction() {
        let mut templates = TemplateRegistry::new();
        templates
            .stages
            .register("warehouse", StageTemplate::ground_plane(50.0));
        let config = SimulatorConfiguration {
            scene_path: "warehouse".to_string(),
            ..Default::default()
        };

        let sim = Simulator::with_templates(config, templates).unwrap();
        let bounds = sim
            .scene(sim.default_scene_id())
            .unwrap()
            .stage()
            .bounds;
        assert_eq!(bounds.max.x, 50.0);
    }

    #[test]
    fn test_add_object_resolves_registered_template() {
        let mut sim = Simulator::new(physics_config()).unwrap();
        let scene_id = sim.default_scene_id();
        let template_id = sim.templates_mut().objects.register("crate", box_template());

        let by_id = sim.add_object(template_id, scene_id, None).unwrap();
        let by_handle = sim.add_object_by_handle("crate", scene_id, None).unwrap();

        assert_eq!(sim.existing_object_ids(scene_id).unwrap(), vec![by_id, by_handle]);
        assert!(matches!(
            sim.add_object_by_handle("no_such_template", scene_id, None),
            Err(SimError::NotFound(_))
        ));
    }

    #[test]
    fn test_initialization_template_survives_reregistration() {
        let mut sim = Simulator::new(SimulatorConfiguration::default()).unwrap();
        let scene_id = sim.default_scene_id();
        sim.templates_mut().objects.register("crate", box_template());
        let object_id = sim.add_object_by_handle("crate", scene_id, None).unwrap();

        // Overwriting the registered template must not touch the instance.
        sim.templates_mut().objects.register(
            "crate",
            ObjectTemplate {
                mass: 99.0,
                ..box_template()
            },
        );

        let snapshot = sim
            .object_initialization_template(object_id, scene_id)
            .unwrap();
        assert_eq!(snapshot.mass, box_template().mass);
    }

    #[test]
    fn test_default_light_setup_key_comes_from_config() {
        let config = SimulatorConfiguration {
            scene_light_setup_key: "studio".to_string(),
            ..Default::default()
        };
        let mut sim = Simulator::new(config).unwrap();
        let scene_id = sim.default_scene_id();
        sim.templates_mut().objects.register("crate", box_template());

        let object_id = sim.add_object_by_handle("crate", scene_id, None).unwrap();
        let instance = sim.scene(scene_id).unwrap().object(object_id).unwrap();
        assert_eq!(instance.light_setup_key(), "studio");
    }

    #[test]
    fn test_dropped_object_falls_under_gravity() {
        let mut sim = Simulator::new(physics_config()).unwrap();
        let scene_id = sim.default_scene_id();
        sim.templates_mut().objects.register("crate", box_template());
        let object_id = sim.add_object_by_handle("crate", scene_id, None).unwrap();
        sim.set_translation(Vec3::new(0.0, 5.0, 0.0), object_id, scene_id)
            .unwrap();

        for _ in 0..30 {
            sim.step_world(scene_id, 1.0 / 60.0).unwrap();
        }

        let position = sim.translation(object_id, scene_id).unwrap();
        assert!(position.y < 5.0);
        assert_relative_eq!(sim.get_world_time(scene_id).unwrap() as f32, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_object_lifecycle_end_to_end() {
        let mut sim = Simulator::new(physics_config()).unwrap();
        let scene_id = sim.default_scene_id();
        sim.templates_mut().objects.register("crate", box_template());

        let object_id = sim.add_object_by_handle("crate", scene_id, None).unwrap();
        sim.set_translation(Vec3::new(1.0, 2.0, 3.0), object_id, scene_id)
            .unwrap();
        assert_relative_eq!(
            sim.translation(object_id, scene_id).unwrap(),
            Vec3::new(1.0, 2.0, 3.0),
            epsilon = 1e-5
        );

        sim.remove_object(object_id, scene_id, true, true).unwrap();
        assert!(sim.existing_object_ids(scene_id).unwrap().is_empty());
        assert!(matches!(
            sim.translation(object_id, scene_id),
            Err(SimError::NotFound(_))
        ));
    }

    #[test]
    fn test_scenes_are_isolated() {
        let mut sim = Simulator::new(physics_config()).unwrap();
        let first = sim.default_scene_id();
        let second = sim.create_scene("NONE").unwrap();
        sim.templates_mut().objects.register("crate", box_template());

        let object_id = sim.add_object_by_handle("crate", first, None).unwrap();
        sim.step_world(first, 0.1).unwrap();

        assert!(sim.existing_object_ids(second).unwrap().is_empty());
        assert_eq!(sim.get_world_time(second).unwrap(), 0.0);
        assert!(sim.translation(object_id, second).is_err());
    }

    #[test]
    fn test_create_scene_requires_registered_handle() {
        let mut sim = Simulator::new(SimulatorConfiguration::default()).unwrap();

        assert!(sim.create_scene("NONE").is_ok());
        assert!(matches!(
            sim.create_scene(""),
            Err(SimError::NotFound(_))
        ));
        assert!(matches!(
            sim.create_scene("nowhere"),
            Err(SimError::NotFound(_))
        ));
    }

    #[test]
    fn test_destroy_scene_rules() {
        let mut sim = Simulator::new(SimulatorConfiguration::default()).unwrap();
        let extra = sim.create_scene("NONE").unwrap();

        assert!(matches!(
            sim.destroy_scene(sim.default_scene_id()),
            Err(SimError::InvalidArgument(_))
        ));
        sim.destroy_scene(extra).unwrap();
        assert!(matches!(
            sim.destroy_scene(extra),
            Err(SimError::NotFound(_))
        ));
    }

    #[test]
    fn test_reconfigure_with_equal_config_preserves_state() {
        let config = physics_config();
        let mut sim = Simulator::new(config.clone()).unwrap();
        let scene_id = sim.default_scene_id();
        sim.templates_mut().objects.register("crate", box_template());
        let object_id = sim.add_object_by_handle("crate", scene_id, None).unwrap();

        sim.reconfigure(config).unwrap();

        assert_eq!(sim.existing_object_ids(scene_id).unwrap(), vec![object_id]);
    }

    #[test]
    fn test_reconfigure_with_new_config_rebuilds_scenes() {
        let mut sim = Simulator::new(SimulatorConfiguration::default()).unwrap();
        let old_scene = sim.default_scene_id();
        sim.templates_mut().objects.register("crate", box_template());
        sim.add_object_by_handle("crate", old_scene, None).unwrap();

        sim.reconfigure(physics_config()).unwrap();

        let new_scene = sim.default_scene_id();
        assert!(sim.existing_object_ids(new_scene).unwrap().is_empty());
        assert_eq!(
            sim.physics_simulation_library(new_scene).unwrap(),
            PhysicsSimulationLibrary::Rapier
        );
        // The template registry survives the rebuild.
        assert!(sim.templates().objects.get_by_handle("crate").is_ok());
    }

    #[test]
    fn test_reset_clears_instances_and_keeps_registries() {
        let mut sim = Simulator::new(physics_config()).unwrap();
        let scene_id = sim.default_scene_id();
        sim.templates_mut().objects.register("crate", box_template());
        sim.add_object_by_handle("crate", scene_id, None).unwrap();
        sim.set_light_setup(
            vec![LightInfo::point(Vec3::new(0.0, 2.0, 0.0), Vec3::new(1.0, 1.0, 1.0))],
            "lamp",
        )
        .unwrap();
        sim.step_world(scene_id, 0.1).unwrap();

        sim.reset().unwrap();

        assert!(sim.existing_object_ids(scene_id).unwrap().is_empty());
        assert_eq!(sim.get_world_time(scene_id).unwrap(), 0.0);
        assert!(sim.templates().objects.get_by_handle("crate").is_ok());
        assert!(sim.get_light_setup("lamp").is_ok());
    }

    #[test]
    fn test_seed_makes_rng_deterministic() {
        let mut a = Simulator::new(SimulatorConfiguration::default()).unwrap();
        let mut b = Simulator::new(SimulatorConfiguration::default()).unwrap();
        a.seed(1234).unwrap();
        b.seed(1234).unwrap();

        let draws_a: Vec<u32> = (0..8).map(|_| a.rng().gen()).collect();
        let draws_b: Vec<u32> = (0..8).map(|_| b.rng().gen()).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_close_is_terminal_and_idempotent() {
        let mut sim = Simulator::new(SimulatorConfiguration::default()).unwrap();
        let scene_id = sim.default_scene_id();

        sim.close();
        sim.close();

        assert!(matches!(
            sim.existing_object_ids(scene_id),
            Err(SimError::InvalidState(_))
        ));
        assert!(matches!(sim.reset(), Err(SimError::InvalidState(_))));
        assert!(matches!(
            sim.step_world(scene_id, 0.1),
            Err(SimError::InvalidState(_))
        ));
    }

    #[test]
    fn test_bb_draw_requires_renderer() {
        let mut sim = Simulator::new(SimulatorConfiguration::default()).unwrap();
        let scene_id = sim.default_scene_id();
        sim.templates_mut().objects.register("crate", box_template());
        let object_id = sim.add_object_by_handle("crate", scene_id, None).unwrap();

        assert!(matches!(
            sim.set_object_bb_draw(true, object_id, scene_id),
            Err(SimError::InvalidState(_))
        ));

        let mut rendered = Simulator::new(SimulatorConfiguration {
            create_renderer: true,
            ..Default::default()
        })
        .unwrap();
        let scene_id = rendered.default_scene_id();
        rendered
            .templates_mut()
            .objects
            .register("crate", box_template());
        let object_id = rendered
            .add_object_by_handle("crate", scene_id, None)
            .unwrap();
        rendered.set_object_bb_draw(true, object_id, scene_id).unwrap();
        assert!(rendered
            .scene(scene_id)
            .unwrap()
            .object(object_id)
            .unwrap()
            .bb_draw());
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let config = SimulatorConfiguration {
            scene_path: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            Simulator::new(config),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn test_navmesh_recompute_through_simulator() {
        let mut sim = Simulator::new(physics_config()).unwrap();
        let scene_id = sim.default_scene_id();
        sim.templates_mut().objects.register("crate", box_template());
        let object_id = sim.add_object_by_handle("crate", scene_id, None).unwrap();
        sim.set_translation(Vec3::new(2.0, 0.5, 2.0), object_id, scene_id)
            .unwrap();
        sim.set_object_motion_type(MotionType::Static, object_id, scene_id)
            .unwrap();

        sim.recompute_navmesh(scene_id, &NavMeshSettings::default(), true)
            .unwrap();

        let pathfinder = sim.pathfinder(scene_id).unwrap();
        assert!(pathfinder.is_loaded());
        assert!(!pathfinder.is_navigable(&crate::foundation::math::Point3::new(2.0, 0.0, 2.0)));
        assert!(pathfinder.is_navigable(&crate::foundation::math::Point3::new(-4.0, 0.0, -4.0)));
    }
}

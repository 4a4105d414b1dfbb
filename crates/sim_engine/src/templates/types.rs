//! Blueprint types for assets, objects, stages, and physics configuration
//!
//! Templates are plain serializable data. Instancing an object copies the
//! template at creation time; later edits to a registered template never
//! retroactively affect existing instances.

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::foundation::math::{Aabb, Quat, Vec3};

/// Collision shape carried by object templates and stage statics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    /// Oriented box with given half-extents (meters)
    Cuboid {
        /// Half-extents along each local axis
        half_extents: Vec3,
    },
    /// Sphere (meters)
    Sphere {
        /// Sphere radius
        radius: f32,
    },
    /// Y-aligned capsule (meters)
    CapsuleY {
        /// Capsule radius
        radius: f32,
        /// Half-height of the cylindrical segment
        half_height: f32,
    },
}

impl CollisionShape {
    /// Local-space AABB of the shape, centered at the origin
    pub fn local_aabb(&self) -> Aabb {
        match self {
            Self::Cuboid { half_extents } => Aabb::from_center_extents(Vec3::zeros(), *half_extents),
            Self::Sphere { radius } => {
                Aabb::from_center_extents(Vec3::zeros(), Vec3::new(*radius, *radius, *radius))
            }
            Self::CapsuleY {
                radius,
                half_height,
            } => Aabb::from_center_extents(
                Vec3::zeros(),
                Vec3::new(*radius, half_height + radius, *radius),
            ),
        }
    }
}

impl Default for CollisionShape {
    fn default() -> Self {
        Self::Cuboid {
            half_extents: Vec3::new(0.1, 0.1, 0.1),
        }
    }
}

/// Blueprint for a loadable or procedural render asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetTemplate {
    /// Asset source path or primitive descriptor
    pub path: String,

    /// Whether the asset participates in lighting calculations
    pub requires_lighting: bool,

    /// Model up axis
    pub up: Vec3,

    /// Model front axis
    pub front: Vec3,
}

impl Default for AssetTemplate {
    fn default() -> Self {
        Self {
            path: String::new(),
            requires_lighting: true,
            up: Vec3::new(0.0, 1.0, 0.0),
            front: Vec3::new(0.0, 0.0, -1.0),
        }
    }
}

/// Blueprint for an instantiable physical object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectTemplate {
    /// Handle of the render asset to attach at the visual node
    pub render_asset: String,

    /// Collision shape used by the physics backend
    pub collision_shape: CollisionShape,

    /// Mass in kilograms
    pub mass: f32,

    /// Contact friction coefficient
    pub friction: f32,

    /// Contact restitution coefficient
    pub restitution: f32,

    /// Uniform instance scale applied at the root node
    pub scale: Vec3,

    /// Whether the object participates in collision at all
    pub is_collidable: bool,

    /// Default semantic id assigned to the instance's visual nodes
    pub semantic_id: u32,
}

impl Default for ObjectTemplate {
    fn default() -> Self {
        Self {
            render_asset: String::new(),
            collision_shape: CollisionShape::default(),
            mass: 1.0,
            friction: 0.5,
            restitution: 0.1,
            scale: Vec3::new(1.0, 1.0, 1.0),
            is_collidable: true,
            semantic_id: 0,
        }
    }
}

/// A static collider placed by a stage template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticColliderDef {
    /// Collider shape
    pub shape: CollisionShape,
    /// World-space translation
    pub translation: Vec3,
    /// World-space rotation
    pub rotation: Quat,
}

/// Blueprint for a simulation stage (the static environment of a scene)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTemplate {
    /// Handle of the stage render asset
    pub render_asset: String,

    /// Contact friction for stage geometry
    pub friction: f32,

    /// Contact restitution for stage geometry
    pub restitution: f32,

    /// Walkable bounds used when building a navmesh
    pub bounds: Aabb,

    /// Static collision geometry instanced at scene construction
    pub statics: Vec<StaticColliderDef>,
}

impl Default for StageTemplate {
    fn default() -> Self {
        Self::ground_plane(20.0)
    }
}

impl StageTemplate {
    /// A flat stage: one large ground slab whose top surface is at y = 0
    pub fn ground_plane(half_size: f32) -> Self {
        let ground_half_extents = Vec3::new(half_size, 0.5, half_size);
        Self {
            render_asset: String::new(),
            friction: 0.7,
            restitution: 0.0,
            bounds: Aabb::new(
                Vec3::new(-half_size, 0.0, -half_size),
                Vec3::new(half_size, 3.0, half_size),
            ),
            statics: vec![StaticColliderDef {
                shape: CollisionShape::Cuboid {
                    half_extents: ground_half_extents,
                },
                translation: Vec3::new(0.0, -0.5, 0.0),
                rotation: Quat::identity(),
            }],
        }
    }
}

/// Blueprint for the physics backend configuration of a scene
///
/// The fixed-step integrator parameters live here rather than being
/// hardcoded in the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTemplate {
    /// Default gravity vector for new scenes
    pub gravity: Vec3,

    /// Fixed integrator timestep in seconds
    pub fixed_dt: f32,

    /// Maximum number of fixed substeps consumed by one step call
    pub max_substeps: u32,
}

impl Default for PhysicsTemplate {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.8, 0.0),
            fixed_dt: 1.0 / 60.0,
            max_substeps: 10,
        }
    }
}

impl PhysicsTemplate {
    /// Load a physics configuration from a TOML or RON file, selected by
    /// extension
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_shape_local_aabb() {
        let capsule = CollisionShape::CapsuleY {
            radius: 0.2,
            half_height: 0.5,
        };
        let aabb = capsule.local_aabb();

        assert_eq!(aabb.extents(), Vec3::new(0.2, 0.7, 0.2));
        assert_eq!(aabb.center(), Vec3::zeros());
    }

    #[test]
    fn test_ground_plane_top_is_at_zero() {
        let stage = StageTemplate::ground_plane(10.0);
        let StaticColliderDef {
            shape, translation, ..
        } = &stage.statics[0];

        let CollisionShape::Cuboid { half_extents } = shape else {
            panic!("ground stage should use a cuboid slab");
        };
        assert_eq!(translation.y + half_extents.y, 0.0);
    }

    #[test]
    fn test_physics_template_ron_round_trip() {
        let template = PhysicsTemplate {
            gravity: Vec3::new(0.0, -3.7, 0.0),
            fixed_dt: 1.0 / 120.0,
            max_substeps: 4,
        };

        let text = ron::to_string(&template).unwrap();
        let parsed: PhysicsTemplate = ron::from_str(&text).unwrap();
        assert_eq!(template, parsed);
    }
}

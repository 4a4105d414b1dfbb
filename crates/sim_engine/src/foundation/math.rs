//! Math utilities and types
//!
//! Provides fundamental math types for 3D simulation.

pub use nalgebra::{Isometry3, Matrix3, Matrix4, Quaternion, Translation3, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Combine this transform with another (this acting as the parent)
    ///
    /// Non-uniform scale under rotation is not preserved exactly; simulation
    /// poses are rigid so composition stays lossless for them.
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * self.scale.component_mul(&other.position),
            rotation: self.rotation * other.rotation,
            scale: self.scale.component_mul(&other.scale),
        }
    }

    /// Get the inverse transform
    pub fn inverse(&self) -> Transform {
        let inv_scale = Vec3::new(1.0 / self.scale.x, 1.0 / self.scale.y, 1.0 / self.scale.z);
        let inv_rotation = self.rotation.inverse();
        let inv_position = inv_rotation * (-self.position).component_mul(&inv_scale);

        Transform {
            position: inv_position,
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }

    /// Decompose a transformation matrix into position, rotation, and scale
    ///
    /// Assumes the matrix was produced by composing translation, rotation,
    /// and positive scaling; shear is not recovered.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = Vec3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
        let mut basis: Mat3 = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let scale = Vec3::new(
            basis.column(0).norm(),
            basis.column(1).norm(),
            basis.column(2).norm(),
        );
        for i in 0..3 {
            if scale[i] > f32::EPSILON {
                basis.column_mut(i).unscale_mut(scale[i]);
            }
        }
        let rotation =
            Quat::from_rotation_matrix(&nalgebra::Rotation3::from_matrix_unchecked(basis));

        Self {
            position,
            rotation,
            scale,
        }
    }

    /// The rigid part of this transform as an isometry (scale discarded)
    pub fn to_isometry(&self) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(self.position), self.rotation)
    }

    /// Build a transform from an isometry with unit scale
    pub fn from_isometry(iso: &Isometry3<f32>) -> Self {
        Self {
            position: iso.translation.vector,
            rotation: iso.rotation,
            ..Default::default()
        }
    }
}

/// A pure (translation, rotation) pose used as a transfer value between the
/// scene graph and the physics backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidState {
    /// Translation component of the pose
    pub translation: Vec3,

    /// Rotation component of the pose
    pub rotation: Quat,
}

impl Default for RigidState {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl RigidState {
    /// Create a rigid state from translation and rotation
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// View this pose as an isometry
    pub fn to_isometry(&self) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }

    /// Build a rigid state from an isometry
    pub fn from_isometry(iso: &Isometry3<f32>) -> Self {
        Self {
            translation: iso.translation.vector,
            rotation: iso.rotation,
        }
    }
}

impl From<&Transform> for RigidState {
    fn from(transform: &Transform) -> Self {
        Self {
            translation: transform.position,
            rotation: transform.rotation,
        }
    }
}

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_transform_identity() {
        let transform = Transform::identity();

        assert_eq!(transform.position, Vec3::zeros());
        assert_relative_eq!(transform.rotation, Quat::identity(), epsilon = EPSILON);
        assert_eq!(transform.scale, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_transform_combine_inverse_round_trip() {
        let parent = Transform::from_position_rotation(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_euler_angles(0.1, 0.4, -0.2),
        );
        let child = Transform::from_position(Vec3::new(-2.0, 0.5, 4.0));

        let world = parent.combine(&child);
        let recovered = parent.inverse().combine(&world);

        assert_relative_eq!(recovered.position, child.position, epsilon = EPSILON);
        assert_relative_eq!(recovered.rotation, child.rotation, epsilon = EPSILON);
    }

    #[test]
    fn test_transform_matrix_round_trip() {
        let transform = Transform {
            position: Vec3::new(1.0, -2.0, 0.5),
            rotation: Quat::from_euler_angles(0.2, -0.7, 1.3),
            scale: Vec3::new(2.0, 0.5, 1.5),
        };

        let recovered = Transform::from_matrix(&transform.to_matrix());

        assert_relative_eq!(recovered.position, transform.position, epsilon = EPSILON);
        assert_relative_eq!(recovered.rotation, transform.rotation, epsilon = EPSILON);
        assert_relative_eq!(recovered.scale, transform.scale, epsilon = EPSILON);
    }

    #[test]
    fn test_rigid_state_isometry_round_trip() {
        let state = RigidState::new(
            Vec3::new(4.0, -1.0, 0.25),
            Quat::from_euler_angles(0.3, 0.0, 1.1),
        );

        let recovered = RigidState::from_isometry(&state.to_isometry());

        assert_relative_eq!(recovered.translation, state.translation, epsilon = EPSILON);
        assert_relative_eq!(recovered.rotation, state.rotation, epsilon = EPSILON);
    }

    #[test]
    fn test_aabb_contains_and_intersects() {
        let a = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let b = Aabb::from_center_extents(Vec3::new(1.5, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let c = Aabb::from_center_extents(Vec3::new(5.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));

        assert!(a.contains_point(Vec3::new(0.5, -0.5, 0.9)));
        assert!(!a.contains_point(Vec3::new(0.0, 1.5, 0.0)));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}

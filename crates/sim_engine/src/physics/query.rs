//! Spatial query value types (rays and hit records)

use crate::core::error::{SimError, SimResult};
use crate::foundation::math::{Point3, Vec3};
use crate::scene::ObjectId;

/// A ray cast into the collidable scene
#[derive(Debug, Clone, PartialEq)]
pub struct Ray {
    /// Ray origin
    pub origin: Point3,
    /// Ray direction; does not need to be normalized
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Reject degenerate rays before they reach the backend
    pub fn validate(&self) -> SimResult<()> {
        if !self.origin.coords.iter().all(|c| c.is_finite())
            || !self.direction.iter().all(|c| c.is_finite())
        {
            return Err(SimError::InvalidArgument(
                "ray origin/direction must be finite".into(),
            ));
        }
        if self.direction.norm_squared() <= f32::EPSILON {
            return Err(SimError::InvalidArgument(
                "ray direction must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// A single raycast hit
#[derive(Debug, Clone, PartialEq)]
pub struct RaycastHit {
    /// Id of the hit object; `None` when stage geometry was hit
    pub object_id: Option<ObjectId>,
    /// World-space hit point
    pub point: Point3,
    /// World-space surface normal at the hit point
    pub normal: Vec3,
    /// Hit distance as a fraction of the ray's maximum distance, in [0, 1]
    pub fraction: f32,
}

/// Ordered raycast results, nearest hit first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaycastResults {
    /// The ray that produced these results
    pub ray: Option<Ray>,
    /// Hits sorted by ascending fraction
    pub hits: Vec<RaycastHit>,
}

impl RaycastResults {
    /// Whether anything was hit
    pub fn has_hits(&self) -> bool {
        !self.hits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_validation() {
        let good = Ray::new(Point3::origin(), Vec3::new(0.0, -1.0, 0.0));
        assert!(good.validate().is_ok());

        let zero_dir = Ray::new(Point3::origin(), Vec3::zeros());
        assert!(matches!(
            zero_dir.validate(),
            Err(SimError::InvalidArgument(_))
        ));

        let non_finite = Ray::new(Point3::origin(), Vec3::new(f32::NAN, 1.0, 0.0));
        assert!(matches!(
            non_finite.validate(),
            Err(SimError::InvalidArgument(_))
        ));
    }
}

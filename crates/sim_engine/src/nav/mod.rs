//! Navigability mesh construction and queries
//!
//! The navmesh is an XZ occupancy grid over the stage's walkable bounds.
//! Rebuilds produce a complete new mesh and swap it into the pathfinder in
//! one assignment, so queries observe either the prior or the new mesh,
//! never a partial rebuild. Path-planning internals are out of scope; this
//! module answers navigability only.

use serde::{Deserialize, Serialize};

use crate::core::error::{SimError, SimResult};
use crate::foundation::math::{Aabb, Point3};

/// Parameters of a navmesh rebuild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavMeshSettings {
    /// XZ cell size in meters
    pub cell_size: f32,
    /// Vertical cell size in meters
    pub cell_height: f32,
    /// Agent radius; obstacles are inflated by this much
    pub agent_radius: f32,
    /// Agent height
    pub agent_height: f32,
    /// Maximum ledge height the agent can climb
    pub agent_max_climb: f32,
    /// Maximum walkable slope in degrees
    pub agent_max_slope_deg: f32,
}

impl Default for NavMeshSettings {
    fn default() -> Self {
        Self {
            cell_size: 0.05,
            cell_height: 0.2,
            agent_radius: 0.1,
            agent_height: 1.5,
            agent_max_climb: 0.2,
            agent_max_slope_deg: 45.0,
        }
    }
}

impl NavMeshSettings {
    /// Reject out-of-range settings before a rebuild starts
    pub fn validate(&self) -> SimResult<()> {
        if self.cell_size <= 0.0 || self.cell_height <= 0.0 {
            return Err(SimError::InvalidArgument(
                "navmesh cell dimensions must be positive".into(),
            ));
        }
        if self.agent_radius < 0.0 || self.agent_height <= 0.0 || self.agent_max_climb < 0.0 {
            return Err(SimError::InvalidArgument(
                "navmesh agent dimensions are out of range".into(),
            ));
        }
        if !(0.0..90.0).contains(&self.agent_max_slope_deg) {
            return Err(SimError::InvalidArgument(
                "navmesh max slope must be in [0, 90) degrees".into(),
            ));
        }
        Ok(())
    }
}

/// Precomputed grid of walkable regions
#[derive(Debug, Clone)]
pub struct NavMesh {
    bounds: Aabb,
    cell_size: f32,
    width: usize,
    depth: usize,
    walkable: Vec<bool>,
}

impl NavMesh {
    /// Build a fully-walkable mesh over `bounds`
    fn new(bounds: Aabb, cell_size: f32) -> Self {
        let size = bounds.max - bounds.min;
        let width = (size.x / cell_size).ceil().max(1.0) as usize;
        let depth = (size.z / cell_size).ceil().max(1.0) as usize;
        Self {
            bounds,
            cell_size,
            width,
            depth,
            walkable: vec![true; width * depth],
        }
    }

    fn cell_index(&self, x: f32, z: f32) -> Option<usize> {
        if x < self.bounds.min.x || z < self.bounds.min.z {
            return None;
        }
        let cx = ((x - self.bounds.min.x) / self.cell_size) as usize;
        let cz = ((z - self.bounds.min.z) / self.cell_size) as usize;
        if cx >= self.width || cz >= self.depth {
            return None;
        }
        Some(cz * self.width + cx)
    }

    /// Mark every cell covered by the XZ footprint of `aabb` (inflated by
    /// `inflate`) as non-walkable
    fn carve_footprint(&mut self, aabb: &Aabb, inflate: f32) {
        let min_x = aabb.min.x - inflate;
        let max_x = aabb.max.x + inflate;
        let min_z = aabb.min.z - inflate;
        let max_z = aabb.max.z + inflate;

        let mut z = min_z;
        while z <= max_z {
            let mut x = min_x;
            while x <= max_x {
                if let Some(index) = self.cell_index(x, z) {
                    self.walkable[index] = false;
                }
                x += self.cell_size;
            }
            // Also hit the exact edge row/column.
            if let Some(index) = self.cell_index(max_x, z) {
                self.walkable[index] = false;
            }
            z += self.cell_size;
        }
        let mut x = min_x;
        while x <= max_x {
            if let Some(index) = self.cell_index(x, max_z) {
                self.walkable[index] = false;
            }
            x += self.cell_size;
        }
    }

    /// Whether a world-space point lies on a walkable cell
    pub fn is_navigable(&self, point: &Point3) -> bool {
        self.cell_index(point.x, point.z)
            .map(|index| self.walkable[index])
            .unwrap_or(false)
    }

    /// Bounds this mesh covers
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Fraction of cells that are walkable
    pub fn walkable_ratio(&self) -> f32 {
        let walkable = self.walkable.iter().filter(|&&w| w).count();
        walkable as f32 / self.walkable.len() as f32
    }
}

/// Navigability query interface backed by an optional [`NavMesh`]
///
/// A pathfinder with no mesh loaded reports every point non-navigable.
#[derive(Debug, Clone, Default)]
pub struct PathFinder {
    mesh: Option<NavMesh>,
}

impl PathFinder {
    /// Create a pathfinder with no mesh loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a mesh has been built or loaded
    pub fn is_loaded(&self) -> bool {
        self.mesh.is_some()
    }

    /// Whether a world-space point is navigable
    pub fn is_navigable(&self, point: &Point3) -> bool {
        self.mesh
            .as_ref()
            .map(|mesh| mesh.is_navigable(point))
            .unwrap_or(false)
    }

    /// Borrow the current mesh, if any
    pub fn mesh(&self) -> Option<&NavMesh> {
        self.mesh.as_ref()
    }

    /// Replace the mesh atomically
    ///
    /// The new mesh is fully built before this is called, so observers see
    /// either the prior or the new mesh.
    pub fn replace_mesh(&mut self, mesh: NavMesh) {
        self.mesh = Some(mesh);
    }
}

/// Rebuild a navmesh from the stage's walkable bounds and a set of obstacle
/// footprints
///
/// `obstacles` are world-space AABBs of geometry that blocks navigation
/// (typically the STATIC-motion object instances of the scene).
pub fn build_navmesh(
    settings: &NavMeshSettings,
    stage_bounds: &Aabb,
    obstacles: &[Aabb],
) -> SimResult<NavMesh> {
    settings.validate()?;

    let mut mesh = NavMesh::new(*stage_bounds, settings.cell_size);
    for obstacle in obstacles {
        // Obstacles far above the walkable surface don't block it.
        if obstacle.min.y > stage_bounds.min.y + settings.agent_height {
            continue;
        }
        mesh.carve_footprint(obstacle, settings.agent_radius);
    }

    log::debug!(
        "navmesh rebuilt: {}x{} cells, {:.1}% walkable",
        mesh.width,
        mesh.depth,
        mesh.walkable_ratio() * 100.0
    );
    Ok(mesh)
}

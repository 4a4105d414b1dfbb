//! Named lighting configurations
//!
//! Light setups are shared by key reference: drawable metadata stores a key,
//! and every lookup goes through the registry, so replacing a setup under a
//! key is observed by all current referrers on their next use.

use std::collections::HashMap;

use crate::core::error::{SimError, SimResult};
use crate::foundation::math::Vec3;

/// Key of the light setup assigned to objects when none is specified
pub const DEFAULT_LIGHTING_KEY: &str = "default";

/// Key of the no-lights setup used for flat shading
pub const NO_LIGHT_KEY: &str = "no_lights";

/// How a light's position vector is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightPositionModel {
    /// Vector is in world space
    Global,
    /// Vector is relative to the camera
    Camera,
    /// Vector is relative to the lit object
    Object,
}

/// A single light descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct LightInfo {
    /// Position (point light) or direction (directional light)
    pub vector: Vec3,
    /// Light color, linear RGB
    pub color: Vec3,
    /// Frame the vector is expressed in
    pub model: LightPositionModel,
}

impl LightInfo {
    /// Create a world-space point light
    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self {
            vector: position,
            color,
            model: LightPositionModel::Global,
        }
    }
}

/// A named set of light descriptors
pub type LightSetup = Vec<LightInfo>;

/// Registry of light setups shared by key across all scenes of a simulator
#[derive(Debug, Clone)]
pub struct LightSetupRegistry {
    setups: HashMap<String, LightSetup>,
}

impl LightSetupRegistry {
    /// Create a registry pre-populated with the default and no-light setups
    pub fn new() -> Self {
        let mut setups = HashMap::new();
        setups.insert(
            DEFAULT_LIGHTING_KEY.to_string(),
            vec![
                LightInfo::point(Vec3::new(1.0, 1.5, 0.5), Vec3::new(0.75, 0.75, 0.75)),
                LightInfo::point(Vec3::new(-0.5, 1.5, -1.0), Vec3::new(0.4, 0.4, 0.4)),
            ],
        );
        setups.insert(NO_LIGHT_KEY.to_string(), Vec::new());
        Self { setups }
    }

    /// Get a copy of the setup registered under `key`
    pub fn get(&self, key: &str) -> SimResult<LightSetup> {
        self.setups.get(key).cloned().ok_or_else(|| {
            SimError::NotFound(format!("no light setup registered under key '{key}'"))
        })
    }

    /// Register a setup under `key`, replacing any existing one
    ///
    /// All current referrers observe the replacement on their next lookup.
    pub fn set(&mut self, setup: LightSetup, key: &str) {
        if self.setups.insert(key.to_string(), setup).is_some() {
            log::debug!("light setup '{key}' replaced");
        }
    }

    /// Whether a setup exists under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.setups.contains_key(key)
    }
}

impl Default for LightSetupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

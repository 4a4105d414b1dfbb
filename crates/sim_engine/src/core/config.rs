//! Simulator session configuration
//!
//! [`SimulatorConfiguration`] captures everything fixed at construction time.
//! It is plain serializable data: two configurations are equal iff every
//! field matches, which is what `reconfigure` uses to decide whether a
//! rebuild is needed.

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::lighting::DEFAULT_LIGHTING_KEY;

/// Construction-time configuration for a [`crate::sim::Simulator`]
///
/// Immutable for the lifetime of a session unless `reconfigure` is called
/// with a non-equal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfiguration {
    /// Handle of the stage template to instance the default scene from
    pub scene_path: String,

    /// Seed for the simulator's random number generator
    pub random_seed: u64,

    /// Identifier of the default agent
    pub default_agent_id: u32,

    /// Identifier of the default camera
    pub default_camera_id: String,

    /// GPU device id used when a renderer is created
    pub gpu_device_id: i32,

    /// Compress textures on load
    pub compress_textures: bool,

    /// Allow agents to slide along obstacles on contact
    pub allow_sliding: bool,

    /// Create a renderer; presentation operations that touch drawables
    /// require this
    pub create_renderer: bool,

    /// Enable frustum culling in the renderer
    pub frustum_culling: bool,

    /// Enable the physics backend; without it scenes fall back to
    /// kinematic-only scene-graph state
    pub enable_physics: bool,

    /// Path to a physics configuration file (TOML or RON); empty means
    /// built-in defaults
    pub physics_config_path: String,

    /// Light setup key assigned to newly instanced objects by default
    pub scene_light_setup_key: String,

    /// Load the semantic mesh for the stage
    pub load_semantic_mesh: bool,
}

impl Default for SimulatorConfiguration {
    fn default() -> Self {
        Self {
            scene_path: "NONE".to_string(),
            random_seed: 0,
            default_agent_id: 0,
            default_camera_id: "rgba_camera".to_string(),
            gpu_device_id: 0,
            compress_textures: false,
            allow_sliding: true,
            create_renderer: false,
            frustum_culling: true,
            enable_physics: false,
            physics_config_path: String::new(),
            scene_light_setup_key: DEFAULT_LIGHTING_KEY.to_string(),
            load_semantic_mesh: true,
        }
    }
}

impl SimulatorConfiguration {
    /// Reject configurations that cannot construct a session
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scene_path.is_empty() {
            return Err(ConfigError::Invalid(
                "scene_path must be a stage handle or \"NONE\"".to_string(),
            ));
        }
        if self.default_camera_id.is_empty() {
            return Err(ConfigError::Invalid(
                "default_camera_id must not be empty".to_string(),
            ));
        }
        if self.scene_light_setup_key.is_empty() {
            return Err(ConfigError::Invalid(
                "scene_light_setup_key must not be empty".to_string(),
            ));
        }
        if self.gpu_device_id < -1 {
            return Err(ConfigError::Invalid(format!(
                "gpu_device_id {} is out of range",
                self.gpu_device_id
            )));
        }
        Ok(())
    }

    /// Load configuration from a TOML or RON file, selected by extension
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

    /// Save configuration to a TOML or RON file, selected by extension
    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = SimulatorConfiguration::default();

        assert_eq!(config.scene_path, "NONE");
        assert!(!config.enable_physics);
        assert!(!config.create_renderer);
        assert_eq!(config.scene_light_setup_key, DEFAULT_LIGHTING_KEY);
    }

    #[test]
    fn test_validation_rejects_empty_fields() {
        assert!(SimulatorConfiguration::default().validate().is_ok());

        let no_scene = SimulatorConfiguration {
            scene_path: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            no_scene.validate(),
            Err(ConfigError::Invalid(_))
        ));

        let bad_gpu = SimulatorConfiguration {
            gpu_device_id: -3,
            ..Default::default()
        };
        assert!(matches!(bad_gpu.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_equality_is_field_wise() {
        let a = SimulatorConfiguration::default();
        let mut b = a.clone();
        assert_eq!(a, b);

        b.random_seed = 7;
        assert_ne!(a, b);

        b.random_seed = a.random_seed;
        b.enable_physics = !a.enable_physics;
        assert_ne!(a, b);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = SimulatorConfiguration::default();
        config.scene_path = "apartment_0".to_string();
        config.enable_physics = true;
        config.random_seed = 42;

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: SimulatorConfiguration = toml::from_str(&text).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: SimulatorConfiguration =
            toml::from_str("scene_path = \"van-gogh-room\"\nenable_physics = true\n").unwrap();

        assert_eq!(parsed.scene_path, "van-gogh-room");
        assert!(parsed.enable_physics);
        assert_eq!(parsed.default_camera_id, "rgba_camera");
    }
}

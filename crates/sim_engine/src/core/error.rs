//! Simulator error taxonomy
//!
//! Every fallible operation on the library surface returns [`SimResult`].
//! Validation failures surface synchronously as typed errors; they never
//! abort the process.

use thiserror::Error;

/// Result alias used across the simulator surface
pub type SimResult<T> = Result<T, SimError>;

/// Simulator errors
#[derive(Error, Debug)]
pub enum SimError {
    /// A template id/handle, object id, or scene id was not registered
    #[error("Not found: {0}")]
    NotFound(String),

    /// A caller-supplied value was malformed or out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation requires state the simulator is not in
    /// (e.g. physics requested with no backend, renderer-dependent call
    /// with no renderer, or any call after `close`)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The active backend cannot service this query
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Configuration file loading or parsing failed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SimError {
    /// Shorthand for an unknown-object failure
    pub(crate) fn unknown_object(object_id: u32) -> Self {
        Self::NotFound(format!("object id {object_id} is not instanced"))
    }

    /// Shorthand for an unknown-scene failure
    pub(crate) fn unknown_scene(scene_id: u64) -> Self {
        Self::NotFound(format!("scene id {scene_id} does not exist"))
    }
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Semantically invalid configuration
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

//! Core module - configuration and error types shared across the simulator

pub mod config;
pub mod error;

pub use config::SimulatorConfiguration;
pub use error::{SimError, SimResult};

//! mmo_shaping - reward shaping and observation augmentation for
//! multi-agent survival environments.
//!
//! Each agent gets its own [`Postprocessor`](shaping::Postprocessor), built by
//! a [`PostprocessorFactory`](shaping::PostprocessorFactory) from the run's
//! [`EnvConfig`](config::EnvConfig) and [`ShapingConfig`](shaping::ShapingConfig).
//! A small procedural realm in [`synthetic`] drives postprocessors end to end
//! without the full simulation.

pub mod config;
pub mod shaping;
pub mod synthetic;

pub use config::{ConfigError, EnvConfig, RunArgs};
pub use shaping::{Postprocessor, PostprocessorFactory, ShapingConfig, ShapingError};

use thiserror::Error;

/// Errors raised while building or validating run configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Weight `{name}` must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f32 },

    #[error("Threshold `{name}` must lie in 0..=100, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: i32 },

    #[error("Survival threshold {survival} exceeds resource threshold {resource}")]
    ThresholdOrder { survival: i32, resource: i32 },

    #[error("Death fog threshold must be finite and non-negative, got {0}")]
    InvalidFogThreshold(f32),

    #[error("`{name}` must be positive")]
    NonPositive { name: &'static str },

    #[error("Resilient population must lie in 0.0..=1.0, got {0}")]
    ResilientPopulation(f32),
}

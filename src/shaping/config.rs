//! Reward-term weights and thresholds for the postprocessor.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Immutable shaping configuration shared by every postprocessor of a run.
///
/// All weights default to zero, which turns the postprocessor into a pure
/// observation augmenter that forwards the base reward.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ShapingConfig {
    // --- Action masking ---
    /// Restrict the attack-style action to the assigned combat skill.
    pub only_use_main_skill: bool,

    // --- Thresholds ---
    /// Health/food/water level at or below which the agent is in survival mode.
    pub survival_mode_criteria: i32,
    /// Upper bound of the "start looking for food/water" band.
    pub get_resource_criteria: i32,
    /// Death fog value at or above which the agent is in survival mode.
    pub death_fog_criteria: f32,
    /// Maximum number of new unique events rewarded in a single tick.
    pub clip_unique_event: u32,

    // --- Reward weights ---
    pub survival_bonus_weight: f32,
    pub progress_bonus_weight: f32,
    pub get_resource_weight: f32,
    pub meander_bonus_weight: f32,
    pub combat_bonus_weight: f32,
    pub equipment_bonus_weight: f32,
    pub unique_event_bonus_weight: f32,
    pub underdog_bonus_weight: f32,
}

impl ShapingConfig {
    /// Checks that every weight is finite and non-negative and that the
    /// thresholds are ordered and within the resource range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.weights() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        for (name, value) in [
            ("survival_mode_criteria", self.survival_mode_criteria),
            ("get_resource_criteria", self.get_resource_criteria),
        ] {
            if !(0..=100).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.survival_mode_criteria > self.get_resource_criteria {
            return Err(ConfigError::ThresholdOrder {
                survival: self.survival_mode_criteria,
                resource: self.get_resource_criteria,
            });
        }
        if !self.death_fog_criteria.is_finite() || self.death_fog_criteria < 0.0 {
            return Err(ConfigError::InvalidFogThreshold(self.death_fog_criteria));
        }
        Ok(())
    }

    /// Named reward weights, in reward-term order.
    pub fn weights(&self) -> [(&'static str, f32); 8] {
        [
            ("survival", self.survival_bonus_weight),
            ("progress", self.progress_bonus_weight),
            ("get_resource", self.get_resource_weight),
            ("meander", self.meander_bonus_weight),
            ("combat", self.combat_bonus_weight),
            ("equipment", self.equipment_bonus_weight),
            ("unique_event", self.unique_event_bonus_weight),
            ("underdog", self.underdog_bonus_weight),
        ]
    }
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            only_use_main_skill: false,
            survival_mode_criteria: 35,
            get_resource_criteria: 70,
            death_fog_criteria: 1.0,
            clip_unique_event: 3,
            survival_bonus_weight: 0.0,
            progress_bonus_weight: 0.0,
            get_resource_weight: 0.0,
            meander_bonus_weight: 0.0,
            combat_bonus_weight: 0.0,
            equipment_bonus_weight: 0.0,
            unique_event_bonus_weight: 0.0,
            underdog_bonus_weight: 0.0,
        }
    }
}

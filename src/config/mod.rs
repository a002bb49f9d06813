//! Run configuration: command-line arguments and the simulation config
//! derived from them.

mod error;

pub use error::ConfigError;

use clap::Args;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::shaping::ShapingConfig;

/// External run arguments, shared by the training entry point and tools.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Number of player agents per environment.
    #[arg(long, default_value_t = 128)]
    pub num_agents: u32,
    /// Episode horizon in ticks.
    #[arg(long, default_value_t = 1024)]
    pub max_episode_length: u32,
    /// Number of pregenerated maps to cycle through.
    #[arg(long, default_value_t = 128)]
    pub num_maps: u32,
    /// Directory holding the pregenerated maps.
    #[arg(long, default_value = "maps/train")]
    pub maps_path: String,
    /// Playable map size (without the border).
    #[arg(long, default_value_t = 128)]
    pub map_size: usize,
    /// Number of NPCs per environment.
    #[arg(long, default_value_t = 256)]
    pub num_npcs: u32,
    /// Curriculum file with the task definitions.
    #[arg(long)]
    pub tasks_path: Option<String>,
    /// Task embedding dimension.
    #[arg(long, default_value_t = 4096)]
    pub task_size: usize,
    /// Fraction of agents that do not lose health from starvation.
    #[arg(long, default_value_t = 0.2)]
    pub resilient_population: f32,
    /// Ticks after spawn during which players cannot attack each other.
    #[arg(long, default_value_t = 20)]
    pub spawn_immunity: u32,
    /// Seed for the postprocessors' fallback skill draw.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Restrict attacks to the assigned combat skill.
    #[arg(long)]
    pub only_use_main_skill: bool,
    #[arg(long, default_value_t = 35)]
    pub survival_mode_criteria: i32,
    #[arg(long, default_value_t = 70)]
    pub get_resource_criteria: i32,
    #[arg(long, default_value_t = 1.0)]
    pub death_fog_criteria: f32,
    #[arg(long, default_value_t = 3)]
    pub clip_unique_event: u32,
    #[arg(long, default_value_t = 0.0)]
    pub survival_bonus_weight: f32,
    #[arg(long, default_value_t = 0.0)]
    pub progress_bonus_weight: f32,
    #[arg(long, default_value_t = 0.0)]
    pub get_resource_weight: f32,
    #[arg(long, default_value_t = 0.0)]
    pub meander_bonus_weight: f32,
    #[arg(long, default_value_t = 0.0)]
    pub combat_bonus_weight: f32,
    #[arg(long, default_value_t = 0.0)]
    pub equipment_bonus_weight: f32,
    #[arg(long, default_value_t = 0.0)]
    pub unique_event_bonus_weight: f32,
    #[arg(long, default_value_t = 0.0)]
    pub underdog_bonus_weight: f32,
}

impl RunArgs {
    /// Collects the shaping flags into a validated [`ShapingConfig`].
    pub fn shaping(&self) -> Result<ShapingConfig, ConfigError> {
        let config = ShapingConfig {
            only_use_main_skill: self.only_use_main_skill,
            survival_mode_criteria: self.survival_mode_criteria,
            get_resource_criteria: self.get_resource_criteria,
            death_fog_criteria: self.death_fog_criteria,
            clip_unique_event: self.clip_unique_event,
            survival_bonus_weight: self.survival_bonus_weight,
            progress_bonus_weight: self.progress_bonus_weight,
            get_resource_weight: self.get_resource_weight,
            meander_bonus_weight: self.meander_bonus_weight,
            combat_bonus_weight: self.combat_bonus_weight,
            equipment_bonus_weight: self.equipment_bonus_weight,
            unique_event_bonus_weight: self.unique_event_bonus_weight,
            underdog_bonus_weight: self.underdog_bonus_weight,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Simulation configuration handed to the environment.
///
/// Feature toggles that training relies on (action targets, death fog
/// observations) are always on; communication is always off.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvConfig {
    // --- Observation toggles ---
    pub provide_action_targets: bool,
    pub provide_noop_action_target: bool,
    pub provide_death_fog_obs: bool,
    pub communication_system_enabled: bool,

    // --- Map ---
    pub map_force_generation: bool,
    pub map_n: u32,
    pub path_maps: String,
    /// Playable area side length.
    pub map_center: usize,
    /// Impassable border around the playable area.
    pub map_border: usize,
    /// Radius of the square tile window each agent observes.
    pub player_vision_radius: usize,

    // --- Population ---
    pub player_n: u32,
    pub npc_n: u32,
    pub resource_resilient_population: f32,
    pub combat_spawn_immunity: u32,

    // --- Episode / tasks ---
    pub horizon: u32,
    pub curriculum_file_path: Option<String>,
    pub task_embed_dim: usize,
}

impl EnvConfig {
    pub const DEFAULT_MAP_BORDER: usize = 16;
    pub const DEFAULT_VISION_RADIUS: usize = 7;

    /// Builds the simulation configuration from run arguments.
    pub fn from_args(args: &RunArgs) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("num_agents", args.num_agents as usize),
            ("max_episode_length", args.max_episode_length as usize),
            ("num_maps", args.num_maps as usize),
            ("map_size", args.map_size),
        ] {
            if value == 0 {
                return Err(ConfigError::NonPositive { name });
            }
        }
        if !(0.0..=1.0).contains(&args.resilient_population) {
            return Err(ConfigError::ResilientPopulation(args.resilient_population));
        }

        Ok(Self {
            provide_action_targets: true,
            provide_noop_action_target: true,
            provide_death_fog_obs: true,
            communication_system_enabled: false,
            map_force_generation: false,
            map_n: args.num_maps,
            path_maps: format!("{}/{}/", args.maps_path.trim_end_matches('/'), args.map_size),
            map_center: args.map_size,
            map_border: Self::DEFAULT_MAP_BORDER,
            player_vision_radius: Self::DEFAULT_VISION_RADIUS,
            player_n: args.num_agents,
            npc_n: args.num_npcs,
            resource_resilient_population: args.resilient_population,
            combat_spawn_immunity: args.spawn_immunity,
            horizon: args.max_episode_length,
            curriculum_file_path: args.tasks_path.clone(),
            task_embed_dim: args.task_size,
        })
    }

    /// Full map side length, border included.
    pub fn map_size(&self) -> usize {
        self.map_center + 2 * self.map_border
    }

    /// Number of tiles in one agent's observation window.
    pub fn map_n_obs(&self) -> usize {
        let side = 2 * self.player_vision_radius + 1;
        side * side
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        run: RunArgs,
    }

    fn parse(args: &[&str]) -> RunArgs {
        let argv = std::iter::once("test").chain(args.iter().copied());
        Cli::parse_from(argv).run
    }

    #[test]
    fn defaults_build_env_config() {
        let args = parse(&[]);
        let cfg = EnvConfig::from_args(&args).unwrap();
        assert!(cfg.provide_action_targets);
        assert!(cfg.provide_death_fog_obs);
        assert!(!cfg.communication_system_enabled);
        assert!(!cfg.map_force_generation);
        assert_eq!(cfg.player_n, 128);
        assert_eq!(cfg.horizon, 1024);
        assert_eq!(cfg.path_maps, "maps/train/128/");
        assert_eq!(cfg.map_size(), 160);
        assert_eq!(cfg.map_n_obs(), 225);
        assert_eq!(cfg.curriculum_file_path, None);
    }

    #[test]
    fn args_flow_into_config() {
        let args = parse(&[
            "--num-agents",
            "16",
            "--map-size",
            "64",
            "--maps-path",
            "maps/eval/",
            "--tasks-path",
            "curriculum.pkl",
            "--num-npcs",
            "32",
            "--spawn-immunity",
            "5",
        ]);
        let cfg = EnvConfig::from_args(&args).unwrap();
        assert_eq!(cfg.player_n, 16);
        assert_eq!(cfg.npc_n, 32);
        assert_eq!(cfg.map_center, 64);
        assert_eq!(cfg.path_maps, "maps/eval/64/");
        assert_eq!(cfg.curriculum_file_path.as_deref(), Some("curriculum.pkl"));
        assert_eq!(cfg.combat_spawn_immunity, 5);
    }

    #[test]
    fn zero_agents_rejected() {
        let args = parse(&["--num-agents", "0"]);
        assert_eq!(
            EnvConfig::from_args(&args),
            Err(ConfigError::NonPositive { name: "num_agents" })
        );
    }

    #[test]
    fn shaping_flags_validated() {
        let args = parse(&["--combat-bonus-weight", "0.05", "--only-use-main-skill"]);
        let shaping = args.shaping().unwrap();
        assert_eq!(shaping.combat_bonus_weight, 0.05);
        assert!(shaping.only_use_main_skill);

        let args = parse(&["--survival-mode-criteria", "90"]);
        assert!(args.shaping().is_err());
    }
}

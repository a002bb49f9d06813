//! Per-agent postprocessor: episode lifecycle, observation augmentation,
//! action recording, and reward shaping.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use super::action::ActionVector;
use super::config::ShapingConfig;
use super::episode::{EpisodeState, TickContext};
use super::error::ShapingError;
use super::maps::{DistanceMap, ThreatMap};
use super::observation::{
    augment_tiles, combat_embedding, ActionTargets, EntityLayout, Observation, ObservationShape,
    TileLayout,
};
use super::query::{AgentView, RealmView};
use super::reward::{EpisodeTotals, RewardBreakdown, RewardShaper};
use super::types::{CombatSkill, EntityId};
use crate::config::{ConfigError, EnvConfig};

/// Reward, done flag, and info after shaping.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedStep<I> {
    pub reward: f32,
    pub done: bool,
    pub info: I,
    /// Per-term bonuses; `None` on the terminal tick, which is not shaped.
    pub breakdown: Option<RewardBreakdown>,
}

/// State that exists only between `reset` and the end of an episode.
#[derive(Debug, Clone)]
struct ActiveEpisode {
    skill: CombatSkill,
    combat_attr_len: usize,
    state: EpisodeState,
    totals: EpisodeTotals,
}

/// Wraps one agent's observation/action/reward stream.
///
/// # Lifecycle
///
/// 1. Create with [`Postprocessor::new`] (or a [`PostprocessorFactory`]).
/// 2. Call [`Postprocessor::reset`] at the start of every episode.
/// 3. Each tick, pass the raw observation through [`Postprocessor::observation`],
///    the chosen action through [`Postprocessor::action`], and the step
///    result through [`Postprocessor::reward_done_info`].
#[derive(Debug)]
pub struct Postprocessor {
    agent_id: EntityId,
    config: ShapingConfig,
    combat_spawn_immunity: u32,
    map_n_obs: usize,
    entity_layout: EntityLayout,
    tile_layout: TileLayout,
    /// Built once; map geometry does not change between episodes.
    dist_map: DistanceMap,
    /// Rebuilt from the entity observation every tick.
    threat_map: ThreatMap,
    rng: StdRng,
    episode: Option<ActiveEpisode>,
}

impl Postprocessor {
    /// Creates a postprocessor for `agent_id` after validating `config`.
    ///
    /// `seed` drives the fallback combat-skill draw.
    pub fn new(
        agent_id: EntityId,
        env: &EnvConfig,
        config: ShapingConfig,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(agent_id, env, config, seed))
    }

    fn from_validated(agent_id: EntityId, env: &EnvConfig, config: ShapingConfig, seed: u64) -> Self {
        let map_size = env.map_size();
        Self {
            agent_id,
            config,
            combat_spawn_immunity: env.combat_spawn_immunity,
            map_n_obs: env.map_n_obs(),
            entity_layout: EntityLayout::default(),
            tile_layout: TileLayout::default(),
            dist_map: DistanceMap::new(map_size),
            threat_map: ThreatMap::new(map_size),
            rng: StdRng::seed_from_u64(seed),
            episode: None,
        }
    }

    /// Overrides the entity and tile column layouts.
    pub fn with_layouts(mut self, entity: EntityLayout, tile: TileLayout) -> Self {
        self.entity_layout = entity;
        self.tile_layout = tile;
        self
    }

    pub fn agent_id(&self) -> EntityId {
        self.agent_id
    }

    pub fn config(&self) -> &ShapingConfig {
        &self.config
    }

    /// Combat skill assigned for the current episode.
    pub fn skill(&self) -> Option<CombatSkill> {
        self.episode.as_ref().map(|e| e.skill)
    }

    /// Episode state, if an episode is running.
    pub fn state(&self) -> Option<&EpisodeState> {
        self.episode.as_ref().map(|e| &e.state)
    }

    /// Applied bonuses summed over the current episode.
    pub fn episode_totals(&self) -> Option<&EpisodeTotals> {
        self.episode.as_ref().map(|e| &e.totals)
    }

    /// Shape contract of the augmented observation.
    pub fn observation_space(&self, raw: ObservationShape) -> ObservationShape {
        raw.augmented(self.map_n_obs)
    }

    /// Starts a new episode.
    ///
    /// Resets all episode state and picks the combat skill from the agent's
    /// task name, drawing uniformly when the name carries no hint.
    pub fn reset(&mut self, obs: &Observation, task_name: &str) -> CombatSkill {
        let (skill, drawn) = match CombatSkill::from_task_name(task_name) {
            Some(skill) => (skill, false),
            None => (CombatSkill::all()[self.rng.gen_range(0..CombatSkill::COUNT)], true),
        };
        debug!(
            agent = self.agent_id,
            task = task_name,
            %skill,
            drawn,
            "episode reset"
        );
        self.episode = Some(ActiveEpisode {
            skill,
            combat_attr_len: obs.combat_attr.len(),
            state: EpisodeState::default(),
            totals: EpisodeTotals::default(),
        });
        skill
    }

    /// Augments a raw observation.
    pub fn observation(
        &mut self,
        mut obs: Observation,
        realm: &impl RealmView,
    ) -> Result<Observation, ShapingError> {
        let episode = self.episode.as_ref().ok_or(ShapingError::NotReset)?;
        let skill = episode.skill;

        if obs.combat_attr.len() != episode.combat_attr_len {
            return Err(ShapingError::CombatAttrLength {
                got: obs.combat_attr.len(),
                expected: episode.combat_attr_len,
            });
        }
        obs.combat_attr = combat_embedding(skill, &obs.combat_attr);

        let players_immune = self.combat_spawn_immunity >= realm.tick();
        self.threat_map.rebuild(
            obs.entity.view(),
            &self.entity_layout,
            self.agent_id,
            players_immune,
        )?;
        obs.tile = augment_tiles(
            obs.tile.view(),
            &self.tile_layout,
            skill,
            &self.dist_map,
            &self.threat_map,
        )?;

        let last_price = episode.state.last_price;
        let price_mask = obs
            .action_targets
            .mask_mut(ActionTargets::SELL, ActionTargets::PRICE)?;
        let slot = usize::try_from(last_price)
            .ok()
            .filter(|i| *i < price_mask.len())
            .ok_or(ShapingError::PriceOutOfRange(last_price))?;
        price_mask[slot] = 0;

        if self.config.only_use_main_skill {
            let style = obs
                .action_targets
                .mask_mut(ActionTargets::ATTACK, ActionTargets::STYLE)?;
            *style = skill.style_mask().into_iter().collect();
        }

        Ok(obs)
    }

    /// Records the move direction and sell price of an outgoing action.
    /// The action itself passes through unchanged.
    pub fn action(&mut self, action: ActionVector) -> Result<ActionVector, ShapingError> {
        let episode = self.episode.as_mut().ok_or(ShapingError::NotReset)?;
        let (direction, price) = action.recorded()?;
        episode.state.record_action(direction, price);
        Ok(action)
    }

    /// Shapes the reward of one step. The terminal step is returned as is.
    pub fn reward_done_info<I>(
        &mut self,
        reward: f32,
        done: bool,
        info: I,
        agent: &impl AgentView,
        realm: &impl RealmView,
    ) -> Result<ShapedStep<I>, ShapingError> {
        let episode = self.episode.as_mut().ok_or(ShapingError::NotReset)?;

        if done {
            let totals = &episode.totals;
            debug!(
                agent = self.agent_id,
                skill = %episode.skill,
                ticks = totals.ticks,
                survival_ticks = totals.survival_ticks,
                survival = totals.bonus.survival,
                progress = totals.bonus.progress,
                meander = totals.bonus.meander,
                combat = totals.bonus.combat,
                equipment = totals.bonus.equipment,
                unique_event = totals.bonus.unique_event,
                underdog = totals.bonus.underdog,
                "episode done"
            );
            return Ok(ShapedStep {
                reward,
                done,
                info,
                breakdown: None,
            });
        }

        let position = agent.position();
        let map_size = self.dist_map.map_size();
        if position.row >= map_size || position.col >= map_size {
            return Err(ShapingError::OutOfMap {
                row: i16::try_from(position.row).unwrap_or(i16::MAX),
                col: i16::try_from(position.col).unwrap_or(i16::MAX),
                map_size,
            });
        }

        let skill = episode.skill;
        episode.state.refresh(
            agent,
            TickContext {
                tick: realm.tick(),
                death_fog: realm.death_fog(position),
                events: realm.events(self.agent_id),
                skill,
                survival_mode_criteria: self.config.survival_mode_criteria,
                death_fog_criteria: self.config.death_fog_criteria,
            },
        );
        let dist = f64::from(self.dist_map.at(position));
        let breakdown =
            RewardShaper::compute(&mut episode.state, agent, skill, dist, &self.config);
        episode.totals += &breakdown;
        trace!(agent = self.agent_id, tick = realm.tick(), ?breakdown, "shaped");

        Ok(ShapedStep {
            reward: reward + breakdown.total(),
            done,
            info,
            breakdown: Some(breakdown),
        })
    }
}

/// Creates postprocessors that share one environment and shaping config.
#[derive(Debug, Clone)]
pub struct PostprocessorFactory {
    env: EnvConfig,
    shaping: ShapingConfig,
    seed: u64,
}

impl PostprocessorFactory {
    /// Validates `shaping` once for every postprocessor this factory makes.
    pub fn new(env: EnvConfig, shaping: ShapingConfig, seed: u64) -> Result<Self, ConfigError> {
        shaping.validate()?;
        Ok(Self { env, shaping, seed })
    }

    pub fn env(&self) -> &EnvConfig {
        &self.env
    }

    pub fn shaping(&self) -> &ShapingConfig {
        &self.shaping
    }

    /// Postprocessor for one agent; each agent gets its own skill-draw seed.
    pub fn create(&self, agent_id: EntityId) -> Postprocessor {
        let seed = self.seed.wrapping_add(u64::from(agent_id.unsigned_abs()));
        Postprocessor::from_validated(agent_id, &self.env, self.shaping.clone(), seed)
    }
}

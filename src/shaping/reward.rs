//! Multi-term reward shaping.
//!
//! Survival and progress terms always apply. Meander, combat, equipment,
//! unique-event, and underdog terms are dropped while the agent is in
//! survival mode.

use std::ops::AddAssign;

use super::config::ShapingConfig;
use super::episode::EpisodeState;
use super::query::AgentView;
use super::types::CombatSkill;

/// Minimum health restore that counts as recovering (10 from food/water,
/// 50+ from a potion).
const HEALTH_RESTORE_MIN: i32 = 5;

/// Moves required before the meander term kicks in.
const MEANDER_MIN_MOVES: usize = 6;

/// Per-term bonuses computed for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RewardBreakdown {
    pub survival: f32,
    pub progress: f32,
    pub meander: f32,
    pub combat: f32,
    pub equipment: f32,
    pub unique_event: f32,
    pub underdog: f32,
    /// Whether the opportunistic terms were suppressed this tick.
    pub survival_mode: bool,
}

impl RewardBreakdown {
    /// Sum of the terms that actually apply this tick.
    pub fn total(&self) -> f32 {
        let applied = self.applied();
        applied.survival
            + applied.progress
            + applied.meander
            + applied.combat
            + applied.equipment
            + applied.unique_event
            + applied.underdog
    }

    /// Copy with the survival-mode-gated terms zeroed out.
    pub fn applied(&self) -> Self {
        if !self.survival_mode {
            return *self;
        }
        Self {
            survival: self.survival,
            progress: self.progress,
            survival_mode: true,
            ..Self::default()
        }
    }
}

/// Running sums of applied bonuses over one episode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpisodeTotals {
    pub bonus: RewardBreakdown,
    /// Ticks shaped so far.
    pub ticks: u32,
    /// Ticks spent in survival mode.
    pub survival_ticks: u32,
}

impl AddAssign<&RewardBreakdown> for EpisodeTotals {
    fn add_assign(&mut self, tick: &RewardBreakdown) {
        let applied = tick.applied();
        self.bonus.survival += applied.survival;
        self.bonus.progress += applied.progress;
        self.bonus.meander += applied.meander;
        self.bonus.combat += applied.combat;
        self.bonus.equipment += applied.equipment;
        self.bonus.unique_event += applied.unique_event;
        self.bonus.underdog += applied.underdog;
        self.ticks += 1;
        if tick.survival_mode {
            self.survival_ticks += 1;
        }
    }
}

/// Computes shaped bonuses from refreshed episode state.
pub struct RewardShaper;

impl RewardShaper {
    /// Computes every bonus term for the current tick.
    ///
    /// `state` must already be refreshed for this tick. The best eat/drink
    /// distances are updated when the agent eats or drinks closer to the
    /// center than ever before. `dist` is the agent's distance to center.
    pub fn compute(
        state: &mut EpisodeState,
        agent: &impl AgentView,
        skill: CombatSkill,
        dist: f64,
        config: &ShapingConfig,
    ) -> RewardBreakdown {
        let thr = config.survival_mode_criteria;
        let resource_band = |level: i32| thr < level && level <= config.get_resource_criteria;

        // 1. Survival: recover from starvation, dehydration, low health
        let mut survival = 0.0;
        if state.last_food <= thr && state.curr_food > thr {
            survival += config.survival_bonus_weight * (state.curr_food - state.last_food) as f32;
        }
        if state.last_water <= thr && state.curr_water > thr {
            survival += config.survival_bonus_weight * (state.curr_water - state.last_water) as f32;
        }
        if state.last_health <= thr && agent.health_restore() > HEALTH_RESTORE_MIN {
            survival += config.survival_bonus_weight * agent.health_restore() as f32;
        }

        // 2. Progress: eat/drink farther in, flee the death fog
        let mut progress = 0.0;
        let events = state.tick_events;
        if events.ate() {
            if dist < state.best_eat_dist {
                progress += config.progress_bonus_weight;
                state.best_eat_dist = dist;
            }
            if resource_band(state.last_food) {
                survival += config.get_resource_weight;
            }
        }
        if events.drank() {
            if dist < state.best_drink_dist {
                progress += config.progress_bonus_weight;
                state.best_drink_dist = dist;
            }
            if resource_band(state.last_water) {
                survival += config.get_resource_weight;
            }
        }
        if events.went_farthest() && state.curr_death_fog > 0.0 {
            progress += config.meander_bonus_weight;
        }

        // 3. Meander: keep movement entropy from collapsing
        let meander = if state.moves.len() >= MEANDER_MIN_MOVES {
            config.meander_bonus_weight * (state.moves.entropy() as f32 - 1.0)
        } else {
            0.0
        };

        // 4. Combat experience gained in the assigned skill
        let exp_gain = state.curr_combat_exp.saturating_sub(state.last_combat_exp);
        let combat = config.combat_bonus_weight * exp_gain as f32;

        // 5. Equipment upgrades
        let upgrades = u8::from(state.new_max_offense) + u8::from(state.new_max_defense);
        let equipment = config.equipment_bonus_weight * f32::from(upgrades);

        // 6. Newly seen unique events, clipped per tick
        let new_events = state
            .curr_unique_count
            .saturating_sub(state.prev_unique_count)
            .min(config.clip_unique_event as usize);
        let unique_event = config.unique_event_bonus_weight * new_events as f32;

        // 7. Underdog: killed someone above our level
        let underdog = if events.kill_level > agent.skill_level(skill) {
            config.underdog_bonus_weight
        } else {
            0.0
        };

        RewardBreakdown {
            survival,
            progress,
            meander,
            combat,
            equipment,
            unique_event,
            underdog,
            survival_mode: state.survival_mode,
        }
    }
}

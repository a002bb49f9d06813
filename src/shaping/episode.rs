//! Rolling per-episode state read by the reward shaper.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use super::events::{unique_event_count, EventRecord, TickEvents};
use super::query::AgentView;
use super::types::CombatSkill;

/// Starting value of health, food, and water.
pub const FULL_RESOURCE: i32 = 100;

/// Shannon entropy, in bits, of the symbol distribution in `samples`.
///
/// Empty and single-symbol samples have zero entropy.
pub fn shannon_entropy<T: Eq + Hash>(samples: impl IntoIterator<Item = T>) -> f64 {
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut total = 0usize;
    for sample in samples {
        *counts.entry(sample).or_insert(0) += 1;
        total += 1;
    }
    if counts.len() <= 1 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .values()
        .map(|&n| {
            let p = n as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Most recent movement directions, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveHistory {
    moves: VecDeque<i32>,
}

impl MoveHistory {
    /// Number of moves kept for the entropy window.
    pub const WINDOW: usize = 8;

    pub fn push(&mut self, direction: i32) {
        if self.moves.len() == Self::WINDOW {
            self.moves.pop_front();
        }
        self.moves.push_back(direction);
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Entropy of the recorded window.
    pub fn entropy(&self) -> f64 {
        shannon_entropy(self.moves.iter().copied())
    }
}

/// Episode bookkeeping, reset at the start of every episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeState {
    // --- Life support ---
    pub last_health: i32,
    pub curr_health: i32,
    pub last_food: i32,
    pub curr_food: i32,
    pub last_water: i32,
    pub curr_water: i32,
    /// Death fog on the agent's tile this tick.
    pub curr_death_fog: f32,
    pub survival_mode: bool,

    // --- Progress ---
    /// Which of eat / drink / go-farthest fired this tick.
    pub tick_events: TickEvents,
    /// Best (smallest) distance to center at which the agent has eaten.
    pub best_eat_dist: f64,
    /// Best (smallest) distance to center at which the agent has drunk.
    pub best_drink_dist: f64,

    // --- Actions ---
    pub moves: MoveHistory,
    /// Last sell price chosen; masked out on the next tick.
    pub last_price: i32,

    // --- Combat ---
    pub last_combat_exp: u32,
    pub curr_combat_exp: u32,
    pub max_offense: i32,
    pub new_max_offense: bool,
    pub max_defense: i32,
    pub new_max_defense: bool,

    // --- Exploration ---
    pub prev_unique_count: usize,
    pub curr_unique_count: usize,
}

impl Default for EpisodeState {
    fn default() -> Self {
        Self {
            last_health: FULL_RESOURCE,
            curr_health: FULL_RESOURCE,
            last_food: FULL_RESOURCE,
            curr_food: FULL_RESOURCE,
            last_water: FULL_RESOURCE,
            curr_water: FULL_RESOURCE,
            curr_death_fog: 0.0,
            survival_mode: false,
            tick_events: TickEvents::default(),
            best_eat_dist: f64::INFINITY,
            best_drink_dist: f64::INFINITY,
            moves: MoveHistory::default(),
            last_price: 0,
            last_combat_exp: 0,
            curr_combat_exp: 0,
            max_offense: 0,
            new_max_offense: false,
            max_defense: 0,
            new_max_defense: false,
            prev_unique_count: 0,
            curr_unique_count: 0,
        }
    }
}

/// Inputs for one [`EpisodeState::refresh`].
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub tick: u32,
    pub death_fog: f32,
    pub events: &'a [EventRecord],
    pub skill: CombatSkill,
    pub survival_mode_criteria: i32,
    pub death_fog_criteria: f32,
}

impl EpisodeState {
    /// Records the recorded arguments of an outgoing action.
    pub fn record_action(&mut self, direction: i32, price: i32) {
        self.moves.push(direction);
        self.last_price = price;
    }

    /// Rolls current values into the previous-tick slots and reads the new
    /// tick from the agent and its event log.
    pub fn refresh(&mut self, agent: &impl AgentView, ctx: TickContext<'_>) {
        self.last_health = self.curr_health;
        self.curr_health = agent.health();
        self.last_food = self.curr_food;
        self.curr_food = agent.food();
        self.last_water = self.curr_water;
        self.curr_water = agent.water();
        self.curr_death_fog = ctx.death_fog;

        let lowest = self.last_health.min(self.last_food).min(self.last_water);
        self.survival_mode = lowest <= ctx.survival_mode_criteria
            || self.curr_death_fog >= ctx.death_fog_criteria;

        self.last_combat_exp = self.curr_combat_exp;
        self.curr_combat_exp = agent.skill_exp(ctx.skill);

        // Starting equipment shows up on the first tick and is not an upgrade.
        let offense = agent.attack(ctx.skill);
        self.new_max_offense = false;
        if offense > self.max_offense {
            self.new_max_offense = ctx.tick > 1;
            self.max_offense = offense;
        }
        let defense = agent.max_defense();
        self.new_max_defense = false;
        if defense > self.max_defense {
            self.new_max_defense = ctx.tick > 1;
            self.max_defense = defense;
        }

        self.prev_unique_count = self.curr_unique_count;
        self.curr_unique_count = unique_event_count(ctx.events);
        self.tick_events = TickEvents::extract(ctx.events, ctx.tick, ctx.skill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::events::EventCode;
    use crate::shaping::query::AgentSnapshot;
    use crate::shaping::types::Position;

    fn ctx(tick: u32, events: &[EventRecord]) -> TickContext<'_> {
        TickContext {
            tick,
            death_fog: 0.0,
            events,
            skill: CombatSkill::Melee,
            survival_mode_criteria: 35,
            death_fog_criteria: 1.0,
        }
    }

    #[test]
    fn defaults() {
        let state = EpisodeState::default();
        assert_eq!(state.curr_health, 100);
        assert_eq!(state.curr_food, 100);
        assert_eq!(state.curr_water, 100);
        assert_eq!(state.curr_unique_count, 0);
        assert!(state.moves.is_empty());
        assert!(state.best_eat_dist.is_infinite());
        assert!(!state.survival_mode);
    }

    #[test]
    fn entropy_edge_cases() {
        assert_eq!(shannon_entropy(Vec::<i32>::new()), 0.0);
        assert_eq!(shannon_entropy([4]), 0.0);
        assert_eq!(shannon_entropy([2, 2, 2, 2]), 0.0);
        assert!((shannon_entropy([0, 1]) - 1.0).abs() < 1e-12);
        assert!((shannon_entropy([0, 1, 2, 3, 0, 1, 2, 3]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn move_history_keeps_last_window() {
        let mut history = MoveHistory::default();
        for d in 0..12 {
            history.push(d);
        }
        assert_eq!(history.len(), MoveHistory::WINDOW);
        // 4..12 are all distinct
        assert!((history.entropy() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn refresh_rolls_levels() {
        let mut state = EpisodeState::default();
        let mut agent = AgentSnapshot::spawned(Position::new(5, 5));
        agent.food = 30;
        state.refresh(&agent, ctx(1, &[]));
        assert_eq!(state.last_food, 100);
        assert_eq!(state.curr_food, 30);
        // survival mode reads the previous tick's levels
        assert!(!state.survival_mode);

        state.refresh(&agent, ctx(2, &[]));
        assert_eq!(state.last_food, 30);
        assert!(state.survival_mode);
    }

    #[test]
    fn fog_triggers_survival_mode() {
        let mut state = EpisodeState::default();
        let agent = AgentSnapshot::spawned(Position::new(5, 5));
        let mut c = ctx(3, &[]);
        c.death_fog = 1.5;
        state.refresh(&agent, c);
        assert!(state.survival_mode);
    }

    #[test]
    fn equipment_gain_on_first_tick_not_flagged() {
        let mut state = EpisodeState::default();
        let mut agent = AgentSnapshot::spawned(Position::new(5, 5));
        agent.attack = [10, 0, 0];
        agent.defense = [0, 4, 0];
        state.refresh(&agent, ctx(1, &[]));
        assert!(!state.new_max_offense);
        assert!(!state.new_max_defense);
        assert_eq!(state.max_offense, 10);
        assert_eq!(state.max_defense, 4);

        agent.attack = [15, 0, 0];
        state.refresh(&agent, ctx(2, &[]));
        assert!(state.new_max_offense);
        assert!(!state.new_max_defense);

        state.refresh(&agent, ctx(3, &[]));
        assert!(!state.new_max_offense);
    }

    #[test]
    fn unique_counts_roll() {
        let mut state = EpisodeState::default();
        let agent = AgentSnapshot::spawned(Position::new(5, 5));
        let log = vec![
            EventRecord::new(1, EventCode::EatFood),
            EventRecord::new(1, EventCode::DrinkWater),
        ];
        state.refresh(&agent, ctx(1, &log));
        assert_eq!(state.prev_unique_count, 0);
        assert_eq!(state.curr_unique_count, 2);
        assert!(state.tick_events.ate());
    }
}

//! A small synthetic realm for exercising postprocessors end to end.
//!
//! Agents random-walk on a procedurally textured map, burn food and water
//! every tick, eat on foilage, drink next to water, fight static NPCs, and
//! are pushed inward by a death fog in the second half of the episode. It is
//! not a game; it only produces the observations, snapshots, and event rows
//! the shaping layer consumes.

use std::collections::HashMap;
use std::fmt;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::config::EnvConfig;
use crate::shaping::{
    ActionTargets, ActionVector, AgentSnapshot, EntityId, EntityLayout, EventCode, EventRecord,
    ItemType, Material, Observation, PostprocessorFactory, RealmView, ShapingError,
};
use crate::shaping::{AgentView, CombatSkill, Position};

/// Number of sell-price options.
pub const PRICE_OPTIONS: usize = 5;
/// Rows in the entity observation.
pub const ENTITY_ROWS: usize = 16;
/// Slot of the attack-style argument in an action vector.
pub const ATTACK_STYLE: usize = 0;

const FOOD_DECAY: i32 = 1;
const WATER_DECAY: i32 = 1;
const STARVE_DAMAGE: i32 = 10;
const REGEN: i32 = 10;
const ATTACK_CHANCE: f64 = 0.25;

/// Task names handed out round-robin; the last one carries no skill hint.
const TASKS: [&str; 4] = [
    "task:melee_level_3",
    "equip:bow_1",
    "practice_mage_attack",
    "eat_food_10",
];

#[derive(Debug, Clone)]
struct SyntheticAgent {
    id: EntityId,
    snapshot: AgentSnapshot,
    spawn: Position,
    farthest: usize,
    alive: bool,
}

#[derive(Debug, Clone)]
struct Npc {
    id: EntityId,
    position: Position,
    level: i16,
}

/// Procedural multi-agent realm implementing [`RealmView`].
#[derive(Debug)]
pub struct SyntheticRealm {
    map_center: usize,
    map_border: usize,
    vision: usize,
    horizon: u32,
    n_npcs: usize,
    tick: u32,
    agents: Vec<SyntheticAgent>,
    npcs: Vec<Npc>,
    logs: HashMap<EntityId, Vec<EventRecord>>,
    rng: StdRng,
}

impl SyntheticRealm {
    pub fn new(env: &EnvConfig, seed: u64) -> Self {
        let mut realm = Self {
            map_center: env.map_center,
            map_border: env.map_border,
            vision: env.player_vision_radius,
            horizon: env.horizon,
            n_npcs: env.npc_n as usize,
            tick: 0,
            agents: Vec::new(),
            npcs: Vec::new(),
            logs: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        };
        realm.agents = (1..=env.player_n as EntityId)
            .map(|id| SyntheticAgent {
                id,
                snapshot: AgentSnapshot::spawned(Position::new(0, 0)),
                spawn: Position::new(0, 0),
                farthest: 0,
                alive: false,
            })
            .collect();
        realm
    }

    pub fn map_size(&self) -> usize {
        self.map_center + 2 * self.map_border
    }

    pub fn agent_ids(&self) -> Vec<EntityId> {
        self.agents.iter().map(|a| a.id).collect()
    }

    /// Task assigned to an agent for the episode.
    pub fn task_name(&self, agent: EntityId) -> &'static str {
        TASKS[agent.unsigned_abs() as usize % TASKS.len()]
    }

    pub fn agent(&self, id: EntityId) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|a| a.id == id).map(|a| &a.snapshot)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.agents.iter().any(|a| a.id == id && a.alive)
    }

    /// Terrain at a cell: the border is void, the interior is a fixed
    /// pseudo-random texture.
    pub fn material(&self, pos: Position) -> Material {
        if !self.in_playable_area(pos) {
            return Material::Void;
        }
        match (pos.row * 7 + pos.col * 13 + pos.row * pos.col) % 17 {
            0 | 1 => Material::Foilage,
            2 => Material::Water,
            3 => Material::Stone,
            4 => Material::Tree,
            5 => Material::Ore,
            6 => Material::Crystal,
            _ => Material::Grass,
        }
    }

    fn in_playable_area(&self, pos: Position) -> bool {
        let lo = self.map_border;
        let hi = self.map_border + self.map_center;
        (lo..hi).contains(&pos.row) && (lo..hi).contains(&pos.col)
    }

    fn random_cell(&mut self) -> Position {
        loop {
            let lo = self.map_border;
            let hi = self.map_border + self.map_center;
            let pos = Position::new(self.rng.gen_range(lo..hi), self.rng.gen_range(lo..hi));
            if !self.material(pos).is_impassable() {
                return pos;
            }
        }
    }

    /// Starts a new episode and returns each agent's first observation.
    pub fn reset(&mut self) -> Vec<(EntityId, Observation)> {
        self.tick = 0;
        self.logs.clear();
        for i in 0..self.agents.len() {
            let pos = self.random_cell();
            let agent = &mut self.agents[i];
            agent.snapshot = AgentSnapshot::spawned(pos);
            agent.spawn = pos;
            agent.farthest = 0;
            agent.alive = true;
        }
        let mut npcs = Vec::with_capacity(self.n_npcs);
        for i in 0..self.n_npcs {
            let position = self.random_cell();
            npcs.push(Npc {
                id: -(i as EntityId) - 1,
                position,
                level: self.rng.gen_range(1..=10),
            });
        }
        self.npcs = npcs;
        self.agent_ids()
            .into_iter()
            .map(|id| (id, self.observe(id)))
            .collect()
    }

    /// Advances one tick. Returns `(agent, base reward, done)` for every
    /// agent alive at the start of the tick.
    pub fn step(&mut self, actions: &HashMap<EntityId, ActionVector>) -> Vec<(EntityId, f32, bool)> {
        self.tick += 1;
        let tick = self.tick;
        let mut results = Vec::new();

        for i in 0..self.agents.len() {
            if !self.agents[i].alive {
                continue;
            }
            let id = self.agents[i].id;
            let (direction, style) = actions
                .get(&id)
                .map(|a| {
                    let get = |slot: usize| a.0.get(slot).copied().unwrap_or(0);
                    (get(ActionVector::MOVE_DIRECTION), get(ATTACK_STYLE))
                })
                .unwrap_or((4, 0));

            self.move_agent(i, direction);
            self.forage(i, tick);
            self.fight(i, tick, style);
            let died = self.metabolize(i);

            let done = died || tick >= self.horizon;
            if died {
                self.agents[i].alive = false;
            }
            results.push((id, if died { -1.0 } else { 0.0 }, done));
        }
        results
    }

    fn move_agent(&mut self, i: usize, direction: i32) {
        let pos = self.agents[i].snapshot.position;
        let next = match direction {
            0 => Position::new(pos.row.saturating_sub(1), pos.col),
            1 => Position::new(pos.row + 1, pos.col),
            2 => Position::new(pos.row, pos.col + 1),
            3 => Position::new(pos.row, pos.col.saturating_sub(1)),
            _ => pos,
        };
        if !self.material(next).is_impassable() {
            self.agents[i].snapshot.position = next;
        }

        let agent = &self.agents[i];
        let travelled = agent.snapshot.position.row.abs_diff(agent.spawn.row)
            + agent.snapshot.position.col.abs_diff(agent.spawn.col);
        if travelled > agent.farthest {
            self.agents[i].farthest = travelled;
            self.log(i, EventRecord::new(self.tick, EventCode::GoFarthest).with_level(travelled as i16));
        }
    }

    fn forage(&mut self, i: usize, tick: u32) {
        let pos = self.agents[i].snapshot.position;
        if self.material(pos) == Material::Foilage {
            let snapshot = &mut self.agents[i].snapshot;
            snapshot.food = (snapshot.food + 20).min(100);
            self.log(i, EventRecord::new(tick, EventCode::EatFood));
        }
        let near_water = [(0, 1), (2, 1), (1, 0), (1, 2)].iter().any(|&(dr, dc)| {
            let (r, c) = (pos.row + dr, pos.col + dc);
            r >= 1 && c >= 1 && self.material(Position::new(r - 1, c - 1)) == Material::Water
        });
        if near_water {
            let snapshot = &mut self.agents[i].snapshot;
            snapshot.water = (snapshot.water + 20).min(100);
            self.log(i, EventRecord::new(tick, EventCode::DrinkWater));
        }
    }

    fn fight(&mut self, i: usize, tick: u32, style: i32) {
        let pos = self.agents[i].snapshot.position;
        let Some(target) = self
            .npcs
            .iter()
            .position(|n| n.position.row.abs_diff(pos.row) <= 1 && n.position.col.abs_diff(pos.col) <= 1)
        else {
            return;
        };
        if !self.rng.gen_bool(ATTACK_CHANCE) {
            return;
        }
        let skill = CombatSkill::all()[style.clamp(0, 2) as usize];
        let level = self.npcs[target].level;
        let s = skill.style_index();
        {
            let snapshot = &mut self.agents[i].snapshot;
            snapshot.exp[s] += 10 * level as u32;
            snapshot.level[s] = (1 + snapshot.exp[s] / 100).min(10) as i16;
        }
        self.log(
            i,
            EventRecord::new(tick, EventCode::ScoreHit).with_item(0, skill.style_index() as i16),
        );
        self.log(i, EventRecord::new(tick, EventCode::PlayerKill).with_level(level));

        // loot: a weapon and a hat scaled by the victim's level
        let loot = i32::from(level) * 2;
        let weapon = match skill {
            CombatSkill::Melee => ItemType::Spear,
            CombatSkill::Range => ItemType::Bow,
            CombatSkill::Mage => ItemType::Wand,
        };
        if loot > self.agents[i].snapshot.attack[s] {
            self.agents[i].snapshot.attack[s] = loot;
            self.log(i, EventRecord::new(tick, EventCode::EquipItem).with_item(weapon.id(), level));
        }
        if loot > self.agents[i].snapshot.max_defense() {
            self.agents[i].snapshot.defense = [loot; 3];
            self.log(
                i,
                EventRecord::new(tick, EventCode::EquipItem).with_item(ItemType::Hat.id(), level),
            );
        }

        let respawn = self.random_cell();
        self.npcs[target].position = respawn;
    }

    /// Applies hunger, thirst, fog damage, and regeneration. Returns true if
    /// the agent died.
    fn metabolize(&mut self, i: usize) -> bool {
        let fog = self.death_fog(self.agents[i].snapshot.position);
        let snapshot = &mut self.agents[i].snapshot;
        snapshot.food = (snapshot.food - FOOD_DECAY).max(0);
        snapshot.water = (snapshot.water - WATER_DECAY).max(0);
        snapshot.health_restore = 0;
        if snapshot.food == 0 || snapshot.water == 0 {
            snapshot.health -= STARVE_DAMAGE;
        } else if snapshot.food > 50 && snapshot.water > 50 && snapshot.health < 100 {
            let restore = REGEN.min(100 - snapshot.health);
            snapshot.health += restore;
            snapshot.health_restore = restore;
        }
        snapshot.health -= fog.ceil() as i32;
        snapshot.health <= 0
    }

    fn log(&mut self, i: usize, record: EventRecord) {
        self.logs.entry(self.agents[i].id).or_default().push(record);
    }

    /// Builds an agent's current observation.
    pub fn observe(&self, id: EntityId) -> Observation {
        let layout = EntityLayout::default();
        let Some(agent) = self.agents.iter().find(|a| a.id == id) else {
            return self.empty_observation();
        };
        let center = agent.snapshot.position;
        let r = self.vision;
        let visible = |p: Position| p.row.abs_diff(center.row) <= r && p.col.abs_diff(center.col) <= r;

        let mut entity = Array2::zeros((ENTITY_ROWS, layout.width()));
        let players = self
            .agents
            .iter()
            .filter(|a| a.alive && visible(a.snapshot.position))
            .map(|a| (a.id, a.snapshot.position, a.snapshot.level));
        let npcs = self
            .npcs
            .iter()
            .filter(|n| visible(n.position))
            .map(|n| (n.id, n.position, [n.level; 3]));
        for (row, (eid, pos, levels)) in players.chain(npcs).take(ENTITY_ROWS).enumerate() {
            entity[[row, layout.id]] = eid as i16;
            entity[[row, layout.row]] = pos.row as i16;
            entity[[row, layout.col]] = pos.col as i16;
            entity[[row, layout.melee_level]] = levels[0];
            entity[[row, layout.range_level]] = levels[1];
            entity[[row, layout.mage_level]] = levels[2];
        }

        let side = 2 * r + 1;
        let last = self.map_size() - 1;
        let tile = Array2::from_shape_fn((side * side, 3), |(k, j)| {
            let row = (center.row + k / side).saturating_sub(r).min(last);
            let col = (center.col + k % side).saturating_sub(r).min(last);
            match j {
                0 => row as i16,
                1 => col as i16,
                _ => self.material(Position::new(row, col)).index(),
            }
        });

        let s = &agent.snapshot;
        let combat_attr = Array1::from(vec![
            s.level[0],
            s.level[1],
            s.level[2],
            CombatSkill::all().iter().map(|k| s.attack(*k)).max().unwrap_or(0) as i16,
            s.max_defense() as i16,
            s.health as i16,
        ]);

        Observation {
            entity,
            tile,
            combat_attr,
            action_targets: Self::action_targets(),
        }
    }

    fn empty_observation(&self) -> Observation {
        let side = 2 * self.vision + 1;
        Observation {
            entity: Array2::zeros((ENTITY_ROWS, EntityLayout::default().width())),
            tile: Array2::zeros((side * side, 3)),
            combat_attr: Array1::zeros(6),
            action_targets: Self::action_targets(),
        }
    }

    fn action_targets() -> ActionTargets {
        let mut targets = ActionTargets::new();
        targets.insert(ActionTargets::SELL, ActionTargets::PRICE, Array1::ones(PRICE_OPTIONS));
        targets.insert(ActionTargets::ATTACK, ActionTargets::STYLE, Array1::ones(3));
        targets
    }
}

impl RealmView for SyntheticRealm {
    fn tick(&self) -> u32 {
        self.tick
    }

    fn death_fog(&self, position: Position) -> f32 {
        let start = self.horizon / 2;
        if self.tick < start || !self.in_playable_area(position) {
            return 0.0;
        }
        let lo = self.map_border;
        let hi = self.map_border + self.map_center - 1;
        let depth = [
            position.row - lo,
            position.col - lo,
            hi - position.row,
            hi - position.col,
        ]
        .into_iter()
        .min()
        .unwrap_or(0);
        let front = (self.tick - start) as f32 / 4.0;
        (front - depth as f32).max(0.0)
    }

    fn events(&self, agent: EntityId) -> &[EventRecord] {
        self.logs.get(&agent).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Aggregated rollout statistics.
#[derive(Debug, Clone, Default)]
pub struct RolloutReport {
    pub n_episodes: usize,
    /// Mean ticks survived per agent.
    pub mean_lifetime: f64,
    /// Mean shaped return per agent.
    pub mean_shaped_return: f64,
    /// Mean base (unshaped) return per agent.
    pub mean_base_return: f64,
    /// Mean applied bonus per term, in reward-term order.
    pub mean_bonus: [(&'static str, f64); 7],
    /// Fraction of shaped ticks spent in survival mode.
    pub survival_fraction: f64,
}

impl RolloutReport {
    /// Runs `n_episodes` with a uniformly random policy and one
    /// postprocessor per agent.
    pub fn collect(
        realm: &mut SyntheticRealm,
        factory: &PostprocessorFactory,
        n_episodes: usize,
        seed: u64,
    ) -> Result<Self, ShapingError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pps: HashMap<EntityId, _> = realm
            .agent_ids()
            .into_iter()
            .map(|id| (id, factory.create(id)))
            .collect();

        let mut lifetimes = 0u64;
        let mut shaped = 0f64;
        let mut base = 0f64;
        let mut bonus = [0f64; 7];
        let mut ticks = 0u64;
        let mut survival_ticks = 0u64;
        let mut agent_episodes = 0u64;

        for episode in 0..n_episodes {
            let mut obs: HashMap<EntityId, Observation> = HashMap::new();
            for (id, raw) in realm.reset() {
                let task = realm.task_name(id);
                if let Some(pp) = pps.get_mut(&id) {
                    pp.reset(&raw, task);
                    obs.insert(id, pp.observation(raw, &*realm)?);
                }
            }

            while !obs.is_empty() {
                let mut actions = HashMap::new();
                for (id, augmented) in &obs {
                    let price_mask = augmented
                        .action_targets
                        .get(ActionTargets::SELL, ActionTargets::PRICE);
                    let price = random_allowed(&mut rng, price_mask);
                    let mut action = vec![0; ActionVector::MIN_LEN];
                    action[ATTACK_STYLE] = rng.gen_range(0..3);
                    action[ActionVector::MOVE_DIRECTION] = rng.gen_range(0..5);
                    action[ActionVector::SELL_PRICE] = price;
                    if let Some(pp) = pps.get_mut(id) {
                        actions.insert(*id, pp.action(ActionVector(action))?);
                    }
                }

                let results = realm.step(&actions);
                obs.clear();
                for (id, reward, done) in results {
                    let (Some(pp), Some(agent)) = (pps.get_mut(&id), realm.agent(id)) else {
                        continue;
                    };
                    let step = pp.reward_done_info(reward, done, (), agent, &*realm)?;
                    shaped += f64::from(step.reward);
                    base += f64::from(reward);
                    if done {
                        lifetimes += u64::from(realm.tick());
                        agent_episodes += 1;
                        if let Some(totals) = pp.episode_totals() {
                            let b = totals.bonus;
                            let terms = [
                                b.survival,
                                b.progress,
                                b.meander,
                                b.combat,
                                b.equipment,
                                b.unique_event,
                                b.underdog,
                            ];
                            for (acc, term) in bonus.iter_mut().zip(terms) {
                                *acc += f64::from(term);
                            }
                            ticks += u64::from(totals.ticks);
                            survival_ticks += u64::from(totals.survival_ticks);
                        }
                    } else {
                        let next = realm.observe(id);
                        obs.insert(id, pp.observation(next, &*realm)?);
                    }
                }
            }
            info!(episode, tick = realm.tick(), "rollout episode finished");
        }

        let n = agent_episodes.max(1) as f64;
        let names = ["survival", "progress", "meander", "combat", "equipment", "unique_event", "underdog"];
        let mut mean_bonus = [("", 0.0); 7];
        for (slot, (name, total)) in mean_bonus.iter_mut().zip(names.into_iter().zip(bonus)) {
            *slot = (name, total / n);
        }

        Ok(Self {
            n_episodes,
            mean_lifetime: lifetimes as f64 / n,
            mean_shaped_return: shaped / n,
            mean_base_return: base / n,
            mean_bonus,
            survival_fraction: if ticks > 0 {
                survival_ticks as f64 / ticks as f64
            } else {
                0.0
            },
        })
    }
}

/// Picks a random index whose mask entry is non-zero (0 if none is).
fn random_allowed(rng: &mut StdRng, mask: Option<&Array1<i8>>) -> i32 {
    let allowed: Vec<usize> = mask
        .map(|m| m.iter().enumerate().filter(|(_, v)| **v != 0).map(|(i, _)| i).collect())
        .unwrap_or_default();
    if allowed.is_empty() {
        return 0;
    }
    allowed[rng.gen_range(0..allowed.len())] as i32
}

impl fmt::Display for RolloutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Rollout ({} episodes) ===", self.n_episodes)?;
        writeln!(f, "  Mean lifetime:        {:.1}", self.mean_lifetime)?;
        writeln!(f, "  Mean base return:     {:.3}", self.mean_base_return)?;
        writeln!(f, "  Mean shaped return:   {:.3}", self.mean_shaped_return)?;
        writeln!(f, "  Survival-mode ticks:  {:.1}%", self.survival_fraction * 100.0)?;
        for (name, value) in &self.mean_bonus {
            writeln!(f, "  {:<20}  {:.3}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::ShapingConfig;

    fn env() -> EnvConfig {
        EnvConfig {
            provide_action_targets: true,
            provide_noop_action_target: true,
            provide_death_fog_obs: true,
            communication_system_enabled: false,
            map_force_generation: false,
            map_n: 1,
            path_maps: "maps/test/32/".into(),
            map_center: 32,
            map_border: 8,
            player_vision_radius: 3,
            player_n: 4,
            npc_n: 12,
            resource_resilient_population: 0.0,
            combat_spawn_immunity: 5,
            horizon: 40,
            curriculum_file_path: None,
            task_embed_dim: 8,
        }
    }

    #[test]
    fn border_is_void() {
        let realm = SyntheticRealm::new(&env(), 0);
        assert_eq!(realm.material(Position::new(0, 0)), Material::Void);
        assert_eq!(realm.map_size(), 48);
    }

    #[test]
    fn observation_shapes() {
        let mut realm = SyntheticRealm::new(&env(), 3);
        let obs = realm.reset();
        assert_eq!(obs.len(), 4);
        for (_, o) in &obs {
            assert_eq!(o.tile.dim(), (49, 3));
            assert_eq!(o.combat_attr.len(), 6);
        }
    }

    #[test]
    fn wide_vision_stays_inside_map() {
        let mut env = env();
        env.map_border = 1;
        env.player_vision_radius = 4;
        let mut realm = SyntheticRealm::new(&env, 5);
        let size = realm.map_size() as i16;
        for (_, o) in realm.reset() {
            assert!(o.tile.column(0).iter().all(|v| *v < size));
            assert!(o.tile.column(1).iter().all(|v| *v < size));
        }
    }

    #[test]
    fn fog_only_in_second_half() {
        let mut realm = SyntheticRealm::new(&env(), 3);
        realm.reset();
        let edge = Position::new(8, 20);
        assert_eq!(realm.death_fog(edge), 0.0);
        let idle = HashMap::new();
        for _ in 0..30 {
            realm.step(&idle);
        }
        assert!(realm.death_fog(edge) > 0.0);
        assert_eq!(realm.death_fog(Position::new(24, 24)), 0.0);
    }

    #[test]
    fn rollout_completes() {
        let env = env();
        let factory = PostprocessorFactory::new(
            env.clone(),
            ShapingConfig {
                survival_bonus_weight: 0.01,
                progress_bonus_weight: 0.05,
                meander_bonus_weight: 0.01,
                combat_bonus_weight: 0.01,
                unique_event_bonus_weight: 0.05,
                ..ShapingConfig::default()
            },
            1,
        )
        .unwrap();
        let mut realm = SyntheticRealm::new(&env, 2);
        let report = RolloutReport::collect(&mut realm, &factory, 2, 9).unwrap();
        assert_eq!(report.n_episodes, 2);
        assert!(report.mean_lifetime > 0.0);
        assert!(report.mean_lifetime <= 40.0);
    }
}

//! Read-only views of the simulation consumed by the reward shaper.
//!
//! The postprocessor never holds on to simulation state: each tick the
//! stepping loop passes an [`AgentView`] and a [`RealmView`] into
//! [`Postprocessor::reward_done_info`](super::Postprocessor::reward_done_info).

use super::events::EventRecord;
use super::types::{CombatSkill, EntityId, Position};

/// Current state of the agent being shaped.
pub trait AgentView {
    fn health(&self) -> i32;
    fn food(&self) -> i32;
    fn water(&self) -> i32;

    /// Health restored this tick (from food/water or potions).
    fn health_restore(&self) -> i32;

    fn position(&self) -> Position;

    /// Accumulated experience in a combat skill.
    fn skill_exp(&self, skill: CombatSkill) -> u32;

    /// Current level in a combat skill.
    fn skill_level(&self, skill: CombatSkill) -> i16;

    /// Equipment offense bonus for a combat style.
    fn attack(&self, skill: CombatSkill) -> i32;

    /// Equipment defense bonus against a combat style.
    fn defense(&self, skill: CombatSkill) -> i32;

    /// Best defense across all three styles.
    fn max_defense(&self) -> i32 {
        CombatSkill::all()
            .iter()
            .map(|s| self.defense(*s))
            .max()
            .unwrap_or(0)
    }
}

/// World-level queries for the current tick.
pub trait RealmView {
    fn tick(&self) -> u32;

    /// Death fog intensity at a cell (0 when the fog has not reached it).
    fn death_fog(&self, position: Position) -> f32;

    /// Every event-log row recorded for `agent` so far this episode.
    fn events(&self, agent: EntityId) -> &[EventRecord];
}

/// Plain-data [`AgentView`], indexed per skill in attack-style order.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSnapshot {
    pub health: i32,
    pub food: i32,
    pub water: i32,
    pub health_restore: i32,
    pub position: Position,
    pub exp: [u32; 3],
    pub level: [i16; 3],
    pub attack: [i32; 3],
    pub defense: [i32; 3],
}

impl AgentSnapshot {
    /// A freshly spawned agent at `position`: full resources, level 1,
    /// no equipment.
    pub fn spawned(position: Position) -> Self {
        Self {
            health: 100,
            food: 100,
            water: 100,
            health_restore: 0,
            position,
            exp: [0; 3],
            level: [1; 3],
            attack: [0; 3],
            defense: [0; 3],
        }
    }
}

impl AgentView for AgentSnapshot {
    fn health(&self) -> i32 {
        self.health
    }

    fn food(&self) -> i32 {
        self.food
    }

    fn water(&self) -> i32 {
        self.water
    }

    fn health_restore(&self) -> i32 {
        self.health_restore
    }

    fn position(&self) -> Position {
        self.position
    }

    fn skill_exp(&self, skill: CombatSkill) -> u32 {
        self.exp[skill.style_index()]
    }

    fn skill_level(&self, skill: CombatSkill) -> i16 {
        self.level[skill.style_index()]
    }

    fn attack(&self, skill: CombatSkill) -> i32 {
        self.attack[skill.style_index()]
    }

    fn defense(&self, skill: CombatSkill) -> i32 {
        self.defense[skill.style_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_indexes_by_style() {
        let mut agent = AgentSnapshot::spawned(Position::new(10, 10));
        agent.exp = [5, 7, 9];
        agent.attack = [1, 2, 3];
        assert_eq!(agent.skill_exp(CombatSkill::Range), 7);
        assert_eq!(agent.attack(CombatSkill::Mage), 3);
    }

    #[test]
    fn max_defense_across_styles() {
        let mut agent = AgentSnapshot::spawned(Position::new(0, 0));
        agent.defense = [4, 12, 6];
        assert_eq!(agent.max_defense(), 12);
    }
}

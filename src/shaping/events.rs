//! Event-log rows and the per-tick summaries the reward shaper reads.

use std::collections::HashSet;

use super::error::ShapingError;
use super::types::CombatSkill;

/// Event codes written to the simulation's event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCode {
    EatFood = 1,
    DrinkWater = 2,
    GoFarthest = 3,
    ScoreHit = 11,
    PlayerKill = 12,
    ConsumeItem = 21,
    GiveItem = 22,
    DestroyItem = 23,
    HarvestItem = 24,
    EquipItem = 25,
    FireAmmo = 26,
    GiveGold = 31,
    ListItem = 32,
    EarnGold = 33,
    BuyItem = 34,
    LevelUp = 41,
}

impl EventCode {
    /// Events rewarded by the progress bonus, in bonus order.
    pub const BASIC: [EventCode; 3] = [
        EventCode::EatFood,
        EventCode::DrinkWater,
        EventCode::GoFarthest,
    ];

    /// True for events whose item/level columns carry no identity
    /// (e.g. the distance reached by `GoFarthest`).
    fn is_code_only(&self) -> bool {
        matches!(
            self,
            EventCode::EatFood | EventCode::DrinkWater | EventCode::GoFarthest
        )
    }
}

impl TryFrom<i16> for EventCode {
    type Error = ShapingError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        let event = match code {
            1 => EventCode::EatFood,
            2 => EventCode::DrinkWater,
            3 => EventCode::GoFarthest,
            11 => EventCode::ScoreHit,
            12 => EventCode::PlayerKill,
            21 => EventCode::ConsumeItem,
            22 => EventCode::GiveItem,
            23 => EventCode::DestroyItem,
            24 => EventCode::HarvestItem,
            25 => EventCode::EquipItem,
            26 => EventCode::FireAmmo,
            31 => EventCode::GiveGold,
            32 => EventCode::ListItem,
            33 => EventCode::EarnGold,
            34 => EventCode::BuyItem,
            41 => EventCode::LevelUp,
            other => return Err(ShapingError::UnknownEvent(other)),
        };
        Ok(event)
    }
}

/// One row of the event log, already filtered to a single agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    pub tick: u32,
    pub event: EventCode,
    /// Item type id (0 when the event involves no item).
    pub item_type: i16,
    /// Item, skill, or target level depending on the event.
    pub level: i16,
    pub quantity: i16,
    pub price: i16,
}

impl EventRecord {
    /// Creates a record with no item, level, quantity, or price.
    pub fn new(tick: u32, event: EventCode) -> Self {
        Self {
            tick,
            event,
            item_type: 0,
            level: 0,
            quantity: 0,
            price: 0,
        }
    }

    pub fn with_item(mut self, item_type: i16, level: i16) -> Self {
        self.item_type = item_type;
        self.level = level;
        self
    }

    pub fn with_level(mut self, level: i16) -> Self {
        self.level = level;
        self
    }

    /// Identity used when counting distinct events.
    ///
    /// Quantity and price never make an event distinct.
    pub fn unique_key(&self) -> (EventCode, i16, i16) {
        if self.event.is_code_only() {
            (self.event, 0, 0)
        } else {
            (self.event, self.item_type, self.level)
        }
    }
}

/// Number of distinct events in an agent's log.
pub fn unique_event_count(log: &[EventRecord]) -> usize {
    log.iter()
        .map(EventRecord::unique_key)
        .collect::<HashSet<_>>()
        .len()
}

/// What happened to one agent during a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickEvents {
    /// Whether each of [`EventCode::BASIC`] fired this tick.
    pub basic: [bool; 3],
    /// Whether the agent fired its assigned skill's ammunition.
    pub ammo_fired: bool,
    /// Highest level among players killed this tick (0 if none).
    pub kill_level: i16,
}

impl TickEvents {
    /// Summarizes the rows of `log` stamped with `tick`.
    pub fn extract(log: &[EventRecord], tick: u32, skill: CombatSkill) -> Self {
        let mut summary = Self::default();
        for record in log.iter().filter(|r| r.tick == tick) {
            if let Some(idx) = EventCode::BASIC.iter().position(|e| *e == record.event) {
                summary.basic[idx] = true;
            }
            match record.event {
                EventCode::FireAmmo if record.item_type == skill.ammo().id() => {
                    summary.ammo_fired = true;
                }
                EventCode::PlayerKill => {
                    summary.kill_level = summary.kill_level.max(record.level);
                }
                _ => {}
            }
        }
        summary
    }

    pub fn ate(&self) -> bool {
        self.basic[0]
    }

    pub fn drank(&self) -> bool {
        self.basic[1]
    }

    pub fn went_farthest(&self) -> bool {
        self.basic[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::types::ItemType;

    #[test]
    fn event_codes_parse() {
        assert_eq!(EventCode::try_from(12i16), Ok(EventCode::PlayerKill));
        assert_eq!(
            EventCode::try_from(99i16),
            Err(ShapingError::UnknownEvent(99))
        );
    }

    #[test]
    fn unique_count_ignores_quantity_and_distance() {
        let mut harvest = EventRecord::new(1, EventCode::HarvestItem).with_item(10, 1);
        harvest.quantity = 3;
        let mut harvest_again = harvest;
        harvest_again.quantity = 5;
        harvest_again.tick = 4;

        let log = vec![
            EventRecord::new(1, EventCode::GoFarthest).with_level(3),
            EventRecord::new(2, EventCode::GoFarthest).with_level(7),
            harvest,
            harvest_again,
            EventRecord::new(5, EventCode::HarvestItem).with_item(10, 2),
        ];
        assert_eq!(unique_event_count(&log), 3);
    }

    #[test]
    fn unique_count_of_empty_log() {
        assert_eq!(unique_event_count(&[]), 0);
    }

    #[test]
    fn extract_only_reads_current_tick() {
        let log = vec![
            EventRecord::new(3, EventCode::EatFood),
            EventRecord::new(4, EventCode::DrinkWater),
            EventRecord::new(4, EventCode::PlayerKill).with_level(5),
            EventRecord::new(4, EventCode::PlayerKill).with_level(9),
        ];
        let tick = TickEvents::extract(&log, 4, CombatSkill::Melee);
        assert!(!tick.ate());
        assert!(tick.drank());
        assert!(!tick.went_farthest());
        assert_eq!(tick.kill_level, 9);
    }

    #[test]
    fn no_kills_means_level_zero() {
        let log = vec![EventRecord::new(2, EventCode::EatFood)];
        let tick = TickEvents::extract(&log, 2, CombatSkill::Mage);
        assert_eq!(tick.kill_level, 0);
    }

    #[test]
    fn ammo_fire_matches_assigned_skill() {
        let log = vec![EventRecord::new(6, EventCode::FireAmmo).with_item(ItemType::Arrow.id(), 1)];
        assert!(TickEvents::extract(&log, 6, CombatSkill::Range).ammo_fired);
        assert!(!TickEvents::extract(&log, 6, CombatSkill::Melee).ammo_fired);
    }
}

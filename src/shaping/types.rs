//! Core types for the shaping layer.
//!
//! Defines combat skills, terrain materials, item types, and grid positions
//! shared by the observation augmenter and the reward shaper.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::error::ShapingError;

/// Identifier of an entity in the simulation.
///
/// Players have positive ids, NPCs negative ids, and `0` marks an empty
/// (padding) row in entity observations.
pub type EntityId = i32;

/// Primary combat profession assigned to an agent for one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CombatSkill {
    Melee,
    Range,
    Mage,
}

/// Task-name hints, checked in order; the first substring match wins.
const TASK_HINTS: [(&str, CombatSkill); 12] = [
    (":melee_", CombatSkill::Melee), // skills
    (":range_", CombatSkill::Range),
    (":mage_", CombatSkill::Mage),
    (":spear_", CombatSkill::Melee), // weapons
    (":bow_", CombatSkill::Range),
    (":wand_", CombatSkill::Mage),
    (":pickaxe_", CombatSkill::Melee), // tools
    (":axe_", CombatSkill::Range),
    (":chisel_", CombatSkill::Mage),
    (":whetstone", CombatSkill::Melee), // ammo
    (":arrow_", CombatSkill::Range),
    (":runes_", CombatSkill::Mage),
];

impl CombatSkill {
    /// Number of combat skills.
    pub const COUNT: usize = 3;

    /// Returns all skills in attack-style order.
    pub fn all() -> [CombatSkill; 3] {
        [CombatSkill::Melee, CombatSkill::Range, CombatSkill::Mage]
    }

    /// Index into the attack-style action (0=Melee, 1=Range, 2=Mage).
    pub fn style_index(&self) -> usize {
        match self {
            CombatSkill::Melee => 0,
            CombatSkill::Range => 1,
            CombatSkill::Mage => 2,
        }
    }

    /// Index into the combat embedding, which follows the alphabetical
    /// skill list (0=Mage, 1=Melee, 2=Range).
    pub fn embedding_index(&self) -> usize {
        match self {
            CombatSkill::Mage => 0,
            CombatSkill::Melee => 1,
            CombatSkill::Range => 2,
        }
    }

    /// One-hot attack-style mask selecting only this skill.
    pub fn style_mask(&self) -> [i8; 3] {
        let mut mask = [0; 3];
        mask[self.style_index()] = 1;
        mask
    }

    /// Tile whose resource this skill harvests for ammunition.
    pub fn harvest_tile(&self) -> Material {
        match self {
            CombatSkill::Melee => Material::Ore,
            CombatSkill::Range => Material::Tree,
            CombatSkill::Mage => Material::Crystal,
        }
    }

    /// Ammunition item fired by this skill.
    pub fn ammo(&self) -> ItemType {
        match self {
            CombatSkill::Melee => ItemType::Whetstone,
            CombatSkill::Range => ItemType::Arrow,
            CombatSkill::Mage => ItemType::Runes,
        }
    }

    /// Resolves a skill from a task name.
    ///
    /// Tries the prefixed hints first (`":bow_"`, `":runes_"`, ...), then
    /// the bare skill names as whole `_`/`:`-separated tokens. Returns
    /// `None` when nothing matches.
    pub fn from_task_name(task_name: &str) -> Option<CombatSkill> {
        let name = task_name.to_lowercase();
        if let Some((_, skill)) = TASK_HINTS.iter().find(|(hint, _)| name.contains(hint)) {
            return Some(*skill);
        }
        name.split(|c: char| !c.is_ascii_alphanumeric())
            .find_map(|token| match token {
                "melee" => Some(CombatSkill::Melee),
                "range" => Some(CombatSkill::Range),
                "mage" => Some(CombatSkill::Mage),
                _ => None,
            })
    }
}

impl fmt::Display for CombatSkill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombatSkill::Melee => write!(f, "melee"),
            CombatSkill::Range => write!(f, "range"),
            CombatSkill::Mage => write!(f, "mage"),
        }
    }
}

/// Terrain material of a map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    Void,
    Water,
    Grass,
    Scrub,
    Foilage,
    Stone,
    Slag,
    Ore,
    Stump,
    Tree,
    Fragment,
    Crystal,
    Weeds,
    Ocean,
    Fish,
}

impl Material {
    /// Returns true if agents cannot walk onto this material.
    pub fn is_impassable(&self) -> bool {
        matches!(
            self,
            Material::Void | Material::Water | Material::Stone | Material::Ocean | Material::Fish
        )
    }

    /// Material code as used in tile observations.
    pub fn index(&self) -> i16 {
        *self as i16
    }
}

impl TryFrom<i16> for Material {
    type Error = ShapingError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        let material = match code {
            0 => Material::Void,
            1 => Material::Water,
            2 => Material::Grass,
            3 => Material::Scrub,
            4 => Material::Foilage,
            5 => Material::Stone,
            6 => Material::Slag,
            7 => Material::Ore,
            8 => Material::Stump,
            9 => Material::Tree,
            10 => Material::Fragment,
            11 => Material::Crystal,
            12 => Material::Weeds,
            13 => Material::Ocean,
            14 => Material::Fish,
            other => return Err(ShapingError::UnknownTerrain(other)),
        };
        Ok(material)
    }
}

/// Item type ids as reported in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Hat = 2,
    Top = 3,
    Bottom = 4,
    Spear = 5,
    Bow = 6,
    Wand = 7,
    Rod = 8,
    Gloves = 9,
    Pickaxe = 10,
    Axe = 11,
    Chisel = 12,
    Whetstone = 13,
    Arrow = 14,
    Runes = 15,
    Ration = 16,
    Potion = 17,
}

impl ItemType {
    /// Item type id as it appears in event rows.
    pub fn id(&self) -> i16 {
        *self as i16
    }
}

/// A cell on the square simulation map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    /// Creates a new position.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Builds a position from raw observation coordinates, rejecting cells
    /// outside a `map_size × map_size` map.
    pub fn from_obs(row: i16, col: i16, map_size: usize) -> Result<Self, ShapingError> {
        let in_map = |v: i16| usize::try_from(v).ok().filter(|v| *v < map_size);
        match (in_map(row), in_map(col)) {
            (Some(r), Some(c)) => Ok(Self::new(r, c)),
            _ => Err(ShapingError::OutOfMap { row, col, map_size }),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_from_prefixed_hint() {
        assert_eq!(
            CombatSkill::from_task_name("Equip:bow_level_3"),
            Some(CombatSkill::Range)
        );
        assert_eq!(
            CombatSkill::from_task_name("consume:runes_1"),
            Some(CombatSkill::Mage)
        );
        assert_eq!(
            CombatSkill::from_task_name("harvest:PICKAXE_2"),
            Some(CombatSkill::Melee)
        );
    }

    #[test]
    fn skill_from_whole_word() {
        assert_eq!(
            CombatSkill::from_task_name("practice_range_attack"),
            Some(CombatSkill::Range)
        );
        assert_eq!(CombatSkill::from_task_name("deal_damage"), None);
        assert_eq!(CombatSkill::from_task_name("eat_food"), None);
    }

    #[test]
    fn hint_table_wins_over_tokens() {
        // ":axe_" is checked before the bare "melee" token
        assert_eq!(
            CombatSkill::from_task_name("melee_with:axe_"),
            Some(CombatSkill::Range)
        );
    }

    #[test]
    fn skill_orderings_differ() {
        assert_eq!(CombatSkill::Melee.style_mask(), [1, 0, 0]);
        assert_eq!(CombatSkill::Mage.style_mask(), [0, 0, 1]);
        assert_eq!(CombatSkill::Mage.embedding_index(), 0);
        assert_eq!(CombatSkill::Range.embedding_index(), 2);
    }

    #[test]
    fn skill_lookup_tables() {
        assert_eq!(CombatSkill::Melee.harvest_tile(), Material::Ore);
        assert_eq!(CombatSkill::Range.harvest_tile(), Material::Tree);
        assert_eq!(CombatSkill::Mage.ammo(), ItemType::Runes);
    }

    #[test]
    fn material_codes_round_trip_and_reject_unknown() {
        assert_eq!(Material::try_from(4i16), Ok(Material::Foilage));
        assert_eq!(Material::Crystal.index(), 11);
        assert_eq!(Material::try_from(42i16), Err(ShapingError::UnknownTerrain(42)));
    }

    #[test]
    fn impassable_set() {
        assert!(Material::Stone.is_impassable());
        assert!(Material::Water.is_impassable());
        assert!(!Material::Grass.is_impassable());
        assert!(!Material::Foilage.is_impassable());
    }

    #[test]
    fn position_from_obs_bounds() {
        assert_eq!(Position::from_obs(3, 4, 8), Ok(Position::new(3, 4)));
        assert!(Position::from_obs(8, 0, 8).is_err());
        assert!(Position::from_obs(-1, 0, 8).is_err());
    }
}

//! Observation layout and augmentation.
//!
//! Raw observations carry an entity matrix, a tile matrix, the agent's
//! combat attributes, and per-action target masks. Augmentation prepends a
//! skill one-hot to the combat attributes and appends six derived columns to
//! every tile row.

use std::collections::BTreeMap;

use ndarray::{s, Array1, Array2, ArrayView2};

use super::error::ShapingError;
use super::maps::{DistanceMap, ThreatMap};
use super::types::{CombatSkill, Material, Position};

/// Column indices of the entity matrix that the shaping layer reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityLayout {
    pub id: usize,
    pub row: usize,
    pub col: usize,
    pub melee_level: usize,
    pub range_level: usize,
    pub mage_level: usize,
}

impl EntityLayout {
    /// Minimum number of columns an entity row must have.
    pub fn width(&self) -> usize {
        [
            self.id,
            self.row,
            self.col,
            self.melee_level,
            self.range_level,
            self.mage_level,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

impl Default for EntityLayout {
    fn default() -> Self {
        Self {
            id: 0,
            row: 2,
            col: 3,
            melee_level: 15,
            range_level: 17,
            mage_level: 19,
        }
    }
}

/// Column indices of the tile matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayout {
    pub row: usize,
    pub col: usize,
    pub material: usize,
}

impl TileLayout {
    pub fn width(&self) -> usize {
        self.row.max(self.col).max(self.material) + 1
    }
}

impl Default for TileLayout {
    fn default() -> Self {
        Self {
            row: 0,
            col: 1,
            material: 2,
        }
    }
}

/// Number of columns appended to each tile row:
/// distance, obstacle, food, water, harvest tile, threat.
pub const TILE_EXTRA_COLUMNS: usize = 6;

/// Action-target masks keyed by action and argument name
/// (e.g. `Sell` / `Price`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionTargets {
    masks: BTreeMap<String, BTreeMap<String, Array1<i8>>>,
}

impl ActionTargets {
    pub const SELL: &'static str = "Sell";
    pub const PRICE: &'static str = "Price";
    pub const ATTACK: &'static str = "Attack";
    pub const STYLE: &'static str = "Style";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, action: &str, argument: &str, mask: Array1<i8>) {
        self.masks
            .entry(action.to_string())
            .or_default()
            .insert(argument.to_string(), mask);
    }

    pub fn get(&self, action: &str, argument: &str) -> Option<&Array1<i8>> {
        self.masks.get(action).and_then(|args| args.get(argument))
    }

    /// Mutable mask for `action/argument`; a missing mask is a contract
    /// violation.
    pub fn mask_mut(&mut self, action: &str, argument: &str) -> Result<&mut Array1<i8>, ShapingError> {
        self.masks
            .get_mut(action)
            .and_then(|args| args.get_mut(argument))
            .ok_or_else(|| ShapingError::MissingActionTarget {
                action: action.to_string(),
                argument: argument.to_string(),
            })
    }
}

/// One agent's observation for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub entity: Array2<i16>,
    pub tile: Array2<i16>,
    pub combat_attr: Array1<i16>,
    pub action_targets: ActionTargets,
}

/// Shapes of the observation arrays, as published to the training loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationShape {
    pub entity: (usize, usize),
    pub tile: (usize, usize),
    pub combat_attr: usize,
}

impl ObservationShape {
    /// Shape after augmentation, with `map_n_obs` tile rows.
    pub fn augmented(&self, map_n_obs: usize) -> Self {
        Self {
            entity: self.entity,
            tile: (map_n_obs, self.tile.1 + TILE_EXTRA_COLUMNS),
            combat_attr: CombatSkill::COUNT + self.combat_attr,
        }
    }
}

/// Builds the combat embedding: skill one-hot followed by the raw
/// attributes.
pub fn combat_embedding(skill: CombatSkill, raw: &Array1<i16>) -> Array1<i16> {
    let mut embedding = Array1::zeros(CombatSkill::COUNT + raw.len());
    embedding[skill.embedding_index()] = 1;
    embedding.slice_mut(s![CombatSkill::COUNT..]).assign(raw);
    embedding
}

/// Appends the derived feature columns to every tile row.
pub fn augment_tiles(
    tile: ArrayView2<'_, i16>,
    layout: &TileLayout,
    skill: CombatSkill,
    dist_map: &DistanceMap,
    threat_map: &ThreatMap,
) -> Result<Array2<i16>, ShapingError> {
    let (rows, cols) = tile.dim();
    if cols < layout.width() {
        return Err(ShapingError::TooFewColumns {
            name: "Tile",
            got: cols,
            expected: layout.width(),
        });
    }

    let map_size = dist_map.map_size();
    let mut out = Array2::zeros((rows, cols + TILE_EXTRA_COLUMNS));
    out.slice_mut(s![.., ..cols]).assign(&tile);
    for (i, raw) in tile.rows().into_iter().enumerate() {
        let pos = Position::from_obs(raw[layout.row], raw[layout.col], map_size)?;
        let material = Material::try_from(raw[layout.material])?;
        let features = [
            dist_map.at(pos),
            i16::from(material.is_impassable()),
            i16::from(material == Material::Foilage),
            i16::from(material == Material::Water),
            i16::from(material == skill.harvest_tile()),
            threat_map.at(pos),
        ];
        for (j, value) in features.into_iter().enumerate() {
            out[[i, cols + j]] = value;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn combat_embedding_prepends_one_hot() {
        let raw = array![7i16, 8, 9, 10, 11, 12];
        let emb = combat_embedding(CombatSkill::Melee, &raw);
        assert_eq!(emb.len(), 9);
        assert_eq!(emb.to_vec(), vec![0, 1, 0, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn tile_features_appended() {
        let dist = DistanceMap::new(8);
        let threat = ThreatMap::new(8);
        let tile = array![
            [0i16, 0, Material::Stone.index()],
            [3, 3, Material::Foilage.index()],
            [4, 4, Material::Water.index()],
            [4, 5, Material::Tree.index()],
        ];
        let out = augment_tiles(
            tile.view(),
            &TileLayout::default(),
            CombatSkill::Range,
            &dist,
            &threat,
        )
        .unwrap();
        assert_eq!(out.dim(), (4, 9));
        assert_eq!(out.row(0).to_vec(), vec![0, 0, 5, 3, 1, 0, 0, 0, 0]);
        assert_eq!(out.row(1).to_vec(), vec![3, 3, 4, 0, 0, 1, 0, 0, 0]);
        assert_eq!(out.row(2).to_vec(), vec![4, 4, 1, 0, 1, 0, 1, 0, 0]);
        assert_eq!(out.row(3).to_vec(), vec![4, 5, 9, 1, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn unknown_terrain_fails_loudly() {
        let dist = DistanceMap::new(8);
        let threat = ThreatMap::new(8);
        let tile = array![[1i16, 1, 77]];
        let err = augment_tiles(
            tile.view(),
            &TileLayout::default(),
            CombatSkill::Mage,
            &dist,
            &threat,
        )
        .unwrap_err();
        assert_eq!(err, ShapingError::UnknownTerrain(77));
    }

    #[test]
    fn narrow_tile_matrix_rejected() {
        let dist = DistanceMap::new(8);
        let threat = ThreatMap::new(8);
        let tile = array![[1i16, 1]];
        assert!(matches!(
            augment_tiles(tile.view(), &TileLayout::default(), CombatSkill::Mage, &dist, &threat),
            Err(ShapingError::TooFewColumns { name: "Tile", .. })
        ));
    }

    #[test]
    fn augmented_shape() {
        let raw = ObservationShape {
            entity: (100, 31),
            tile: (225, 3),
            combat_attr: 6,
        };
        let aug = raw.augmented(225);
        assert_eq!(aug.tile, (225, 9));
        assert_eq!(aug.combat_attr, 9);
        assert_eq!(aug.entity, raw.entity);
    }

    #[test]
    fn missing_mask_is_an_error() {
        let mut targets = ActionTargets::new();
        targets.insert(ActionTargets::SELL, ActionTargets::PRICE, Array1::ones(5));
        assert!(targets.mask_mut(ActionTargets::SELL, ActionTargets::PRICE).is_ok());
        assert!(targets.mask_mut(ActionTargets::ATTACK, ActionTargets::STYLE).is_err());
    }
}

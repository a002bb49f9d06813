//! Spatial maps used to derive tile features.

use ndarray::{s, Array2, ArrayView2};

use super::error::ShapingError;
use super::observation::EntityLayout;
use super::types::{EntityId, Position};

/// Static per-cell distance to the map center.
///
/// Concentric square rings: the outermost ring holds `map_size / 2 - 1`
/// and the central cells hold 0.
#[derive(Debug, Clone)]
pub struct DistanceMap {
    grid: Array2<i16>,
}

impl DistanceMap {
    /// Builds the map for a `map_size × map_size` world.
    pub fn new(map_size: usize) -> Self {
        let mut grid = Array2::zeros((map_size, map_size));
        let center = map_size / 2;
        for i in 0..center {
            let (lo, hi) = (i, map_size - i);
            grid.slice_mut(s![lo..hi, lo..hi])
                .fill((center - i - 1) as i16);
        }
        Self { grid }
    }

    pub fn map_size(&self) -> usize {
        self.grid.nrows()
    }

    /// Distance to center at `position`.
    pub fn at(&self, position: Position) -> i16 {
        self.grid[[position.row, position.col]]
    }
}

/// Per-cell strongest hostile combat level, rebuilt every tick.
#[derive(Debug, Clone)]
pub struct ThreatMap {
    grid: Array2<i16>,
}

impl ThreatMap {
    pub fn new(map_size: usize) -> Self {
        Self {
            grid: Array2::zeros((map_size, map_size)),
        }
    }

    /// Clears the map and registers every visible threat.
    ///
    /// Rows with id 0 are padding. The owning agent never counts, and while
    /// `players_immune` holds only NPCs (negative ids) are registered.
    pub fn rebuild(
        &mut self,
        entities: ArrayView2<'_, i16>,
        layout: &EntityLayout,
        owner: EntityId,
        players_immune: bool,
    ) -> Result<(), ShapingError> {
        if entities.ncols() < layout.width() {
            return Err(ShapingError::TooFewColumns {
                name: "Entity",
                got: entities.ncols(),
                expected: layout.width(),
            });
        }
        self.grid.fill(0);
        let map_size = self.grid.nrows();
        for entity in entities.rows() {
            let id = EntityId::from(entity[layout.id]);
            if id == 0 || id == owner || (id > 0 && players_immune) {
                continue;
            }
            let pos = Position::from_obs(entity[layout.row], entity[layout.col], map_size)?;
            let combat_level = entity[layout.melee_level]
                .max(entity[layout.range_level])
                .max(entity[layout.mage_level]);
            let cell = &mut self.grid[[pos.row, pos.col]];
            *cell = (*cell).max(combat_level);
        }
        Ok(())
    }

    /// Threat level at `position` (0 when the cell is empty).
    pub fn at(&self, position: Position) -> i16 {
        self.grid[[position.row, position.col]]
    }
}

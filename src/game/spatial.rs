//! Spatial hash grid for density-proportional broad-phase collision detection
//!
//! Divides the world into uniform cells and tracks which cell each entity
//! occupies. Cells live in a sparse map, so entities may wander arbitrarily
//! far and new cells are created lazily. Collision candidates are only
//! taken from an entity's own cell (or its half-neighborhood, see
//! [`BroadPhase`]).

use std::str::FromStr;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::game::constants::grid::INITIAL_CELL_CAPACITY;
use crate::game::entity::EntityId;
use crate::util::vec2::Vec2;

/// Inline capacity for entity ids within a cell
const CELL_INLINE_CAPACITY: usize = 8;

/// Half-neighborhood offsets: every unordered pair of adjacent cells is
/// visited exactly once when each cell looks only at these four.
const HALF_NEIGHBORHOOD: [(i64, i64); 4] = [(1, 0), (0, 1), (1, 1), (-1, 1)];

/// Grid cell key - (x, y) cell coordinates.
/// 64-bit so any finite `f32` position gets a distinct, offsettable cell.
pub type CellKey = (i64, i64);

/// Entity ids in one cell, kept sorted ascending
type Cell = SmallVec<[EntityId; CELL_INLINE_CAPACITY]>;

/// Which cells contribute collision candidates for an entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadPhase {
    /// Only entities sharing the same cell are compared.
    /// Requires cell_size >= max extent + max per-step displacement.
    #[default]
    SameCell,
    /// Same cell plus the eight surrounding cells
    Neighborhood,
}

impl FromStr for BroadPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "same_cell" => Ok(BroadPhase::SameCell),
            "neighborhood" => Ok(BroadPhase::Neighborhood),
            other => Err(format!("unknown broad phase '{}'", other)),
        }
    }
}

/// Spatial hash grid keyed by entity id
#[derive(Debug)]
pub struct SpatialGrid {
    /// Cell size in world units
    cell_size: f32,
    /// Map from cell key to the ids in that cell
    cells: HashMap<CellKey, Cell, FxBuildHasher>,
    /// Map from entity id to the cell it is recorded under
    locations: HashMap<EntityId, CellKey, FxBuildHasher>,
}

impl SpatialGrid {
    /// Create a grid with the given cell size.
    ///
    /// The size is validated by `WorldConfig::validate`; a non-positive
    /// size here is a programming error.
    pub fn new(cell_size: f32) -> Self {
        assert!(
            cell_size.is_finite() && cell_size > 0.0,
            "cell size must be positive, got {}",
            cell_size
        );
        Self {
            cell_size,
            cells: HashMap::with_capacity_and_hasher(INITIAL_CELL_CAPACITY, FxBuildHasher),
            locations: HashMap::with_capacity_and_hasher(INITIAL_CELL_CAPACITY, FxBuildHasher),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Convert world position to cell key: `floor(p / cell_size)` per axis.
    /// Computed in `f64`; the result saturates only at the `i64` range.
    #[inline]
    pub fn cell_of(&self, position: Vec2) -> CellKey {
        let size = f64::from(self.cell_size);
        (
            (f64::from(position.x) / size).floor() as i64,
            (f64::from(position.y) / size).floor() as i64,
        )
    }

    /// Cell an entity is currently recorded under
    #[inline]
    pub fn location(&self, id: EntityId) -> Option<CellKey> {
        self.locations.get(&id).copied()
    }

    /// Index an entity. Re-inserting a known id behaves like `update`.
    pub fn insert(&mut self, id: EntityId, position: Vec2) {
        if self.locations.contains_key(&id) {
            self.update(id, position);
            return;
        }
        let key = self.cell_of(position);
        Self::add_to_cell(self.cells.entry(key).or_default(), id);
        self.locations.insert(id, key);
    }

    /// Move an entity to the cell matching `position`.
    ///
    /// No-op when the cell is unchanged. Returns true if the entity changed cell.
    pub fn update(&mut self, id: EntityId, position: Vec2) -> bool {
        let new_key = self.cell_of(position);
        let Some(old_key) = self.locations.get(&id).copied() else {
            self.insert(id, position);
            return true;
        };
        if old_key == new_key {
            return false;
        }

        if let Some(cell) = self.cells.get_mut(&old_key) {
            Self::remove_from_cell(cell, id);
        }
        Self::add_to_cell(self.cells.entry(new_key).or_default(), id);
        self.locations.insert(id, new_key);
        true
    }

    /// Drop an entity from the grid. Returns false if it was not indexed.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(key) = self.locations.remove(&id) else {
            return false;
        };
        if let Some(cell) = self.cells.get_mut(&key) {
            Self::remove_from_cell(cell, id);
        }
        true
    }

    /// Other ids sharing `id`'s cell, ascending
    pub fn neighbors(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.locations
            .get(&id)
            .and_then(|key| self.cells.get(key))
            .into_iter()
            .flat_map(|cell| cell.iter().copied())
            .filter(move |&other| other != id)
    }

    /// Ids recorded in a cell, ascending
    pub fn cell(&self, key: CellKey) -> &[EntityId] {
        self.cells.get(&key).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// Remove cells whose member set is empty. Returns the number removed.
    pub fn prune_empty_cells(&mut self) -> usize {
        let before = self.cells.len();
        self.cells.retain(|_, cell| !cell.is_empty());
        before - self.cells.len()
    }

    /// Collect every broad-phase candidate pair into `out` as `(lo, hi)`,
    /// sorted ascending, each unordered pair exactly once.
    ///
    /// `out` is cleared first so callers can reuse one buffer per step.
    pub fn collect_candidate_pairs(&self, mode: BroadPhase, out: &mut Vec<(EntityId, EntityId)>) {
        out.clear();
        for (&(cx, cy), ids) in &self.cells {
            // Pairs within the same cell; ids are sorted so (i, j) is (lo, hi)
            for i in 0..ids.len() {
                for j in (i + 1)..ids.len() {
                    out.push((ids[i], ids[j]));
                }
            }

            if mode == BroadPhase::Neighborhood {
                for (dx, dy) in HALF_NEIGHBORHOOD {
                    // Cells at the edge of the key range have no neighbor there
                    let (Some(nx), Some(ny)) = (cx.checked_add(dx), cy.checked_add(dy)) else {
                        continue;
                    };
                    let Some(other_cell) = self.cells.get(&(nx, ny)) else {
                        continue;
                    };
                    for &a in ids {
                        for &b in other_cell {
                            out.push(if a < b { (a, b) } else { (b, a) });
                        }
                    }
                }
            }
        }
        out.sort_unstable();
    }

    /// Ids recorded in any cell overlapping the rectangle `[min, max]`.
    ///
    /// Entities are indexed by their top-left corner, so callers looking for
    /// boxes that may reach into the rectangle should widen `min` by the
    /// largest extent in play.
    pub fn query_region(&self, min: Vec2, max: Vec2) -> Vec<EntityId> {
        let (x0, y0) = self.cell_of(min);
        let (x1, y1) = self.cell_of(max);
        let area = (i128::from(x1) - i128::from(x0) + 1) * (i128::from(y1) - i128::from(y0) + 1);

        let mut found = Vec::new();
        if area > self.cells.len() as i128 {
            // Sparse grid: scanning the occupied cells is cheaper than the key range
            for (&(cx, cy), ids) in &self.cells {
                if (x0..=x1).contains(&cx) && (y0..=y1).contains(&cy) {
                    found.extend_from_slice(ids);
                }
            }
        } else {
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    if let Some(ids) = self.cells.get(&(cx, cy)) {
                        found.extend_from_slice(ids);
                    }
                }
            }
        }
        found
    }

    /// Number of indexed entities
    #[inline]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> SpatialGridStats {
        SpatialGridStats {
            allocated_cells: self.cells.len(),
            non_empty_cells: self.cells.values().filter(|c| !c.is_empty()).count(),
            total_entities: self.cells.values().map(|c| c.len()).sum(),
            max_per_cell: self.cells.values().map(|c| c.len()).max().unwrap_or(0),
        }
    }

    fn add_to_cell(cell: &mut Cell, id: EntityId) {
        if let Err(idx) = cell.binary_search(&id) {
            cell.insert(idx, id);
        }
    }

    fn remove_from_cell(cell: &mut Cell, id: EntityId) {
        if let Ok(idx) = cell.binary_search(&id) {
            cell.remove(idx);
        }
    }
}

/// Statistics about the spatial grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialGridStats {
    /// Cells present in the map, including empty ones awaiting pruning
    pub allocated_cells: usize,
    pub non_empty_cells: usize,
    pub total_entities: usize,
    pub max_per_cell: usize,
}

//! Arena-backed state tables keyed by (evader position, pursuer pair).
//!
//! Both the reward field and the Q-table share the same shape: for every
//! free evader cell and every unordered pair of distinct free cells there is
//! one fixed 16-entry action row. Instead of hashing tuples, states are
//! mapped to dense slots (evader slot, then a triangular pair slot), so the
//! training inner loop indexes flat arrays.

use serde::{Deserialize, Serialize};

use crate::actions::JOINT_ACTION_COUNT;
use crate::error::{Error, Result};
use crate::grid::GridTopology;

/// One 16-wide row of per-joint-action values.
pub type ActionRow = [i32; JOINT_ACTION_COUNT];

/// Canonical unordered pair of distinct free cells, `low < high`.
///
/// Used as the lookup key for table rows. Physical pursuer identity is kept
/// separately in [`PursuerPair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    low: usize,
    high: usize,
}

impl PairKey {
    /// Create a canonical key from two distinct cells, in either order.
    pub fn new(a: usize, b: usize) -> Option<PairKey> {
        if a == b {
            None
        } else {
            Some(PairKey {
                low: a.min(b),
                high: a.max(b),
            })
        }
    }

    pub fn low(&self) -> usize {
        self.low
    }

    pub fn high(&self) -> usize {
        self.high
    }
}

/// Pursuer positions in physical-identity order.
///
/// `first` is always pursuer A and `second` pursuer B, whatever their cell
/// indices. Canonical ordering is derived on lookup via [`PursuerPair::canonical`]
/// instead of being forced into storage, so action component 1 keeps meaning
/// "pursuer A's move" everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PursuerPair {
    pub first: usize,
    pub second: usize,
}

impl PursuerPair {
    pub fn new(first: usize, second: usize) -> Self {
        Self { first, second }
    }

    /// Canonical table key for this pair. `None` if both pursuers share a
    /// cell, which no legal pair ever does.
    pub fn canonical(&self) -> Option<PairKey> {
        PairKey::new(self.first, self.second)
    }

    /// Whether canonical ordering swaps the physical identities.
    pub fn is_swapped(&self) -> bool {
        self.first > self.second
    }

    pub fn contains(&self, cell: usize) -> bool {
        self.first == cell || self.second == cell
    }
}

impl From<PairKey> for PursuerPair {
    fn from(key: PairKey) -> Self {
        PursuerPair::new(key.low(), key.high())
    }
}

/// Dense slot assignment for free cells and canonical pairs of a topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateIndex {
    free_cells: Vec<usize>,
    slot_of_cell: Vec<Option<usize>>,
    pair_keys: Vec<PairKey>,
}

impl StateIndex {
    pub fn new(topology: &GridTopology) -> Self {
        let free_cells = topology.free_cells();
        let mut slot_of_cell = vec![None; topology.cell_count()];
        for (slot, &cell) in free_cells.iter().enumerate() {
            slot_of_cell[cell] = Some(slot);
        }
        let mut pair_keys = Vec::with_capacity(free_cells.len() * free_cells.len() / 2);
        for (i, &low) in free_cells.iter().enumerate() {
            for &high in &free_cells[i + 1..] {
                pair_keys.push(PairKey { low, high });
            }
        }
        Self {
            free_cells,
            slot_of_cell,
            pair_keys,
        }
    }

    pub fn free_cells(&self) -> &[usize] {
        &self.free_cells
    }

    /// Canonical pair keys in slot order.
    pub fn pair_keys(&self) -> &[PairKey] {
        &self.pair_keys
    }

    pub fn pair_count(&self) -> usize {
        self.pair_keys.len()
    }

    fn cell_slot(&self, cell: usize) -> Option<usize> {
        self.slot_of_cell.get(cell).copied().flatten()
    }

    /// Dense slot of a free evader cell.
    pub fn evader_slot(&self, cell: usize) -> Result<usize> {
        self.cell_slot(cell).ok_or(Error::NotFreeCell { cell })
    }

    /// Triangular slot of a canonical pair of free cells.
    pub fn pair_slot(&self, key: PairKey) -> Option<usize> {
        let li = self.cell_slot(key.low())?;
        let hi = self.cell_slot(key.high())?;
        let n = self.free_cells.len();
        Some(li * n - li * (li + 1) / 2 + (hi - li - 1))
    }
}

/// Two-level arena of action rows: evader slot, then pair slot.
///
/// Shared by reward fields (immutable after construction) and Q-tables
/// (mutated in place during training).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTable {
    index: StateIndex,
    rows: Vec<Vec<ActionRow>>,
}

impl StateTable {
    /// All-zero table with one row per (evader, pair) state.
    pub fn zeroed(index: StateIndex) -> Self {
        let rows = vec![vec![[0; JOINT_ACTION_COUNT]; index.pair_count()]; index.free_cells.len()];
        Self { index, rows }
    }

    /// Assemble a table from per-evader row vectors, in free-cell order.
    /// Callers must supply one row vector per free cell, each covering every
    /// pair slot.
    pub(crate) fn from_rows(index: StateIndex, rows: Vec<Vec<ActionRow>>) -> Self {
        debug_assert_eq!(rows.len(), index.free_cells.len());
        debug_assert!(rows.iter().all(|r| r.len() == index.pair_count()));
        Self { index, rows }
    }

    pub fn index(&self) -> &StateIndex {
        &self.index
    }

    pub fn state_count(&self) -> usize {
        self.index.free_cells.len() * self.index.pair_count()
    }

    fn slots(&self, evader: usize, key: PairKey) -> Result<(usize, usize)> {
        let missing = Error::StateNotFound {
            low: key.low(),
            high: key.high(),
            evader,
        };
        let Some(evader_slot) = self.index.cell_slot(evader) else {
            return Err(missing);
        };
        let Some(pair_slot) = self.index.pair_slot(key) else {
            return Err(missing);
        };
        Ok((evader_slot, pair_slot))
    }

    /// Action row for one state. A miss is a fatal integration error, not a
    /// recoverable condition.
    pub fn row(&self, evader: usize, key: PairKey) -> Result<&ActionRow> {
        let (es, ps) = self.slots(evader, key)?;
        Ok(&self.rows[es][ps])
    }

    pub fn row_mut(&mut self, evader: usize, key: PairKey) -> Result<&mut ActionRow> {
        let (es, ps) = self.slots(evader, key)?;
        Ok(&mut self.rows[es][ps])
    }

    /// All rows for one evader position, in pair-slot order (matching
    /// [`StateIndex::pair_keys`]).
    pub fn rows_for(&self, evader: usize) -> Result<&[ActionRow]> {
        let slot = self.index.evader_slot(evader)?;
        Ok(&self.rows[slot])
    }

    /// Iterate every state as `(evader cell, pair key, row)`.
    pub fn states(&self) -> impl Iterator<Item = (usize, PairKey, &ActionRow)> {
        self.index
            .free_cells
            .iter()
            .zip(&self.rows)
            .flat_map(move |(&evader, rows)| {
                self.index
                    .pair_keys
                    .iter()
                    .zip(rows)
                    .map(move |(&key, row)| (evader, key, row))
            })
    }
}

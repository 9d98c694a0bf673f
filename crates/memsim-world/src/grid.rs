//! Square grid of memory cells.

use memsim_core::{CellState, CellStats, Error, Position, Result, NEIGHBOR_OFFSETS};
use serde::Serialize;

/// A dense, bounded N×N grid (no wraparound).
///
/// The engine never mutates a grid once it has been handed out; each step
/// builds a replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid {
    size: usize,
    cells: Vec<CellState>,
}

impl Grid {
    /// Grid of freshly installed cells
    pub fn new(size: usize) -> Self {
        Self::filled(size, CellState::New)
    }

    /// Panics if `size * size` overflows; sizes accepted by
    /// [`memsim_core::validate_grid_size`] never do.
    pub fn filled(size: usize, state: CellState) -> Self {
        Self {
            size,
            cells: vec![state; size * size],
        }
    }

    /// Build a grid from row-major states
    pub fn from_states(size: usize, cells: Vec<CellState>) -> Result<Self> {
        let expected = size.checked_mul(size).ok_or_else(|| {
            Error::Validation(format!("grid size {} overflows the cell count", size))
        })?;
        if cells.len() != expected {
            return Err(Error::Validation(format!(
                "expected {} cells for a {}x{} grid, got {}",
                expected,
                size,
                size,
                cells.len()
            )));
        }
        Ok(Self::from_cells(size, cells))
    }

    /// Caller guarantees `cells.len() == size * size`
    pub(crate) fn from_cells(size: usize, cells: Vec<CellState>) -> Self {
        debug_assert_eq!(cells.len(), size * size);
        Self { size, cells }
    }

    /// Build a grid from nested rows, which must form a square
    pub fn from_rows(rows: Vec<Vec<CellState>>) -> Result<Self> {
        let size = rows.len();
        if let Some(row) = rows.iter().find(|row| row.len() != size) {
            return Err(Error::Validation(format!(
                "row of length {} in a grid of {} rows",
                row.len(),
                size
            )));
        }
        Self::from_states(size, rows.into_iter().flatten().collect())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    /// State at `pos`.
    ///
    /// Panics if `pos` lies outside the grid.
    pub fn get(&self, pos: Position) -> CellState {
        self.cells[self.pos_to_index(pos)]
    }

    /// In-bounds neighbors of a position: 8 inside, 5 on an edge, 3 in a corner
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = (Position, CellState)> + '_ {
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dr, dc)| {
            pos.offset(dr, dc, self.size)
                .map(|neighbor| (neighbor, self.get(neighbor)))
        })
    }

    pub fn defective_neighbors(&self, pos: Position) -> usize {
        self.neighbors(pos)
            .filter(|(_, state)| state.is_defective())
            .count()
    }

    pub fn has_defective_neighbor(&self, pos: Position) -> bool {
        self.neighbors(pos).any(|(_, state)| state.is_defective())
    }

    /// Per-state counts of the whole grid
    pub fn stats(&self) -> CellStats {
        CellStats::from_states(self.cells.iter().copied())
    }

    fn pos_to_index(&self, pos: Position) -> usize {
        pos.row * self.size + pos.col
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        Position::new(index / self.size, index % self.size)
    }

    /// Iterator over all cells with positions, row-major
    pub fn iter(&self) -> impl Iterator<Item = (Position, CellState)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, state)| (self.index_to_pos(i), *state))
    }

    /// Rows as slices, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[CellState]> + '_ {
        // chunks() rejects a zero chunk size; an empty grid has no rows anyway
        self.cells.chunks(self.size.max(1))
    }
}

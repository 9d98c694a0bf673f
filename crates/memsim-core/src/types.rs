//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a simulation run (assigned at every reset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Health state of a single memory cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellState {
    /// Non-functional, candidate for repair
    Defective = 0,
    /// Freshly installed
    New = 1,
    /// Stable operating state
    Normal = 2,
    /// Degraded but still functional
    Aged = 3,
}

impl CellState {
    /// All states, ordered by their numeric value
    pub const ALL: [CellState; 4] = [
        CellState::Defective,
        CellState::New,
        CellState::Normal,
        CellState::Aged,
    ];

    /// Order used by the statistics panel
    pub const REPORT_ORDER: [CellState; 4] = [
        CellState::New,
        CellState::Normal,
        CellState::Defective,
        CellState::Aged,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CellState::Defective => "Defective",
            CellState::New => "New",
            CellState::Normal => "Normal",
            CellState::Aged => "Aged",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(CellState::Defective),
            1 => Some(CellState::New),
            2 => Some(CellState::Normal),
            3 => Some(CellState::Aged),
            _ => None,
        }
    }

    pub fn is_defective(&self) -> bool {
        *self == CellState::Defective
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cell coordinates on a bounded square grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Offset by (dr, dc), returning `None` if the result leaves a `size`×`size` grid.
    /// No wraparound.
    pub fn offset(&self, dr: isize, dc: isize, size: usize) -> Option<Self> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < size && col < size).then_some(Self { row, col })
    }
}

/// Relative offsets of the eight surrounding cells
pub const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

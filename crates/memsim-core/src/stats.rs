//! Population statistics for a grid of cells.

use crate::CellState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count and share of one state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateShare {
    pub state: CellState,
    pub count: usize,
    /// Percentage of all cells (0 when the grid is empty)
    pub percentage: f64,
}

/// Per-state cell counts of a grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStats {
    pub defective: usize,
    pub new: usize,
    pub normal: usize,
    pub aged: usize,
}

impl CellStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally an iterator of cell states
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = CellState>,
    {
        let mut stats = Self::new();
        for state in states {
            stats.record(state);
        }
        stats
    }

    pub fn record(&mut self, state: CellState) {
        match state {
            CellState::Defective => self.defective += 1,
            CellState::New => self.new += 1,
            CellState::Normal => self.normal += 1,
            CellState::Aged => self.aged += 1,
        }
    }

    pub fn count(&self, state: CellState) -> usize {
        match state {
            CellState::Defective => self.defective,
            CellState::New => self.new,
            CellState::Normal => self.normal,
            CellState::Aged => self.aged,
        }
    }

    pub fn total(&self) -> usize {
        self.defective + self.new + self.normal + self.aged
    }

    pub fn percentage(&self, state: CellState) -> f64 {
        self.fraction(state) * 100.0
    }

    /// Fraction of cells in `state`, guarded against an empty grid
    pub fn fraction(&self, state: CellState) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.count(state) as f64 / total as f64
    }

    /// Shares in statistics-panel order
    pub fn shares(&self) -> [StateShare; 4] {
        CellState::REPORT_ORDER.map(|state| StateShare {
            state,
            count: self.count(state),
            percentage: self.percentage(state),
        })
    }

    /// `{state name: (count, percentage)}`
    pub fn by_name(&self) -> BTreeMap<&'static str, (usize, f64)> {
        self.shares()
            .into_iter()
            .map(|share| (share.state.name(), (share.count, share.percentage)))
            .collect()
    }
}

/// Counts of `from -> to` transitions, indexed by state value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTally {
    counts: [[u64; 4]; 4],
}

impl TransitionTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, from: CellState, to: CellState) {
        self.counts[from.index()][to.index()] += 1;
    }

    pub fn get(&self, from: CellState, to: CellState) -> u64 {
        self.counts[from.index()][to.index()]
    }

    /// Number of cells whose state changed
    pub fn changed(&self) -> u64 {
        CellState::ALL
            .iter()
            .flat_map(|&from| CellState::ALL.iter().map(move |&to| (from, to)))
            .filter(|(from, to)| from != to)
            .map(|(from, to)| self.get(from, to))
            .sum()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn merge(&mut self, other: &TransitionTally) {
        for (row, other_row) in self.counts.iter_mut().zip(other.counts.iter()) {
            for (count, other_count) in row.iter_mut().zip(other_row.iter()) {
                *count += other_count;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_states() {
        let stats = CellStats::from_states([
            CellState::New,
            CellState::New,
            CellState::Normal,
            CellState::Defective,
        ]);

        assert_eq!(stats.new, 2);
        assert_eq!(stats.normal, 1);
        assert_eq!(stats.defective, 1);
        assert_eq!(stats.aged, 0);
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.percentage(CellState::New), 50.0);
        assert_eq!(stats.fraction(CellState::Defective), 0.25);
    }

    #[test]
    fn test_empty_stats_guarded() {
        let stats = CellStats::new();
        for state in CellState::ALL {
            assert_eq!(stats.percentage(state), 0.0);
        }
    }

    #[test]
    fn test_shares_order_and_names() {
        let stats = CellStats::from_states([CellState::Aged; 3]);
        let order: Vec<_> = stats.shares().iter().map(|s| s.state).collect();
        assert_eq!(order, CellState::REPORT_ORDER.to_vec());

        let by_name = stats.by_name();
        assert_eq!(by_name["Aged"], (3, 100.0));
        assert_eq!(by_name["New"], (0, 0.0));
        assert_eq!(by_name.len(), 4);
    }

    #[test]
    fn test_tally_merge() {
        let mut a = TransitionTally::new();
        a.record(CellState::New, CellState::Normal);
        a.record(CellState::New, CellState::New);

        let mut b = TransitionTally::new();
        b.record(CellState::New, CellState::Normal);
        b.record(CellState::Aged, CellState::Defective);

        a.merge(&b);
        assert_eq!(a.get(CellState::New, CellState::Normal), 2);
        assert_eq!(a.get(CellState::Aged, CellState::Defective), 1);
        assert_eq!(a.total(), 4);
        assert_eq!(a.changed(), 3);
    }
}

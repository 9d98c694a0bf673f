//! Stochastic transition rule.
//!
//! Every cell's next state is computed from the pre-step grid only, using
//! one uniform draw per cell. The repair probability is the defective
//! fraction of that same pre-step grid.

use crate::grid::Grid;
use memsim_core::{CellState, Position, TransitionRules, TransitionTally};
use rand::Rng;

/// Result of applying the rule to a whole grid
#[derive(Debug, Clone)]
pub struct Transition {
    pub grid: Grid,
    /// Repair chance applied to every defective cell during this step
    pub repair_probability: f64,
    pub tally: TransitionTally,
}

/// Defective fraction of the grid (0 for an empty grid)
pub fn repair_probability(grid: &Grid) -> f64 {
    grid.stats().fraction(CellState::Defective)
}

/// Next state of a single cell given its draw `r` in [0, 1).
///
/// Bands are cumulative over the one draw and tested in order.
pub fn next_state(
    rules: &TransitionRules,
    current: CellState,
    has_defective_neighbor: bool,
    repair_probability: f64,
    r: f64,
) -> CellState {
    match current {
        CellState::New => {
            if r < rules.lemon {
                CellState::Defective
            } else if r < rules.install {
                CellState::Normal
            } else {
                CellState::New
            }
        }
        CellState::Normal => {
            if r < rules.prevention {
                CellState::New
            } else if r < rules.wear {
                CellState::Aged
            } else if r < rules.contagion && has_defective_neighbor {
                CellState::Defective
            } else {
                CellState::Normal
            }
        }
        CellState::Defective => {
            if r < repair_probability {
                CellState::New
            } else {
                CellState::Defective
            }
        }
        CellState::Aged => {
            if r < rules.decay {
                CellState::Defective
            } else {
                CellState::Aged
            }
        }
    }
}

/// Apply the rule to every cell, taking draws from `rng` in row-major order
pub fn advance<R: Rng>(grid: &Grid, rules: &TransitionRules, rng: &mut R) -> Transition {
    advance_with(grid, rules, |_| rng.gen::<f64>())
}

/// Apply the rule with caller-supplied draws, one call per cell in row-major order
pub fn advance_with<F>(grid: &Grid, rules: &TransitionRules, mut draw: F) -> Transition
where
    F: FnMut(Position) -> f64,
{
    let repair_probability = repair_probability(grid);
    let mut tally = TransitionTally::new();

    let cells: Vec<CellState> = grid
        .iter()
        .map(|(pos, current)| {
            let r = draw(pos);
            let next = next_state(
                rules,
                current,
                grid.has_defective_neighbor(pos),
                repair_probability,
                r,
            );
            tally.record(current, next);
            next
        })
        .collect();

    Transition {
        grid: Grid::from_cells(grid.size(), cells),
        repair_probability,
        tally,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use CellState::*;

    fn rules() -> TransitionRules {
        TransitionRules::default()
    }

    #[test]
    fn test_new_cell_bands() {
        let rules = rules();
        assert_eq!(next_state(&rules, New, false, 0.0, 0.0), Defective);
        assert_eq!(next_state(&rules, New, false, 0.0, 0.049), Defective);
        assert_eq!(next_state(&rules, New, false, 0.0, 0.05), Normal);
        assert_eq!(next_state(&rules, New, false, 0.0, 0.449), Normal);
        assert_eq!(next_state(&rules, New, false, 0.0, 0.45), New);
        assert_eq!(next_state(&rules, New, true, 0.0, 0.99), New);
    }

    #[test]
    fn test_normal_cell_bands() {
        let rules = rules();
        assert_eq!(next_state(&rules, Normal, true, 0.0, 0.10), New);
        assert_eq!(next_state(&rules, Normal, true, 0.0, 0.15), Aged);
        assert_eq!(next_state(&rules, Normal, true, 0.0, 0.19), Aged);
        assert_eq!(next_state(&rules, Normal, true, 0.0, 0.20), Defective);
        assert_eq!(next_state(&rules, Normal, true, 0.0, 0.39), Defective);
        assert_eq!(next_state(&rules, Normal, true, 0.0, 0.40), Normal);
        assert_eq!(next_state(&rules, Normal, false, 0.0, 0.75), Normal);
    }

    #[test]
    fn test_contagion_requires_defective_neighbor() {
        let rules = rules();
        for i in 0..200 {
            let r = 0.20 + 0.2 * (i as f64 / 200.0);
            assert_eq!(next_state(&rules, Normal, false, 1.0, r), Normal);
        }
    }

    #[test]
    fn test_defective_repair() {
        let rules = rules();
        assert_eq!(next_state(&rules, Defective, false, 0.3, 0.29), New);
        assert_eq!(next_state(&rules, Defective, false, 0.3, 0.30), Defective);
        assert_eq!(next_state(&rules, Defective, true, 0.0, 0.0), Defective);
    }

    #[test]
    fn test_aged_decay() {
        let rules = rules();
        assert_eq!(next_state(&rules, Aged, false, 0.0, 0.09), Defective);
        assert_eq!(next_state(&rules, Aged, false, 0.0, 0.10), Aged);
    }

    #[test]
    fn test_repair_probability_fraction() {
        let grid = Grid::from_rows(vec![vec![Defective, New], vec![Normal, Aged]]).unwrap();
        assert_eq!(repair_probability(&grid), 0.25);
        assert_eq!(repair_probability(&Grid::new(0)), 0.0);
    }

    #[test]
    fn test_all_defective_fully_repaired() {
        let grid = Grid::filled(3, Defective);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let transition = advance(&grid, &rules(), &mut rng);

        assert_eq!(transition.repair_probability, 1.0);
        assert!(transition.grid.iter().all(|(_, state)| state == New));
        assert_eq!(transition.tally.get(Defective, New), 9);
    }

    #[test]
    fn test_single_cell_install() {
        let grid = Grid::new(1);
        // 0.5 is past the install band, so the cell stays New
        let transition = advance_with(&grid, &rules(), |_| 0.5);
        assert_eq!(transition.grid.get(Position::new(0, 0)), New);

        let transition = advance_with(&grid, &rules(), |_| 0.3);
        assert_eq!(transition.grid.get(Position::new(0, 0)), Normal);
        assert_eq!(transition.tally.get(New, Normal), 1);
    }

    #[test]
    fn test_uses_pre_step_grid_only() {
        // Row-major order visits (0, 0) first; it turns Defective this step,
        // but its Normal neighbor must still see the pre-step New value.
        let grid = Grid::from_rows(vec![vec![New, Normal], vec![Normal, Normal]]).unwrap();
        let transition = advance_with(&grid, &rules(), |pos| {
            if pos == Position::new(0, 0) {
                0.0
            } else {
                0.30
            }
        });

        assert_eq!(transition.repair_probability, 0.0);
        assert_eq!(transition.grid.get(Position::new(0, 0)), Defective);
        assert_eq!(transition.grid.get(Position::new(0, 1)), Normal);
        assert_eq!(transition.grid.get(Position::new(1, 0)), Normal);
        assert_eq!(transition.grid.get(Position::new(1, 1)), Normal);
    }

    #[test]
    fn test_repair_probability_read_before_update() {
        // One of four cells defective: p = 0.25 even though the aged cell
        // decays to defective in the same step.
        let grid = Grid::from_rows(vec![vec![Defective, Aged], vec![New, New]]).unwrap();
        let transition = advance_with(&grid, &rules(), |pos| match pos {
            Position { row: 0, col: 0 } => 0.26,
            Position { row: 0, col: 1 } => 0.0,
            _ => 0.9,
        });

        assert_eq!(transition.repair_probability, 0.25);
        assert_eq!(transition.grid.get(Position::new(0, 0)), Defective);
        assert_eq!(transition.grid.get(Position::new(0, 1)), Defective);
    }

    #[test]
    fn test_advance_is_deterministic() {
        let grid = Grid::from_rows(vec![
            vec![New, Normal, Aged],
            vec![Defective, Normal, Normal],
            vec![Aged, New, Defective],
        ])
        .unwrap();

        let a = advance(&grid, &rules(), &mut ChaCha8Rng::seed_from_u64(99));
        let b = advance(&grid, &rules(), &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.tally, b.tally);
    }

    fn arb_grid() -> impl Strategy<Value = Grid> {
        (1usize..8).prop_flat_map(|size| {
            proptest::collection::vec(0u8..4, size * size).prop_map(move |raw| {
                let cells = raw
                    .into_iter()
                    .filter_map(CellState::from_index)
                    .collect();
                Grid::from_states(size, cells).unwrap()
            })
        })
    }

    proptest! {
        #[test]
        fn prop_counts_cover_grid(grid in arb_grid(), seed in any::<u64>()) {
            let transition = advance(&grid, &rules(), &mut ChaCha8Rng::seed_from_u64(seed));
            let stats = transition.grid.stats();

            prop_assert_eq!(transition.grid.size(), grid.size());
            prop_assert_eq!(stats.total(), grid.size() * grid.size());
            prop_assert_eq!(transition.tally.total() as usize, grid.total_cells());

            let percent: f64 = CellState::ALL.iter().map(|&s| stats.percentage(s)).sum();
            prop_assert!((percent - 100.0).abs() < 1e-9);
        }

        #[test]
        fn prop_isolated_normal_never_infected(r in 0.20f64..0.40) {
            let grid = Grid::from_rows(vec![
                vec![New, New, New],
                vec![New, Normal, New],
                vec![New, New, New],
            ]).unwrap();
            let transition = advance_with(&grid, &rules(), |_| r);
            prop_assert_eq!(transition.grid.get(Position::new(1, 1)), Normal);
        }

        #[test]
        fn prop_repair_probability_matches_pre_step(grid in arb_grid(), seed in any::<u64>()) {
            let expected = grid.stats().defective as f64 / grid.total_cells() as f64;
            let transition = advance(&grid, &rules(), &mut ChaCha8Rng::seed_from_u64(seed));
            prop_assert_eq!(transition.repair_probability, expected);
        }
    }
}

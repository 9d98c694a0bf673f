//! Simulation engine for a single run.

use crate::grid::Grid;
use crate::rules;
use chrono::{DateTime, Utc};
use memsim_core::{
    parse_max_iterations, validate_grid_size, CellState, CellStats, Result, RunId, SimConfig,
    TransitionRules, TransitionTally,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Owns the grid, the run counters and the random source.
///
/// Grids handed out by [`Simulation::snapshot`] are never mutated; every
/// step replaces the current grid with a new one.
pub struct Simulation<R = ChaCha8Rng> {
    run_id: RunId,
    config: SimConfig,
    grid: Arc<Grid>,
    stats: CellStats,
    rng: R,
    iteration: u64,
    last_repair_probability: f64,
    // Cumulative over the run, cleared on reset
    transitions: TransitionTally,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Simulation<ChaCha8Rng> {
    /// Create an engine seeded from `config.seed`
    pub fn new(config: SimConfig) -> Result<Self> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }

    /// Replace the random source with a freshly seeded one
    pub fn reseed(&mut self, seed: u64) {
        self.config.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}

impl<R: Rng> Simulation<R> {
    /// Create an engine drawing from the given random source
    pub fn with_rng(config: SimConfig, rng: R) -> Result<Self> {
        config.validate()?;

        let grid = Grid::new(config.grid_size);
        let run_id = RunId::new();
        info!(
            run_id = %run_id,
            grid_size = config.grid_size,
            max_iterations = config.max_iterations,
            seed = config.seed,
            "Simulation created"
        );

        Ok(Self {
            run_id,
            stats: grid.stats(),
            grid: Arc::new(grid),
            config,
            rng,
            iteration: 0,
            last_repair_probability: 0.0,
            transitions: TransitionTally::new(),
            started_at: Utc::now(),
            finished_at: None,
        })
    }

    /// Start a new run on a `size`×`size` grid of new cells.
    ///
    /// An out-of-range size is rejected and the current run is left as is.
    pub fn reset(&mut self, size: usize) -> Result<()> {
        validate_grid_size(size)?;
        self.reset_with(Grid::new(size))
    }

    /// Start a new run from an arbitrary starting grid
    pub fn reset_with(&mut self, grid: Grid) -> Result<()> {
        validate_grid_size(grid.size())?;

        self.config.grid_size = grid.size();
        self.run_id = RunId::new();
        self.stats = grid.stats();
        self.grid = Arc::new(grid);
        self.iteration = 0;
        self.last_repair_probability = 0.0;
        self.transitions = TransitionTally::new();
        self.started_at = Utc::now();
        self.finished_at = None;

        info!(
            run_id = %self.run_id,
            grid_size = self.config.grid_size,
            defective = self.stats.defective,
            "Simulation reset"
        );
        Ok(())
    }

    /// Set the run length
    pub fn configure(&mut self, max_iterations: u64) {
        self.config.max_iterations = max_iterations;
        if !self.is_complete() {
            self.finished_at = None;
        }
        info!(
            run_id = %self.run_id,
            max_iterations,
            "Run length configured"
        );
    }

    /// Set the run length from raw user input, defaulting to 10 iterations
    pub fn configure_from_input(&mut self, input: Option<&str>) {
        self.configure(parse_max_iterations(input));
    }

    /// Advance one iteration, or report completion once the run length is reached
    pub fn step(&mut self) -> StepOutcome {
        if self.is_complete() {
            debug!(
                run_id = %self.run_id,
                iteration = self.iteration,
                "Run already complete, step ignored"
            );
            return StepOutcome::Completed {
                iteration: self.iteration,
            };
        }

        let transition = rules::advance(&self.grid, &self.config.rules, &mut self.rng);

        self.grid = Arc::new(transition.grid);
        self.stats = self.grid.stats();
        self.iteration += 1;
        self.last_repair_probability = transition.repair_probability;
        self.transitions.merge(&transition.tally);

        debug!(
            run_id = %self.run_id,
            iteration = self.iteration,
            repair_probability = transition.repair_probability,
            new = self.stats.new,
            normal = self.stats.normal,
            defective = self.stats.defective,
            aged = self.stats.aged,
            changed = transition.tally.changed(),
            "Step complete"
        );

        if self.is_complete() {
            self.finished_at = Some(Utc::now());
            info!(
                run_id = %self.run_id,
                iterations = self.iteration,
                defective_pct = format!("{:.2}%", self.stats.percentage(CellState::Defective)),
                "Run complete"
            );
        }

        StepOutcome::Advanced(StepReport {
            run_id: self.run_id,
            iteration: self.iteration,
            max_iterations: self.config.max_iterations,
            repair_probability: transition.repair_probability,
            stats: self.stats,
            transitions: transition.tally,
            grid: Arc::clone(&self.grid),
        })
    }

    /// Step until the run length is reached
    #[instrument(skip(self), fields(run_id = %self.run_id, max_iterations = self.config.max_iterations))]
    pub fn run(&mut self) -> RunSummary {
        while let StepOutcome::Advanced(_) = self.step() {}
        self.summary()
    }

    /// Read-only view of the current grid
    pub fn snapshot(&self) -> Arc<Grid> {
        Arc::clone(&self.grid)
    }

    /// Per-state counts of the current grid
    pub fn stats(&self) -> CellStats {
        self.stats
    }

    /// `{state name: (count, percentage)}` for the current grid
    pub fn stats_by_name(&self) -> BTreeMap<&'static str, (usize, f64)> {
        self.stats.by_name()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            seed: self.config.seed,
            grid_size: self.config.grid_size,
            iterations: self.iteration,
            max_iterations: self.config.max_iterations,
            final_stats: self.stats,
            transitions: self.transitions.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn max_iterations(&self) -> u64 {
        self.config.max_iterations
    }

    pub fn is_complete(&self) -> bool {
        self.iteration >= self.config.max_iterations
    }

    pub fn grid_size(&self) -> usize {
        self.config.grid_size
    }

    pub fn rules(&self) -> &TransitionRules {
        &self.config.rules
    }

    /// Repair probability used by the most recent step
    pub fn last_repair_probability(&self) -> f64 {
        self.last_repair_probability
    }

    /// Transitions accumulated since the last reset
    pub fn transitions(&self) -> &TransitionTally {
        &self.transitions
    }
}

/// Result of a [`Simulation::step`] call
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Advanced(StepReport),
    /// The run had already reached its length; nothing changed
    Completed { iteration: u64 },
}

impl StepOutcome {
    pub fn report(&self) -> Option<&StepReport> {
        match self {
            StepOutcome::Advanced(report) => Some(report),
            StepOutcome::Completed { .. } => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed { .. })
    }
}

/// Everything a driver needs to render one step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub run_id: RunId,
    /// 1-based index of the step just taken
    pub iteration: u64,
    pub max_iterations: u64,
    pub repair_probability: f64,
    pub stats: CellStats,
    pub transitions: TransitionTally,
    pub grid: Arc<Grid>,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Iteration {}/{}:", self.iteration, self.max_iterations)?;
        for share in self.stats.shares() {
            writeln!(
                f,
                "{}: {} ({:.2}%)",
                share.state, share.count, share.percentage
            )?;
        }
        Ok(())
    }
}

/// Summary of a run from its last reset
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub seed: u64,
    pub grid_size: usize,
    pub iterations: u64,
    pub max_iterations: u64,
    pub final_stats: CellStats,
    pub transitions: TransitionTally,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Run {} finished {}/{} iterations on a {}x{} grid (seed {})",
            self.run_id, self.iterations, self.max_iterations, self.grid_size, self.grid_size, self.seed
        )?;
        for share in self.final_stats.shares() {
            writeln!(
                f,
                "  {}: {} ({:.2}%)",
                share.state, share.count, share.percentage
            )?;
        }
        write!(f, "  Cells changed over the run: {}", self.transitions.changed())
    }
}

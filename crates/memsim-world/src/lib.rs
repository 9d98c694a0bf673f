//! Memory-cell wear simulation engine.
//!
//! This module implements the square grid of cells, the stochastic
//! transition rule, and the run lifecycle a driver steps through.

pub mod grid;
pub mod rules;
pub mod simulation;

pub use grid::Grid;
pub use rules::{advance, advance_with, next_state, repair_probability, Transition};
pub use simulation::{RunSummary, Simulation, StepOutcome, StepReport};

//! Configuration types for the simulation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;
use std::path::Path;
use tracing::warn;

/// Grid side length of the reference configuration
pub const DEFAULT_GRID_SIZE: usize = 21;

/// Largest accepted grid side length
pub const MAX_GRID_SIZE: usize = 4096;

/// Check a grid side length: at least 1 and at most [`MAX_GRID_SIZE`]
pub fn validate_grid_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(Error::Validation("grid_size must be at least 1".to_string()));
    }
    if size > MAX_GRID_SIZE {
        return Err(Error::Validation(format!(
            "grid_size must be at most {}, got {}",
            MAX_GRID_SIZE, size
        )));
    }
    Ok(())
}

/// Run length used when the requested iteration count is missing or unparseable
pub const DEFAULT_MAX_ITERATIONS: u64 = 10;

/// Interpret a user-supplied iteration count.
///
/// Missing or non-integer input falls back to [`DEFAULT_MAX_ITERATIONS`].
/// Negative counts are accepted as zero, so the run completes immediately;
/// integers too large to represent saturate at `u64::MAX`.
pub fn parse_max_iterations(input: Option<&str>) -> u64 {
    let Some(raw) = input else {
        return DEFAULT_MAX_ITERATIONS;
    };

    match raw.trim().parse::<i64>() {
        Ok(n) => n.max(0) as u64,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => {
            raw.trim().parse::<u64>().unwrap_or(u64::MAX)
        }
        Err(e) if *e.kind() == IntErrorKind::NegOverflow => 0,
        Err(e) => {
            warn!(
                input = raw,
                default = DEFAULT_MAX_ITERATIONS,
                "Invalid iteration count ({}), using default",
                e
            );
            DEFAULT_MAX_ITERATIONS
        }
    }
}

/// Cumulative probability thresholds of the transition rule.
///
/// Each value is the exclusive upper bound of a band over a single uniform
/// draw; bands for the same state are tested in order, lower bound inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionRules {
    /// New -> Defective below this draw ("lemon")
    pub lemon: f64,
    /// New -> Normal below this draw ("install")
    pub install: f64,
    /// Normal -> New below this draw ("prevention")
    pub prevention: f64,
    /// Normal -> Aged below this draw ("wear and tear")
    pub wear: f64,
    /// Normal -> Defective below this draw, only with a defective neighbor
    pub contagion: f64,
    /// Aged -> Defective below this draw ("decay")
    pub decay: f64,
}

impl Default for TransitionRules {
    fn default() -> Self {
        Self {
            lemon: 0.05,      // 5%
            install: 0.45,    // 40%
            prevention: 0.15, // 15%
            wear: 0.20,       // 5%
            contagion: 0.40,  // 20% if any neighbor is defective
            decay: 0.10,      // 10%
        }
    }
}

impl TransitionRules {
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("lemon", self.lemon),
            ("install", self.install),
            ("prevention", self.prevention),
            ("wear", self.wear),
            ("contagion", self.contagion),
            ("decay", self.decay),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Validation(format!(
                    "threshold `{}` must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.lemon > self.install {
            return Err(Error::Validation(format!(
                "lemon ({}) must not exceed install ({})",
                self.lemon, self.install
            )));
        }
        if self.prevention > self.wear || self.wear > self.contagion {
            return Err(Error::Validation(format!(
                "normal-state bands must be ordered: prevention ({}) <= wear ({}) <= contagion ({})",
                self.prevention, self.wear, self.contagion
            )));
        }

        Ok(())
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Side length of the square grid
    pub grid_size: usize,
    /// Number of steps in a run
    pub max_iterations: u64,
    /// Seed for the engine's random source
    pub seed: u64,
    /// Transition thresholds
    pub rules: TransitionRules,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: 0,
            rules: TransitionRules::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        validate_grid_size(self.grid_size)?;
        self.rules.validate()
    }
}

/// How the runner prints each step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Headless runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Side length of the square grid
    pub grid_size: usize,
    /// Requested iteration count, as typed by the user
    pub iterations: Option<String>,
    /// Delay between steps (milliseconds)
    pub speed_ms: u64,
    /// Random seed; drawn from the OS when absent
    pub seed: Option<u64>,
    /// Output format
    pub format: OutputFormat,
    /// Print the grid after every step (text format only)
    pub show_grid: bool,
    /// Transition threshold overrides
    pub rules: TransitionRules,
}

/// Bounds of the step delay, in milliseconds
pub const MIN_SPEED_MS: u64 = 10;
pub const MAX_SPEED_MS: u64 = 500;

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            iterations: Some(DEFAULT_MAX_ITERATIONS.to_string()),
            speed_ms: 100,
            seed: None,
            format: OutputFormat::Text,
            show_grid: false,
            rules: TransitionRules::default(),
        }
    }
}

impl RunnerConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Step delay clamped to the supported range
    pub fn step_delay_ms(&self) -> u64 {
        self.speed_ms.clamp(MIN_SPEED_MS, MAX_SPEED_MS)
    }

    pub fn max_iterations(&self) -> u64 {
        parse_max_iterations(self.iterations.as_deref())
    }

    /// Engine configuration for a run with the given seed
    pub fn sim_config(&self, seed: u64) -> SimConfig {
        SimConfig {
            grid_size: self.grid_size,
            max_iterations: self.max_iterations(),
            seed,
            rules: self.rules,
        }
    }
}

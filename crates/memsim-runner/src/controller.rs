//! Run / pause / reset bookkeeping around the engine.
//!
//! The engine itself has no notion of pausing; a paused controller simply
//! does not call `step()`.

use memsim_world::{Simulation, StepOutcome};
use rand::Rng;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// Commands accepted on stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Option<String>),
    Pause,
    Resume,
    TogglePause,
    Reset(Option<usize>),
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next();

        match verb.as_str() {
            "run" | "start" => Ok(Command::Run(arg.map(str::to_string))),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "p" => Ok(Command::TogglePause),
            "reset" => match arg {
                None => Ok(Command::Reset(None)),
                Some(raw) => raw
                    .parse()
                    .map(|size| Command::Reset(Some(size)))
                    .map_err(|_| format!("invalid grid size: {}", raw)),
            },
            "quit" | "q" | "exit" => Ok(Command::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

pub struct Controller<R> {
    sim: Simulation<R>,
    state: RunState,
}

impl<R: Rng> Controller<R> {
    pub fn new(sim: Simulation<R>) -> Self {
        Self {
            sim,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn simulation(&self) -> &Simulation<R> {
        &self.sim
    }

    /// Begin stepping, reading the run length at start.
    ///
    /// Ignored while a run is in progress (paused counts as in progress).
    pub fn start(&mut self, iterations: Option<&str>) -> bool {
        if self.state != RunState::Idle {
            warn!(state = ?self.state, "Run already in progress");
            return false;
        }
        self.sim.configure_from_input(iterations);
        self.state = RunState::Running;
        info!(
            run_id = %self.sim.run_id(),
            from_iteration = self.sim.iteration(),
            max_iterations = self.sim.max_iterations(),
            "Run started"
        );
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        self.state = RunState::Paused;
        info!(iteration = self.sim.iteration(), "Paused");
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != RunState::Paused {
            return false;
        }
        self.state = RunState::Running;
        info!(iteration = self.sim.iteration(), "Resumed");
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.state {
            RunState::Running => self.pause(),
            RunState::Paused => self.resume(),
            RunState::Idle => false,
        }
    }

    pub fn stop(&mut self) {
        self.state = RunState::Idle;
    }

    /// Reset the grid; refused while a run is in progress
    pub fn reset(&mut self, size: Option<usize>) -> bool {
        if self.state != RunState::Idle {
            warn!(state = ?self.state, "Reset refused while a run is in progress");
            return false;
        }
        let size = size.unwrap_or_else(|| self.sim.grid_size());
        match self.sim.reset(size) {
            Ok(()) => true,
            Err(e) => {
                warn!(size, "Reset refused: {}", e);
                false
            }
        }
    }

    /// Take one step if running; stops once the run length is reached
    pub fn tick(&mut self) -> Option<StepOutcome> {
        if self.state != RunState::Running {
            return None;
        }

        let outcome = self.sim.step();
        if self.sim.is_complete() {
            self.stop();
        }
        Some(outcome)
    }
}

//! Headless driver for the memory-cell wear simulation.

mod controller;
mod render;
mod settings;
mod telemetry;

use anyhow::Result;
use clap::Parser;
use controller::{Command, Controller, RunState};
use memsim_core::{OutputFormat, RunnerConfig};
use memsim_world::{Simulation, StepOutcome};
use rand_chacha::ChaCha8Rng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = settings::Args::parse();

    telemetry::init_telemetry(args.log_json)?;

    let config = settings::load(&args)?;
    let seed = config.seed.unwrap_or_else(rand::random);
    let sim = Simulation::new(config.sim_config(seed))?;

    info!(
        grid_size = config.grid_size,
        speed_ms = config.step_delay_ms(),
        seed,
        "Starting memsim runner"
    );
    if config.format == OutputFormat::Text {
        println!("{}", render::legend());
    }

    let mut controller = Controller::new(sim);
    controller.start(config.iterations.as_deref());

    drive(&mut controller, &config, args.interactive).await?;

    let summary = controller.simulation().summary();
    println!("{}", render::summary(&summary, config.format)?);

    Ok(())
}

/// Step on a timer until the run completes, a quit command arrives, or a
/// shutdown signal is received.
async fn drive(
    controller: &mut Controller<ChaCha8Rng>,
    config: &RunnerConfig,
    interactive: bool,
) -> Result<()> {
    let mut ticker = interval(Duration::from_millis(config.step_delay_ms()));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // A pending stdin read blocks runtime shutdown, so only read commands
    // when asked to
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = interactive;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(outcome) = controller.tick() {
                    emit(&outcome, config)?;
                }
                if controller.state() == RunState::Idle && !interactive {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_command(controller, &line) {
                            break;
                        }
                    }
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("Failed to read command: {}", e);
                        stdin_open = false;
                    }
                }
            }
            _ = &mut shutdown => {
                controller.stop();
                break;
            }
        }
    }

    Ok(())
}

fn emit(outcome: &StepOutcome, config: &RunnerConfig) -> Result<()> {
    match outcome {
        StepOutcome::Advanced(report) => {
            println!("{}", render::step(report, config.format, config.show_grid)?);
        }
        StepOutcome::Completed { iteration } => {
            info!(iteration, "Run already complete");
        }
    }
    Ok(())
}

/// Apply a stdin command; returns `false` when the driver should exit
fn handle_command(controller: &mut Controller<ChaCha8Rng>, line: &str) -> bool {
    if line.trim().is_empty() {
        return true;
    }

    match line.parse::<Command>() {
        Ok(Command::Run(iterations)) => {
            controller.start(iterations.as_deref());
        }
        Ok(Command::Pause) => {
            controller.pause();
        }
        Ok(Command::Resume) => {
            controller.resume();
        }
        Ok(Command::TogglePause) => {
            controller.toggle_pause();
        }
        Ok(Command::Reset(size)) => {
            if controller.reset(size) {
                let grid = controller.simulation().snapshot();
                println!("{}", render::grid_map(&grid));
            }
        }
        Ok(Command::Quit) => return false,
        Err(e) => warn!("{}", e),
    }
    true
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

//! Runner configuration: defaults, JSON file, environment, then flags.

use anyhow::{Context, Result};
use clap::Parser;
use memsim_core::{OutputFormat, RunnerConfig};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Headless memory-cell wear simulator
#[derive(Parser, Debug, Default)]
#[command(name = "memsim-runner")]
#[command(about = "Run the stochastic memory-cell wear simulation in a terminal")]
pub struct Args {
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Side length of the square grid
    #[arg(long)]
    pub grid_size: Option<usize>,

    /// Number of iterations (non-integer input falls back to 10)
    #[arg(long, short = 'n')]
    pub iterations: Option<String>,

    /// Delay between steps in milliseconds (10..=500)
    #[arg(long)]
    pub speed_ms: Option<u64>,

    /// Random seed for deterministic runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output as JSON lines instead of the statistics panel
    #[arg(long)]
    pub json: bool,

    /// Print the grid after every step
    #[arg(long)]
    pub show_grid: bool,

    /// Read run/pause/resume/reset/quit commands from stdin and keep
    /// going after the run completes
    #[arg(long, short = 'i')]
    pub interactive: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

/// Resolve the effective configuration
pub fn load(args: &Args) -> Result<RunnerConfig> {
    let mut config = match &args.config {
        Some(path) => from_file(path)?,
        None => RunnerConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    apply_args(&mut config, args);
    Ok(config)
}

pub fn from_file(path: &Path) -> Result<RunnerConfig> {
    RunnerConfig::from_file(path)
        .with_context(|| format!("failed to load config file {}", path.display()))
}

/// Apply `MEMSIM_*` overrides.
///
/// The iteration count is kept verbatim so the default-on-failure rule
/// applies to it like any other input.
pub fn apply_env<F>(config: &mut RunnerConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(size) = parse_var(&lookup, "MEMSIM_GRID_SIZE")? {
        config.grid_size = size;
    }
    if let Some(iterations) = lookup("MEMSIM_ITERATIONS") {
        config.iterations = Some(iterations);
    }
    if let Some(speed) = parse_var(&lookup, "MEMSIM_SPEED_MS")? {
        config.speed_ms = speed;
    }
    if let Some(seed) = parse_var(&lookup, "MEMSIM_SEED")? {
        config.seed = Some(seed);
    }
    Ok(())
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))
        })
        .transpose()
}

pub fn apply_args(config: &mut RunnerConfig, args: &Args) {
    if let Some(size) = args.grid_size {
        config.grid_size = size;
    }
    if let Some(iterations) = &args.iterations {
        config.iterations = Some(iterations.clone());
    }
    if let Some(speed) = args.speed_ms {
        config.speed_ms = speed;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if args.json {
        config.format = OutputFormat::Json;
    }
    if args.show_grid {
        config.show_grid = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RunnerConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("MEMSIM_GRID_SIZE", "9"),
                ("MEMSIM_ITERATIONS", "forty"),
                ("MEMSIM_SEED", "123"),
            ]),
        )
        .unwrap();

        assert_eq!(config.grid_size, 9);
        assert_eq!(config.seed, Some(123));
        assert_eq!(config.speed_ms, 100);
        // Unparseable counts are not an error, they fall back to the default
        assert_eq!(config.max_iterations(), 10);
    }

    #[test]
    fn test_env_rejects_bad_numbers() {
        let mut config = RunnerConfig::default();
        let result = apply_env(&mut config, env(&[("MEMSIM_SPEED_MS", "fast")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_args_take_precedence() {
        let mut config = RunnerConfig::default();
        apply_env(&mut config, env(&[("MEMSIM_GRID_SIZE", "9")])).unwrap();

        let args = Args::parse_from([
            "memsim-runner",
            "--grid-size",
            "5",
            "-n",
            "30",
            "--json",
        ]);
        apply_args(&mut config, &args);

        assert_eq!(config.grid_size, 5);
        assert_eq!(config.max_iterations(), 30);
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("memsim-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"grid_size": 4, "speed_ms": 250, "rules": {"decay": 0.2}}"#)
            .unwrap();

        let config = from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.grid_size, 4);
        assert_eq!(config.speed_ms, 250);
        assert_eq!(config.rules.decay, 0.2);
        assert_eq!(config.rules.lemon, 0.05);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(from_file(Path::new("/nonexistent/memsim.json")).is_err());
    }
}

//! Terminal output for step reports and run summaries.

use anyhow::Result;
use memsim_core::{CellState, OutputFormat};
use memsim_world::{Grid, RunSummary, StepReport};
use std::fmt::Write as _;

pub fn glyph(state: CellState) -> char {
    match state {
        CellState::Defective => '#',
        CellState::New => 'N',
        CellState::Normal => 'o',
        CellState::Aged => '.',
    }
}

/// One line of glyphs per grid row
pub fn grid_map(grid: &Grid) -> String {
    let mut out = String::with_capacity(grid.total_cells() + grid.size());
    for row in grid.rows() {
        out.extend(row.iter().copied().map(glyph));
        out.push('\n');
    }
    out
}

pub fn legend() -> String {
    let mut out = String::from("Legend:");
    for state in CellState::REPORT_ORDER {
        // Writing to a String cannot fail
        let _ = write!(out, " {}={}", glyph(state), state);
    }
    out
}

pub fn step(report: &StepReport, format: OutputFormat, show_grid: bool) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(report)?),
        OutputFormat::Text if show_grid => Ok(format!("{}{}", grid_map(&report.grid), report)),
        OutputFormat::Text => Ok(report.to_string()),
    }
}

pub fn summary(summary: &RunSummary, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(summary)?),
        OutputFormat::Text => Ok(summary.to_string()),
    }
}

mod cli;
mod json;

pub use cli::{print_advisory_detail, print_advisory_table, print_stats_table};
pub use json::print_json;

use crate::index::IndexStats;
use crate::model::Advisory;
use anyhow::Result;

/// Output format for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

pub fn print_advisories(advisories: &[Advisory], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_advisory_table(advisories),
        OutputFormat::Json => print_json(advisories),
    }
}

pub fn print_advisory(advisory: &Advisory, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_advisory_detail(advisory),
        OutputFormat::Json => print_json(advisory),
    }
}

pub fn print_stats(stats: &IndexStats, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_stats_table(stats),
        OutputFormat::Json => print_json(stats),
    }
}

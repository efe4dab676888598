pub mod analyze;
pub mod config;
pub mod tables;

use crate::error::CliError;
use std::path::Path;
use tanshin_core::config::{builtin, load_config};
use tanshin_core::AnalyzerConfig;

/// A custom config file when given, otherwise the built-in one.
fn resolve_config(path: Option<&Path>) -> Result<AnalyzerConfig, CliError> {
    let config = match path {
        Some(p) => load_config(p)?,
        None => builtin::default_config()?,
    };
    tracing::debug!(name = %config.name, metrics = config.metrics.len(), "config loaded");
    Ok(config)
}

fn check_format(format: &str) -> Result<(), CliError> {
    match format {
        "table" | "json" => Ok(()),
        other => Err(CliError::OutputFormat(other.to_string())),
    }
}

pub mod builtin;
pub mod schema;

use crate::error::TanshinError;
use schema::AnalyzerConfig;
use std::collections::HashSet;
use std::path::Path;

/// Smallest table a config may ask for; a grid never has fewer rows.
pub const MIN_TABLE_ROWS: usize = 3;

/// Load an analyzer config from a JSON file.
pub fn load_config(path: &Path) -> Result<AnalyzerConfig, TanshinError> {
    let content = std::fs::read_to_string(path).map_err(|e| TanshinError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_config(&content, path)
}

/// Parse an analyzer config from a JSON string.
pub fn parse_config(json: &str, source: &Path) -> Result<AnalyzerConfig, TanshinError> {
    let config: AnalyzerConfig =
        serde_json::from_str(json).map_err(|e| TanshinError::ConfigLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse an analyzer config from a JSON string (no file path context).
pub fn parse_config_str(json: &str) -> Result<AnalyzerConfig, TanshinError> {
    let config: AnalyzerConfig = serde_json::from_str(json).map_err(TanshinError::Json)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate that a config is well-formed.
pub fn validate_config(config: &AnalyzerConfig) -> Result<(), TanshinError> {
    if !(config.fuzzy_threshold > 0.0 && config.fuzzy_threshold <= 1.0) {
        return Err(TanshinError::ConfigInvalid(format!(
            "fuzzy_threshold must be in (0, 1], got {}",
            config.fuzzy_threshold
        )));
    }

    if config.metrics.is_empty() {
        return Err(TanshinError::ConfigInvalid("metrics must not be empty".into()));
    }

    if config.units.is_empty() {
        return Err(TanshinError::ConfigInvalid("units must not be empty".into()));
    }

    let mut seen = HashSet::new();
    for def in &config.metrics {
        if !seen.insert(def.metric) {
            return Err(TanshinError::ConfigInvalid(format!(
                "metric '{}' is defined more than once",
                def.metric
            )));
        }
        if def.label.trim().is_empty() {
            return Err(TanshinError::ConfigInvalid(format!(
                "metric '{}' has an empty label",
                def.metric
            )));
        }
        if def.aliases.iter().any(|a| a.trim().is_empty()) {
            return Err(TanshinError::ConfigInvalid(format!(
                "metric '{}' has an empty alias",
                def.metric
            )));
        }
    }

    for unit in &config.units {
        if unit.token.trim().is_empty() {
            return Err(TanshinError::ConfigInvalid("unit token must not be empty".into()));
        }
        if unit.scale <= rust_decimal::Decimal::ZERO {
            return Err(TanshinError::ConfigInvalid(format!(
                "unit '{}' has non-positive scale {}",
                unit.token, unit.scale
            )));
        }
    }

    let table = &config.table;
    if table.min_rows < MIN_TABLE_ROWS {
        return Err(TanshinError::ConfigInvalid(format!(
            "table.min_rows must be at least {MIN_TABLE_ROWS}, got {}",
            table.min_rows
        )));
    }
    for (name, value) in [
        ("row_tolerance", table.row_tolerance),
        ("min_gap", table.min_gap),
        ("max_row_gap", table.max_row_gap),
    ] {
        if !(value > 0.0) {
            return Err(TanshinError::ConfigInvalid(format!(
                "table.{name} must be positive, got {value}"
            )));
        }
    }
    if !(table.title_distance >= 0.0) {
        return Err(TanshinError::ConfigInvalid(format!(
            "table.title_distance must not be negative, got {}",
            table.title_distance
        )));
    }
    if table.min_columns < 2 {
        return Err(TanshinError::ConfigInvalid(
            "table.min_columns must be at least 2".into(),
        ));
    }
    if !(table.min_column_support > 0.0 && table.min_column_support <= 1.0) {
        return Err(TanshinError::ConfigInvalid(format!(
            "table.min_column_support must be in (0, 1], got {}",
            table.min_column_support
        )));
    }

    Ok(())
}

use crate::config::schema::AnalyzerConfig;
use crate::config::validate_config;
use crate::error::TanshinError;

const DEFAULT_CONFIG_JSON: &str = include_str!("../../../../config/tanshin-default.json");

/// Raw JSON of the built-in config, for `tanshin config show`.
pub fn default_config_json() -> &'static str {
    DEFAULT_CONFIG_JSON
}

/// The built-in metric and unit vocabulary for tanshin summaries.
pub fn default_config() -> Result<AnalyzerConfig, TanshinError> {
    let config: AnalyzerConfig = serde_json::from_str(DEFAULT_CONFIG_JSON)?;
    validate_config(&config)?;
    Ok(config)
}

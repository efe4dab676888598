use std::path::Path;
use tanshin_core::config::{builtin, load_config};

use crate::error::CliError;

pub fn show() -> Result<(), CliError> {
    println!("{}", builtin::default_config_json());
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), CliError> {
    let config = load_config(file)?;
    println!(
        "{} is valid: '{}' with {} metric(s), {} unit(s)",
        file.display(),
        config.name,
        config.metrics.len(),
        config.units.len()
    );
    Ok(())
}

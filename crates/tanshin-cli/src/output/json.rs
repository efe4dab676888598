use tanshin_core::extraction::table::TableGrid;
use tanshin_core::AnalysisOutcome;

use crate::error::CliError;

pub fn print_outcome(outcome: &AnalysisOutcome, with_trace: bool) -> Result<(), CliError> {
    let json = if with_trace {
        serde_json::to_string_pretty(&serde_json::json!({
            "record": outcome.record,
            "flat": outcome.record.to_flat_map(),
            "trace": outcome.trace,
        }))?
    } else {
        serde_json::to_string_pretty(&outcome.record.to_flat_map())?
    };
    println!("{json}");
    Ok(())
}

pub fn print_tables(tables: &[TableGrid]) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(tables)?;
    println!("{json}");
    Ok(())
}

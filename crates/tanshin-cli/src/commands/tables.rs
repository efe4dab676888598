use std::path::PathBuf;
use tanshin_core::extraction::pdftotext::PdftotextExtractor;
use tanshin_core::extraction::PdfExtractor;
use tanshin_core::DocumentAnalyzer;

use super::{check_format, resolve_config};
use crate::error::CliError;
use crate::{fetch, output};

pub fn run(input: &str, output_format: &str, config_path: Option<PathBuf>) -> Result<(), CliError> {
    check_format(output_format)?;

    let config = resolve_config(config_path.as_deref())?;
    let limit = config.max_pages;
    let analyzer = DocumentAnalyzer::new(config);

    let pdf_bytes = fetch::load_input(input)?;
    let pages = PdftotextExtractor::new().extract_pages(&pdf_bytes)?;

    let tables: Vec<_> = pages
        .iter()
        .take(limit.unwrap_or(pages.len()))
        .flat_map(|page| analyzer.tables(page))
        .collect();

    match output_format {
        "json" => output::json::print_tables(&tables)?,
        _ => output::table::print_tables(&tables),
    }

    Ok(())
}

use std::path::PathBuf;
use std::time::Duration;
use tanshin_core::extraction::pdftotext::PdftotextExtractor;
use tanshin_core::{analyze_pdf, CancelToken};

use super::{check_format, resolve_config};
use crate::error::CliError;
use crate::{fetch, output};

pub fn run(
    input: &str,
    output_format: &str,
    config_path: Option<PathBuf>,
    max_pages: Option<usize>,
    timeout: Option<u64>,
    with_trace: bool,
) -> Result<(), CliError> {
    check_format(output_format)?;

    let mut config = resolve_config(config_path.as_deref())?;
    if max_pages.is_some() {
        config.max_pages = max_pages;
    }

    let (pdf_bytes, cancel) =
        load_with_deadline(|| fetch::load_input(input), timeout.map(Duration::from_secs))?;
    let extractor = PdftotextExtractor::new();
    let outcome = analyze_pdf(&pdf_bytes, &extractor, &config, &cancel)?;

    match output_format {
        "json" => output::json::print_outcome(&outcome, with_trace)?,
        _ => output::table::print_outcome(&outcome),
    }

    Ok(())
}

/// Load the input, then start the deadline: `timeout` bounds decoding and
/// analysis, not the download.
fn load_with_deadline(
    load: impl FnOnce() -> Result<Vec<u8>, CliError>,
    timeout: Option<Duration>,
) -> Result<(Vec<u8>, CancelToken), CliError> {
    let bytes = load()?;
    let cancel = match timeout {
        Some(limit) => CancelToken::with_timeout(limit),
        None => CancelToken::new(),
    };
    Ok((bytes, cancel))
}

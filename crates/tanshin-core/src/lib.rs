pub mod analyzer;
pub mod cancel;
pub mod config;
pub mod error;
pub mod extraction;
pub mod model;
pub mod parsing;
pub mod trace;

pub use analyzer::{AnalysisOutcome, DocumentAnalyzer};
pub use cancel::CancelToken;
pub use config::schema::AnalyzerConfig;
pub use error::TanshinError;
pub use model::{CanonicalMetric, FinancialRecord, ParsedValue, UnitClass};

use extraction::{PageLayout, PdfExtractor};

/// Analyze already-decoded page layouts with one config.
pub fn analyze(
    pages: &[PageLayout],
    config: &AnalyzerConfig,
) -> Result<FinancialRecord, TanshinError> {
    DocumentAnalyzer::new(config.clone())
        .analyze(pages, &CancelToken::new())
        .map(|outcome| outcome.record)
}

/// Main API entry point: decode a tanshin PDF and extract its figures.
///
/// The token is checked between pages and tables; a cancelled run
/// returns [`TanshinError::Cancelled`] and no partial record.
pub fn analyze_pdf(
    pdf_bytes: &[u8],
    extractor: &dyn PdfExtractor,
    config: &AnalyzerConfig,
    cancel: &CancelToken,
) -> Result<AnalysisOutcome, TanshinError> {
    let pages = extractor.extract_pages(pdf_bytes)?;
    tracing::debug!(
        backend = extractor.backend_name(),
        pages = pages.len(),
        "pdf decoded"
    );

    if cancel.is_cancelled() {
        return Err(TanshinError::Cancelled { pages_processed: 0 });
    }

    DocumentAnalyzer::new(config.clone()).analyze(&pages, cancel)
}

pub mod pdftotext;
pub mod table;

use crate::error::TanshinError;
use serde::{Deserialize, Serialize};

/// A positioned text fragment from one page.
///
/// Coordinates are PDF points with `y` growing downward (pdftotext's
/// convention), so `y0` is the top edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    pub page_index: usize,
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub y0: f32,
    pub y1: f32,
}

impl RawCell {
    pub fn new(page_index: usize, text: impl Into<String>, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            page_index,
            text: text.into(),
            x0,
            x1,
            y0,
            y1,
        }
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }
}

/// Layout of a single page: its text fragments in extraction order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLayout {
    /// Zero-based page index.
    pub page_index: usize,
    pub cells: Vec<RawCell>,
}

/// Trait for PDF layout decoding backends.
pub trait PdfExtractor: Send + Sync {
    /// Decode PDF bytes into one PageLayout per page, in document order.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageLayout>, TanshinError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

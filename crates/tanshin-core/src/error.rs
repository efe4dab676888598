use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TanshinError {
    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("cannot parse '{token}' as a number: {reason}")]
    ParseError { token: String, reason: String },

    #[error("no financial summary table found in document")]
    NoFinancialTableFound,

    #[error("analysis cancelled after {pages_processed} page(s)")]
    Cancelled { pages_processed: usize },

    #[error("failed to load config from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TanshinError {
    pub(crate) fn parse(token: &str, reason: impl Into<String>) -> Self {
        TanshinError::ParseError {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

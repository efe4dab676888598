use tanshin_core::TanshinError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] TanshinError),

    #[error("download failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("unknown output format '{0}' (expected table or json)")]
    OutputFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

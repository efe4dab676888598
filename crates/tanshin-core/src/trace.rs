use crate::model::CanonicalMetric;
use crate::parsing::MatchKind;
use serde::{Deserialize, Serialize};

pub const TRACE_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceSeverity {
    Important,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceMatchKind {
    Exact,
    Contains,
    Fuzzy,
}

impl From<MatchKind> for TraceMatchKind {
    fn from(kind: MatchKind) -> Self {
        match kind {
            MatchKind::Exact => TraceMatchKind::Exact,
            MatchKind::Contains => TraceMatchKind::Contains,
            MatchKind::Fuzzy => TraceMatchKind::Fuzzy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    /// First value for the metric; recorded.
    Recorded,
    /// A revision table replaced an earlier value.
    Revised,
    /// A results or forecast summary table replaced a value taken from
    /// another table.
    Superseded,
    /// An earlier table already supplied the metric.
    Ignored,
}

/// One label match and what happened to its value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub metric: CanonicalMetric,
    pub page_index: usize,
    pub table_index: usize,
    pub row_index: usize,
    pub raw_label: String,
    pub raw_value: String,
    pub match_kind: TraceMatchKind,
    pub is_forecast: bool,
    pub outcome: TraceOutcome,
    /// Bounding box of the value cell (x0, y0, x1, y1).
    pub evidence: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceWarning {
    pub page_index: usize,
    pub message: String,
    pub severity: TraceSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceBundle {
    pub trace_schema_version: String,
    pub pages_analyzed: usize,
    pub tables_found: usize,
    pub entries: Vec<TraceEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TraceWarning>,
}

impl Default for TraceBundle {
    fn default() -> Self {
        Self {
            trace_schema_version: TRACE_SCHEMA_VERSION.to_string(),
            pages_analyzed: 0,
            tables_found: 0,
            entries: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl TraceBundle {
    pub(crate) fn warn(&mut self, page_index: usize, severity: TraceSeverity, message: String) {
        match severity {
            TraceSeverity::Important => tracing::warn!(page = page_index, "{message}"),
            TraceSeverity::Info => tracing::debug!(page = page_index, "{message}"),
        }
        self.warnings.push(TraceWarning {
            page_index,
            message,
            severity,
        });
    }
}

use crate::model::{CanonicalMetric, UnitClass};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable configuration for one analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Minimum fuzzy label score (0.0-1.0] accepted by the label matcher.
    pub fuzzy_threshold: f64,
    /// Only the first N pages are analyzed when set.
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default)]
    pub table: TableSettings,
    pub units: Vec<UnitDef>,
    pub metrics: Vec<MetricDef>,
}

/// A unit suffix and the scale it implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    pub token: String,
    pub scale: Decimal,
    pub class: UnitClass,
}

/// Label vocabulary for one canonical metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDef {
    pub metric: CanonicalMetric,
    pub label: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Label fragments that rule this metric out of containment and fuzzy
    /// matches, e.g. "税金等調整前" for net profit.
    #[serde(default)]
    pub exclude: Vec<String>,
    pub unit_class: UnitClass,
}

/// Geometry tolerances for table detection, in PDF points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// Fragments whose vertical intervals are within this distance share a row.
    pub row_tolerance: f32,
    /// Narrowest horizontal whitespace treated as a cell separator.
    pub min_gap: f32,
    /// Fraction of a run's rows that must share a gap for it to become a column boundary.
    pub min_column_support: f32,
    pub min_rows: usize,
    pub min_columns: usize,
    /// Vertical distance between rows that ends a table.
    pub max_row_gap: f32,
    /// How far above a table a title line may sit.
    pub title_distance: f32,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            row_tolerance: 2.0,
            min_gap: 6.0,
            min_column_support: 0.6,
            min_rows: 3,
            min_columns: 2,
            max_row_gap: 24.0,
            title_distance: 40.0,
        }
    }
}

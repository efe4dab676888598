use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Financial line items the analyzer recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalMetric {
    Revenue,
    OperatingProfit,
    OrdinaryProfit,
    NetProfit,
    ComprehensiveIncome,
    Eps,
    DilutedEps,
    OperatingMargin,
    Roe,
    Roa,
    TotalAssets,
    NetAssets,
    EquityRatio,
    Bps,
    DividendPerShare,
    SharesOutstanding,
}

impl CanonicalMetric {
    pub fn key(&self) -> &'static str {
        match self {
            CanonicalMetric::Revenue => "revenue",
            CanonicalMetric::OperatingProfit => "operating_profit",
            CanonicalMetric::OrdinaryProfit => "ordinary_profit",
            CanonicalMetric::NetProfit => "net_profit",
            CanonicalMetric::ComprehensiveIncome => "comprehensive_income",
            CanonicalMetric::Eps => "eps",
            CanonicalMetric::DilutedEps => "diluted_eps",
            CanonicalMetric::OperatingMargin => "operating_margin",
            CanonicalMetric::Roe => "roe",
            CanonicalMetric::Roa => "roa",
            CanonicalMetric::TotalAssets => "total_assets",
            CanonicalMetric::NetAssets => "net_assets",
            CanonicalMetric::EquityRatio => "equity_ratio",
            CanonicalMetric::Bps => "bps",
            CanonicalMetric::DividendPerShare => "dividend_per_share",
            CanonicalMetric::SharesOutstanding => "shares_outstanding",
        }
    }
}

impl fmt::Display for CanonicalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The kind of quantity a metric is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    Currency,
    Percentage,
    PerShareCurrency,
    Count,
}

impl UnitClass {
    /// Unit suffix used when formatting a value at scale 1.
    pub fn canonical_token(&self) -> &'static str {
        match self {
            UnitClass::Currency | UnitClass::PerShareCurrency => "円",
            UnitClass::Percentage => "%",
            UnitClass::Count => "株",
        }
    }
}

impl fmt::Display for UnitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitClass::Currency => write!(f, "円"),
            UnitClass::Percentage => write!(f, "%"),
            UnitClass::PerShareCurrency => write!(f, "円/株"),
            UnitClass::Count => write!(f, "株"),
        }
    }
}

/// A signed number already converted to its unit class at scale 1.
///
/// `scale` keeps the multiplier that was detected in the source
/// (1,000,000 for "百万円").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedValue {
    pub value: Decimal,
    pub unit: UnitClass,
    pub scale: Decimal,
}

impl NormalizedValue {
    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }

    /// Format back into source notation at the canonical scale, using the
    /// triangle marker for negatives ("△1200000000円").
    pub fn to_token(&self) -> String {
        let sign = if self.is_negative() { "△" } else { "" };
        format!(
            "{}{}{}",
            sign,
            self.value.abs().normalize(),
            self.unit.canonical_token()
        )
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value.normalize(), self.unit)
    }
}

/// Result of normalizing one value cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedValue {
    Value(NormalizedValue),
    /// Forecasts are often published as a range ("1,000～1,200").
    Range {
        low: NormalizedValue,
        high: NormalizedValue,
    },
    /// Explicit "no value" marker such as "-" or "―".
    NotApplicable,
}

impl ParsedValue {
    pub fn as_value(&self) -> Option<&NormalizedValue> {
        match self {
            ParsedValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn unit(&self) -> Option<UnitClass> {
        match self {
            ParsedValue::Value(v) => Some(v.unit),
            ParsedValue::Range { low, .. } => Some(low.unit),
            ParsedValue::NotApplicable => None,
        }
    }

    pub fn is_not_applicable(&self) -> bool {
        matches!(self, ParsedValue::NotApplicable)
    }
}

impl fmt::Display for ParsedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedValue::Value(v) => write!(f, "{}", v.value.normalize()),
            ParsedValue::Range { low, high } => {
                write!(f, "{}~{}", low.value.normalize(), high.value.normalize())
            }
            ParsedValue::NotApplicable => write!(f, "-"),
        }
    }
}

/// Where in the document a metric value was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSource {
    /// Zero-based page index.
    pub page_index: usize,
    /// Index of the table on its page.
    pub table_index: usize,
    pub row_index: usize,
    pub raw_label: String,
    pub raw_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub metric: CanonicalMetric,
    pub value: ParsedValue,
    pub is_forecast: bool,
    pub source: MetricSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    /// Securities code, e.g. "7203" or "130A".
    pub securities_code: Option<String>,
    /// Listed company name as printed after "上場会社名".
    pub company_name: Option<String>,
}

/// One row of the flat export of a [`FinancialRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatEntry {
    /// `None` when the document states the value is not applicable.
    pub value: Option<String>,
    pub unit: Option<UnitClass>,
    pub is_forecast: bool,
}

/// Figures recovered from one document.
///
/// Holds at most one entry per metric for actual results and one per metric
/// for forecasts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    header: DocumentHeader,
    metrics: BTreeMap<CanonicalMetric, MetricEntry>,
    forecasts: BTreeMap<CanonicalMetric, MetricEntry>,
}

impl FinancialRecord {
    pub(crate) fn new(
        header: DocumentHeader,
        metrics: BTreeMap<CanonicalMetric, MetricEntry>,
        forecasts: BTreeMap<CanonicalMetric, MetricEntry>,
    ) -> Self {
        Self {
            header,
            metrics,
            forecasts,
        }
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn metrics(&self) -> &BTreeMap<CanonicalMetric, MetricEntry> {
        &self.metrics
    }

    pub fn forecasts(&self) -> &BTreeMap<CanonicalMetric, MetricEntry> {
        &self.forecasts
    }

    /// Actual (reported) value for a metric.
    pub fn get(&self, metric: CanonicalMetric) -> Option<&ParsedValue> {
        self.metrics.get(&metric).map(|e| &e.value)
    }

    pub fn forecast(&self, metric: CanonicalMetric) -> Option<&ParsedValue> {
        self.forecasts.get(&metric).map(|e| &e.value)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty() && self.forecasts.is_empty()
    }

    /// Flatten into `metric-name -> {value, unit, is_forecast}`.
    /// Forecast keys are prefixed with `forecast_`.
    pub fn to_flat_map(&self) -> BTreeMap<String, FlatEntry> {
        let mut out = BTreeMap::new();
        for entry in self.metrics.values().chain(self.forecasts.values()) {
            let key = if entry.is_forecast {
                format!("forecast_{}", entry.metric.key())
            } else {
                entry.metric.key().to_string()
            };
            let value = match &entry.value {
                ParsedValue::NotApplicable => None,
                other => Some(other.to_string()),
            };
            out.insert(
                key,
                FlatEntry {
                    value,
                    unit: entry.value.unit(),
                    is_forecast: entry.is_forecast,
                },
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn yen(v: Decimal) -> NormalizedValue {
        NormalizedValue {
            value: v,
            unit: UnitClass::Currency,
            scale: dec!(1000000),
        }
    }

    #[test]
    fn to_token_uses_triangle_for_negatives() {
        assert_eq!(yen(dec!(-1200000000)).to_token(), "△1200000000円");
        assert_eq!(yen(dec!(5)).to_token(), "5円");
    }

    #[test]
    fn flat_map_prefixes_forecasts() {
        let source = MetricSource {
            page_index: 0,
            table_index: 0,
            row_index: 1,
            raw_label: "売上高".into(),
            raw_value: "10,000".into(),
        };
        let mut metrics = BTreeMap::new();
        metrics.insert(
            CanonicalMetric::Revenue,
            MetricEntry {
                metric: CanonicalMetric::Revenue,
                value: ParsedValue::Value(yen(dec!(10000000000))),
                is_forecast: false,
                source: source.clone(),
            },
        );
        let mut forecasts = BTreeMap::new();
        forecasts.insert(
            CanonicalMetric::Revenue,
            MetricEntry {
                metric: CanonicalMetric::Revenue,
                value: ParsedValue::NotApplicable,
                is_forecast: true,
                source,
            },
        );
        let record = FinancialRecord::new(DocumentHeader::default(), metrics, forecasts);
        let flat = record.to_flat_map();

        assert_eq!(flat["revenue"].value.as_deref(), Some("10000000000"));
        assert_eq!(flat["revenue"].unit, Some(UnitClass::Currency));
        assert!(flat["forecast_revenue"].is_forecast);
        assert_eq!(flat["forecast_revenue"].value, None);
    }

    #[test]
    fn metric_serializes_as_snake_case_key() {
        let json = serde_json::to_string(&CanonicalMetric::DilutedEps).unwrap();
        assert_eq!(json, "\"diluted_eps\"");
    }
}

use crate::cancel::CancelToken;
use crate::config::schema::{AnalyzerConfig, UnitDef};
use crate::error::TanshinError;
use crate::extraction::table::{page_lines, TableExtractor, TableGrid};
use crate::extraction::{PageLayout, RawCell};
use crate::model::{
    CanonicalMetric, DocumentHeader, FinancialRecord, MetricEntry, MetricSource, ParsedValue,
    UnitClass,
};
use crate::parsing::header::parse_header;
use crate::parsing::text::{compact, split_trailing_bracket};
use crate::parsing::values::{find_unit, unit_fits, unit_only, unit_suffix};
use crate::parsing::{parse_value, LabelMatch, LabelMatcher, LabelScorer, MatchKind};
use crate::trace::{TraceBundle, TraceEntry, TraceOutcome, TraceSeverity};
use std::collections::{BTreeMap, BTreeSet};

const FORECAST_MARKER: &str = "予想";
const REVISION_MARKER: &str = "修正";
const FULL_YEAR_MARKER: &str = "通期";
/// Titles of the results and forecast summaries; "業績" also covers "業績予想".
const SUMMARY_TITLES: [&str; 2] = ["経営成績", "業績"];
const RANGE_MARKS: [char; 2] = ['~', '〜'];

/// Record plus the decision trail that produced it.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub record: FinancialRecord,
    pub trace: TraceBundle,
}

/// Walks the pages of one document and assembles a [`FinancialRecord`].
///
/// Holds only configuration and derived matchers, so one analyzer can be
/// shared across threads and documents.
pub struct DocumentAnalyzer {
    config: AnalyzerConfig,
    matcher: LabelMatcher,
    tables: TableExtractor,
}

/// What a table's title and position say about its rows.
struct TableContext<'a> {
    page_index: usize,
    table_index: usize,
    forecast: bool,
    revision: bool,
    /// Titled as a results or forecast summary.
    summary: bool,
    unit: Option<&'a UnitDef>,
}

/// A matched label and the cell holding its value.
struct Observation<'t> {
    metric: CanonicalMetric,
    kind: MatchKind,
    row_index: usize,
    label: &'t str,
    cell: &'t RawCell,
    /// Cell text, joined with the next row when a range is split over two.
    text: String,
    is_forecast: bool,
}

#[derive(Default)]
struct Accumulator {
    metrics: BTreeMap<CanonicalMetric, MetricEntry>,
    forecasts: BTreeMap<CanonicalMetric, MetricEntry>,
    /// Slots currently held by a value from a summary-titled table.
    from_summary: BTreeSet<(bool, CanonicalMetric)>,
    trace: TraceBundle,
}

impl Accumulator {
    fn is_empty(&self) -> bool {
        self.metrics.is_empty() && self.forecasts.is_empty()
    }

    /// First numeric value wins. A not-applicable marker holds the slot
    /// until a number arrives; revision tables overwrite, and a summary
    /// table's number replaces one taken from any other table.
    fn record(&mut self, ctx: &TableContext<'_>, obs: Observation<'_>, value: ParsedValue) {
        let map = if obs.is_forecast {
            &mut self.forecasts
        } else {
            &mut self.metrics
        };
        let key = (obs.is_forecast, obs.metric);
        let held_by_summary = self.from_summary.contains(&key);

        let outcome = match map.get(&obs.metric) {
            None => TraceOutcome::Recorded,
            Some(prev) if prev.value.is_not_applicable() && !value.is_not_applicable() => {
                TraceOutcome::Recorded
            }
            Some(_) if ctx.revision => TraceOutcome::Revised,
            Some(_) if ctx.summary && !held_by_summary && !value.is_not_applicable() => {
                TraceOutcome::Superseded
            }
            Some(_) => TraceOutcome::Ignored,
        };

        let cell = obs.cell;
        self.trace.entries.push(TraceEntry {
            metric: obs.metric,
            page_index: ctx.page_index,
            table_index: ctx.table_index,
            row_index: obs.row_index,
            raw_label: obs.label.to_string(),
            raw_value: obs.text.clone(),
            match_kind: obs.kind.into(),
            is_forecast: obs.is_forecast,
            outcome,
            evidence: Some([cell.x0, cell.y0, cell.x1, cell.y1]),
        });

        if outcome == TraceOutcome::Ignored {
            tracing::debug!(metric = %obs.metric, page = ctx.page_index, "metric already recorded");
            return;
        }

        if ctx.summary {
            self.from_summary.insert(key);
        } else {
            self.from_summary.remove(&key);
        }
        map.insert(
            obs.metric,
            MetricEntry {
                metric: obs.metric,
                value,
                is_forecast: obs.is_forecast,
                source: MetricSource {
                    page_index: ctx.page_index,
                    table_index: ctx.table_index,
                    row_index: obs.row_index,
                    raw_label: obs.label.to_string(),
                    raw_value: obs.text,
                },
            },
        );
    }
}

impl DocumentAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let matcher = LabelMatcher::new(&config.metrics, config.fuzzy_threshold);
        Self::assemble(config, matcher)
    }

    /// Use a custom label similarity scorer for the fuzzy pass.
    pub fn with_scorer(config: AnalyzerConfig, scorer: Box<dyn LabelScorer>) -> Self {
        let matcher = LabelMatcher::with_scorer(&config.metrics, config.fuzzy_threshold, scorer);
        Self::assemble(config, matcher)
    }

    fn assemble(config: AnalyzerConfig, matcher: LabelMatcher) -> Self {
        let tables = TableExtractor::new(config.table.clone());
        Self {
            config,
            matcher,
            tables,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Tables detected on one page, without any metric matching.
    pub fn tables(&self, page: &PageLayout) -> Vec<TableGrid> {
        self.tables.extract(page)
    }

    /// Identification fields printed at the top of the first page.
    pub fn header(&self, page: &PageLayout) -> DocumentHeader {
        let lines = page_lines(page, self.tables.settings());
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        parse_header(&refs)
    }

    pub fn analyze(
        &self,
        pages: &[PageLayout],
        cancel: &CancelToken,
    ) -> Result<AnalysisOutcome, TanshinError> {
        let limit = self
            .config
            .max_pages
            .map_or(pages.len(), |n| n.min(pages.len()));
        let mut acc = Accumulator::default();

        for (processed, page) in pages[..limit].iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(TanshinError::Cancelled {
                    pages_processed: processed,
                });
            }
            acc.trace.pages_analyzed += 1;

            let tables = self.tables.extract(page);
            if tables.is_empty() {
                tracing::debug!(page = page.page_index, "no tables on page; skipped");
                continue;
            }
            acc.trace.tables_found += tables.len();

            for (table_index, table) in tables.iter().enumerate() {
                if cancel.is_cancelled() {
                    return Err(TanshinError::Cancelled {
                        pages_processed: processed,
                    });
                }
                let ctx = self.context(table, table_index);
                let mut matched = self.scan_rows(table, &ctx, &mut acc);
                if matched == 0 {
                    matched = self.scan_columns(table, &ctx, &mut acc);
                }
                tracing::debug!(
                    page = page.page_index,
                    table = table_index,
                    rows = table.row_count(),
                    columns = table.column_count(),
                    matched,
                    "table scanned"
                );
            }
        }

        if acc.is_empty() {
            return Err(TanshinError::NoFinancialTableFound);
        }

        let header = pages.first().map(|p| self.header(p)).unwrap_or_default();
        tracing::info!(
            metrics = acc.metrics.len(),
            forecasts = acc.forecasts.len(),
            pages = acc.trace.pages_analyzed,
            warnings = acc.trace.warnings.len(),
            "analysis finished"
        );

        let Accumulator {
            metrics,
            forecasts,
            trace,
            ..
        } = acc;
        Ok(AnalysisOutcome {
            record: FinancialRecord::new(header, metrics, forecasts),
            trace,
        })
    }

    fn context(&self, table: &TableGrid, table_index: usize) -> TableContext<'_> {
        let title = table.title.as_deref().map(compact).unwrap_or_default();
        TableContext {
            page_index: table.page_index,
            table_index,
            forecast: title.contains(FORECAST_MARKER),
            revision: title.contains(REVISION_MARKER),
            summary: SUMMARY_TITLES.iter().any(|t| title.contains(t)),
            unit: find_unit(&title, &self.config.units),
        }
    }

    /// Metrics down the first column, values to the right.
    fn scan_rows(&self, table: &TableGrid, ctx: &TableContext<'_>, acc: &mut Accumulator) -> usize {
        let units = &self.config.units;
        let mut forecast = ctx.forecast;
        let mut section_unit = ctx.unit;
        let mut matched = 0;

        for row_index in 0..table.row_count() {
            let texts = table.row_texts(row_index);
            let label = texts.first().copied().unwrap_or_default();

            let LabelMatch::Matched {
                metric,
                unit_class,
                kind,
            } = self.matcher.match_label(label)
            else {
                if self.is_header_row(&texts) {
                    let joined = compact(&texts.concat());
                    forecast |= joined.contains(FORECAST_MARKER);
                    if let Some(u) = find_unit(&joined, units) {
                        section_unit = Some(u);
                    }
                }
                continue;
            };
            matched += 1;

            let Some((col, adjacent_unit)) = self.value_column(&texts, unit_class) else {
                acc.trace.warn(
                    ctx.page_index,
                    TraceSeverity::Info,
                    format!("{metric}: no value cell on row {row_index}"),
                );
                continue;
            };
            let Some(cell) = table.rows()[row_index][col].as_ref() else {
                continue;
            };

            let compacted = compact(label);
            let label_unit = split_trailing_bracket(&compacted)
                .1
                .and_then(|u| find_unit(u, units));
            let hint = adjacent_unit.or(label_unit).or(section_unit);

            let obs = Observation {
                metric,
                kind,
                row_index,
                label,
                cell,
                text: split_range(table, row_index, col).unwrap_or_else(|| cell.text.clone()),
                is_forecast: forecast,
            };
            self.observe(acc, ctx, obs, unit_class, hint);
        }
        matched
    }

    /// Metrics across the header rows, one period per data row.
    fn scan_columns(
        &self,
        table: &TableGrid,
        ctx: &TableContext<'_>,
        acc: &mut Accumulator,
    ) -> usize {
        let units = &self.config.units;
        let rows = table.row_count();
        let data_start = match (0..rows).find(|&r| self.is_data_row(&table.row_texts(r))) {
            Some(r) if r > 0 => r,
            _ => return 0,
        };

        let headers: Vec<String> = (0..table.column_count())
            .map(|c| {
                (0..data_start)
                    .filter_map(|r| table.cell_text(r, c))
                    .collect::<Vec<_>>()
                    .concat()
            })
            .collect();
        let forecast = ctx.forecast || compact(&headers.concat()).contains(FORECAST_MARKER);

        let value_row = if forecast {
            (data_start..rows)
                .find(|&r| {
                    table
                        .cell_text(r, 0)
                        .is_some_and(|t| compact(t).contains(FULL_YEAR_MARKER))
                })
                .unwrap_or(data_start)
        } else {
            data_start
        };

        let mut matched = 0;
        for (col, header) in headers.iter().enumerate().skip(1) {
            let LabelMatch::Matched {
                metric,
                unit_class,
                kind,
            } = self.matcher.match_label(header)
            else {
                continue;
            };
            matched += 1;

            // A metric header centred over its value and change-rate pair
            // lands on the rate column.
            let col = match find_unit(header, units) {
                Some(u)
                    if u.class == UnitClass::Percentage
                        && unit_class != UnitClass::Percentage
                        && col > 1 =>
                {
                    col - 1
                }
                _ => col,
            };
            let hint = find_unit(&headers[col], units).or(ctx.unit);

            let Some(cell) = table.rows()[value_row][col].as_ref() else {
                acc.trace.warn(
                    ctx.page_index,
                    TraceSeverity::Info,
                    format!("{metric}: empty cell in column {col}"),
                );
                continue;
            };

            let obs = Observation {
                metric,
                kind,
                row_index: value_row,
                label: header,
                cell,
                text: split_range(table, value_row, col).unwrap_or_else(|| cell.text.clone()),
                is_forecast: forecast,
            };
            self.observe(acc, ctx, obs, unit_class, hint);
        }
        matched
    }

    fn observe(
        &self,
        acc: &mut Accumulator,
        ctx: &TableContext<'_>,
        obs: Observation<'_>,
        expected: UnitClass,
        hint: Option<&UnitDef>,
    ) {
        match parse_value(&obs.text, expected, hint, &self.config.units) {
            Ok(value) => acc.record(ctx, obs, value),
            Err(e) => acc.trace.warn(
                ctx.page_index,
                TraceSeverity::Important,
                format!("{}: skipped value on row {}: {e}", obs.metric, obs.row_index),
            ),
        }
    }

    /// Rightmost non-empty cell holding a figure of the metric's class,
    /// plus the nearest unit-only cell to its right. Bare unit cells and
    /// figures in another unit (a change rate beside an amount) are passed.
    fn value_column(
        &self,
        texts: &[&str],
        expected: UnitClass,
    ) -> Option<(usize, Option<&UnitDef>)> {
        let units = &self.config.units;
        let mut adjacent = None;
        for (col, text) in texts.iter().enumerate().skip(1).rev() {
            if text.trim().is_empty() {
                continue;
            }
            if let Some(u) = unit_only(text, units) {
                adjacent = Some(u);
                continue;
            }
            let unit = unit_suffix(&compact(text), units).or(adjacent);
            if unit.is_some_and(|u| !unit_fits(u.class, expected)) {
                adjacent = None;
                continue;
            }
            return Some((col, adjacent));
        }
        None
    }

    /// Parse a cell under the class of its own unit suffix; the first half
    /// of a split range counts as a figure.
    fn parses(&self, text: &str) -> Option<ParsedValue> {
        let units = &self.config.units;
        let compacted = compact(text);
        let body = compacted.trim_end_matches(RANGE_MARKS);
        let class = unit_suffix(body, units).map_or(UnitClass::Currency, |u| u.class);
        parse_value(body, class, None, units).ok()
    }

    fn is_header_row(&self, texts: &[&str]) -> bool {
        !texts.iter().skip(1).any(|t| {
            matches!(
                self.parses(t),
                Some(ParsedValue::Value(_) | ParsedValue::Range { .. })
            )
        })
    }

    fn is_data_row(&self, texts: &[&str]) -> bool {
        let filled: Vec<&&str> = texts
            .iter()
            .skip(1)
            .filter(|t| !t.trim().is_empty())
            .collect();
        let numeric = filled.iter().filter(|t| self.parses(t).is_some()).count();
        numeric > 0 && numeric * 2 > filled.len()
    }
}

/// A forecast range broken over two rows of one column: "13,000～" with
/// "14,000" (or "～14,000") directly below.
fn split_range(table: &TableGrid, row: usize, col: usize) -> Option<String> {
    let first = compact(table.cell_text(row, col)?);
    let low = first.strip_suffix(RANGE_MARKS)?;
    let second = compact(table.cell_text(row + 1, col)?);
    let high = second.strip_prefix(RANGE_MARKS).unwrap_or(&second);
    let numeric =
        |s: &str| s.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '△' | '▲' | '-'));
    if !numeric(low) || !numeric(high) || high.ends_with(RANGE_MARKS) {
        return None;
    }
    Some(format!("{low}～{high}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin::default_config;
    use rust_decimal_macros::dec;

    const CHAR_W: f32 = 8.0;
    const ROW_H: f32 = 10.0;

    fn page(page_index: usize, rows: &[(f32, &[(f32, &str)])]) -> PageLayout {
        let cells = rows
            .iter()
            .flat_map(|(y, items)| {
                items.iter().map(move |(x, t)| {
                    let w = t.chars().count() as f32 * CHAR_W;
                    RawCell::new(page_index, *t, *x, *y, x + w, y + ROW_H)
                })
            })
            .collect();
        PageLayout { page_index, cells }
    }

    fn results_page(page_index: usize, revenue: &str) -> PageLayout {
        page(
            page_index,
            &[
                (100.0, &[(40.0, "売上高"), (200.0, revenue), (300.0, "百万円")]),
                (115.0, &[(40.0, "営業利益"), (200.0, "△1,200"), (300.0, "百万円")]),
                (130.0, &[(40.0, "経常利益"), (200.0, "1,100"), (300.0, "百万円")]),
            ],
        )
    }

    fn analyzer() -> DocumentAnalyzer {
        DocumentAnalyzer::new(default_config().unwrap())
    }

    fn run(pages: &[PageLayout]) -> Result<AnalysisOutcome, TanshinError> {
        analyzer().analyze(pages, &CancelToken::new())
    }

    fn amount(value: Option<&ParsedValue>) -> rust_decimal::Decimal {
        value.and_then(ParsedValue::as_value).unwrap().value
    }

    #[test]
    fn test_unit_cell_scales_value() {
        let out = run(&[results_page(0, "12,345")]).unwrap();
        let v = out.record.get(CanonicalMetric::Revenue).unwrap();
        assert_eq!(v.as_value().unwrap().value, dec!(12345000000));
        assert_eq!(v.unit(), Some(UnitClass::Currency));
    }

    #[test]
    fn test_triangle_value_is_negative() {
        let out = run(&[results_page(0, "12,345")]).unwrap();
        assert_eq!(
            amount(out.record.get(CanonicalMetric::OperatingProfit)),
            dec!(-1200000000)
        );
    }

    #[test]
    fn test_first_table_wins() {
        let out = run(&[results_page(0, "10,000"), results_page(1, "9,999")]).unwrap();
        assert_eq!(
            amount(out.record.get(CanonicalMetric::Revenue)),
            dec!(10000000000)
        );
        let source = &out.record.metrics()[&CanonicalMetric::Revenue].source;
        assert_eq!(source.page_index, 0);
        assert!(out
            .trace
            .entries
            .iter()
            .any(|e| e.metric == CanonicalMetric::Revenue
                && e.page_index == 1
                && e.outcome == TraceOutcome::Ignored));
    }

    #[test]
    fn test_narrative_page_skipped() {
        let narrative = page(
            0,
            &[
                (100.0, &[(40.0, "当連結会計年度におけるわが国経済は、緩やかに回復しました。")]),
                (115.0, &[(40.0, "当社グループは事業基盤の強化に努めました。")]),
            ],
        );
        let out = run(&[narrative, results_page(1, "12,345")]).unwrap();
        assert_eq!(out.trace.pages_analyzed, 2);
        assert_eq!(out.trace.tables_found, 1);
        assert!(out.record.get(CanonicalMetric::Revenue).is_some());
    }

    #[test]
    fn test_no_metric_labels_is_an_error() {
        let p = page(
            0,
            &[
                (100.0, &[(40.0, "従業員数"), (200.0, "1,234")]),
                (115.0, &[(40.0, "店舗数"), (200.0, "56")]),
                (130.0, &[(40.0, "拠点数"), (200.0, "7")]),
            ],
        );
        assert!(matches!(run(&[p]), Err(TanshinError::NoFinancialTableFound)));
        assert!(matches!(run(&[]), Err(TanshinError::NoFinancialTableFound)));
    }

    #[test]
    fn test_forecast_header_row_marks_section() {
        let p = page(
            0,
            &[
                (100.0, &[(200.0, "2025年3月期"), (320.0, "2026年3月期予想")]),
                (115.0, &[(40.0, "売上高(百万円)"), (200.0, "10,000"), (320.0, "11,000")]),
                (130.0, &[(40.0, "営業利益(百万円)"), (200.0, "900"), (320.0, "1,000")]),
                (145.0, &[(40.0, "経常利益(百万円)"), (200.0, "950"), (320.0, "1,050")]),
            ],
        );
        let out = run(&[p]).unwrap();
        assert!(out.record.get(CanonicalMetric::Revenue).is_none());
        assert_eq!(
            amount(out.record.forecast(CanonicalMetric::Revenue)),
            dec!(11000000000)
        );
        assert!(out.record.forecasts()[&CanonicalMetric::Revenue].is_forecast);
    }

    #[test]
    fn test_revision_table_overwrites_forecast() {
        let forecast = |page_index, title, revenue| {
            page(
                page_index,
                &[
                    (80.0, &[(40.0, title)]),
                    (100.0, &[(40.0, "売上高"), (200.0, revenue), (300.0, "百万円")]),
                    (115.0, &[(40.0, "営業利益"), (200.0, "1,000"), (300.0, "百万円")]),
                    (130.0, &[(40.0, "経常利益"), (200.0, "1,050"), (300.0, "百万円")]),
                ],
            )
        };
        let out = run(&[
            forecast(0, "2026年3月期の連結業績予想", "11,000"),
            forecast(1, "業績予想の修正について", "12,000"),
        ])
        .unwrap();
        assert_eq!(
            amount(out.record.forecast(CanonicalMetric::Revenue)),
            dec!(12000000000)
        );
        assert!(out
            .trace
            .entries
            .iter()
            .any(|e| e.outcome == TraceOutcome::Revised));
    }

    #[test]
    fn test_not_applicable_replaced_by_later_number() {
        let out = run(&[results_page(0, "-"), results_page(1, "10,000")]).unwrap();
        assert_eq!(
            amount(out.record.get(CanonicalMetric::Revenue)),
            dec!(10000000000)
        );
    }

    #[test]
    fn test_not_applicable_recorded_when_alone() {
        let out = run(&[results_page(0, "-")]).unwrap();
        assert_eq!(
            out.record.get(CanonicalMetric::Revenue),
            Some(&ParsedValue::NotApplicable)
        );
    }

    #[test]
    fn test_unparseable_value_becomes_warning() {
        let out = run(&[results_page(0, "n.a.")]).unwrap();
        assert!(out.record.get(CanonicalMetric::Revenue).is_none());
        assert!(out.record.get(CanonicalMetric::OperatingProfit).is_some());
        assert_eq!(out.trace.warnings.len(), 1);
        assert!(out.trace.warnings[0].message.contains("revenue"));
    }

    #[test]
    fn test_column_oriented_table() {
        let p = page(
            0,
            &[
                (80.0, &[(40.0, "(1)連結経営成績")]),
                (100.0, &[(150.0, "売上高"), (330.0, "営業利益")]),
                (115.0, &[(150.0, "百万円"), (240.0, "%"), (330.0, "百万円"), (420.0, "%")]),
                (130.0, &[(40.0, "2025年3月期"), (150.0, "12,345"), (240.0, "5.2"), (330.0, "1,234"), (420.0, "△3.1")]),
                (145.0, &[(40.0, "2024年3月期"), (150.0, "11,734"), (240.0, "4.0"), (330.0, "1,274"), (420.0, "2.0")]),
            ],
        );
        let out = run(&[p]).unwrap();
        assert_eq!(
            amount(out.record.get(CanonicalMetric::Revenue)),
            dec!(12345000000)
        );
        assert_eq!(
            amount(out.record.get(CanonicalMetric::OperatingProfit)),
            dec!(1234000000)
        );
    }

    #[test]
    fn test_column_oriented_forecast_prefers_full_year() {
        let p = page(
            0,
            &[
                (80.0, &[(40.0, "2026年3月期の連結業績予想")]),
                (100.0, &[(150.0, "売上高"), (330.0, "営業利益")]),
                (115.0, &[(150.0, "百万円"), (240.0, "%"), (330.0, "百万円"), (420.0, "%")]),
                (130.0, &[(40.0, "第2四半期(累計)"), (150.0, "6,000"), (240.0, "4.0"), (330.0, "600"), (420.0, "2.0")]),
                (145.0, &[(40.0, "通期"), (150.0, "12,500"), (240.0, "5.1"), (330.0, "1,300"), (420.0, "5.4")]),
            ],
        );
        let out = run(&[p]).unwrap();
        assert!(out.record.metrics().is_empty());
        assert_eq!(
            amount(out.record.forecast(CanonicalMetric::Revenue)),
            dec!(12500000000)
        );
        assert_eq!(
            amount(out.record.forecast(CanonicalMetric::OperatingProfit)),
            dec!(1300000000)
        );
    }

    #[test]
    fn test_change_rate_column_passed_over() {
        let p = page(
            0,
            &[
                (85.0, &[(200.0, "百万円"), (300.0, "%")]),
                (100.0, &[(40.0, "売上高"), (200.0, "10,000"), (300.0, "5.2%")]),
                (115.0, &[(40.0, "営業利益"), (200.0, "1,000"), (300.0, "△3.1%")]),
                (130.0, &[(40.0, "経常利益"), (200.0, "950"), (300.0, "2.0%")]),
            ],
        );
        let out = run(&[p]).unwrap();
        let revenue = out.record.get(CanonicalMetric::Revenue).unwrap();
        assert_eq!(revenue.unit(), Some(UnitClass::Currency));
        assert_eq!(amount(Some(revenue)), dec!(10000000000));
        assert_eq!(
            amount(out.record.get(CanonicalMetric::OperatingProfit)),
            dec!(1000000000)
        );
        assert_eq!(out.record.metrics()[&CanonicalMetric::Revenue].source.raw_value, "10,000");
    }

    #[test]
    fn test_pre_tax_row_does_not_take_net_profit() {
        let p = page(
            0,
            &[
                (100.0, &[(40.0, "経常利益"), (240.0, "1,000"), (340.0, "百万円")]),
                (115.0, &[(40.0, "税金等調整前当期純利益"), (240.0, "800"), (340.0, "百万円")]),
                (130.0, &[(40.0, "親会社株主に帰属する当期純利益"), (240.0, "600"), (340.0, "百万円")]),
                (145.0, &[(40.0, "非支配株主に帰属する当期純利益"), (240.0, "50"), (340.0, "百万円")]),
            ],
        );
        let out = run(&[p]).unwrap();
        assert_eq!(
            amount(out.record.get(CanonicalMetric::NetProfit)),
            dec!(600000000)
        );
        let source = &out.record.metrics()[&CanonicalMetric::NetProfit].source;
        assert_eq!(source.raw_label, "親会社株主に帰属する当期純利益");
    }

    #[test]
    fn test_summary_titled_table_preferred() {
        let titled = |page_index, title, revenue| {
            page(
                page_index,
                &[
                    (80.0, &[(40.0, title)]),
                    (100.0, &[(40.0, "売上高"), (200.0, revenue), (300.0, "百万円")]),
                    (115.0, &[(40.0, "営業利益"), (200.0, "1,000"), (300.0, "百万円")]),
                    (130.0, &[(40.0, "経常利益"), (200.0, "1,050"), (300.0, "百万円")]),
                ],
            )
        };
        let out = run(&[
            titled(0, "セグメント情報", "9,999"),
            titled(1, "(1)連結経営成績", "10,000"),
            titled(2, "(参考)個別業績の概要", "8,000"),
        ])
        .unwrap();
        assert_eq!(
            amount(out.record.get(CanonicalMetric::Revenue)),
            dec!(10000000000)
        );
        assert_eq!(out.record.metrics()[&CanonicalMetric::Revenue].source.page_index, 1);
        let outcomes: Vec<TraceOutcome> = out
            .trace
            .entries
            .iter()
            .filter(|e| e.metric == CanonicalMetric::Revenue)
            .map(|e| e.outcome)
            .collect();
        assert_eq!(
            outcomes,
            vec![
                TraceOutcome::Recorded,
                TraceOutcome::Superseded,
                TraceOutcome::Ignored
            ]
        );
    }

    #[test]
    fn test_range_split_over_two_rows() {
        let p = page(
            0,
            &[
                (80.0, &[(40.0, "2026年3月期の連結業績予想")]),
                (100.0, &[(150.0, "売上高"), (330.0, "営業利益")]),
                (115.0, &[(150.0, "百万円"), (240.0, "%"), (330.0, "百万円"), (420.0, "%")]),
                (130.0, &[(40.0, "第2四半期(累計)"), (150.0, "6,000"), (240.0, "4.0"), (330.0, "600"), (420.0, "2.0")]),
                (145.0, &[(40.0, "通期"), (150.0, "13,000～"), (240.0, "5.0～"), (330.0, "1,200～"), (420.0, "3.0～")]),
                (160.0, &[(150.0, "14,000"), (240.0, "12.0"), (330.0, "1,400"), (420.0, "20.0")]),
            ],
        );
        let out = run(&[p]).unwrap();
        match out.record.forecast(CanonicalMetric::Revenue) {
            Some(ParsedValue::Range { low, high }) => {
                assert_eq!(low.value, dec!(13000000000));
                assert_eq!(high.value, dec!(14000000000));
            }
            other => panic!("expected a range, got {other:?}"),
        }
        match out.record.forecast(CanonicalMetric::OperatingProfit) {
            Some(ParsedValue::Range { low, high }) => {
                assert_eq!(low.value, dec!(1200000000));
                assert_eq!(high.value, dec!(1400000000));
            }
            other => panic!("expected a range, got {other:?}"),
        }
        assert!(out.trace.warnings.is_empty());
    }

    #[test]
    fn test_max_pages_limits_scan() {
        let mut cfg = default_config().unwrap();
        cfg.max_pages = Some(1);
        let narrative = page(0, &[(100.0, &[(40.0, "決算短信")])]);
        let result = DocumentAnalyzer::new(cfg)
            .analyze(&[narrative, results_page(1, "1")], &CancelToken::new());
        assert!(matches!(result, Err(TanshinError::NoFinancialTableFound)));
    }

    #[test]
    fn test_cancelled_before_first_page() {
        let token = CancelToken::new();
        token.cancel();
        let result = analyzer().analyze(&[results_page(0, "1")], &token);
        assert!(matches!(
            result,
            Err(TanshinError::Cancelled { pages_processed: 0 })
        ));
    }

    #[test]
    fn test_header_read_from_first_page() {
        let mut p = results_page(0, "12,345");
        p.cells.extend(page(
            0,
            &[
                (20.0, &[(40.0, "上場会社名"), (200.0, "サンプル工業株式会社")]),
                (40.0, &[(40.0, "コード番号"), (200.0, "7203")]),
            ],
        ).cells);
        let out = run(&[p]).unwrap();
        assert_eq!(out.record.header().securities_code.as_deref(), Some("7203"));
        assert_eq!(
            out.record.header().company_name.as_deref(),
            Some("サンプル工業株式会社")
        );
    }
}

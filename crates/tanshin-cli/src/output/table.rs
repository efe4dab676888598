use tanshin_core::extraction::table::TableGrid;
use tanshin_core::model::MetricEntry;
use tanshin_core::trace::TraceSeverity;
use tanshin_core::{AnalysisOutcome, CanonicalMetric, ParsedValue};
use std::collections::BTreeMap;

pub fn print_outcome(outcome: &AnalysisOutcome) {
    let record = &outcome.record;
    let header = record.header();

    if let Some(ref name) = header.company_name {
        print!("{name}");
        match header.securities_code {
            Some(ref code) => println!(" ({code})"),
            None => println!(),
        }
        println!();
    }

    print_section("Results", record.metrics());
    if !record.forecasts().is_empty() {
        print_section("Forecast", record.forecasts());
    }

    let important = outcome
        .trace
        .warnings
        .iter()
        .filter(|w| matches!(w.severity, TraceSeverity::Important))
        .count();
    println!(
        "  {} page(s), {} table(s) analyzed",
        outcome.trace.pages_analyzed, outcome.trace.tables_found
    );
    if important > 0 {
        println!("  {important} value(s) skipped; run with -o json --trace for details");
    }
}

fn print_section(title: &str, entries: &BTreeMap<CanonicalMetric, MetricEntry>) {
    if entries.is_empty() {
        return;
    }
    println!("=== {title} ===\n");

    let width = entries.keys().map(|m| m.key().len()).max().unwrap_or(10);
    for (metric, entry) in entries {
        let value = match &entry.value {
            ParsedValue::NotApplicable => "-".to_string(),
            other => other.to_string(),
        };
        let unit = entry.value.unit().map(|u| u.to_string()).unwrap_or_default();
        println!(
            "  {:<width$}  {:>20} {:<4}  p{} {}",
            metric.key(),
            value,
            unit,
            entry.source.page_index + 1,
            entry.source.raw_label,
            width = width
        );
    }
    println!();
}

pub fn print_tables(tables: &[TableGrid]) {
    if tables.is_empty() {
        println!("No tables detected.");
        return;
    }

    for (i, table) in tables.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print!(
            "--- page {}, {}x{}",
            table.page_index + 1,
            table.row_count(),
            table.column_count()
        );
        match table.title {
            Some(ref title) => println!(": {title} ---"),
            None => println!(" ---"),
        }

        let widths: Vec<usize> = (0..table.column_count())
            .map(|c| {
                (0..table.row_count())
                    .map(|r| table.cell_text(r, c).map_or(0, |t| t.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for r in 0..table.row_count() {
            let cells: Vec<String> = table
                .row_texts(r)
                .iter()
                .zip(&widths)
                .map(|(text, w)| format!("{:<w$}", text, w = *w))
                .collect();
            println!("  {}", cells.join(" | ").trim_end());
        }
    }
}

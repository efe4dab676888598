use crate::config::schema::TableSettings;
use crate::extraction::{PageLayout, RawCell};
use crate::parsing::text::join_fragments;
use serde::Serialize;
use std::ops::Range;

/// Reconstruct tables from positioned text.
///
/// Tanshin summary tables rarely carry ruling lines reliable enough to
/// detect, so tables are recovered from text geometry alone:
///
/// 1. fragments are clustered into rows by vertical overlap,
/// 2. horizontal whitespace shared by most rows of a run becomes a
///    column boundary,
/// 3. a table is a run of rows consistent with one boundary set.
pub struct TableExtractor {
    settings: TableSettings,
}

/// Fragments sharing a vertical band, sorted left to right.
#[derive(Debug, Clone)]
pub struct LayoutRow {
    pub cells: Vec<RawCell>,
    pub y0: f32,
    pub y1: f32,
}

impl LayoutRow {
    /// Horizontal extents after merging fragments closer than `min_gap`.
    fn segments(&self, min_gap: f32) -> Vec<(f32, f32)> {
        let mut segments: Vec<(f32, f32)> = Vec::new();
        for cell in &self.cells {
            match segments.last_mut() {
                Some(last) if cell.x0 - last.1 < min_gap => last.1 = last.1.max(cell.x1),
                _ => segments.push((cell.x0, cell.x1)),
            }
        }
        segments
    }

    /// Whitespace intervals of at least `min_gap` between segments.
    pub fn gaps(&self, min_gap: f32) -> Vec<(f32, f32)> {
        self.segments(min_gap)
            .windows(2)
            .map(|w| (w[0].1, w[1].0))
            .collect()
    }

    /// Row text with wide gaps rendered as three spaces.
    pub fn text(&self, min_gap: f32) -> String {
        let mut out = String::new();
        let mut prev_x1: Option<f32> = None;
        for cell in &self.cells {
            out = match prev_x1 {
                None => cell.text.clone(),
                Some(x1) if cell.x0 - x1 >= min_gap => format!("{out}   {}", cell.text),
                Some(_) => join_fragments(&out, &cell.text),
            };
            prev_x1 = Some(prev_x1.map_or(cell.x1, |x| x.max(cell.x1)));
        }
        out
    }
}

/// A reconstructed table: every row has exactly `column_count()` cells.
#[derive(Debug, Clone, Serialize)]
pub struct TableGrid {
    pub page_index: usize,
    /// Text line(s) directly above the table, if any.
    pub title: Option<String>,
    pub column_boundaries: Vec<f32>,
    rows: Vec<Vec<Option<RawCell>>>,
}

impl TableGrid {
    pub fn rows(&self) -> &[Vec<Option<RawCell>>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_boundaries.len() + 1
    }

    pub fn cell_text(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)?
            .get(col)?
            .as_ref()
            .map(|c| c.text.as_str())
    }

    /// Bounding box `[x0, y0, x1, y1]` over every cell of the table.
    pub fn bbox(&self) -> Option<[f32; 4]> {
        self.rows
            .iter()
            .flatten()
            .flatten()
            .fold(None, |acc, c| {
                Some(match acc {
                    None => [c.x0, c.y0, c.x1, c.y1],
                    Some([x0, y0, x1, y1]) => {
                        [x0.min(c.x0), y0.min(c.y0), x1.max(c.x1), y1.max(c.y1)]
                    }
                })
            })
    }

    /// Cell texts of one row, empty cells as "".
    pub fn row_texts(&self, row: usize) -> Vec<&str> {
        self.rows
            .get(row)
            .map(|r| {
                r.iter()
                    .map(|c| c.as_ref().map_or("", |c| c.text.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TableExtractor {
    pub fn new(settings: TableSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    /// Detect zero or more tables on one page.
    pub fn extract(&self, page: &PageLayout) -> Vec<TableGrid> {
        let s = &self.settings;
        let rows = cluster_rows(&page.cells, s.row_tolerance);

        let mut regions: Vec<(Range<usize>, Vec<f32>)> = Vec::new();
        for run in self.runs(&rows) {
            self.split_regions(&rows, run, &mut regions);
        }

        let tables: Vec<TableGrid> = regions
            .iter()
            .map(|(range, boundaries)| TableGrid {
                page_index: page.page_index,
                title: self.title_above(&rows, range.start, &regions),
                column_boundaries: boundaries.clone(),
                rows: rows[range.clone()]
                    .iter()
                    .map(|row| assign_cells(row, boundaries))
                    .collect(),
            })
            .filter(|t| t.row_count() >= s.min_rows && t.column_count() >= s.min_columns)
            .collect();

        tracing::debug!(
            page = page.page_index,
            rows = rows.len(),
            tables = tables.len(),
            "table detection finished"
        );
        tables
    }

    /// Maximal runs of consecutive rows that have at least one gap and are
    /// not separated by more than `max_row_gap`.
    fn runs(&self, rows: &[LayoutRow]) -> Vec<Range<usize>> {
        let s = &self.settings;
        let mut runs = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let tabular = !row.gaps(s.min_gap).is_empty();
            let detached = i > 0 && row.y0 - rows[i - 1].y1 > s.max_row_gap;

            if let Some(st) = start {
                if !tabular || detached {
                    runs.push(st..i);
                    start = None;
                }
            }
            if tabular && start.is_none() {
                start = Some(i);
            }
        }
        if let Some(st) = start {
            runs.push(st..rows.len());
        }
        runs
    }

    /// Split a run at rows whose fragments cross a column boundary and
    /// recompute boundaries for each piece.
    fn split_regions(
        &self,
        rows: &[LayoutRow],
        range: Range<usize>,
        out: &mut Vec<(Range<usize>, Vec<f32>)>,
    ) {
        let s = &self.settings;
        if range.len() < s.min_rows {
            return;
        }

        let boundaries =
            column_boundaries(&rows[range.clone()], s.min_column_support, s.min_gap);
        if boundaries.len() + 1 < s.min_columns {
            return;
        }

        let crossing: Vec<usize> = range
            .clone()
            .filter(|&i| crosses(&rows[i], &boundaries))
            .collect();

        if crossing.is_empty() {
            out.push((range, boundaries));
            return;
        }

        let mut piece_start = range.start;
        for i in crossing {
            self.split_regions(rows, piece_start..i, out);
            piece_start = i + 1;
        }
        self.split_regions(rows, piece_start..range.end, out);
    }

    /// Up to two rows directly above a table that belong to no table.
    fn title_above(
        &self,
        rows: &[LayoutRow],
        start: usize,
        regions: &[(Range<usize>, Vec<f32>)],
    ) -> Option<String> {
        let s = &self.settings;
        let top = rows.get(start)?.y0;
        let mut lines = Vec::new();

        for i in (start.saturating_sub(2)..start).rev() {
            if regions.iter().any(|(r, _)| r.contains(&i)) {
                break;
            }
            if top - rows[i].y1 > s.title_distance {
                break;
            }
            lines.push(rows[i].text(s.min_gap));
        }

        if lines.is_empty() {
            None
        } else {
            lines.reverse();
            Some(lines.join(" "))
        }
    }
}

/// Cluster fragments into rows: a fragment joins the current row when its
/// vertical interval overlaps the row's band widened by `tolerance`.
pub fn cluster_rows(cells: &[RawCell], tolerance: f32) -> Vec<LayoutRow> {
    let mut sorted: Vec<&RawCell> = cells.iter().collect();
    sorted.sort_by(|a, b| a.y0.total_cmp(&b.y0).then(a.x0.total_cmp(&b.x0)));

    let mut rows: Vec<LayoutRow> = Vec::new();
    for cell in sorted {
        match rows.last_mut() {
            Some(row) if cell.y0 <= row.y1 + tolerance && cell.y1 >= row.y0 - tolerance => {
                row.y0 = row.y0.min(cell.y0);
                row.y1 = row.y1.max(cell.y1);
                row.cells.push(cell.clone());
            }
            _ => rows.push(LayoutRow {
                cells: vec![cell.clone()],
                y0: cell.y0,
                y1: cell.y1,
            }),
        }
    }

    for row in &mut rows {
        row.cells.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    }
    rows
}

/// Column boundaries corroborated across rows.
///
/// An x position qualifies when it lies inside a gap in at least two rows
/// and no text covers it in at least `min_support` of the rows (a row
/// with nothing at that position, e.g. a header row with an empty label
/// column, does not contradict the boundary). Each maximal qualifying
/// interval yields one boundary, placed at the middle of its widest stretch
/// that the fewest rows cover.
pub fn column_boundaries(rows: &[LayoutRow], min_support: f32, min_gap: f32) -> Vec<f32> {
    let gaps: Vec<Vec<(f32, f32)>> = rows.iter().map(|r| r.gaps(min_gap)).collect();
    let segments: Vec<Vec<(f32, f32)>> = rows.iter().map(|r| r.segments(min_gap)).collect();
    let required = ((min_support as f64 * rows.len() as f64 - 1e-6).ceil() as usize).max(2);

    let mut points: Vec<f32> = gaps.iter().flatten().flat_map(|&(a, b)| [a, b]).collect();
    points.sort_by(|a, b| a.total_cmp(b));
    points.dedup();

    // Qualifying elementary intervals with their uncovered-row count,
    // grouped into maximal contiguous runs.
    let mut intervals: Vec<Vec<(f32, f32, usize)>> = Vec::new();
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let mid = (a + b) / 2.0;
        let in_gap = gaps
            .iter()
            .filter(|row| row.iter().any(|&(g0, g1)| g0 <= mid && mid <= g1))
            .count();
        let uncovered = segments
            .iter()
            .filter(|row| !row.iter().any(|&(s0, s1)| s0 < mid && mid < s1))
            .count();
        if in_gap < 2 || uncovered < required {
            continue;
        }
        match intervals.last_mut() {
            Some(run) if run.last().is_some_and(|last| last.1 == a) => run.push((a, b, uncovered)),
            _ => intervals.push(vec![(a, b, uncovered)]),
        }
    }

    intervals.iter().map(|run| clearest_midpoint(run)).collect()
}

/// Middle of the widest contiguous stretch with the highest uncovered count.
fn clearest_midpoint(run: &[(f32, f32, usize)]) -> f32 {
    let best = run.iter().map(|&(_, _, u)| u).max().unwrap_or(0);
    let mut widest: Option<(f32, f32)> = None;
    let mut current: Option<(f32, f32)> = None;

    for &(a, b, u) in run {
        current = match current {
            _ if u != best => None,
            Some((start, end)) if end == a => Some((start, b)),
            _ => Some((a, b)),
        };
        if let Some((start, end)) = current {
            if widest.map_or(true, |(ws, we)| end - start > we - ws) {
                widest = Some((start, end));
            }
        }
    }

    match widest {
        Some((start, end)) => (start + end) / 2.0,
        None => run.first().map_or(0.0, |&(a, b, _)| (a + b) / 2.0),
    }
}

fn crosses(row: &LayoutRow, boundaries: &[f32]) -> bool {
    row.cells
        .iter()
        .any(|c| boundaries.iter().any(|&b| c.x0 < b && b < c.x1))
}

fn assign_cells(row: &LayoutRow, boundaries: &[f32]) -> Vec<Option<RawCell>> {
    let mut out: Vec<Option<RawCell>> = vec![None; boundaries.len() + 1];
    for frag in &row.cells {
        let col = boundaries.iter().filter(|&&b| b < frag.center_x()).count();
        out[col] = Some(match out[col].take() {
            None => frag.clone(),
            Some(mut merged) => {
                merged.text = join_fragments(&merged.text, &frag.text);
                merged.x0 = merged.x0.min(frag.x0);
                merged.x1 = merged.x1.max(frag.x1);
                merged.y0 = merged.y0.min(frag.y0);
                merged.y1 = merged.y1.max(frag.y1);
                merged
            }
        });
    }
    out
}

/// Plain text lines of a page, top to bottom.
pub fn page_lines(page: &PageLayout, settings: &TableSettings) -> Vec<String> {
    cluster_rows(&page.cells, settings.row_tolerance)
        .iter()
        .map(|r| r.text(settings.min_gap))
        .collect()
}

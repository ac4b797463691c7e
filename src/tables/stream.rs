//! Table detection from text alignment (stream mode).
//!
//! Words are grouped into rows by vertical position and merged into phrases
//! where the horizontal gap is smaller than a column gap. Column positions
//! are the left edges that recur across rows; contiguous runs of rows that
//! line up with those columns become tables.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TableError, TableStrategy};
use crate::document::PdfDocument;
use crate::models::{Table, TableFlavor, Word};

/// Bucket width for left edges, in points.
const EDGE_BUCKET: f64 = 5.0;
/// Distance within which a phrase counts as aligned to a column.
const ALIGN_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub min_rows: usize,
    pub min_columns: usize,
    /// Regions with more columns are treated as word-level noise.
    pub max_columns: usize,
    /// Row grouping tolerance as a fraction of word height.
    pub y_tolerance_factor: f64,
    /// Share of rows an edge must appear in to become a column.
    pub min_alignment_ratio: f64,
    /// Minimum distance between two column edges.
    pub min_column_gap: f64,
    /// Words closer than this fraction of their height join one phrase.
    pub word_gap_factor: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 12,
            y_tolerance_factor: 0.5,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            word_gap_factor: 0.6,
        }
    }
}

/// A run of adjacent words on one row.
#[derive(Debug, Clone)]
struct Phrase {
    x0: f64,
    x1: f64,
    text: String,
}

#[derive(Debug, Clone)]
struct Row {
    phrases: Vec<Phrase>,
}

#[derive(Debug, Default)]
pub struct StreamDetector {
    config: StreamConfig,
}

impl StreamDetector {
    pub fn with_config(config: StreamConfig) -> Self {
        Self { config }
    }

    /// Detect tables in one page's words.
    pub fn detect_words(&self, words: &[Word], page: usize) -> Vec<Table> {
        if words.len() < self.config.min_rows * self.config.min_columns {
            return Vec::new();
        }

        let rows = self.group_into_rows(words);
        if rows.len() < self.config.min_rows {
            return Vec::new();
        }

        let columns = self.detect_columns(&rows);
        debug!("stream: {} rows, columns at {:?}", rows.len(), columns);
        if columns.len() < self.config.min_columns {
            return Vec::new();
        }

        let mut tables = Vec::new();
        for (start, end) in self.find_table_regions(&rows, &columns) {
            let region = &rows[start..=end];
            let region_columns = self.detect_columns(region);
            if region_columns.len() < self.config.min_columns {
                continue;
            }
            if region_columns.len() > self.config.max_columns {
                debug!("stream: skipping region with {} columns", region_columns.len());
                continue;
            }
            if is_list_pattern(region, &region_columns) {
                debug!("stream: skipping list-like region");
                continue;
            }
            tables.push(Table {
                page,
                flavor: TableFlavor::Stream,
                rows: to_cells(region, &region_columns),
            });
        }
        tables
    }

    fn group_into_rows(&self, words: &[Word]) -> Vec<Row> {
        let mut sorted: Vec<&Word> = words.iter().filter(|w| !w.text.trim().is_empty()).collect();
        sorted.sort_by(|a, b| {
            a.bbox
                .center_y()
                .total_cmp(&b.bbox.center_y())
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });

        let mut grouped: Vec<Vec<&Word>> = Vec::new();
        let mut current_y: Option<f64> = None;
        for word in sorted {
            let tolerance = word.bbox.height().max(1.0) * self.config.y_tolerance_factor;
            match (current_y, grouped.last_mut()) {
                (Some(y), Some(row)) if (word.bbox.center_y() - y).abs() <= tolerance => {
                    row.push(word);
                }
                _ => {
                    current_y = Some(word.bbox.center_y());
                    grouped.push(vec![word]);
                }
            }
        }

        grouped
            .into_iter()
            .map(|mut row| {
                row.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
                Row {
                    phrases: self.merge_phrases(&row),
                }
            })
            .collect()
    }

    fn merge_phrases(&self, row: &[&Word]) -> Vec<Phrase> {
        let mut phrases: Vec<Phrase> = Vec::new();
        for word in row {
            let max_gap = word.bbox.height().max(1.0) * self.config.word_gap_factor;
            match phrases.last_mut() {
                Some(last) if word.bbox.x0 - last.x1 <= max_gap => {
                    last.text.push(' ');
                    last.text.push_str(word.text.trim());
                    last.x1 = last.x1.max(word.bbox.x1);
                }
                _ => phrases.push(Phrase {
                    x0: word.bbox.x0,
                    x1: word.bbox.x1,
                    text: word.text.trim().to_string(),
                }),
            }
        }
        phrases
    }

    /// Left edges that recur in enough rows, merged when closer than the column gap.
    fn detect_columns(&self, rows: &[Row]) -> Vec<f64> {
        let multi: Vec<&Row> = rows.iter().filter(|r| r.phrases.len() >= 2).collect();
        let considered: Vec<&Row> = if multi.len() >= self.config.min_rows {
            multi
        } else {
            rows.iter().collect()
        };
        if considered.is_empty() {
            return Vec::new();
        }

        let mut edge_counts: HashMap<i64, usize> = HashMap::new();
        for row in &considered {
            let buckets: HashSet<i64> = row
                .phrases
                .iter()
                .map(|p| (p.x0 / EDGE_BUCKET).round() as i64)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((considered.len() as f64 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f64> = edge_counts
            .into_iter()
            .filter(|(_, count)| *count >= min_occurrences)
            .map(|(bucket, _)| bucket as f64 * EDGE_BUCKET)
            .collect();
        edges.sort_by(|a, b| a.total_cmp(b));

        let mut merged: Vec<f64> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Contiguous runs of multi-phrase rows aligned with `columns`.
    fn find_table_regions(&self, rows: &[Row], columns: &[f64]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = row.phrases.len() >= 2
                && alignment_score(row, columns) >= self.config.min_alignment_ratio;
            match (aligned, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.config.min_rows {
                        regions.push((s, i - 1));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }
        regions
    }
}

impl TableStrategy for StreamDetector {
    fn flavor(&self) -> TableFlavor {
        TableFlavor::Stream
    }

    fn detect(&self, doc: &dyn PdfDocument, page: usize) -> Result<Vec<Table>, TableError> {
        let words = doc.page_words(page)?;
        Ok(self.detect_words(&words, page))
    }
}

fn alignment_score(row: &Row, columns: &[f64]) -> f64 {
    if row.phrases.is_empty() || columns.is_empty() {
        return 0.0;
    }
    let aligned = row
        .phrases
        .iter()
        .filter(|p| columns.iter().any(|c| (p.x0 - c).abs() <= ALIGN_TOLERANCE))
        .count();
    aligned as f64 / row.phrases.len() as f64
}

/// Column index for a phrase starting at `x`.
fn column_for(x: f64, columns: &[f64]) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(f64::MAX);
        if x >= start - 10.0 && x < end - 10.0 {
            return i;
        }
    }
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (x - **a).abs().total_cmp(&(x - **b).abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn to_cells(rows: &[Row], columns: &[f64]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
            for phrase in &row.phrases {
                cells[column_for(phrase.x0, columns)].push(phrase.text.as_str());
            }
            cells.into_iter().map(|parts| parts.join(" ")).collect()
        })
        .collect()
}

/// Numbered or bulleted lists look like two-column tables.
fn is_list_pattern(rows: &[Row], columns: &[f64]) -> bool {
    if columns.len() < 2 || rows.is_empty() {
        return false;
    }
    let mut bullets = 0;
    let mut numbers = 0;
    for row in rows {
        if let Some(first) = row.phrases.first() {
            let text = first.text.trim();
            if is_bullet_marker(text) {
                bullets += 1;
            } else if is_number_marker(text) {
                numbers += 1;
            }
        }
    }
    let n = rows.len() as f64;
    bullets as f64 / n >= 0.5 || (columns.len() == 2 && (bullets + numbers) as f64 / n >= 0.5)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(text, "-" | "–" | "•" | "·" | "*" | "○" | "▪" | "■" | "●" | "►" | "◆")
}

fn is_number_marker(text: &str) -> bool {
    match text.find(|c: char| !c.is_ascii_digit()) {
        Some(0) => {
            let mut chars = text.chars();
            matches!((chars.next(), chars.next(), chars.next()), (Some(c), Some('.' | ')'), None) if c.is_alphabetic())
        }
        Some(pos) => matches!(&text[pos..], "." | ")"),
        None => false,
    }
}

//! Line-based table detection.
//!
//! A line is a candidate row when it matches the configured row pattern, or
//! (without a pattern) when splitting it on the column separator yields at
//! least `min_columns` non-empty cells. Contiguous candidate rows form a
//! table; a single stray line inside a run is absorbed as an irregular row,
//! two in a row end the run. Page-break marker lines are skipped, so a table
//! may continue on the next page.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::TableDetection;
use crate::error::Result;
use crate::model::{TableBlock, TableRow, PAGE_MARKER};

/// Pipes, tabs or runs of two or more spaces.
fn default_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\S\n]*[|\t][^\S\n]*| {2,}").expect("valid separator regex"))
}

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Detection is skipped entirely when false
    pub enabled: bool,
    /// A line must match this to count as a row (pattern mode)
    pub row_pattern: Option<Regex>,
    /// Literal column separator; [`default_separator`] when unset
    pub delimiter: Option<String>,
    /// Minimum non-empty cells for a row in column mode
    pub min_columns: usize,
    /// Minimum matching rows for a run to become a table
    pub min_rows: usize,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            row_pattern: None,
            delimiter: None,
            min_columns: 2,
            min_rows: 2,
        }
    }
}

impl TableDetectorConfig {
    /// Build from a `*.table_detection` configuration section.
    pub fn from_settings(settings: &TableDetection) -> Result<Self> {
        let row_pattern = match settings.row_pattern.as_deref() {
            Some(p) if !p.is_empty() => Some(Regex::new(p)?),
            _ => None,
        };
        Ok(Self {
            enabled: settings.enabled,
            row_pattern,
            delimiter: settings.delimiter.clone().filter(|d| !d.is_empty()),
            min_columns: settings.min_columns.max(1),
            min_rows: settings.min_rows.max(1),
        })
    }

    /// Column mode with a literal delimiter.
    pub fn with_delimiter(delimiter: impl Into<String>, min_columns: usize) -> Self {
        Self {
            delimiter: Some(delimiter.into()),
            min_columns,
            ..Self::default()
        }
    }
}

/// A run of rows being collected.
#[derive(Default)]
struct Run {
    rows: Vec<TableRow>,
    matched: usize,
}

/// Detects tables in a block of text.
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self {
            config: TableDetectorConfig::default(),
        }
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TableDetectorConfig {
        &self.config
    }

    /// Detect tables in `text`, in document order.
    pub fn detect(&self, text: &str) -> Vec<TableBlock> {
        if !self.config.enabled {
            log::debug!("TableDetector: disabled");
            return Vec::new();
        }

        let mut tables = Vec::new();
        let mut run: Option<Run> = None;
        let mut pending_noise: Option<&str> = None;

        for line in text.lines() {
            if line == PAGE_MARKER {
                continue;
            }
            match self.match_row(line) {
                Some(cells) => {
                    let current = run.get_or_insert_with(Run::default);
                    if let Some(noise) = pending_noise.take() {
                        let mut row = TableRow::new(noise, self.split_cells(noise));
                        row.irregular = true;
                        current.rows.push(row);
                    }
                    current.rows.push(TableRow::new(line, cells));
                    current.matched += 1;
                }
                None if run.is_some() => {
                    if pending_noise.is_none() {
                        pending_noise = Some(line);
                    } else {
                        pending_noise = None;
                        if let Some(table) = run.take().and_then(|r| self.finish(r)) {
                            tables.push(table);
                        }
                    }
                }
                None => {}
            }
        }

        if let Some(table) = run.take().and_then(|r| self.finish(r)) {
            tables.push(table);
        }

        log::debug!("TableDetector: found {} table(s)", tables.len());
        tables
    }

    /// Cells of `line` when it qualifies as a row.
    pub fn match_row(&self, line: &str) -> Option<Vec<String>> {
        if line.trim().is_empty() {
            return None;
        }

        match &self.config.row_pattern {
            Some(pattern) => {
                let caps = pattern.captures(line)?;
                if pattern.captures_len() > 1 {
                    let cells: Vec<String> = caps
                        .iter()
                        .skip(1)
                        .flatten()
                        .map(|m| m.as_str().trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect();
                    Some(cells)
                } else {
                    Some(self.split_cells(line))
                }
            }
            None => {
                let cells = self.split_cells(line);
                (cells.len() >= self.config.min_columns).then_some(cells)
            }
        }
    }

    /// Split a line into trimmed, non-empty cells.
    pub fn split_cells(&self, line: &str) -> Vec<String> {
        let parts: Vec<&str> = match &self.config.delimiter {
            Some(delimiter) => line.split(delimiter.as_str()).collect(),
            None => default_separator().split(line).collect(),
        };
        parts
            .into_iter()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn finish(&self, mut run: Run) -> Option<TableBlock> {
        if run.matched < self.config.min_rows {
            log::debug!(
                "TableDetector: dropping run of {} row(s) (< {})",
                run.matched,
                self.config.min_rows
            );
            return None;
        }

        let column_count = mode_column_count(&run.rows);
        for row in &mut run.rows {
            if row.cells.len() != column_count {
                row.irregular = true;
            }
        }
        let column_offsets = column_offsets(&run.rows, column_count);

        Some(TableBlock {
            rows: run.rows,
            column_count,
            column_offsets,
        })
    }
}

impl Default for TableDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Most frequent cell count among the rows that matched; larger count wins ties.
fn mode_column_count(rows: &[TableRow]) -> usize {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for row in rows.iter().filter(|r| !r.irregular) {
        *counts.entry(row.cells.len()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(columns, seen)| (seen, columns))
        .map(|(columns, _)| columns)
        .unwrap_or(0)
}

/// Leftmost character offset of each column over the regular rows.
fn column_offsets(rows: &[TableRow], column_count: usize) -> Vec<usize> {
    let mut offsets = vec![usize::MAX; column_count];

    for row in rows.iter().filter(|r| !r.irregular) {
        let mut cursor = 0;
        for (i, cell) in row.cells.iter().enumerate().take(column_count) {
            let Some(found) = row.text[cursor..].find(cell.as_str()) else {
                break;
            };
            let byte = cursor + found;
            let chars = row.text[..byte].chars().count();
            offsets[i] = offsets[i].min(chars);
            cursor = byte + cell.len();
        }
    }

    offsets
        .into_iter()
        .map(|o| if o == usize::MAX { 0 } else { o })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe_detector() -> TableDetector {
        TableDetector::with_config(TableDetectorConfig::with_delimiter("|", 2))
    }

    #[test]
    fn test_empty_block() {
        assert!(pipe_detector().detect("").is_empty());
        assert!(TableDetector::new().detect("\n\n").is_empty());
    }

    #[test]
    fn test_two_well_formed_rows() {
        let tables = pipe_detector().detect("A | B\nC | D");
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].row_count(), 2);
        assert_eq!(tables[0].column_count, 2);
        assert_eq!(tables[0].irregular_rows().count(), 0);
    }

    #[test]
    fn test_single_noisy_line_is_absorbed() {
        let tables = pipe_detector().detect("A | B\ngarbled\nC | D");
        assert_eq!(tables.len(), 1);

        let table = &tables[0];
        assert_eq!(table.row_count(), 3);
        assert!(table.rows[1].irregular);
        assert_eq!(table.rows[1].text, "garbled");
        assert!(!table.rows[0].irregular);
        assert!(!table.rows[2].irregular);
    }

    #[test]
    fn test_two_noisy_lines_split_the_run() {
        // both halves are single rows, below min_rows
        assert!(pipe_detector()
            .detect("A | B\nnoise\nmore noise\nC | D")
            .is_empty());

        let tables = pipe_detector().detect("A | B\nC | D\nnoise\nmore noise\nE | F");
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].row_count(), 2);
        assert_eq!(tables[0].rows[1].cells, vec!["C", "D"]);
    }

    #[test]
    fn test_trailing_noise_is_dropped() {
        let tables = pipe_detector().detect("A | B\nC | D\nafterword");
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].row_count(), 2);
    }

    #[test]
    fn test_two_separate_tables() {
        let text = "A | B\nC | D\n\n\nE | F | G\nH | I | J\n";
        let tables = pipe_detector().detect(text);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].column_count, 3);
    }

    #[test]
    fn test_table_continues_across_page_break() {
        let tables = pipe_detector().detect("A | B\nC | D\n\u{c}\nE | F\n");
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].row_count(), 3);
        assert_eq!(tables[0].irregular_rows().count(), 0);
    }

    #[test]
    fn test_disabled() {
        let config = TableDetectorConfig {
            enabled: false,
            ..TableDetectorConfig::with_delimiter("|", 2)
        };
        assert!(TableDetector::with_config(config)
            .detect("A | B\nC | D")
            .is_empty());
    }

    #[test]
    fn test_mode_column_count_flags_irregular() {
        let tables = pipe_detector().detect("A | B\nC | D\nE | F | G\nH | I");
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.column_count, 2);
        assert_eq!(table.row_count(), 4);
        assert!(table.rows[2].irregular);
        assert_eq!(table.irregular_rows().count(), 1);
    }

    #[test]
    fn test_whitespace_columns_for_ocr_text() {
        let detector = TableDetector::new();
        let text = "UN number     Class    Packing group\nUN1090        3        II\nsingle line of prose here\n";
        let tables = detector.detect(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].column_count, 3);
        assert_eq!(tables[0].rows[1].cells, vec!["UN1090", "3", "II"]);
        assert_eq!(tables[0].column_offsets, vec![0, 14, 23]);
    }

    #[test]
    fn test_single_space_prose_is_not_a_row() {
        let detector = TableDetector::new();
        assert!(detector.match_row("This is an ordinary sentence.").is_none());
        assert!(detector.match_row("   ").is_none());
    }

    #[test]
    fn test_pattern_mode_with_groups() {
        let config = TableDetectorConfig {
            row_pattern: Some(Regex::new(r"^(UN\d{4})\s+(.+?)\s+(\d)$").unwrap()),
            ..TableDetectorConfig::default()
        };
        let detector = TableDetector::with_config(config);
        let tables = detector.detect("UN1090 Acetone 3\nUN1993 Flammable liquid 3\n");
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].rows[1].cells,
            vec!["UN1993", "Flammable liquid", "3"]
        );
    }

    #[test]
    fn test_pattern_mode_without_groups_splits_cells() {
        let config = TableDetectorConfig {
            row_pattern: Some(Regex::new(crate::config::DEFAULT_TEXT_ROW_PATTERN).unwrap()),
            ..TableDetectorConfig::default()
        };
        let detector = TableDetector::with_config(config);
        let tables = detector.detect("Section 14 Transport\nUN number | UN1090\nClass | 3\n");
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0].cells, vec!["UN number", "UN1090"]);
    }

    #[test]
    fn test_from_settings() {
        let settings = TableDetection {
            delimiter: Some(String::new()),
            min_rows: 0,
            ..TableDetection::default()
        };
        let config = TableDetectorConfig::from_settings(&settings).unwrap();
        assert!(config.delimiter.is_none());
        assert_eq!(config.min_rows, 1);

        let bad = TableDetection {
            row_pattern: Some("(".into()),
            ..TableDetection::default()
        };
        assert!(TableDetectorConfig::from_settings(&bad).is_err());
    }
}

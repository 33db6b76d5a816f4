//! Table types.

use serde::{Deserialize, Serialize};

/// A group of contiguous rows detected as a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBlock {
    /// Rows in document order
    pub rows: Vec<TableRow>,

    /// Most frequent cell count among the matching rows
    pub column_count: usize,

    /// Character offset at which each column starts, from the regular rows
    pub column_offsets: Vec<usize>,
}

impl TableBlock {
    /// Get the number of rows, irregular ones included.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows flagged as irregular (noise or a different cell count).
    pub fn irregular_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|r| r.irregular)
    }

    /// First regular row, used as the column header.
    pub fn header(&self) -> Option<&TableRow> {
        self.rows.iter().find(|r| !r.irregular)
    }

    /// Header cells paired with the values below them.
    ///
    /// Rows shorter than the header leave blanks; extra cells are dropped.
    pub fn columns(&self) -> Vec<(String, Vec<String>)> {
        let Some(header) = self.header() else {
            return Vec::new();
        };
        let header_index = self
            .rows
            .iter()
            .position(|r| std::ptr::eq(r, header))
            .unwrap_or(0);

        header
            .cells
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| {
                let values = self.rows[header_index + 1..]
                    .iter()
                    .map(|row| row.cells.get(i).cloned().unwrap_or_default())
                    .collect();
                (name.clone(), values)
            })
            .collect()
    }

    /// Get plain text representation of the table.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    /// Line as it appeared in the section
    pub text: String,

    /// Trimmed, non-empty cells
    pub cells: Vec<String>,

    /// Noise line kept inside a run, or a cell count off the table's mode
    pub irregular: bool,
}

impl TableRow {
    /// Create a regular row.
    pub fn new(text: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            text: text.into(),
            cells,
            irregular: false,
        }
    }

    /// Create a row from plain strings.
    pub fn from_strings<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cells: Vec<String> = cells.into_iter().map(Into::into).collect();
        Self::new(cells.join(" | "), cells)
    }

    /// Get plain text representation of the row.
    pub fn plain_text(&self) -> String {
        self.cells.join(" | ")
    }
}

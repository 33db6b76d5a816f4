//! Plain text rendering for output records.

use crate::model::{OutputRecord, PAGE_MARKER};

/// Section text followed by each detected table as pipe-separated rows.
pub fn to_text(record: &OutputRecord) -> String {
    let mut output = record
        .section
        .text
        .lines()
        .filter(|line| *line != PAGE_MARKER)
        .collect::<Vec<_>>()
        .join("\n");

    for (i, table) in record.tables.iter().enumerate() {
        output.push_str(&format!(
            "\n\n[Table {}: {} rows x {} columns]\n",
            i + 1,
            table.row_count(),
            table.column_count
        ));
        output.push_str(&table.plain_text());
    }

    output.push('\n');
    output
}

//! CSV rendering: one column per table header and per field.

use crate::error::{Error, Result};
use crate::model::OutputRecord;

/// A CSV column's content.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Column {
    /// Written on the first data row only
    Scalar(String),
    /// Written one value per row
    List(Vec<String>),
}

impl Column {
    fn len(&self) -> usize {
        match self {
            Column::Scalar(_) => 1,
            Column::List(values) => values.len(),
        }
    }

    fn get(&self, row: usize) -> &str {
        match self {
            Column::Scalar(value) if row == 0 => value,
            Column::Scalar(_) => "",
            Column::List(values) => values.get(row).map(String::as_str).unwrap_or(""),
        }
    }
}

/// Ordered columns with list-aware merging of repeated keys.
#[derive(Default)]
struct Columns(Vec<(String, Column)>);

impl Columns {
    fn insert(&mut self, key: String, column: Column) {
        let Some(i) = self.0.iter().position(|(k, _)| *k == key) else {
            self.0.push((key, column));
            return;
        };
        if let Column::List(existing) = &mut self.0[i].1 {
            match column {
                Column::List(values) => existing.extend(values),
                Column::Scalar(value) => existing.push(value),
            }
            return;
        }
        self.insert(format!("{}_conflict", key), column);
    }
}

/// Convert a record to CSV.
///
/// Header row: `name`, then the table columns, then the field keys. Table
/// values fill the rows below by index; scalars appear on the first row.
pub fn to_csv(record: &OutputRecord) -> Result<String> {
    let mut columns = Columns::default();
    columns.insert("name".to_string(), Column::Scalar(record.name.clone()));

    for table in &record.tables {
        for (header, values) in table.columns() {
            columns.insert(header, Column::List(values));
        }
    }
    for field in &record.fields {
        columns.insert(field.key.clone(), Column::Scalar(field.value.clone()));
    }

    let row_count = columns.0.iter().map(|(_, c)| c.len()).max().unwrap_or(1);

    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.0.iter().map(|(k, _)| k.as_str()))?;
    for row in 0..row_count {
        writer.write_record(columns.0.iter().map(|(_, c)| c.get(row)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Render(format!("CSV serialization error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::Render(format!("CSV serialization error: {}", e)))
}

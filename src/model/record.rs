//! Output record types.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SectionSpan, TableBlock, TextSource};

/// A key/value pair read from the non-table lines of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub value: String,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Everything extracted from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Input file stem, used to name the output file
    pub name: String,

    /// Path of the source document
    pub source: PathBuf,

    /// Driver that produced the text
    pub mode: TextSource,

    /// Title the section was located by
    pub section_title: String,

    /// Located section
    pub section: SectionSpan,

    /// Tables found inside the section
    pub tables: Vec<TableBlock>,

    /// Key/value pairs from the remaining lines
    pub fields: Vec<Field>,

    /// Number of pages in the document
    pub page_count: u32,

    /// Pages whose extraction was given up after retries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_pages: Vec<u32>,

    /// When the record was produced
    pub extracted_at: DateTime<Utc>,
}

impl OutputRecord {
    /// Create a record for `source` with no tables or fields yet.
    pub fn new(source: &Path, mode: TextSource, section_title: &str, section: SectionSpan) -> Self {
        Self {
            name: record_name(source),
            source: source.to_path_buf(),
            mode,
            section_title: section_title.to_string(),
            section,
            tables: Vec::new(),
            fields: Vec::new(),
            page_count: 0,
            failed_pages: Vec::new(),
            extracted_at: Utc::now(),
        }
    }

    /// Number of detected tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Look up a field value by key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }
}

/// File stem of a source path, or `document` when it has none.
pub fn record_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_name() {
        assert_eq!(record_name(Path::new("/data/acetone.pdf")), "acetone");
        assert_eq!(record_name(Path::new("archive.tar.pdf")), "archive.tar");
        assert_eq!(record_name(Path::new("/")), "document");
    }

    #[test]
    fn test_field_lookup() {
        let span = SectionSpan::from_range("Section 14", 0, 10);
        let mut record = OutputRecord::new(Path::new("a.pdf"), TextSource::Text, "Section 14", span);
        record.fields.push(Field::new("UN number", "UN1090"));

        assert_eq!(record.name, "a");
        assert_eq!(record.field("UN number"), Some("UN1090"));
        assert_eq!(record.field("Class"), None);
        assert_eq!(record.table_count(), 0);
    }
}

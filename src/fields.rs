//! Key/value fields from the prose lines of a section.
//!
//! Table rows and the heading line are skipped. A `Key: value` line yields a
//! pair directly; other lines alternate between key and value, and a key left
//! over at the end gets an empty value.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Field, SectionSpan, TableBlock, PAGE_MARKER};

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Derive ordered fields from `section`, ignoring lines claimed by `tables`.
pub fn extract_fields(section: &SectionSpan, tables: &[TableBlock]) -> Vec<Field> {
    let table_lines: HashSet<&str> = tables
        .iter()
        .flat_map(|t| t.rows.iter())
        .map(|r| r.text.trim())
        .collect();

    let lines = section
        .body_lines()
        .filter(|line| !table_lines.contains(line.trim()))
        .map(normalize_line)
        .filter(|line| !line.is_empty());

    pair_lines(lines)
}

/// Pair already-filtered lines into fields.
pub fn pair_lines<I>(lines: I) -> Vec<Field>
where
    I: IntoIterator<Item = String>,
{
    let mut fields: Vec<Field> = Vec::new();
    let mut pending_key: Option<String> = None;

    for line in lines {
        if let Some(key) = pending_key.take() {
            push_field(&mut fields, key, line);
            continue;
        }
        match split_inline(&line) {
            Some((key, value)) => push_field(&mut fields, key.to_string(), value.to_string()),
            None => pending_key = Some(line),
        }
    }

    if let Some(key) = pending_key {
        push_field(&mut fields, key, String::new());
    }

    fields
}

fn normalize_line(line: &str) -> String {
    let line = line.replace(PAGE_MARKER, " ");
    whitespace_run().replace_all(line.trim(), " ").into_owned()
}

/// Split `Key: value` at the first colon when both sides are present.
fn split_inline(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let (key, value) = (key.trim(), value.trim());
    (!key.is_empty() && !value.is_empty()).then_some((key, value))
}

/// Append a field; a repeated key is kept under a `_conflict` suffix.
fn push_field(fields: &mut Vec<Field>, mut key: String, value: String) {
    while fields.iter().any(|f| f.key == key) {
        log::debug!("fields: duplicate key '{}'", key);
        key.push_str("_conflict");
    }
    fields.push(Field::new(key, value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableRow;

    fn span(text: &str) -> SectionSpan {
        SectionSpan::from_range(text, 0, text.len())
    }

    fn strings(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_inline_pairs() {
        let fields = pair_lines(strings(&["UN number: UN1090", "Class: 3"]));
        assert_eq!(
            fields,
            vec![Field::new("UN number", "UN1090"), Field::new("Class", "3")]
        );
    }

    #[test]
    fn test_alternating_lines() {
        let fields = pair_lines(strings(&["UN number", "UN1090", "Proper shipping name", "ACETONE"]));
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1], Field::new("Proper shipping name", "ACETONE"));
    }

    #[test]
    fn test_odd_trailing_key() {
        let fields = pair_lines(strings(&["Marine pollutant"]));
        assert_eq!(fields, vec![Field::new("Marine pollutant", "")]);
    }

    #[test]
    fn test_duplicate_keys() {
        let fields = pair_lines(strings(&["Class: 3", "Class: 8", "Class: 9"]));
        let keys: Vec<_> = fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["Class", "Class_conflict", "Class_conflict_conflict"]);
    }

    #[test]
    fn test_value_line_with_colon() {
        // a pending key takes the next line whole
        let fields = pair_lines(strings(&["Note", "see: annex"]));
        assert_eq!(fields, vec![Field::new("Note", "see: annex")]);
    }

    #[test]
    fn test_skips_heading_and_table_rows() {
        let text = "Section 14: Transport\nUN | 1090\nClass | 3\nEmS:   F-E,  S-D\n\u{c}\n";
        let tables = vec![TableBlock {
            rows: vec![
                TableRow::new("UN | 1090", strings(&["UN", "1090"])),
                TableRow::new("Class | 3", strings(&["Class", "3"])),
            ],
            column_count: 2,
            column_offsets: vec![0, 5],
        }];

        let fields = extract_fields(&span(text), &tables);
        assert_eq!(fields, vec![Field::new("EmS", "F-E, S-D")]);
    }

    #[test]
    fn test_heading_only_section() {
        assert!(extract_fields(&span("Section 14"), &[]).is_empty());
    }
}

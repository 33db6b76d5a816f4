//! Tests for the convenience functions.

mod common;

use common::{write_pdf, ACETONE};
use simdut::{detect_tables, locate_section, Error, SectionLocator, SectionOccurrence};

#[test]
fn test_extract_text_joins_pages_with_marker() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "two.pdf", &[&["First page"], &["Second page"]]);

    let text = simdut::extract_text(&pdf).unwrap();
    assert!(text.contains("First page"));
    assert!(text.contains("\u{c}\nSecond page"));
}

#[test]
fn test_extract_text_rejects_non_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.pdf");
    std::fs::write(&path, "hello").unwrap();
    assert!(simdut::extract_text(&path).is_err());
}

#[test]
fn test_locate_then_detect() {
    let text = ACETONE.join("\n");
    let section = locate_section(&text, "Section 14").unwrap();
    let tables = detect_tables(&section.text);

    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].rows[0].cells, vec!["Mode", "UN number", "Class"]);
}

#[test]
fn test_table_of_contents_entry_is_skipped() {
    let text = "Contents\n\
                Section 14 Transport information ........ 9\n\
                Section 15 Regulatory information ........ 10\n\
                Section 14 Transport information\n\
                UN number | UN1090\n\
                Section 15 Regulatory information\n";

    let locator = SectionLocator::new("Section 14", SectionOccurrence::Auto).unwrap();
    assert_eq!(locator.occurrences(text).len(), 2);
    let section = locator.locate(text).unwrap();
    assert!(section.text.contains("UN1090"));
}

#[test]
fn test_section_not_found() {
    let err = locate_section("Section 1 Identification", "Section 14").unwrap_err();
    assert!(matches!(err, Error::SectionNotFound(_)));
}

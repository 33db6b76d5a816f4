//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use simdut::testing::build_pdf;
use simdut::{ExtractionMode, Settings};

/// Write a PDF fixture into `dir`.
pub fn write_pdf(dir: &Path, name: &str, pages: &[&[&str]]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, build_pdf(pages).unwrap()).unwrap();
    path
}

/// Text-mode settings with every output path inside `dir`.
pub fn settings_in(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.general.mode = ExtractionMode::Text;
    settings.paths.output_dir = dir.join("out");
    settings.paths.temp_dir = Some(dir.join("tmp"));
    settings.paths.log_dir = dir.join("logs");
    settings.error_handling.invalid_files_dir = dir.join("invalid");
    settings.error_handling.retry_delay = 0.0;
    settings
}

/// A one-page safety data sheet with a transport table and two fields.
pub const ACETONE: &[&str] = &[
    "SAFETY DATA SHEET",
    "Section 13 Disposal considerations",
    "Dispose of contents in accordance with local regulations.",
    "Section 14 Transport information",
    "Mode | UN number | Class",
    "ADR | UN1090 | 3",
    "IMDG | UN1090 | 3",
    "Proper shipping name: ACETONE",
    "Packing group: II",
    "Section 15 Regulatory information",
    "Not listed.",
];

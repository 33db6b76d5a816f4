//! # simdut
//!
//! Section extraction for Safety Data Sheet PDFs.
//!
//! This library pulls a named section ("Section 14" by default) out of PDF
//! documents, detects the tabular rows inside it and writes a structured
//! record per document as JSON, CSV or plain text.
//!
//! ## Quick Start
//!
//! ```no_run
//! use simdut::{Pipeline, Settings};
//!
//! fn main() -> simdut::Result<()> {
//!     let settings = Settings::load_resolved("config.yaml", Some("production"))?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let report = pipeline.process("sds/acetone.pdf");
//!     println!("{}: {}", report.path.display(), report.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Layered configuration**: YAML base file plus per-environment overlays
//! - **Two drivers**: PDF text layer (lopdf) or OCR (pdftoppm + tesseract)
//! - **Heuristic tables**: row pattern or delimiter splitting with noise tolerance
//! - **Partial-failure tolerance**: unreadable pages are retried, then left empty
//! - **Bounded runs**: per-document timeout, rejected inputs routed aside

pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod fields;
pub mod locate;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod table_detector;

#[doc(hidden)]
pub mod testing;

// Re-export commonly used types
pub use config::{ExtractionMode, SectionOccurrence, Settings, SettingsOverlay};
pub use detect::{detect_mime_from_bytes, detect_mime_from_path, is_pdf, PDF_MIME};
pub use error::{Disposition, Error, Result};
pub use extract::{Deadline, OcrExtractor, PageExtractor, RetryPolicy, TextExtractor};
pub use locate::{locate_section, SectionLocator};
pub use model::{
    ExtractedText, Field, OutputRecord, PageText, SectionSpan, TableBlock, TableRow, TextSource,
};
pub use pipeline::{Pipeline, Report, State, Status};
pub use render::{JsonFormat, OutputEncoding, OutputFormat, RenderOptions};
pub use table_detector::{TableDetector, TableDetectorConfig};

use std::path::Path;

/// Process a single document with the given settings.
///
/// # Example
///
/// ```no_run
/// use simdut::{process_file, Settings};
///
/// let report = process_file("acetone.pdf", Settings::default()).unwrap();
/// println!("{}", report.status);
/// ```
pub fn process_file<P: AsRef<Path>>(path: P, settings: Settings) -> Result<Report> {
    let pipeline = Pipeline::new(settings)?;
    Ok(pipeline.process(path))
}

/// Extract the text layer of a PDF file, pages joined by the page marker.
///
/// # Example
///
/// ```no_run
/// let text = simdut::extract_text("acetone.pdf").unwrap();
/// println!("{}", text);
/// ```
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let extractor = TextExtractor::open(path)?;
    let text = extract::extract_pages(&extractor, &RetryPolicy::no_retry(), &Deadline::none())?;
    Ok(text.joined())
}

/// Detect tables in a block of text with default column-mode rules.
pub fn detect_tables(text: &str) -> Vec<TableBlock> {
    TableDetector::new().detect(text)
}

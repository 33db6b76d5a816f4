//! Data model shared by the extraction stages.
//!
//! Text flows through these types in one direction: an [`ExtractedText`]
//! per document, at most one [`SectionSpan`] inside it, zero or more
//! [`TableBlock`]s inside the span, and finally one [`OutputRecord`].

mod record;
mod section;
mod table;
mod text;

pub use record::{record_name, Field, OutputRecord};
pub use section::SectionSpan;
pub use table::{TableBlock, TableRow};
pub use text::{ExtractedText, PageStatus, PageText, TextSource, PAGE_MARKER};

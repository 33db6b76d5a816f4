//! Text extraction drivers.
//!
//! Two drivers implement [`PageExtractor`]: [`TextExtractor`] reads the PDF
//! text layer, [`OcrExtractor`] renders pages and runs them through an OCR
//! engine. [`extract_pages`] drives either one page by page under a
//! [`RetryPolicy`], so one unreadable page degrades to empty content instead
//! of aborting the document.

mod normalize;
mod ocr;
mod preprocess;
mod retry;
mod text;

pub use normalize::normalize_page_text;
pub use ocr::OcrExtractor;
pub use preprocess::{deskew, estimate_skew, Preprocessor};
pub use retry::{Deadline, RetryOutcome, RetryPolicy};
pub use text::TextExtractor;

use crate::error::{Error, Result};
use crate::model::{ExtractedText, PageText, TextSource};

/// A source of per-page text.
pub trait PageExtractor {
    /// Which driver this is.
    fn source(&self) -> TextSource;

    /// Page numbers (1-indexed) in reading order.
    fn page_numbers(&self) -> Vec<u32>;

    /// Raw text of one page.
    fn extract_page(&self, page: u32) -> Result<String>;
}

/// Extract every page of `extractor`.
///
/// Each page is retried per `policy`; a page that still fails is recorded as
/// empty and the next page is processed. Fails with
/// [`Error::ExtractionFailure`] only when no page at all could be read, and
/// with [`Error::PipelineTimeout`] once `deadline` passes.
pub fn extract_pages<E>(extractor: &E, policy: &RetryPolicy, deadline: &Deadline) -> Result<ExtractedText>
where
    E: PageExtractor + ?Sized,
{
    let source = extractor.source();
    let mut text = ExtractedText::new(source);
    let mut last_error: Option<String> = None;

    for number in extractor.page_numbers() {
        deadline.check()?;

        match policy.run(deadline, |_| extractor.extract_page(number))? {
            RetryOutcome::Success { value, attempts } => {
                if attempts > 1 {
                    log::info!("{} page {}: succeeded on attempt {}", source, number, attempts);
                }
                text.push(PageText::extracted(number, normalize_page_text(&value)));
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error: e,
            } => {
                log::warn!(
                    "{} page {}: giving up after {} attempt(s), page left empty: {}",
                    source,
                    number,
                    attempts,
                    e
                );
                let message = e.to_string();
                text.push(PageText::failed(number, attempts, message.clone()));
                last_error = Some(message);
            }
        }
    }

    if text.all_failed() {
        return Err(Error::ExtractionFailure {
            pages: text.page_count(),
            last: last_error.unwrap_or_default(),
        });
    }

    log::debug!(
        "{}: {} page(s), {} failed",
        source,
        text.page_count(),
        text.failed_pages().len()
    );
    Ok(text)
}

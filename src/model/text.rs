//! Extracted document text.

use serde::{Deserialize, Serialize};

/// Line placed between pages when they are concatenated.
pub const PAGE_MARKER: &str = "\u{000C}";

/// Which driver produced a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    /// The PDF text layer.
    Text,
    /// Optical character recognition of rendered pages.
    Ocr,
}

impl std::fmt::Display for TextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextSource::Text => f.write_str("text"),
            TextSource::Ocr => f.write_str("ocr"),
        }
    }
}

/// Outcome of extracting one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PageStatus {
    /// Text was read (possibly empty, for a blank page).
    Extracted,
    /// Every attempt failed; the page counts as empty.
    Failed { attempts: u32, error: String },
}

/// Text of a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// Page number (1-indexed)
    pub number: u32,
    pub text: String,
    pub status: PageStatus,
}

impl PageText {
    /// A successfully extracted page.
    pub fn extracted(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
            status: PageStatus::Extracted,
        }
    }

    /// A page whose retries were exhausted.
    pub fn failed(number: u32, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            number,
            text: String::new(),
            status: PageStatus::Failed {
                attempts,
                error: error.into(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, PageStatus::Failed { .. })
    }
}

/// Ordered page texts of one document, produced by exactly one driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub source: TextSource,
    pub pages: Vec<PageText>,
}

impl ExtractedText {
    pub fn new(source: TextSource) -> Self {
        Self {
            source,
            pages: Vec::new(),
        }
    }

    pub fn push(&mut self, page: PageText) {
        self.pages.push(page);
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Numbers of the pages that degraded to empty content.
    pub fn failed_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.is_failed())
            .map(|p| p.number)
            .collect()
    }

    /// True when there was at least one page and none of them could be read.
    pub fn all_failed(&self) -> bool {
        !self.pages.is_empty() && self.pages.iter().all(PageText::is_failed)
    }

    /// Count of non-whitespace characters over all pages.
    pub fn significant_chars(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| p.text.chars())
            .filter(|c| !c.is_whitespace())
            .count()
    }

    /// Pages joined with a [`PAGE_MARKER`] line between them.
    pub fn joined(&self) -> String {
        let separator = format!("\n{}\n", PAGE_MARKER);
        self.pages
            .iter()
            .map(|p| p.text.trim_end_matches(['\n', '\r']))
            .collect::<Vec<_>>()
            .join(&separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_uses_page_marker() {
        let mut text = ExtractedText::new(TextSource::Text);
        text.push(PageText::extracted(1, "first\n"));
        text.push(PageText::extracted(2, "second"));
        assert_eq!(text.joined(), "first\n\u{c}\nsecond");
    }

    #[test]
    fn test_failed_pages() {
        let mut text = ExtractedText::new(TextSource::Ocr);
        text.push(PageText::extracted(1, "ok"));
        text.push(PageText::failed(2, 3, "boom"));
        assert_eq!(text.failed_pages(), vec![2]);
        assert!(!text.all_failed());
        assert_eq!(text.joined(), "ok\n\u{c}\n");
    }

    #[test]
    fn test_all_failed() {
        let mut text = ExtractedText::new(TextSource::Text);
        assert!(!text.all_failed());
        text.push(PageText::failed(1, 1, "x"));
        assert!(text.all_failed());
    }

    #[test]
    fn test_significant_chars() {
        let mut text = ExtractedText::new(TextSource::Text);
        text.push(PageText::extracted(1, " a b\n c "));
        assert_eq!(text.significant_chars(), 3);
    }
}

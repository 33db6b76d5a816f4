//! Text-layer extraction with lopdf.

use std::path::Path;

use lopdf::Document as LopdfDocument;

use super::PageExtractor;
use crate::error::{Error, Result};
use crate::model::TextSource;

/// Reads the embedded text of each page.
pub struct TextExtractor {
    doc: LopdfDocument,
    pages: Vec<u32>,
}

impl TextExtractor {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path.as_ref())?;
        Self::from_document(doc)
    }

    /// Open a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Self::from_document(doc)
    }

    fn from_document(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            log::debug!("TextExtractor: document is encrypted, text may be unreadable");
        }
        let pages = doc.get_pages().keys().copied().collect();
        Ok(Self { doc, pages })
    }

    /// PDF version string.
    pub fn version(&self) -> &str {
        &self.doc.version
    }
}

impl PageExtractor for TextExtractor {
    fn source(&self) -> TextSource {
        TextSource::Text
    }

    fn page_numbers(&self) -> Vec<u32> {
        self.pages.clone()
    }

    fn extract_page(&self, page: u32) -> Result<String> {
        self.doc
            .extract_text(&[page])
            .map_err(|e| Error::TextExtract(format!("Page {}: {}", page, e)))
    }
}

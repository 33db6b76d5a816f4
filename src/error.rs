//! Error types for simdut.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for simdut operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting a section from a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The configuration file is missing, malformed or holds invalid values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The file's detected MIME type is not in the allow-list.
    #[error("Unsupported file type {mime} for {path}")]
    UnsupportedFile { path: PathBuf, mime: String },

    /// The file exceeds the configured size limit.
    #[error("File {path} is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// The configured section title does not occur in the document.
    #[error("Section '{0}' not found")]
    SectionNotFound(String),

    /// No page of the document produced any text.
    #[error("Extraction failed on all {pages} pages: {last}")]
    ExtractionFailure { pages: u32, last: String },

    /// Processing the document took longer than the configured timeout.
    #[error("Processing timed out after {0:?}")]
    PipelineTimeout(Duration),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Error extracting text content from a page.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// Error while rasterizing, preprocessing or recognizing a page.
    #[error("OCR error: {0}")]
    Ocr(String),

    /// The configured output encoding is unknown.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Error while serializing an output record.
    #[error("Rendering error: {0}")]
    Render(String),

    /// A row pattern failed to compile.
    #[error("Invalid row pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Terminal state a per-document error routes the document to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The input is moved to the rejected-files directory.
    Rejected,
    /// The input is left in place and the run is marked as failed.
    Failed,
}

impl Error {
    /// Where a document that hit this error ends up.
    pub fn disposition(&self) -> Disposition {
        match self {
            Error::UnsupportedFile { .. }
            | Error::FileTooLarge { .. }
            | Error::SectionNotFound(_) => Disposition::Rejected,
            _ => Disposition::Failed,
        }
    }

    /// Whether this error aborts the whole run rather than one document.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Ocr(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Render(format!("CSV serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::SectionNotFound("Section 14".to_string());
        assert_eq!(err.to_string(), "Section 'Section 14' not found");

        let err = Error::FileTooLarge {
            path: PathBuf::from("big.pdf"),
            size: 2048,
            limit: 1024,
        };
        assert_eq!(
            err.to_string(),
            "File big.pdf is 2048 bytes, limit is 1024 bytes"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_disposition() {
        assert_eq!(
            Error::SectionNotFound("x".into()).disposition(),
            Disposition::Rejected
        );
        assert_eq!(
            Error::UnsupportedFile {
                path: PathBuf::from("a.txt"),
                mime: "text/plain".into()
            }
            .disposition(),
            Disposition::Rejected
        );
        assert_eq!(
            Error::PipelineTimeout(Duration::from_secs(1)).disposition(),
            Disposition::Failed
        );
        assert_eq!(
            Error::ExtractionFailure {
                pages: 2,
                last: "bad".into()
            }
            .disposition(),
            Disposition::Failed
        );
    }

    #[test]
    fn test_only_config_errors_are_fatal() {
        assert!(Error::Config("missing".into()).is_fatal());
        assert!(!Error::SectionNotFound("x".into()).is_fatal());
        assert!(!Error::Encrypted.is_fatal());
    }
}

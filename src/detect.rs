//! File type sniffing for input validation.

use crate::error::Result;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// MIME type reported for PDF files.
pub const PDF_MIME: &str = "application/pdf";

/// MIME type reported when no signature matches.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Some producers emit junk before the header; readers accept it within the first KiB.
const HEADER_SCAN_LEN: usize = 1024;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"II*\x00", "image/tiff"),
    (b"MM\x00*", "image/tiff"),
    (b"PK\x03\x04", "application/zip"),
];

/// Sniff the MIME type of a file from its leading bytes.
///
/// # Example
/// ```no_run
/// use simdut::detect::detect_mime_from_path;
///
/// let mime = detect_mime_from_path("sds.pdf").unwrap();
/// assert_eq!(mime, "application/pdf");
/// ```
pub fn detect_mime_from_path<P: AsRef<Path>>(path: P) -> Result<&'static str> {
    let file = File::open(path)?;
    let mut header = Vec::with_capacity(HEADER_SCAN_LEN);
    file.take(HEADER_SCAN_LEN as u64).read_to_end(&mut header)?;
    Ok(detect_mime_from_bytes(&header))
}

/// Sniff the MIME type of a byte buffer.
pub fn detect_mime_from_bytes(data: &[u8]) -> &'static str {
    if is_pdf_bytes(data) {
        return PDF_MIME;
    }

    SIGNATURES
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, mime)| *mime)
        .unwrap_or(UNKNOWN_MIME)
}

/// Check if bytes start with a PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    let window = &data[..data.len().min(HEADER_SCAN_LEN)];
    window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .map(|pos| has_version(&window[pos + PDF_MAGIC.len()..]))
        .unwrap_or(false)
}

/// Check if a file is a PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    matches!(detect_mime_from_path(path), Ok(PDF_MIME))
}

/// "1.7" style version right after the magic.
fn has_version(rest: &[u8]) -> bool {
    rest.len() >= 3 && rest[0].is_ascii_digit() && rest[1] == b'.' && rest[2].is_ascii_digit()
}

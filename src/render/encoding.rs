//! Output character encodings.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Encoding of written output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    /// UTF-8 without byte order mark
    #[default]
    Utf8,
    /// UTF-8 with a leading byte order mark
    Utf8Sig,
    /// UTF-16, little endian, no byte order mark
    Utf16Le,
    /// UTF-16, big endian, no byte order mark
    Utf16Be,
}

impl OutputEncoding {
    /// Encode `text` into bytes.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            OutputEncoding::Utf8 => text.as_bytes().to_vec(),
            OutputEncoding::Utf8Sig => {
                let mut bytes = Vec::with_capacity(text.len() + 3);
                bytes.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
                bytes.extend_from_slice(text.as_bytes());
                bytes
            }
            OutputEncoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            OutputEncoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        }
    }

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            OutputEncoding::Utf8 => "utf-8",
            OutputEncoding::Utf8Sig => "utf-8-sig",
            OutputEncoding::Utf16Le => "utf-16le",
            OutputEncoding::Utf16Be => "utf-16be",
        }
    }
}

impl fmt::Display for OutputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(OutputEncoding::Utf8),
            "utf-8-sig" | "utf8-sig" => Ok(OutputEncoding::Utf8Sig),
            "utf-16le" | "utf-16-le" | "utf16le" => Ok(OutputEncoding::Utf16Le),
            "utf-16be" | "utf-16-be" | "utf16be" => Ok(OutputEncoding::Utf16Be),
            _ => Err(Error::Encoding(format!("unsupported output encoding '{}'", s))),
        }
    }
}

//! Rendering module for writing output records in the configured format.

mod csv;
mod encoding;
mod text;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::model::OutputRecord;

pub use self::csv::to_csv;
pub use encoding::OutputEncoding;
pub use text::to_text;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed record
    #[default]
    Json,
    /// Column per table header and field
    Csv,
    /// Section text plus pipe-separated tables
    Text,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Csv => f.write_str("csv"),
            OutputFormat::Text => f.write_str("text"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "text" | "txt" => Ok(OutputFormat::Text),
            other => Err(Error::Config(format!("unknown output format '{}'", other))),
        }
    }
}

/// JSON layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    #[default]
    Pretty,
    /// One line
    Compact,
}

/// Serialize a record as JSON, newline-terminated.
pub fn to_json(record: &OutputRecord, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(record),
        JsonFormat::Compact => serde_json::to_string(record),
    }
    .map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))?;
    Ok(json + "\n")
}

/// Options for rendering and writing a record.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub encoding: OutputEncoding,
    pub json_format: JsonFormat,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from the `general` settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            format: settings.general.output_format,
            encoding: settings.general.output_encoding.parse()?,
            json_format: JsonFormat::Pretty,
        })
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_json_format(mut self, json_format: JsonFormat) -> Self {
        self.json_format = json_format;
        self
    }
}

/// Render a record to a string in the chosen format.
pub fn render(record: &OutputRecord, options: &RenderOptions) -> Result<String> {
    match options.format {
        OutputFormat::Json => to_json(record, options.json_format),
        OutputFormat::Csv => to_csv(record),
        OutputFormat::Text => Ok(to_text(record)),
    }
}

/// Path a record is written to inside `output_dir`.
pub fn output_path(record: &OutputRecord, output_dir: &Path, format: OutputFormat) -> PathBuf {
    output_dir.join(format!("{}.{}", record.name, format.extension()))
}

/// Render `record` and write it to `output_dir`, returning the file path.
///
/// The content goes to a temporary sibling first and is renamed into place,
/// so a failed write never leaves a truncated output file.
pub fn write_record(record: &OutputRecord, output_dir: &Path, options: &RenderOptions) -> Result<PathBuf> {
    let content = render(record, options)?;
    let bytes = options.encoding.encode(&content);

    fs::create_dir_all(output_dir)?;
    let path = output_path(record, output_dir, options.format);
    let partial = path.with_extension(format!("{}.partial", options.format.extension()));

    fs::write(&partial, &bytes)?;
    if let Err(e) = fs::rename(&partial, &path) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }

    log::debug!(
        "Wrote {} ({} bytes, {}, {})",
        path.display(),
        bytes.len(),
        options.format,
        options.encoding
    );
    Ok(path)
}

//! Environment overlays.
//!
//! Every overlay mirrors a settings section with each leaf made optional.
//! Applying an overlay writes the leaves that are present and recurses into
//! nested sections, so an overlay never replaces a whole section.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{
    Compatibility, ErrorHandling, ExtractionMode, General, Logging, OcrParser, Paths, Performance,
    Preprocessing, SectionOccurrence, Settings, TableDetection, Tesseract, TextParser,
};
use crate::render::OutputFormat;

/// Copy each present overlay leaf onto the matching base field.
macro_rules! merge_leaves {
    ($overlay:expr => $base:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $overlay.$field {
                $base.$field = value;
            }
        )+
    };
}

/// `environments.<name>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsOverlay {
    pub general: GeneralOverlay,
    pub text_parser: TextParserOverlay,
    pub ocr_parser: OcrParserOverlay,
    pub paths: PathsOverlay,
    pub logging: LoggingOverlay,
    pub performance: PerformanceOverlay,
    pub error_handling: ErrorHandlingOverlay,
    pub compatibility: CompatibilityOverlay,
}

impl SettingsOverlay {
    /// Deep-merge this overlay into `base`.
    pub fn apply_to(self, base: &mut Settings) {
        self.general.apply_to(&mut base.general);
        self.text_parser.apply_to(&mut base.text_parser);
        self.ocr_parser.apply_to(&mut base.ocr_parser);
        self.paths.apply_to(&mut base.paths);
        self.logging.apply_to(&mut base.logging);
        self.performance.apply_to(&mut base.performance);
        self.error_handling.apply_to(&mut base.error_handling);
        self.compatibility.apply_to(&mut base.compatibility);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralOverlay {
    pub section_title: Option<String>,
    pub max_file_size_mb: Option<u64>,
    pub allowed_mime_types: Option<Vec<String>>,
    pub output_encoding: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub section_occurrence: Option<SectionOccurrence>,
    pub mode: Option<ExtractionMode>,
}

impl GeneralOverlay {
    fn apply_to(self, base: &mut General) {
        merge_leaves!(self => base;
            section_title,
            max_file_size_mb,
            allowed_mime_types,
            output_encoding,
            output_format,
            section_occurrence,
            mode,
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextParserOverlay {
    pub table_detection: TableDetectionOverlay,
}

impl TextParserOverlay {
    fn apply_to(self, base: &mut TextParser) {
        self.table_detection.apply_to(&mut base.table_detection);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrParserOverlay {
    pub tesseract: TesseractOverlay,
    pub preprocessing: PreprocessingOverlay,
    pub table_detection: TableDetectionOverlay,
}

impl OcrParserOverlay {
    fn apply_to(self, base: &mut OcrParser) {
        self.tesseract.apply_to(&mut base.tesseract);
        self.preprocessing.apply_to(&mut base.preprocessing);
        self.table_detection.apply_to(&mut base.table_detection);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDetectionOverlay {
    pub enabled: Option<bool>,
    pub row_pattern: Option<String>,
    pub delimiter: Option<String>,
    pub min_columns: Option<usize>,
    pub min_rows: Option<usize>,
}

impl TableDetectionOverlay {
    fn apply_to(self, base: &mut TableDetection) {
        merge_leaves!(self => base; enabled, min_columns, min_rows);
        // the base fields are optional themselves; a present overlay value sets them
        if self.row_pattern.is_some() {
            base.row_pattern = self.row_pattern;
        }
        if self.delimiter.is_some() {
            base.delimiter = self.delimiter;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractOverlay {
    pub binary: Option<String>,
    pub rasterizer: Option<String>,
    pub lang: Option<String>,
    pub oem: Option<u8>,
    pub psm: Option<u8>,
    pub dpi: Option<u32>,
}

impl TesseractOverlay {
    fn apply_to(self, base: &mut Tesseract) {
        merge_leaves!(self => base; binary, rasterizer, lang, oem, psm, dpi);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingOverlay {
    pub denoise: Option<bool>,
    pub contrast: Option<bool>,
    pub deskew: Option<bool>,
    pub denoise_radius: Option<u32>,
    pub max_skew_degrees: Option<f32>,
}

impl PreprocessingOverlay {
    fn apply_to(self, base: &mut Preprocessing) {
        merge_leaves!(self => base;
            denoise,
            contrast,
            deskew,
            denoise_radius,
            max_skew_degrees,
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsOverlay {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl PathsOverlay {
    fn apply_to(self, base: &mut Paths) {
        merge_leaves!(self => base; input_dir, output_dir, log_dir);
        if self.temp_dir.is_some() {
            base.temp_dir = self.temp_dir;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOverlay {
    pub level: Option<String>,
    pub file_name: Option<String>,
    pub max_file_size: Option<u64>,
    pub backup_count: Option<u32>,
    pub console: Option<bool>,
}

impl LoggingOverlay {
    fn apply_to(self, base: &mut Logging) {
        merge_leaves!(self => base; level, file_name, max_file_size, backup_count, console);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceOverlay {
    pub batch_size: Option<usize>,
    pub max_workers: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

impl PerformanceOverlay {
    fn apply_to(self, base: &mut Performance) {
        merge_leaves!(self => base; batch_size, max_workers, timeout_seconds);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandlingOverlay {
    pub max_retries: Option<u32>,
    pub retry_delay: Option<f64>,
    pub invalid_files_dir: Option<PathBuf>,
    pub move_invalid_files: Option<bool>,
}

impl ErrorHandlingOverlay {
    fn apply_to(self, base: &mut ErrorHandling) {
        merge_leaves!(self => base;
            max_retries,
            retry_delay,
            invalid_files_dir,
            move_invalid_files,
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibilityOverlay {
    pub ocr_fallback: Option<bool>,
    pub min_text_chars: Option<usize>,
}

impl CompatibilityOverlay {
    fn apply_to(self, base: &mut Compatibility) {
        merge_leaves!(self => base; ocr_fallback, min_text_chars);
    }
}

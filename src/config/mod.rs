//! Run configuration loaded from YAML.
//!
//! A configuration file holds a base [`Settings`] tree plus optional
//! `environments.<name>` overlays. [`Settings::resolve`] deep-merges one
//! overlay on top of the base; the result is passed down by reference to
//! every stage of the pipeline and never mutated afterward.
//!
//! ```no_run
//! use simdut::config::Settings;
//!
//! let settings = Settings::load_resolved("config.yaml", Some("production"))?;
//! println!("looking for {}", settings.general.section_title);
//! # Ok::<(), simdut::Error>(())
//! ```

mod overlay;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::RetryPolicy;
use crate::render::{OutputEncoding, OutputFormat};

pub use overlay::{
    CompatibilityOverlay, ErrorHandlingOverlay, GeneralOverlay, LoggingOverlay, OcrParserOverlay,
    PathsOverlay, PerformanceOverlay, PreprocessingOverlay, SettingsOverlay, TableDetectionOverlay,
    TesseractOverlay, TextParserOverlay,
};

/// Environment variable naming the overlay to apply.
pub const ENV_VAR: &str = "SIMDUT_ENV";

/// Row pattern used by text mode when none is configured: two cells
/// separated by a pipe, a tab or a run of spaces.
pub const DEFAULT_TEXT_ROW_PATTERN: &str = r"\S\s*(?:\||\t| {2,})\s*\S";

/// Fully resolved run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: General,
    pub text_parser: TextParser,
    pub ocr_parser: OcrParser,
    pub paths: Paths,
    pub logging: Logging,
    pub performance: Performance,
    pub error_handling: ErrorHandling,
    pub compatibility: Compatibility,
    /// Named overlays selectable with `--env` or `SIMDUT_ENV`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environments: BTreeMap<String, SettingsOverlay>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: General::default(),
            text_parser: TextParser::default(),
            ocr_parser: OcrParser::default(),
            paths: Paths::default(),
            logging: Logging::default(),
            performance: Performance::default(),
            error_handling: ErrorHandling::default(),
            compatibility: Compatibility::default(),
            environments: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Read a base configuration file without applying any overlay.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), config_message(&e))))
    }

    /// Parse a configuration document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Serialize the settings, overlays dropped.
    pub fn to_yaml(&self) -> Result<String> {
        let mut flat = self.clone();
        flat.environments.clear();
        Ok(serde_yaml::to_string(&flat)?)
    }

    /// Load, resolve the named environment and validate in one step.
    pub fn load_resolved<P: AsRef<Path>>(path: P, env: Option<&str>) -> Result<Self> {
        let settings = Self::load(path)?.resolve(env);
        settings.validate()?;
        Ok(settings)
    }

    /// Name of the environment selected through [`ENV_VAR`], if set.
    pub fn environment_from_env() -> Option<String> {
        std::env::var(ENV_VAR).ok().filter(|v| !v.trim().is_empty())
    }

    /// Deep-merge the named environment overlay over these settings.
    ///
    /// An unknown name leaves the settings untouched.
    pub fn resolve(mut self, env: Option<&str>) -> Self {
        let Some(name) = env else {
            return self;
        };

        match self.environments.get(name).cloned() {
            Some(overlay) => {
                log::info!("Applying configuration overlay for environment '{}'", name);
                overlay.apply_to(&mut self);
            }
            None => {
                log::warn!(
                    "Environment '{}' has no overlay; using base configuration",
                    name
                );
            }
        }
        self
    }

    /// Reject values that would only fail halfway through a run.
    pub fn validate(&self) -> Result<()> {
        if self.general.section_title.trim().is_empty() {
            return Err(Error::Config("general.section_title is empty".into()));
        }
        if self.general.allowed_mime_types.is_empty() {
            return Err(Error::Config("general.allowed_mime_types is empty".into()));
        }
        self.general
            .output_encoding
            .parse::<OutputEncoding>()
            .map_err(|e| Error::Config(e.to_string()))?;

        for (name, detection) in [
            ("text_parser", &self.text_parser.table_detection),
            ("ocr_parser", &self.ocr_parser.table_detection),
        ] {
            detection
                .validate()
                .map_err(|e| Error::Config(format!("{}.table_detection: {}", name, e)))?;
        }

        if self.ocr_parser.tesseract.dpi == 0 {
            return Err(Error::Config("ocr_parser.tesseract.dpi must be positive".into()));
        }
        if self.performance.max_workers == 0 || self.performance.batch_size == 0 {
            return Err(Error::Config(
                "performance.max_workers and performance.batch_size must be positive".into(),
            ));
        }
        if !self.error_handling.retry_delay.is_finite() || self.error_handling.retry_delay < 0.0 {
            return Err(Error::Config(
                "error_handling.retry_delay must be a non-negative number of seconds".into(),
            ));
        }
        Ok(())
    }

    /// Size limit in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.general.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Retry policy for per-page extraction.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.error_handling.max_retries,
            Duration::from_secs_f64(self.error_handling.retry_delay.max(0.0)),
        )
    }

    /// Per-document time limit; `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.performance.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Whether a MIME type is in the allow-list (case-insensitive).
    pub fn allows_mime(&self, mime: &str) -> bool {
        self.general
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(mime))
    }
}

/// serde_yaml errors arrive wrapped in our own Config variant; keep the message only.
fn config_message(err: &Error) -> String {
    match err {
        Error::Config(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// Which text source feeds the section locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Text layer only.
    Text,
    /// Rasterize and recognize every page.
    Ocr,
    /// Text layer first, OCR when it is (nearly) empty.
    #[default]
    Auto,
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExtractionMode::Text => "text",
            ExtractionMode::Ocr => "ocr",
            ExtractionMode::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// Which occurrence of the section title is taken when there are several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionOccurrence {
    /// Least dense surrounding line wins, the later one on ties.
    #[default]
    Auto,
    First,
    Last,
}

/// `general.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct General {
    pub section_title: String,
    pub max_file_size_mb: u64,
    pub allowed_mime_types: Vec<String>,
    pub output_encoding: String,
    pub output_format: OutputFormat,
    pub section_occurrence: SectionOccurrence,
    pub mode: ExtractionMode,
}

impl Default for General {
    fn default() -> Self {
        Self {
            section_title: "Section 14".to_string(),
            max_file_size_mb: 50,
            allowed_mime_types: vec![crate::detect::PDF_MIME.to_string()],
            output_encoding: "utf-8".to_string(),
            output_format: OutputFormat::Json,
            section_occurrence: SectionOccurrence::Auto,
            mode: ExtractionMode::Auto,
        }
    }
}

/// `text_parser.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextParser {
    pub table_detection: TableDetection,
}

impl Default for TextParser {
    fn default() -> Self {
        Self {
            table_detection: TableDetection {
                row_pattern: Some(DEFAULT_TEXT_ROW_PATTERN.to_string()),
                ..TableDetection::default()
            },
        }
    }
}

/// `ocr_parser.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OcrParser {
    pub tesseract: Tesseract,
    pub preprocessing: Preprocessing,
    pub table_detection: TableDetection,
}

/// `*.table_detection`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDetection {
    pub enabled: bool,
    /// Regex a line must match to count as a row.
    pub row_pattern: Option<String>,
    /// Literal column separator; runs of whitespace, pipes and tabs when unset.
    pub delimiter: Option<String>,
    pub min_columns: usize,
    /// Matching rows a run needs before it is reported as a table.
    pub min_rows: usize,
}

impl Default for TableDetection {
    fn default() -> Self {
        Self {
            enabled: true,
            row_pattern: None,
            delimiter: None,
            min_columns: 2,
            min_rows: 2,
        }
    }
}

impl TableDetection {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(pattern) = &self.row_pattern {
            Regex::new(pattern).map_err(|e| format!("invalid row_pattern: {}", e))?;
        }
        if self.min_columns == 0 {
            return Err("min_columns must be at least 1".into());
        }
        if self.min_rows == 0 {
            return Err("min_rows must be at least 1".into());
        }
        Ok(())
    }
}

/// `ocr_parser.tesseract.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tesseract {
    /// Recognition binary.
    pub binary: String,
    /// Page rasterizer binary (poppler's pdftoppm).
    pub rasterizer: String,
    pub lang: String,
    /// OCR engine mode (`--oem`).
    pub oem: u8,
    /// Page segmentation mode (`--psm`).
    pub psm: u8,
    pub dpi: u32,
}

impl Default for Tesseract {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            rasterizer: "pdftoppm".to_string(),
            lang: "eng".to_string(),
            oem: 3,
            psm: 6,
            dpi: 300,
        }
    }
}

/// `ocr_parser.preprocessing.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocessing {
    pub denoise: bool,
    pub contrast: bool,
    pub deskew: bool,
    /// Median filter radius in pixels.
    pub denoise_radius: u32,
    /// Largest skew angle searched, in degrees either way.
    pub max_skew_degrees: f32,
}

impl Default for Preprocessing {
    fn default() -> Self {
        Self {
            denoise: true,
            contrast: true,
            deskew: true,
            denoise_radius: 1,
            max_skew_degrees: 5.0,
        }
    }
}

/// `paths.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Scratch space for rasterized pages; the system temp dir when unset.
    pub temp_dir: Option<PathBuf>,
    pub log_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            temp_dir: None,
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// `logging.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub file_name: String,
    /// Rotate once the log file reaches this many bytes.
    pub max_file_size: u64,
    pub backup_count: u32,
    /// Mirror log lines to stderr.
    pub console: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file_name: "parser.log".to_string(),
            max_file_size: 10 * 1024 * 1024,
            backup_count: 5,
            console: true,
        }
    }
}

/// `performance.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Performance {
    pub batch_size: usize,
    pub max_workers: usize,
    /// Per-document limit; 0 disables it.
    pub timeout_seconds: u64,
}

impl Default for Performance {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_workers: 1,
            timeout_seconds: 300,
        }
    }
}

/// `error_handling.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorHandling {
    pub max_retries: u32,
    /// Seconds between attempts.
    pub retry_delay: f64,
    pub invalid_files_dir: PathBuf,
    /// Move rejected inputs; copy them when false.
    pub move_invalid_files: bool,
}

impl Default for ErrorHandling {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: 1.0,
            invalid_files_dir: PathBuf::from("invalid_files"),
            move_invalid_files: true,
        }
    }
}

/// `compatibility.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compatibility {
    /// In auto mode, run OCR when the text layer is too thin.
    pub ocr_fallback: bool,
    /// Non-whitespace characters below which a text layer counts as empty.
    pub min_text_chars: usize,
}

impl Default for Compatibility {
    fn default() -> Self {
        Self {
            ocr_fallback: true,
            min_text_chars: 50,
        }
    }
}

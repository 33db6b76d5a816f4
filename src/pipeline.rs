//! Per-document processing.
//!
//! ```text
//! Pending -> Validating -> Extracting -> SectionLocating -> TableDetecting -> Writing -> Done
//!                 |                            |
//!                 +---------> Rejected <-------+
//! Extracting / timeout / Writing ---> Failed
//! ```
//!
//! Extraction and analysis run on a worker thread bounded by
//! `performance.timeout_seconds`; the output file is only written once the
//! worker has delivered a record in time.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use serde::Serialize;

use crate::config::{ExtractionMode, Settings};
use crate::detect::detect_mime_from_path;
use crate::error::{Disposition, Error, Result};
use crate::extract::{extract_pages, Deadline, OcrExtractor, TextExtractor};
use crate::fields::extract_fields;
use crate::locate::SectionLocator;
use crate::model::{ExtractedText, OutputRecord, TextSource};
use crate::render::{write_record, RenderOptions};
use crate::table_detector::{TableDetector, TableDetectorConfig};

/// Processing state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Validating,
    Extracting,
    SectionLocating,
    TableDetecting,
    Writing,
    Done,
    Rejected,
    Failed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Pending => "Pending",
            State::Validating => "Validating",
            State::Extracting => "Extracting",
            State::SectionLocating => "SectionLocating",
            State::TableDetecting => "TableDetecting",
            State::Writing => "Writing",
            State::Done => "Done",
            State::Rejected => "Rejected",
            State::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Done,
    Rejected,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Done => f.write_str("Done"),
            Status::Rejected => f.write_str("Rejected"),
            Status::Failed => f.write_str("Failed"),
        }
    }
}

impl From<Disposition> for Status {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Rejected => Status::Rejected,
            Disposition::Failed => Status::Failed,
        }
    }
}

/// Summary of one processed document.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Input path
    pub path: PathBuf,

    pub status: Status,

    /// Written output file, for `Done`
    pub output: Option<PathBuf>,

    /// Error text, for `Rejected` and `Failed`
    pub message: Option<String>,

    /// Driver that produced the text, once extraction succeeded
    pub mode: Option<TextSource>,

    /// Where a rejected input was moved or copied to
    pub rejected_to: Option<PathBuf>,

    /// Wall-clock processing time
    pub elapsed: Duration,
}

impl Report {
    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }
}

/// Tracks and logs the state of one document.
struct Tracker<'a> {
    path: &'a Path,
    state: State,
}

impl<'a> Tracker<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            state: State::Pending,
        }
    }

    fn enter(&mut self, next: State) {
        log::debug!("{}: {} -> {}", self.path.display(), self.state, next);
        self.state = next;
    }
}

/// Read-only state shared with worker threads.
struct Shared {
    settings: Settings,
    locator: SectionLocator,
    text_tables: TableDetector,
    ocr_tables: TableDetector,
}

/// Processes documents according to one resolved configuration.
#[derive(Clone)]
pub struct Pipeline {
    shared: Arc<Shared>,
    render: RenderOptions,
}

impl Pipeline {
    /// Build a pipeline; fails on invalid settings.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let render = RenderOptions::from_settings(&settings)?;
        let locator = SectionLocator::from_settings(&settings)?;
        let text_tables = TableDetector::with_config(TableDetectorConfig::from_settings(
            &settings.text_parser.table_detection,
        )?);
        let ocr_tables = TableDetector::with_config(TableDetectorConfig::from_settings(
            &settings.ocr_parser.table_detection,
        )?);

        Ok(Self {
            shared: Arc::new(Shared {
                settings,
                locator,
                text_tables,
                ocr_tables,
            }),
            render,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    pub fn render_options(&self) -> &RenderOptions {
        &self.render
    }

    /// Replace the render options (e.g. compact JSON).
    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    /// Run one document through every stage and report the outcome.
    pub fn process<P: AsRef<Path>>(&self, path: P) -> Report {
        let path = path.as_ref();
        let started = Instant::now();
        let mut tracker = Tracker::new(path);
        let settings = &self.shared.settings;

        let mut report = Report {
            path: path.to_path_buf(),
            status: Status::Failed,
            output: None,
            message: None,
            mode: None,
            rejected_to: None,
            elapsed: Duration::ZERO,
        };

        tracker.enter(State::Validating);
        let outcome = self.run_stages(path, &mut tracker, &mut report);

        match outcome {
            Ok(output) => {
                tracker.enter(State::Done);
                log::info!("{}: written to {}", path.display(), output.display());
                report.status = Status::Done;
                report.output = Some(output);
            }
            Err(e) => {
                let status = Status::from(e.disposition());
                report.status = status;
                report.message = Some(e.to_string());

                match status {
                    Status::Rejected => {
                        tracker.enter(State::Rejected);
                        log::warn!("{}: rejected: {}", path.display(), e);
                        match route_invalid(path, settings) {
                            Ok(target) => report.rejected_to = target,
                            Err(move_err) => log::error!(
                                "{}: could not move to {}: {}",
                                path.display(),
                                settings.error_handling.invalid_files_dir.display(),
                                move_err
                            ),
                        }
                    }
                    _ => {
                        tracker.enter(State::Failed);
                        log::error!("{}: failed: {}", path.display(), e);
                    }
                }
            }
        }

        report.elapsed = started.elapsed();
        report
    }

    fn run_stages(&self, path: &Path, tracker: &mut Tracker<'_>, report: &mut Report) -> Result<PathBuf> {
        let settings = &self.shared.settings;
        validate(path, settings)?;

        tracker.enter(State::Extracting);
        let record = self.run_with_timeout(path).map_err(|e| {
            if matches!(e, Error::SectionNotFound(_)) {
                tracker.state = State::SectionLocating;
            }
            e
        })?;
        tracker.state = State::TableDetecting;
        report.mode = Some(record.mode);

        tracker.enter(State::Writing);
        write_record(&record, &settings.paths.output_dir, &self.render)
    }

    /// Extract and analyze on a worker thread, waiting at most the timeout.
    fn run_with_timeout(&self, path: &Path) -> Result<OutputRecord> {
        let timeout = self.shared.settings.timeout();
        let deadline = Deadline::after(timeout);
        let (tx, rx) = crossbeam_channel::bounded(1);

        let shared = Arc::clone(&self.shared);
        let worker_path = path.to_path_buf();
        std::thread::Builder::new()
            .name("simdut-worker".to_string())
            .spawn(move || {
                let result = shared.analyze_file(&worker_path, &deadline);
                // the receiver is gone after a timeout
                let _ = tx.send(result);
            })?;

        match timeout {
            Some(limit) => match rx.recv_timeout(limit) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => Err(Error::PipelineTimeout(limit)),
                Err(RecvTimeoutError::Disconnected) => {
                    Err(Error::TextExtract("worker thread terminated unexpectedly".into()))
                }
            },
            None => rx
                .recv()
                .map_err(|_| Error::TextExtract("worker thread terminated unexpectedly".into()))?,
        }
    }

    /// Locate, detect and collect fields in already extracted text.
    pub fn analyze(&self, source: &Path, text: &ExtractedText) -> Result<OutputRecord> {
        self.shared.analyze(source, text)
    }
}

impl Shared {
    fn analyze_file(&self, path: &Path, deadline: &Deadline) -> Result<OutputRecord> {
        let text = self.extract(path, deadline)?;
        deadline.check()?;
        self.analyze(path, &text)
    }

    fn extract(&self, path: &Path, deadline: &Deadline) -> Result<ExtractedText> {
        let settings = &self.settings;
        match settings.general.mode {
            ExtractionMode::Text => self.extract_text_layer(path, deadline),
            ExtractionMode::Ocr => self.extract_ocr(path, deadline),
            ExtractionMode::Auto => {
                let text = self.extract_text_layer(path, deadline);
                if !settings.compatibility.ocr_fallback {
                    return text;
                }

                let reason = match &text {
                    Ok(t) if t.significant_chars() < settings.compatibility.min_text_chars => {
                        Some(format!("only {} characters in the text layer", t.significant_chars()))
                    }
                    Err(e @ Error::ExtractionFailure { .. }) => Some(e.to_string()),
                    _ => None,
                };
                let Some(reason) = reason else {
                    return text;
                };

                if !OcrExtractor::is_available(&settings.ocr_parser.tesseract) {
                    log::warn!(
                        "{}: {}, but OCR tools are unavailable; keeping text layer",
                        path.display(),
                        reason
                    );
                    return text;
                }

                log::info!("{}: {}; falling back to OCR", path.display(), reason);
                match (self.extract_ocr(path, deadline), text) {
                    (Err(e), Ok(text)) if !matches!(e, Error::PipelineTimeout(_)) => {
                        log::warn!("{}: OCR fallback failed ({}); keeping text layer", path.display(), e);
                        Ok(text)
                    }
                    (ocr, _) => ocr,
                }
            }
        }
    }

    fn extract_text_layer(&self, path: &Path, deadline: &Deadline) -> Result<ExtractedText> {
        let extractor = TextExtractor::open(path)?;
        extract_pages(&extractor, &self.settings.retry_policy(), deadline)
    }

    fn extract_ocr(&self, path: &Path, deadline: &Deadline) -> Result<ExtractedText> {
        let settings = &self.settings;
        let extractor = OcrExtractor::open(path, &settings.ocr_parser, settings.paths.temp_dir.as_deref())?
            .with_deadline(*deadline);
        extract_pages(&extractor, &settings.retry_policy(), deadline)
    }

    fn analyze(&self, source: &Path, text: &ExtractedText) -> Result<OutputRecord> {
        let joined = text.joined();

        log::debug!("{}: Extracting -> SectionLocating", source.display());
        let section = self.locator.locate(&joined)?;

        log::debug!("{}: SectionLocating -> TableDetecting", source.display());
        let detector = match text.source {
            TextSource::Text => &self.text_tables,
            TextSource::Ocr => &self.ocr_tables,
        };
        let tables = detector.detect(&section.text);
        let fields = extract_fields(&section, &tables);

        let mut record = OutputRecord::new(source, text.source, self.locator.title(), section);
        record.tables = tables;
        record.fields = fields;
        record.page_count = text.page_count();
        record.failed_pages = text.failed_pages();

        log::debug!(
            "{}: section {} bytes, {} table(s), {} field(s)",
            source.display(),
            record.section.len(),
            record.table_count(),
            record.fields.len()
        );
        Ok(record)
    }
}

/// Check size, then content type, before anything parses the file.
pub fn validate(path: &Path, settings: &Settings) -> Result<()> {
    let size = fs::metadata(path)?.len();
    let limit = settings.max_file_size_bytes();
    if size > limit {
        return Err(Error::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }

    let mime = detect_mime_from_path(path)?;
    if !settings.allows_mime(mime) {
        return Err(Error::UnsupportedFile {
            path: path.to_path_buf(),
            mime: mime.to_string(),
        });
    }
    Ok(())
}

/// Move (or copy) a rejected input into the invalid-files directory.
///
/// Returns the new location, or `None` when the input no longer exists.
pub fn route_invalid(path: &Path, settings: &Settings) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let dir = &settings.error_handling.invalid_files_dir;
    fs::create_dir_all(dir)?;
    let target = unique_target(dir, path);

    if settings.error_handling.move_invalid_files {
        if fs::rename(path, &target).is_err() {
            // rename fails across filesystems
            fs::copy(path, &target)?;
            fs::remove_file(path)?;
        }
        log::info!("{}: moved to {}", path.display(), target.display());
    } else {
        fs::copy(path, &target)?;
        log::info!("{}: copied to {}", path.display(), target.display());
    }
    Ok(Some(target))
}

/// `dir/<name>`, or `dir/<stem>-N.<ext>` when that is taken.
fn unique_target(dir: &Path, path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let candidate = dir.join(&name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());
    let ext = Path::new(&name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..)
        .map(|n| dir.join(format!("{}-{}{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

//! OCR extraction: `pdftoppm` renders a page, `tesseract` reads it.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use lopdf::Document as LopdfDocument;
use tempfile::TempDir;

use super::{Deadline, PageExtractor, Preprocessor};
use crate::config::{OcrParser, Tesseract};
use crate::error::{Error, Result};
use crate::model::TextSource;

/// How often a running tool is checked against the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Recognizes the text of rendered pages.
///
/// Page images live in a private temporary directory that is removed when
/// the extractor is dropped.
pub struct OcrExtractor {
    pdf: PathBuf,
    pages: Vec<u32>,
    engine: Tesseract,
    preprocessor: Preprocessor,
    workdir: TempDir,
    deadline: Deadline,
}

impl OcrExtractor {
    /// Prepare OCR of `path`, keeping page images under `temp_root` when set.
    pub fn open<P: AsRef<Path>>(path: P, settings: &OcrParser, temp_root: Option<&Path>) -> Result<Self> {
        let pdf = path.as_ref().to_path_buf();
        let doc = LopdfDocument::load(&pdf)?;
        let pages = doc.get_pages().keys().copied().collect();

        let mut builder = tempfile::Builder::new();
        builder.prefix("simdut-ocr-");
        let workdir = match temp_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        log::debug!(
            "OcrExtractor: {} (dpi={}, lang={}, oem={}, psm={}) in {}",
            pdf.display(),
            settings.tesseract.dpi,
            settings.tesseract.lang,
            settings.tesseract.oem,
            settings.tesseract.psm,
            workdir.path().display()
        );

        Ok(Self {
            pdf,
            pages,
            engine: settings.tesseract.clone(),
            preprocessor: Preprocessor::new(settings.preprocessing.clone()),
            workdir,
            deadline: Deadline::none(),
        })
    }

    /// Kill running tools once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Check that both the rasterizer and the OCR engine can be run.
    pub fn is_available(engine: &Tesseract) -> bool {
        let rasterizer = Command::new(&engine.rasterizer).arg("-v").output().is_ok();
        let tesseract = Command::new(&engine.binary).arg("--version").output().is_ok();

        if !rasterizer {
            log::debug!("{} not found - install poppler-utils for OCR support", engine.rasterizer);
        }
        if !tesseract {
            log::debug!("{} not found - install tesseract-ocr for OCR support", engine.binary);
        }

        rasterizer && tesseract
    }

    /// Directory holding the page images.
    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    /// Render one page to a PNG file.
    fn rasterize(&self, page: u32) -> Result<PathBuf> {
        let prefix = self.workdir.path().join(format!("page-{}", page));
        let mut command = Command::new(&self.engine.rasterizer);
        command
            .arg("-png")
            .arg("-r")
            .arg(self.engine.dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-singlefile")
            .arg(&self.pdf)
            .arg(&prefix);
        self.run_tool(&mut command, &self.engine.rasterizer, &prefix)?;

        let image = prefix.with_extension("png");
        if !image.exists() {
            return Err(Error::Ocr(format!(
                "{} produced no image for page {}",
                self.engine.rasterizer, page
            )));
        }
        Ok(image)
    }

    /// Run the OCR engine on an image.
    fn recognize(&self, image: &Path) -> Result<String> {
        // tesseract appends .txt to the output base
        let base = image.with_extension("");
        let mut command = Command::new(&self.engine.binary);
        command
            .arg(image)
            .arg(&base)
            .arg("-l")
            .arg(&self.engine.lang)
            .arg("--oem")
            .arg(self.engine.oem.to_string())
            .arg("--psm")
            .arg(self.engine.psm.to_string());
        self.run_tool(&mut command, &self.engine.binary, &base)?;

        let output = base.with_extension("txt");
        let text = fs::read(&output)
            .map_err(|e| Error::Ocr(format!("{} wrote no text: {}", self.engine.binary, e)))?;
        let _ = fs::remove_file(&output);
        Ok(String::from_utf8_lossy(&text).into_owned())
    }

    /// Run an external tool to completion, killing it once the deadline passes.
    ///
    /// Diagnostics go to `<base>.log` rather than a pipe, so a chatty tool
    /// never blocks on a full buffer while it is polled.
    fn run_tool(&self, command: &mut Command, name: &str, base: &Path) -> Result<()> {
        let log_path = base.with_extension("log");
        let stderr = File::create(&log_path)?;
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| Error::Ocr(format!("Failed to run {}: {}", name, e)))?;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if self.deadline.is_expired() {
                log::warn!("{}: deadline passed, killing process {}", name, child.id());
                // already exited between the two checks when kill fails
                let _ = child.kill();
                let _ = child.wait();
                let _ = fs::remove_file(&log_path);
                return Err(Error::PipelineTimeout(self.deadline.limit().unwrap_or_default()));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let diagnostics = fs::read_to_string(&log_path).unwrap_or_default();
        let _ = fs::remove_file(&log_path);
        if !status.success() {
            return Err(Error::Ocr(format!("{} failed ({}): {}", name, status, diagnostics.trim())));
        }
        Ok(())
    }
}

impl PageExtractor for OcrExtractor {
    fn source(&self) -> TextSource {
        TextSource::Ocr
    }

    fn page_numbers(&self) -> Vec<u32> {
        self.pages.clone()
    }

    fn extract_page(&self, page: u32) -> Result<String> {
        let image = self.rasterize(page)?;
        let result = self
            .preprocessor
            .process_file(&image)
            .and_then(|_| self.recognize(&image));
        let _ = fs::remove_file(&image);
        result
    }
}

//! simdut CLI - SDS section extraction tool

mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use simdut::config::ENV_VAR;
use simdut::{
    ExtractionMode, JsonFormat, OcrExtractor, OutputFormat, Pipeline, Report, Settings, Status,
};

/// Configuration file read when `--config` is not given.
const DEFAULT_CONFIG: &str = "config.yaml";

/// Exit code for a run in which at least one document failed.
const EXIT_FAILED: i32 = 1;

/// Exit code for configuration or logging setup errors.
const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(name = "simdut")]
#[command(version)]
#[command(about = "Extract SDS Section 14 and its tables from PDF files", long_about = None)]
struct Cli {
    /// Input PDF files or directories (default: paths.input_dir)
    #[arg(value_name = "PATH")]
    inputs: Vec<PathBuf>,

    /// Configuration file [default: config.yaml]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run on built-in defaults without reading a configuration file
    #[arg(long, conflicts_with = "config")]
    no_config: bool,

    /// Environment overlay to apply
    #[arg(short, long, env = ENV_VAR)]
    env: Option<String>,

    /// Extraction mode (overrides general.mode)
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Output directory (overrides paths.output_dir)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Output format (overrides general.output_format)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved configuration
    Config,

    /// Check that the OCR tools can be run
    Check,

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// PDF text layer only
    Text,
    /// Render pages and run OCR
    Ocr,
    /// Text layer, OCR when it is (nearly) empty
    Auto,
}

impl From<ModeArg> for ExtractionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Text => ExtractionMode::Text,
            ModeArg::Ocr => ExtractionMode::Ocr,
            ModeArg::Auto => ExtractionMode::Auto,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

/// Returns the exit code; `Err` only for fatal setup errors.
fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    if let Some(Commands::Version) = cli.command {
        cmd_version();
        return Ok(0);
    }

    let settings = load_settings(&cli)?;

    match cli.command {
        Some(Commands::Config) => {
            print!("{}", settings.to_yaml()?);
            return Ok(0);
        }
        Some(Commands::Check) => return Ok(cmd_check(&settings)),
        _ => {}
    }

    let log_path = logging::init(&settings.logging, &settings.paths.log_dir)?;
    log::info!(
        "simdut {} starting (mode={}, environment={})",
        env!("CARGO_PKG_VERSION"),
        settings.general.mode,
        cli.env.as_deref().unwrap_or("-")
    );

    let inputs = collect_inputs(&cli.inputs, &settings.paths.input_dir)?;
    if inputs.is_empty() {
        println!("{}", "No PDF files to process".yellow());
        return Ok(0);
    }

    let max_workers = settings.performance.max_workers;
    let batch_size = settings.performance.batch_size;
    let pipeline = Pipeline::new(settings)?;
    let pipeline = if cli.compact {
        let render = pipeline.render_options().clone().with_json_format(JsonFormat::Compact);
        pipeline.with_render_options(render)
    } else {
        pipeline
    };

    let started = Instant::now();
    let reports = run_batch(&pipeline, &inputs, max_workers, batch_size)?;
    print_summary(&reports, started, &log_path);

    Ok(exit_code(&reports))
}

/// 0 when every document was done or rejected, 1 if any failed.
fn exit_code(reports: &[Report]) -> i32 {
    if reports.iter().any(Report::is_failed) {
        EXIT_FAILED
    } else {
        0
    }
}

/// Read, resolve and validate settings, applying command-line overrides.
fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let base = if cli.no_config {
        Settings::default()
    } else {
        let path = cli.config.as_deref().unwrap_or(Path::new(DEFAULT_CONFIG));
        Settings::load(path)?
    };

    if let Some(env) = cli.env.as_deref() {
        if !base.environments.contains_key(env) {
            eprintln!(
                "{}: environment '{}' has no overlay, using base configuration",
                "Warning".yellow().bold(),
                env
            );
        }
    }

    let mut settings = base.resolve(cli.env.as_deref());
    if let Some(mode) = cli.mode {
        settings.general.mode = mode.into();
    }
    if let Some(format) = cli.format {
        settings.general.output_format = format.into();
    }
    if let Some(output) = &cli.output {
        settings.paths.output_dir = output.clone();
    }

    settings.validate()?;
    Ok(settings)
}

/// Expand directories to their PDF files, sorted; files are kept as given.
fn collect_inputs(inputs: &[PathBuf], input_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let roots: Vec<PathBuf> = if inputs.is_empty() {
        vec![input_dir.to_path_buf()]
    } else {
        inputs.to_vec()
    };

    let mut files = Vec::new();
    for root in roots {
        if root.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(&root)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && has_pdf_extension(path))
                .collect();
            found.sort();
            files.extend(found);
        } else if inputs.is_empty() {
            log::warn!("Input directory {} does not exist", root.display());
        } else {
            files.push(root);
        }
    }
    Ok(files)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Process documents on a worker pool, chunk by chunk, keeping input order.
fn run_batch(
    pipeline: &Pipeline,
    inputs: &[PathBuf],
    max_workers: usize,
    batch_size: usize,
) -> Result<Vec<Report>, Box<dyn std::error::Error>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers.max(1))
        .thread_name(|i| format!("simdut-batch-{}", i))
        .build()?;

    let pb = if inputs.len() > 1 {
        let pb = ProgressBar::new(inputs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut reports = Vec::with_capacity(inputs.len());
    for chunk in inputs.chunks(batch_size.max(1)) {
        log::debug!("Starting batch of {} document(s)", chunk.len());
        let chunk_reports: Vec<Report> = pool.install(|| {
            chunk
                .par_iter()
                .map(|path| {
                    let report = pipeline.process(path);
                    if let Some(pb) = &pb {
                        pb.inc(1);
                    }
                    report
                })
                .collect()
        });

        for report in &chunk_reports {
            let line = status_line(report);
            match &pb {
                Some(pb) => pb.println(line),
                None => println!("{}", line),
            }
        }
        reports.extend(chunk_reports);
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    Ok(reports)
}

fn status_line(report: &Report) -> String {
    let (label, detail) = match report.status {
        Status::Done => (
            "Done".green().bold(),
            report
                .output
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        ),
        Status::Rejected => (
            "Rejected".yellow().bold(),
            report.message.clone().unwrap_or_default(),
        ),
        Status::Failed => (
            "Failed".red().bold(),
            report.message.clone().unwrap_or_default(),
        ),
    };

    format!(
        "{:>8} {} {} {}",
        label,
        report.path.display(),
        "─".dimmed(),
        detail.dimmed()
    )
}

fn print_summary(reports: &[Report], started: Instant, log_path: &Path) {
    let count = |status: Status| reports.iter().filter(|r| r.status == status).count();
    let (done, rejected, failed) = (
        count(Status::Done),
        count(Status::Rejected),
        count(Status::Failed),
    );

    log::info!(
        "Processed {} document(s): {} done, {} rejected, {} failed",
        reports.len(),
        done,
        rejected,
        failed
    );

    println!();
    println!("{}", "Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Documents".bold(), reports.len());
    println!("{}: {}", "Done".bold(), done.to_string().green());
    println!("{}: {}", "Rejected".bold(), rejected.to_string().yellow());
    println!("{}: {}", "Failed".bold(), failed.to_string().red());
    println!("{}: {:.1?}", "Elapsed".bold(), started.elapsed());
    println!("{}: {}", "Log".bold(), log_path.display().to_string().dimmed());
}

fn cmd_check(settings: &Settings) -> i32 {
    let engine = &settings.ocr_parser.tesseract;

    println!("{}", "OCR Tools".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Rasterizer".bold(), engine.rasterizer);
    println!("{}: {}", "Engine".bold(), engine.binary);
    println!(
        "{}: {} (oem {}, psm {}, {} dpi)",
        "Language".bold(),
        engine.lang,
        engine.oem,
        engine.psm,
        engine.dpi
    );

    if OcrExtractor::is_available(engine) {
        println!("\n{}", "OCR available".green().bold());
        0
    } else {
        println!(
            "\n{} install poppler-utils and tesseract-ocr for OCR support",
            "OCR unavailable:".red().bold()
        );
        EXIT_FAILED
    }
}

fn cmd_version() {
    println!("{} {}", "simdut".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("SDS section extraction tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_inputs_expands_directories_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let files = collect_inputs(&[dir.path().to_path_buf()], Path::new("unused")).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.PDF"), dir.path().join("b.pdf")]
        );
    }

    #[test]
    fn test_collect_inputs_defaults_to_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.pdf"), "x").unwrap();

        let files = collect_inputs(&[], dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("one.pdf")]);

        let missing = collect_inputs(&[], &dir.path().join("absent")).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_collect_inputs_keeps_explicit_files() {
        let files = collect_inputs(&[PathBuf::from("missing.pdf")], Path::new("unused")).unwrap();
        assert_eq!(files, vec![PathBuf::from("missing.pdf")]);
    }

    #[test]
    fn test_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.yaml");
        fs::write(
            &config,
            "general:\n  mode: text\nenvironments:\n  production:\n    logging:\n      level: WARNING\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "simdut",
            "--config",
            config.to_str().unwrap(),
            "--env",
            "production",
            "--mode",
            "ocr",
            "--format",
            "csv",
            "--output",
            "results",
        ]);
        let settings = load_settings(&cli).unwrap();

        assert_eq!(settings.general.mode, ExtractionMode::Ocr);
        assert_eq!(settings.general.output_format, OutputFormat::Csv);
        assert_eq!(settings.paths.output_dir, PathBuf::from("results"));
        assert_eq!(settings.logging.level, "WARNING");
    }

    #[test]
    fn test_missing_explicit_config_is_fatal() {
        let cli = Cli::parse_from(["simdut", "--config", "/nonexistent/simdut.yaml"]);
        assert!(load_settings(&cli).is_err());
    }

    #[test]
    fn test_missing_default_config_is_fatal() {
        // tests run from the package directory, which has no config.yaml
        assert!(!Path::new(DEFAULT_CONFIG).exists());

        let cli = Cli::parse_from(["simdut"]);
        let err = load_settings(&cli).unwrap_err();
        assert!(err.to_string().contains(DEFAULT_CONFIG), "{}", err);
    }

    #[test]
    fn test_no_config_uses_defaults() {
        let cli = Cli::parse_from(["simdut", "--no-config", "--mode", "text"]);
        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.general.section_title, "Section 14");
        assert_eq!(settings.general.mode, ExtractionMode::Text);

        assert!(Cli::try_parse_from(["simdut", "--no-config", "--config", "x.yaml"]).is_err());
    }

    #[test]
    fn test_batch_keeps_input_order_and_sets_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let sds: &[&str] = &[
            "Section 14 Transport information",
            "UN number | UN1090",
            "Class | 3",
            "Section 15 Regulatory information",
        ];
        let write = |name: &str| {
            let path = dir.path().join(name);
            fs::write(&path, simdut::testing::build_pdf(&[sds]).unwrap()).unwrap();
            path
        };

        let first = write("first.pdf");
        let not_pdf = dir.path().join("notes.pdf");
        fs::write(&not_pdf, "plain text").unwrap();
        let missing = dir.path().join("missing.pdf");
        let last = write("last.pdf");
        let inputs = vec![first.clone(), not_pdf.clone(), missing.clone(), last.clone()];

        let mut settings = Settings::default();
        settings.general.mode = ExtractionMode::Text;
        settings.paths.output_dir = dir.path().join("out");
        settings.error_handling.invalid_files_dir = dir.path().join("invalid");
        settings.error_handling.retry_delay = 0.0;
        let pipeline = Pipeline::new(settings).unwrap();

        let reports = run_batch(&pipeline, &inputs, 2, 3).unwrap();
        let order: Vec<(&Path, Status)> = reports.iter().map(|r| (r.path.as_path(), r.status)).collect();
        assert_eq!(
            order,
            vec![
                (first.as_path(), Status::Done),
                (not_pdf.as_path(), Status::Rejected),
                (missing.as_path(), Status::Failed),
                (last.as_path(), Status::Done),
            ]
        );
        assert_eq!(exit_code(&reports), EXIT_FAILED);

        let reports = run_batch(&pipeline, &[last], 2, 3).unwrap();
        assert_eq!(exit_code(&reports), 0);
        assert_eq!(exit_code(&[]), 0);
    }
}

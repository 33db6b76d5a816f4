//! Log setup: env_logger writing to a size-rotated file, optionally teed to stderr.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;

use simdut::config::Logging;

/// Parse a level name; `WARNING` and `CRITICAL` are accepted as well.
pub fn parse_level(name: &str) -> Result<LevelFilter, String> {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "NOTSET" => Ok(LevelFilter::Trace),
        "DEBUG" => Ok(LevelFilter::Debug),
        "INFO" => Ok(LevelFilter::Info),
        "WARN" | "WARNING" => Ok(LevelFilter::Warn),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(LevelFilter::Error),
        "OFF" => Ok(LevelFilter::Off),
        other => Err(format!("unknown log level '{}'", other)),
    }
}

/// Append-only log file that rolls over at a size limit.
///
/// On rollover `name` becomes `name.1`, `name.1` becomes `name.2` and so on;
/// the oldest of `backups` files is dropped.
pub struct RotatingFile {
    path: PathBuf,
    max_size: u64,
    backups: u32,
    file: File,
    size: u64,
    console: bool,
}

impl RotatingFile {
    pub fn open(path: &Path, max_size: u64, backups: u32, console: bool) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            max_size,
            backups,
            file,
            size,
            console,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self, index: u32) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups > 0 {
            let oldest = self.backup_path(self.backups);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for index in (1..self.backups).rev() {
                let from = self.backup_path(index);
                if from.exists() {
                    fs::rename(&from, self.backup_path(index + 1))?;
                }
            }
            fs::rename(&self.path, self.backup_path(1))?;
            self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        } else {
            self.file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)?;
        }

        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.max_size > 0 && self.size > 0 && self.size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.size += buf.len() as u64;

        if self.console {
            // a closed stderr must not stop file logging
            let _ = io::stderr().write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Install the global logger; returns the log file path.
///
/// `RUST_LOG`, when set, overrides the configured level.
pub fn init(settings: &Logging, log_dir: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let level = parse_level(&settings.level)?;
    let path = log_dir.join(&settings.file_name);
    let writer = RotatingFile::open(
        &path,
        settings.max_file_size,
        settings.backup_count,
        settings.console,
    )?;

    let mut builder = Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.target(),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(writer)))
        .try_init()?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("WARNING").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_level("critical").unwrap(), LevelFilter::Error);
        assert_eq!(parse_level(" info ").unwrap(), LevelFilter::Info);
        assert!(parse_level("LOUD").is_err());
    }

    #[test]
    fn test_rotation_keeps_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("parser.log");
        let mut log = RotatingFile::open(&path, 10, 2, false).unwrap();

        log.write_all(b"first-line\n").unwrap();
        log.write_all(b"second-line\n").unwrap();
        log.write_all(b"third-line\n").unwrap();
        log.write_all(b"fourth-line\n").unwrap();
        log.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fourth-line\n");
        assert_eq!(fs::read_to_string(dir.path().join("logs/parser.log.1")).unwrap(), "third-line\n");
        assert_eq!(fs::read_to_string(dir.path().join("logs/parser.log.2")).unwrap(), "second-line\n");
        assert!(!dir.path().join("logs/parser.log.3").exists());
    }

    #[test]
    fn test_no_backups_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parser.log");
        let mut log = RotatingFile::open(&path, 8, 0, false).unwrap();

        log.write_all(b"aaaaaaa\n").unwrap();
        log.write_all(b"bbbbbbb\n").unwrap();
        log.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "bbbbbbb\n");
        assert!(!dir.path().join("parser.log.1").exists());
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parser.log");
        fs::write(&path, "old\n").unwrap();

        let mut log = RotatingFile::open(&path, 1024, 1, false).unwrap();
        log.write_all(b"new\n").unwrap();
        log.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }
}

//! Console and log-file tracing setup.
//!
//! Console output goes to stderr. `RUST_LOG` wins when set; otherwise `-q`
//! silences everything, `-v` shows debug, and the default is warnings only.
//!
//! `--logfile PATH` adds a second layer at `--log-level`. The file is rotated
//! before it is opened once it exceeds 10 MiB; five numbered copies are kept:
//!   steamwatch.log → steamwatch.log.1 → … → steamwatch.log.5

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maximum log file size before rotation (10 MiB).
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated backup files to keep.
pub const MAX_ROTATED_FILES: usize = 5;

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub logfile: Option<PathBuf>,
    pub file_level: LevelFilter,
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(options: &LogOptions) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level(options).to_string()));
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let file = match &options.logfile {
        Some(path) => {
            let file = open_logfile(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(options.file_level),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry().with(console).with(file).try_init();
    Ok(())
}

fn console_level(options: &LogOptions) -> LevelFilter {
    if options.quiet {
        LevelFilter::OFF
    } else if options.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    }
}

fn open_logfile(path: &Path) -> Result<fs::File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    rotate_if_needed(path, MAX_LOG_BYTES, MAX_ROTATED_FILES)
        .with_context(|| format!("failed to rotate {}", path.display()))?;
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

/// Rotate `log_path` if its size reaches `max_bytes`.
///
/// `<name>.<max_files>` is deleted, `<name>.<n>` moves to `<name>.<n+1>`,
/// and the live file becomes `<name>.1`. Returns `true` if rotation occurred.
/// A missing file is not an error.
///
/// No new live file is created here; [`open_logfile`] opens it with
/// `create(true)` right after.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes {
        return Ok(false);
    }

    let oldest = numbered_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..max_files).rev() {
        let src = numbered_path(log_path, n);
        if src.exists() {
            fs::rename(&src, numbered_path(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, numbered_path(log_path, 1))?;
    Ok(true)
}

/// `steamwatch.log` → `steamwatch.log.<n>`.
fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("steamwatch.log");
    base.with_file_name(format!("{name}.{n}"))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

//! Logging and metrics.
//!
//! Logs go through `tracing`. The binary installs one subscriber at startup
//! with [`init_logging`]; library users install their own or none. Output
//! goes to stderr (or a file) so stdout stays free for command results.
//!
//! Counters are emitted through the `metrics` facade and are no-ops unless
//! the host installs a recorder:
//!
//! | Counter | Labels |
//! |---------|--------|
//! | `prompt_expansions_total` | |
//! | `prompt_variables_resolved_total` | `kind` |
//! | `prompt_variables_unresolved_total` | `kind` |
//! | `prompt_note_links_resolved_total` | `status` |
//! | `prompt_store_operations_total` | `operation` |

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingSettings;
use crate::{Error, Result};

/// Environment variable holding a filter directive; wins over `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "NOTECOG_LOG";

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidInput(format!(
                "unknown log format '{other}'; expected 'pretty' or 'json'"
            ))),
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Line format.
    pub format: LogFormat,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
    /// Level filter.
    pub filter: EnvFilter,
}

impl LoggingConfig {
    /// Builds a logging configuration from settings and the environment.
    ///
    /// The filter comes from `NOTECOG_LOG`, then `RUST_LOG`, then the
    /// settings, then a default of `warn` (`debug` for notecog when
    /// `verbose`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown format or an invalid
    /// filter directive.
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Result<Self> {
        let format = settings
            .format
            .as_deref()
            .map_or(Ok(LogFormat::default()), LogFormat::from_str)?;

        let directive = std::env::var(LOG_FILTER_ENV)
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .filter(|v| !v.trim().is_empty())
            .or_else(|| settings.filter.clone())
            .unwrap_or_else(|| default_directive(verbose).to_string());

        let filter = EnvFilter::try_new(&directive)
            .map_err(|e| Error::InvalidInput(format!("invalid log filter '{directive}': {e}")))?;

        Ok(Self {
            format,
            file: settings.file.clone(),
            filter,
        })
    }
}

const fn default_directive(verbose: bool) -> &'static str {
    if verbose { "warn,notecog=debug" } else { "warn" }
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
///
/// Returns an error if logging was already initialized, the log file cannot
/// be opened, or another subscriber is installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    if LOGGING_INIT.get().is_some() {
        return Err(Error::operation(
            "logging_init",
            "logging already initialized",
        ));
    }

    let ansi = config.file.is_none();
    let writer = match &config.file {
        Some(path) => BoxMakeWriter::new(open_log_file(path)?),
        None => BoxMakeWriter::new(io::stderr),
    };

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .with(config.filter)
            .try_init()
            .map_err(init_error)?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true),
            )
            .with(config.filter)
            .try_init()
            .map_err(init_error)?,
    }

    LOGGING_INIT
        .set(())
        .map_err(|()| Error::operation("logging_init", "failed to mark logging initialized"))
}

/// Thread-safe file writer for logging.
#[derive(Clone)]
struct LogFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Opens a log file for appending, creating parent directories.
fn open_log_file(path: &Path) -> Result<LogFileWriter> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::operation("create_log_dir", e))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::operation("open_log_file", format!("{}: {e}", path.display())))?;

    Ok(LogFileWriter {
        file: Arc::new(Mutex::new(file)),
    })
}

#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::operation("logging_init", e)
}

//! # Logging Utilities
//!
//! Logging setup for the srcdbg tools, built on `tracing`.
//!
//! Library crates only emit events through the `tracing` macros; a binary
//! calls one of the `init_*` functions here once at startup to decide where
//! those events go.
//!
//! Console output goes to stderr so it never mixes with a tool's own
//! output on stdout (the `dump` listing, for instance).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use srcdbg_utils::init_logging;
//!
//! // Keep the guard alive until exit so buffered file output is flushed
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!("Tool started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: level filter (e.g. `RUST_LOG=debug`, `RUST_LOG=srcdbg_core=trace`)
//! - `SRCDBG_LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
//! - `SRCDBG_LOG_FILE`: optional log file, rotated daily; console only if unset

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub const LOG_FORMAT_ENV: &str = "SRCDBG_LOG_FORMAT";
pub const LOG_FILE_ENV: &str = "SRCDBG_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable, colored on a terminal
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat
{
    const NAMES: [(&'static str, LogFormat); 2] = [("pretty", LogFormat::Pretty), ("json", LogFormat::Json)];
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        Self::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s.trim()))
            .map(|(_, format)| *format)
            .ok_or_else(|| format!("log format must be 'pretty' or 'json', not '{s}'"))
    }
}

/// Verbosity threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel
{
    Error,
    /// Default for the CLI
    Warn,
    /// Aggregator edits and imports
    Info,
    /// Section summaries and provider construction
    Debug,
    /// Every decoded record
    Trace,
}

impl LogLevel
{
    const NAMES: [(&'static str, LogLevel); 5] = [
        ("error", LogLevel::Error),
        ("warn", LogLevel::Warn),
        ("info", LogLevel::Info),
        ("debug", LogLevel::Debug),
        ("trace", LogLevel::Trace),
    ];

    /// Lowercase name, as accepted by `EnvFilter` directives.
    #[must_use]
    pub fn as_str(self) -> &'static str
    {
        Self::NAMES
            .iter()
            .find(|(_, level)| *level == self)
            .map_or("warn", |(name, _)| name)
    }
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let s = s.trim();
        let s = if s.eq_ignore_ascii_case("warning") { "warn" } else { s };
        Self::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, level)| *level)
            .ok_or_else(|| format!("log level must be one of error, warn, info, debug, trace; got '{s}'"))
    }
}

/// Keeps the background log file writer running
///
/// Dropping it flushes and stops file logging; hold it for the lifetime of
/// the program.
#[derive(Debug)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// - `RUST_LOG`: level filter, default `warn`
/// - `SRCDBG_LOG_FORMAT`: `json` or `pretty`, default `pretty`
/// - `SRCDBG_LOG_FILE`: optional log file
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file directory cannot be created.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_default();

    // RUST_LOG accepts full directive lists; anything unparseable means "warn"
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LogLevel::Warn.as_str()));
    init_logging_internal(format, filter, log_file_from_env())
}

/// Initialize logging with an explicit level, ignoring `RUST_LOG`
///
/// Used for a `--log-level` command line flag. `SRCDBG_LOG_FILE` is still
/// honored.
///
/// ```rust,no_run
/// use srcdbg_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    let filter = EnvFilter::new(level.as_str());
    init_logging_internal(format, filter, log_file_from_env())
}

fn log_file_from_env() -> Option<PathBuf>
{
    env::var_os(LOG_FILE_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Directory and file name prefix for a daily rolling appender
fn split_log_path(path: &Path) -> (PathBuf, PathBuf)
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_name()
        .map_or_else(|| PathBuf::from("srcdbg.log"), PathBuf::from);
    (dir, prefix)
}

fn init_logging_internal(
    format: LogFormat,
    filter: EnvFilter,
    log_file: Option<PathBuf>,
) -> Result<LoggingGuard, LoggingError>
{
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(io::stderr);
    layers.push(match format {
        LogFormat::Pretty => console.with_ansi(true).with_filter(filter.clone()).boxed(),
        LogFormat::Json => console
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter.clone())
            .boxed(),
    });

    let mut file_guard = None;
    if let Some(path) = log_file {
        let (dir, prefix) = split_log_path(&path);
        std::fs::create_dir_all(&dir)?;
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, prefix));
        file_guard = Some(guard);

        let file = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false);
        layers.push(match format {
            LogFormat::Pretty => file.with_filter(filter).boxed(),
            LogFormat::Json => file.json().with_filter(filter).boxed(),
        });
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::AlreadyInitialized(err.to_string()))?;

    Ok(LoggingGuard { _file: file_guard })
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// A global subscriber was already installed
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(String),

    /// The log file directory could not be created
    #[error("cannot create log directory: {0}")]
    LogDirectory(#[from] io::Error),
}

//! # daylog
//!
//! daylog is a process-wide logger that fans every line out to a daily log
//! file and any number of extra sinks at once. **The daily file is rotated
//! transparently when the calendar day changes**, so a long-running process
//! always writes to `./log/<name>-<YYYYMMDD>.log` for the current day without
//! any timer or restart.
//!
//! The logger is a singleton: the first call to [`multi_sink_logger`],
//! [`single_sink_logger`] or [`LoggerBuilder::install`] builds it, and every
//! later call, from any thread, returns that same instance. Each severity has
//! a plain form joining its arguments with spaces and a formatted form taking
//! `format_args!`; the macros wrap the latter.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io;
//!
//! fn main() {
//!     // Writes to ./log/server-<today>.log and to stderr.
//!     let logger = daylog::multi_sink_logger("server", [Box::new(io::stderr()) as Box<dyn io::Write + Send>]);
//!
//!     logger.info(["listening on", "0.0.0.0:8080"]);
//!     daylog::warn!(logger, "{} connections dropped", 3);
//!     logger.errorf(format_args!("upstream {} unreachable", "db-1"));
//! }
//! ```
use std::{
    fmt::{self, Display},
    io,
    panic::Location,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

mod fanout;
mod format;
mod macros;
mod rotation;
mod sink;
mod single;

use {fanout::FanoutWriter, format::join_args, rotation::DailyRotation, single::SingleSinkLogger};

pub use {
    format::{FileStyle, LineFormat, Severity},
    rotation::{Clock, SystemClock, TimeZone},
    sink::SinkId,
};

/// Base name of the daily file when none is given.
pub const DEFAULT_BASE_NAME: &str = "JLogger";

/// Directory holding the daily files unless configured otherwise.
pub const DEFAULT_DIRECTORY: &str = "./log";

/// Exit status of the process after a fatal line.
pub const FATAL_EXIT_CODE: i32 = 2;

/// Exit status when the daily file cannot be opened while the logger is
/// being installed or rotated.
pub const INIT_FAILURE_EXIT_CODE: i32 = 1;

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Errors that can occur when building or reconfiguring a logger.
///
/// Writing a line never returns an error: failures of individual sinks are
/// swallowed, and a daily file that cannot be opened ends the process.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Failed to create directory '{0}': {1}")]
    CreateDirectoryFailed(PathBuf, String),
    #[error("Failed to create file '{0}': {1}")]
    CreateFileFailed(PathBuf, String),
    #[error("Failed to set file permissions for '{path}': {error}")]
    SetFilePermissionsError { path: PathBuf, error: String },
    #[error("File IO error: {0}")]
    FileIOError(#[from] io::Error),
    #[error("{0} is the daily log file and cannot be removed or replaced")]
    FileSinkProtected(SinkId),
    #[error("{0} is not registered")]
    UnknownSink(SinkId),
    #[error("Sinks can only be managed on a multi-sink logger")]
    NotMultiSink,
}

/// Which kind of logger the process ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One destination, no rotation.
    SingleSink,
    /// The daily file plus extra sinks, written concurrently.
    MultiSink,
}

#[derive(Debug)]
enum Inner {
    Single(SingleSinkLogger),
    Multi(FanoutWriter),
}

/// A logger in either single-sink or multi-sink mode.
///
/// Most programs never construct one directly and use the process-wide
/// instance returned by [`multi_sink_logger`], [`single_sink_logger`] or
/// [`LoggerBuilder::install`] instead.
#[derive(Debug)]
pub struct Logger {
    inner: Inner,
}

impl Logger {
    /// Create a standalone logger writing to `writer` only.
    ///
    /// An empty `format` ([`LineFormat::new`]) is replaced by
    /// [`LineFormat::default`]; pass [`LineFormat::message_only`] for lines
    /// without any header.
    pub fn single_sink<W>(writer: W, format: LineFormat) -> Self
    where
        W: io::Write + Send + 'static,
    {
        Logger {
            inner: Inner::Single(SingleSinkLogger::new(Box::new(writer), format)),
        }
    }

    /// Create a standalone multi-sink logger with the default configuration.
    ///
    /// Equivalent to `LoggerBuilder::new(base_name).sinks(sinks).build()`.
    pub fn multi_sink<I>(base_name: &str, sinks: I) -> Result<Self, LoggerError>
    where
        I: IntoIterator<Item = Box<dyn io::Write + Send>>,
    {
        LoggerBuilder::new(base_name).sinks(sinks).build()
    }

    pub fn mode(&self) -> Mode {
        match &self.inner {
            Inner::Single(_) => Mode::SingleSink,
            Inner::Multi(_) => Mode::MultiSink,
        }
    }

    /// Number of destinations, the daily file included.
    pub fn sink_count(&self) -> usize {
        match &self.inner {
            Inner::Single(_) => 1,
            Inner::Multi(writer) => writer.sink_count(),
        }
    }

    /// Header format of the sinks.
    pub fn format(&self) -> LineFormat {
        match &self.inner {
            Inner::Single(logger) => logger.format(),
            Inner::Multi(writer) => writer.format(),
        }
    }

    /// The `YYYYMMDD` day of the active daily file.
    pub fn current_day(&self) -> Option<String> {
        match &self.inner {
            Inner::Single(_) => None,
            Inner::Multi(writer) => Some(writer.current_day()),
        }
    }

    /// Path of the active daily file.
    pub fn log_path(&self) -> Option<PathBuf> {
        match &self.inner {
            Inner::Single(_) => None,
            Inner::Multi(writer) => Some(writer.log_path()),
        }
    }

    pub fn base_name(&self) -> Option<&str> {
        match &self.inner {
            Inner::Single(_) => None,
            Inner::Multi(writer) => Some(writer.base_name()),
        }
    }

    /// Id of the sink backed by the active daily file.
    pub fn file_sink(&self) -> Option<SinkId> {
        match &self.inner {
            Inner::Single(_) => None,
            Inner::Multi(writer) => Some(writer.file_sink_id()),
        }
    }

    /// Register another destination. It receives every line from now on,
    /// with the same header format as the daily file.
    pub fn add_sink<W>(&self, writer: W) -> Result<SinkId, LoggerError>
    where
        W: io::Write + Send + 'static,
    {
        Ok(self.fanout()?.add_sink(Box::new(writer)))
    }

    /// Unregister a destination and flush it.
    pub fn remove_sink(&self, id: SinkId) -> Result<(), LoggerError> {
        self.fanout()?.remove_sink(id)
    }

    /// Swap the destination registered under `id`, keeping the id.
    pub fn replace_sink<W>(&self, id: SinkId, writer: W) -> Result<(), LoggerError>
    where
        W: io::Write + Send + 'static,
    {
        self.fanout()?.replace_sink(id, Box::new(writer))
    }

    fn fanout(&self) -> Result<&FanoutWriter, LoggerError> {
        match &self.inner {
            Inner::Single(_) => Err(LoggerError::NotMultiSink),
            Inner::Multi(writer) => Ok(writer),
        }
    }

    /// Write one line tagged with `severity` at the caller's location.
    ///
    /// This never exits the process, even for [`Severity::Fatal`]; use
    /// [`fatal`](Self::fatal) for that.
    #[track_caller]
    pub fn log(&self, severity: Severity, message: &str) {
        let location = Location::caller();
        match &self.inner {
            Inner::Single(logger) => {
                if let Err(err) = logger.write(severity, location, message) {
                    tracing::trace!(error = %err, "single sink write failed");
                }
            }
            Inner::Multi(writer) => {
                if let Err(err) = writer.write(severity, location, message) {
                    abort(&err);
                }
            }
        }
    }

    #[track_caller]
    pub fn debug<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Display,
    {
        self.log(Severity::Debug, &join_args(args));
    }

    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Debug, &fmt::format(args));
    }

    #[track_caller]
    pub fn info<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Display,
    {
        self.log(Severity::Info, &join_args(args));
    }

    #[track_caller]
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Info, &fmt::format(args));
    }

    #[track_caller]
    pub fn warn<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Display,
    {
        self.log(Severity::Warn, &join_args(args));
    }

    #[track_caller]
    pub fn warnf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Warn, &fmt::format(args));
    }

    #[track_caller]
    pub fn error<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Display,
    {
        self.log(Severity::Error, &join_args(args));
    }

    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Error, &fmt::format(args));
    }

    #[track_caller]
    pub fn critical<I>(&self, args: I)
    where
        I: IntoIterator,
        I::Item: Display,
    {
        self.log(Severity::Critical, &join_args(args));
    }

    #[track_caller]
    pub fn criticalf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Critical, &fmt::format(args));
    }

    /// Write a fatal line to every sink, then exit the process with
    /// [`FATAL_EXIT_CODE`].
    #[track_caller]
    pub fn fatal<I>(&self, args: I) -> !
    where
        I: IntoIterator,
        I::Item: Display,
    {
        self.log(Severity::Fatal, &join_args(args));
        self.exit()
    }

    /// Formatted form of [`fatal`](Self::fatal).
    #[track_caller]
    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.log(Severity::Fatal, &fmt::format(args));
        self.exit()
    }

    fn exit(&self) -> ! {
        // Multi-sink writes are flushed per line already.
        if let Inner::Single(logger) = &self.inner {
            let _ = logger.flush();
        }
        std::process::exit(FATAL_EXIT_CODE)
    }
}

/// The daily file could not be opened: report and stop the process.
fn abort(err: &LoggerError) -> ! {
    eprintln!("daylog: cannot continue without the daily log file: {err}");
    std::process::exit(INIT_FAILURE_EXIT_CODE)
}

/// Provides a fluent interface for configuring multi-sink loggers.
///
/// # Default Configuration
///
/// * Files are written to `./log`, which must already exist
/// * Rotation at midnight in the local time zone
/// * New files requested with mode `0o666` (before the umask)
/// * Date and microsecond time in front of every line
/// * No extra sinks
///
/// # Examples
///
/// ```rust
/// use daylog::{LoggerBuilder, TimeZone};
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = LoggerBuilder::new("worker")
///     .directory(dir.path())
///     .time_zone(TimeZone::UTC)
///     .sink(std::io::sink())
///     .build()
///     .unwrap();
///
/// logger.info(["job", "started"]);
/// assert_eq!(logger.sink_count(), 2);
/// ```
pub struct LoggerBuilder {
    policy: DailyRotation,
    clock: Arc<dyn Clock>,
    sinks: Vec<Box<dyn io::Write + Send>>,
}

impl LoggerBuilder {
    /// Create a builder for files named `<base_name>-<YYYYMMDD>.log`. An
    /// empty name falls back to [`DEFAULT_BASE_NAME`].
    pub fn new(base_name: &str) -> Self {
        let base_name = if base_name.is_empty() {
            DEFAULT_BASE_NAME
        } else {
            base_name
        };
        LoggerBuilder {
            policy: DailyRotation {
                directory: PathBuf::from(DEFAULT_DIRECTORY),
                base_name: base_name.to_string(),
                time_zone: TimeZone::Local,
                file_mode: None,
                create_dir: false,
                format: LineFormat::multi_sink(),
            },
            clock: Arc::new(SystemClock),
            sinks: Vec::new(),
        }
    }

    /// Set the directory holding the daily files.
    pub fn directory<P: AsRef<Path>>(self, directory: P) -> Self {
        Self {
            policy: DailyRotation {
                directory: directory.as_ref().to_path_buf(),
                ..self.policy
            },
            ..self
        }
    }

    /// Set the time zone deciding when a day ends.
    pub fn time_zone(self, time_zone: TimeZone) -> Self {
        Self {
            policy: DailyRotation { time_zone, ..self.policy },
            ..self
        }
    }

    /// Set the file permissions for daily files (Unix-like systems only),
    /// in octal notation like `chmod`, e.g. `0o644`.
    pub fn file_mode(self, mode: u32) -> Self {
        Self {
            policy: DailyRotation {
                file_mode: Some(mode),
                ..self.policy
            },
            ..self
        }
    }

    /// Create the directory when it does not exist instead of failing.
    pub fn create_dir(self, create_dir: bool) -> Self {
        Self {
            policy: DailyRotation { create_dir, ..self.policy },
            ..self
        }
    }

    /// Set the header written before every line on every sink.
    pub fn format(self, format: LineFormat) -> Self {
        Self {
            policy: DailyRotation { format, ..self.policy },
            ..self
        }
    }

    /// Add an extra destination.
    pub fn sink<W>(mut self, writer: W) -> Self
    where
        W: io::Write + Send + 'static,
    {
        self.sinks.push(Box::new(writer));
        self
    }

    /// Add several extra destinations.
    pub fn sinks<I>(mut self, writers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn io::Write + Send>>,
    {
        self.sinks.extend(writers);
        self
    }

    /// Replace the clock deciding the current day and line timestamps.
    pub fn clock<C: Clock + 'static>(self, clock: C) -> Self {
        Self {
            clock: Arc::new(clock),
            ..self
        }
    }

    /// Open today's file and build a standalone logger.
    pub fn build(self) -> Result<Logger, LoggerError> {
        let writer = FanoutWriter::new(self.policy, self.clock, self.sinks)?;
        Ok(Logger {
            inner: Inner::Multi(writer),
        })
    }

    /// Build the process-wide logger, unless one already exists, and return
    /// it.
    ///
    /// Only the first call across the process builds anything; later calls
    /// drop this builder and return the existing logger, whatever its mode.
    /// If today's file cannot be opened the process exits with
    /// [`INIT_FAILURE_EXIT_CODE`].
    pub fn install(self) -> &'static Logger {
        LOGGER.get_or_init(|| self.build().unwrap_or_else(|err| abort(&err)))
    }
}

/// Get the process-wide multi-sink logger, building it on first use.
///
/// Lines go to `./log/<base_name>-<YYYYMMDD>.log` and to every writer in
/// `sinks`. If a logger was already installed, the arguments are dropped and
/// the existing logger is returned unchanged.
pub fn multi_sink_logger<I>(base_name: &str, sinks: I) -> &'static Logger
where
    I: IntoIterator<Item = Box<dyn io::Write + Send>>,
{
    if let Some(logger) = LOGGER.get() {
        return logger;
    }
    LoggerBuilder::new(base_name).sinks(sinks).install()
}

/// Get the process-wide single-sink logger, building it on first use.
///
/// If a logger was already installed, the arguments are dropped and the
/// existing logger is returned unchanged.
pub fn single_sink_logger<W>(writer: W, format: LineFormat) -> &'static Logger
where
    W: io::Write + Send + 'static,
{
    LOGGER.get_or_init(|| Logger::single_sink(writer, format))
}

/// The process-wide logger, if one has been installed.
pub fn global() -> Option<&'static Logger> {
    LOGGER.get()
}

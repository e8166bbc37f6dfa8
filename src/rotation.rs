//! Daily rotation of the file-backed sink.

use {
    crate::{
        format::LineFormat,
        sink::{SinkEntry, SinkId, SinkRegistry},
        LoggerError,
    },
    chrono::{DateTime, FixedOffset, Local, Utc},
    std::{
        fmt::Debug,
        fs,
        path::{Path, PathBuf},
    },
};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

/// Mode requested for newly created log files on Unix, before the umask.
#[cfg(unix)]
const DEFAULT_FILE_MODE: u32 = 0o666;

/// Specifies the time zone used to decide which calendar day it is.
///
/// # Examples
/// ```
/// use daylog::TimeZone;
/// use chrono::FixedOffset;
///
/// // Roll over at UTC midnight regardless of where the process runs.
/// let utc = TimeZone::UTC;
///
/// // Roll over at midnight in UTC+8.
/// let china = TimeZone::Fix(FixedOffset::east_opt(8 * 3600).unwrap());
/// # let _ = (utc, china);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub enum TimeZone {
    /// Use UTC.
    UTC,
    /// Use the system's local time zone, looked up on every check so that
    /// daylight saving changes are followed.
    #[default]
    Local,
    /// Use a fixed offset from UTC.
    Fix(FixedOffset),
}

impl TimeZone {
    fn localize(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            TimeZone::UTC => now.fixed_offset(),
            TimeZone::Local => now.with_timezone(&Local).fixed_offset(),
            TimeZone::Fix(offset) => now.with_timezone(offset),
        }
    }
}

/// Source of the current instant.
///
/// The logger asks the clock on every call; implement this to drive day
/// transitions by hand.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Where and how daily files are created.
#[derive(Debug, Clone)]
pub(crate) struct DailyRotation {
    /// The directory holding the daily files.
    pub(crate) directory: PathBuf,
    /// The file name prefix; files are named `<base_name>-<YYYYMMDD>.log`.
    pub(crate) base_name: String,
    /// The time zone deciding where one day ends.
    pub(crate) time_zone: TimeZone,
    /// Explicit permissions applied to every new file (Unix only).
    pub(crate) file_mode: Option<u32>,
    /// Create `directory` when it is missing instead of failing.
    pub(crate) create_dir: bool,
    /// Header format of the file sink, carried over to every new file.
    pub(crate) format: LineFormat,
}

/// The active day and the file sink that belongs to it.
#[derive(Debug)]
pub(crate) struct RotationState {
    pub(crate) day: String,
    pub(crate) file_id: SinkId,
    pub(crate) path: PathBuf,
}

impl DailyRotation {
    /// The `YYYYMMDD` day `now` falls on in the configured time zone.
    pub(crate) fn day_of(&self, now: DateTime<Utc>) -> String {
        self.time_zone.localize(now).format("%Y%m%d").to_string()
    }

    /// Path of the file for `day`.
    pub(crate) fn path_for(&self, day: &str) -> PathBuf {
        self.directory.join(format!("{}-{}.log", self.base_name, day))
    }

    /// Whether a write happening at `now` must first replace the file sink.
    pub(crate) fn should_rotate(&self, state: &RotationState, now: DateTime<Utc>) -> bool {
        self.day_of(now) != state.day
    }

    /// Open the file for `day` and register it, returning the new state.
    pub(crate) fn open(&self, registry: &mut SinkRegistry, day: String) -> Result<RotationState, LoggerError> {
        let path = self.path_for(&day);
        let file = self.create_log_file(&path)?;
        let file_id = registry.add(SinkEntry::file(path.clone(), file, self.format));
        Ok(RotationState { day, file_id, path })
    }

    /// Replace the file sink if `now` falls on another day than `state`.
    ///
    /// The caller must hold exclusive access to both `state` and `registry`.
    /// The old entry is removed and closed before the new file is opened, so
    /// the registry never holds two file sinks. Returns whether a rotation
    /// happened.
    pub(crate) fn rotate(
        &self,
        state: &mut RotationState,
        registry: &mut SinkRegistry,
        now: DateTime<Utc>,
    ) -> Result<bool, LoggerError> {
        let day = self.day_of(now);
        if day == state.day {
            // Another caller rotated while we waited for the lock.
            return Ok(false);
        }

        if let Some(old) = registry.remove(state.file_id) {
            if let Err(err) = old.close() {
                tracing::warn!(path = %state.path.display(), error = %err, "failed to close rotated log file");
            }
        }

        *state = self.open(registry, day)?;
        tracing::debug!(path = %state.path.display(), day = %state.day, "rotated daily log file");
        Ok(true)
    }

    /// Open a log file for appending, creating it if needed.
    ///
    /// The directory is only created when `create_dir` is set; otherwise a
    /// missing directory is reported as a failure to create the file.
    fn create_log_file(&self, log_path: &Path) -> Result<fs::File, LoggerError> {
        let mut open_options = fs::OpenOptions::new();
        open_options.append(true).create(true);
        #[cfg(unix)]
        open_options.mode(DEFAULT_FILE_MODE);

        if self.create_dir {
            if let Some(parent) = log_path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| LoggerError::CreateDirectoryFailed(parent.to_path_buf(), err.to_string()))?;
            }
        }

        let log_file = open_options
            .open(log_path)
            .map_err(|err| LoggerError::CreateFileFailed(log_path.to_path_buf(), err.to_string()))?;

        self.set_permissions(log_path)?;

        Ok(log_file)
    }

    /// Apply the configured file mode, if any.
    ///
    /// Only has an effect on Unix-like systems; elsewhere a warning is
    /// emitted and the file keeps the platform default.
    fn set_permissions(&self, path: &Path) -> Result<(), LoggerError> {
        if let Some(mode) = self.file_mode {
            #[cfg(unix)]
            {
                fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|err| {
                    LoggerError::SetFilePermissionsError {
                        path: path.to_path_buf(),
                        error: err.to_string(),
                    }
                })?
            }
            #[cfg(not(unix))]
            {
                tracing::warn!(mode, path = %path.display(), "setting file permissions is not supported on this platform");
            }
        }
        Ok(())
    }
}

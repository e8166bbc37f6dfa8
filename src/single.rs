//! Single-sink mode: one destination, written synchronously.

use {
    crate::format::{terminate_line, LineFormat, Severity},
    chrono::Utc,
    std::{
        fmt,
        io::{self, Write as _},
        panic::Location,
        sync::{Mutex, PoisonError},
    },
};

/// A logger with exactly one destination and no rotation.
pub(crate) struct SingleSinkLogger {
    format: LineFormat,
    writer: Mutex<Box<dyn io::Write + Send>>,
}

impl SingleSinkLogger {
    /// An empty format means "no preference" and gets the default header,
    /// which carries the timestamp and the caller's location.
    pub(crate) fn new(writer: Box<dyn io::Write + Send>, format: LineFormat) -> Self {
        let format = if format.is_empty() {
            LineFormat::default()
        } else {
            format
        };
        SingleSinkLogger {
            format,
            writer: Mutex::new(writer),
        }
    }

    /// Render `<header><SEVERITY padded to 10><message>\n` and write it.
    pub(crate) fn write(&self, severity: Severity, location: &Location<'_>, message: &str) -> io::Result<()> {
        let line = terminate_line(format!(
            "{}{:<10}{}",
            self.format.header(Utc::now(), location),
            severity.as_str(),
            message
        ));
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }

    pub(crate) fn flush(&self) -> io::Result<()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner).flush()
    }

    pub(crate) fn format(&self) -> LineFormat {
        self.format
    }
}

impl fmt::Debug for SingleSinkLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleSinkLogger").field("format", &self.format).finish()
    }
}

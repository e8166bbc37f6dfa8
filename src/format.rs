//! Severity tags and line header rendering.

use {
    chrono::{DateTime, FixedOffset, Utc},
    std::{fmt, panic::Location},
};

/// Severity attached to every line.
///
/// There is no filtering: every severity is always written. `Fatal`
/// additionally ends the process once the line has been delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
    Fatal,
}

impl Severity {
    /// Get the tag written into log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the source location of a call is rendered in the line header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStyle {
    /// The path as recorded by the compiler, e.g. `src/server/conn.rs:42`.
    Long,
    /// Only the final path component, e.g. `conn.rs:42`.
    Short,
}

/// Controls the header written before every line.
///
/// The header is built from the local (or UTC) timestamp and, for
/// single-sink loggers, the call site. Multi-sink loggers always carry the
/// call site inside the line body, so their `file` setting is ignored.
///
/// # Examples
/// ```
/// use daylog::{FileStyle, LineFormat};
///
/// // `2025/04/01 19:55:03 conn.rs:42: `
/// let format = LineFormat::new().date(true).time(true).file(FileStyle::Short);
/// # let _ = format;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFormat {
    date: bool,
    time: bool,
    microseconds: bool,
    utc: bool,
    file: Option<FileStyle>,
    message_only: bool,
}

impl LineFormat {
    /// An empty format: no timestamp and no call site.
    ///
    /// A single-sink logger given an empty format falls back to
    /// [`LineFormat::default`]; use [`message_only`](Self::message_only) to
    /// really write nothing but the severity and message there.
    pub const fn new() -> Self {
        LineFormat {
            date: false,
            time: false,
            microseconds: false,
            utc: false,
            file: None,
            message_only: false,
        }
    }

    /// No header at all, honoured by every logger mode.
    pub const fn message_only() -> Self {
        LineFormat {
            message_only: true,
            ..LineFormat::new()
        }
    }

    /// The header used by the file sink and extra sinks of a multi-sink
    /// logger: date and microsecond time, no call site.
    pub const fn multi_sink() -> Self {
        LineFormat {
            date: true,
            time: true,
            microseconds: true,
            utc: false,
            file: None,
            message_only: false,
        }
    }

    /// Write the date as `2025/04/01`.
    pub const fn date(self, date: bool) -> Self {
        Self { date, ..self }
    }

    /// Write the time as `19:55:03`.
    pub const fn time(self, time: bool) -> Self {
        Self { time, ..self }
    }

    /// Write the time with microsecond resolution. Implies [`time`](Self::time).
    pub const fn microseconds(self, microseconds: bool) -> Self {
        Self { microseconds, ..self }
    }

    /// Render timestamps in UTC instead of the local time zone.
    pub const fn utc(self, utc: bool) -> Self {
        Self { utc, ..self }
    }

    /// Record the caller's file and line in single-sink mode.
    pub const fn file(self, style: FileStyle) -> Self {
        Self {
            file: Some(style),
            ..self
        }
    }

    /// Whether no header part was asked for. [`message_only`](Self::message_only)
    /// is not empty: it asks for nothing on purpose.
    pub fn is_empty(&self) -> bool {
        *self == LineFormat::new()
    }

    /// Render the timestamp part of the header, including the trailing space
    /// when anything was written.
    pub(crate) fn timestamp(&self, now: DateTime<Utc>) -> String {
        let mut out = String::new();
        if !(self.date || self.time || self.microseconds) {
            return out;
        }
        let now: DateTime<FixedOffset> = if self.utc {
            now.fixed_offset()
        } else {
            now.with_timezone(&chrono::Local).fixed_offset()
        };
        if self.date {
            out.push_str(&now.format("%Y/%m/%d ").to_string());
        }
        if self.microseconds {
            out.push_str(&now.format("%H:%M:%S%.6f ").to_string());
        } else if self.time {
            out.push_str(&now.format("%H:%M:%S ").to_string());
        }
        out
    }

    /// Render the full single-sink header: timestamp then `file:line: `.
    pub(crate) fn header(&self, now: DateTime<Utc>, location: &Location<'_>) -> String {
        let mut out = self.timestamp(now);
        match self.file {
            Some(FileStyle::Long) => {
                out.push_str(&format!("{}:{}: ", location.file(), location.line()));
            }
            Some(FileStyle::Short) => {
                out.push_str(&format!("{}:{}: ", short_file(location.file()), location.line()));
            }
            None => {}
        }
        out
    }
}

/// The default matches the original flag set: date, microsecond time and the
/// long file name.
impl Default for LineFormat {
    fn default() -> Self {
        LineFormat::multi_sink().file(FileStyle::Long)
    }
}

fn short_file(file: &str) -> &str {
    file.rsplit(['/', '\\']).next().unwrap_or(file)
}

/// Join plain arguments with single spaces.
pub(crate) fn join_args<I>(args: I) -> String
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    let mut out = String::new();
    for (i, arg) in args.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&arg.to_string());
    }
    out
}

/// The body shared by every sink of a multi-sink logger:
/// `<file>:<line>\t<SEVERITY>\t<message>`.
pub(crate) fn fanout_body(severity: Severity, location: &Location<'_>, message: &str) -> String {
    format!(
        "{}:{}\t{}\t{}",
        location.file(),
        location.line(),
        severity.as_str(),
        message
    )
}

/// Append a newline unless the text already ends with one.
pub(crate) fn terminate_line(mut line: String) -> String {
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}

#[cfg(test)]
mod tests {
    use {super::*, chrono::TimeZone as _};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 12, 30, 5).unwrap()
    }

    #[test]
    fn test_severity_tags() {
        let tags: Vec<_> = [
            Severity::Debug,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
            Severity::Critical,
            Severity::Fatal,
        ]
        .iter()
        .map(Severity::as_str)
        .collect();
        assert_eq!(tags, ["DEBUG", "INFO", "WARN", "ERROR", "CRITICAL", "FATAL"]);
    }

    #[test]
    fn test_empty_format_writes_nothing() {
        let format = LineFormat::new();
        assert!(format.is_empty());
        assert_eq!(format.header(noon(), Location::caller()), "");

        let bare = LineFormat::message_only();
        assert!(!bare.is_empty());
        assert_eq!(bare.header(noon(), Location::caller()), "");
        assert!(!LineFormat::new().date(true).is_empty());
    }

    #[test]
    fn test_utc_timestamp() {
        let format = LineFormat::new().date(true).time(true).utc(true);
        assert_eq!(format.timestamp(noon()), "2025/04/01 12:30:05 ");

        let micro = LineFormat::new().microseconds(true).utc(true);
        assert_eq!(micro.timestamp(noon()), "12:30:05.000000 ");
    }

    #[test]
    fn test_header_records_call_site() {
        let location = Location::caller();
        let long = LineFormat::new().file(FileStyle::Long).header(noon(), location);
        assert_eq!(long, format!("{}:{}: ", file!(), location.line()));

        let short = LineFormat::new().file(FileStyle::Short).header(noon(), location);
        assert_eq!(short, format!("format.rs:{}: ", location.line()));
    }

    #[test]
    fn test_join_args() {
        assert_eq!(join_args(["a", "b", "c"]), "a b c");
        assert_eq!(join_args(Vec::<u8>::new()), "");
        assert_eq!(join_args([1, 2]), "1 2");
    }

    #[test]
    fn test_fanout_body() {
        let location = Location::caller();
        let body = fanout_body(Severity::Warn, location, "disk almost full");
        assert_eq!(body, format!("{}:{}\tWARN\tdisk almost full", file!(), location.line()));
        assert_eq!(terminate_line(body.clone()), format!("{body}\n"));
        assert_eq!(terminate_line("done\n".to_string()), "done\n");
    }
}

//! Sink identities, entries, and the registry that maps one to the other.

use {
    crate::format::{terminate_line, LineFormat},
    chrono::{DateTime, Utc},
    std::{
        collections::BTreeMap,
        fmt, fs,
        io::{self, Write as _},
        path::PathBuf,
        sync::{
            atomic::{AtomicU64, Ordering},
            Mutex, PoisonError,
        },
    },
};

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a registered sink.
///
/// Ids are unique for the lifetime of the process, so an id handed out for a
/// removed sink never matches a sink registered later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SinkId(u64);

impl SinkId {
    pub(crate) fn next() -> Self {
        SinkId(NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink#{}", self.0)
    }
}

/// Where a sink's bytes end up.
pub(crate) enum SinkTarget {
    /// The daily log file, owned by the logger.
    File { path: PathBuf, file: fs::File },
    /// Any caller-supplied byte sink.
    Stream(Box<dyn io::Write + Send>),
}

impl SinkTarget {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        match self {
            SinkTarget::File { file, .. } => {
                file.write_all(line)?;
                file.flush()
            }
            SinkTarget::Stream(writer) => {
                writer.write_all(line)?;
                writer.flush()
            }
        }
    }
}

/// A registered destination together with the header format it writes.
pub(crate) struct SinkEntry {
    id: SinkId,
    format: LineFormat,
    target: Mutex<SinkTarget>,
}

impl SinkEntry {
    pub(crate) fn file(path: PathBuf, file: fs::File, format: LineFormat) -> Self {
        SinkEntry {
            id: SinkId::next(),
            format,
            target: Mutex::new(SinkTarget::File { path, file }),
        }
    }

    pub(crate) fn stream(writer: Box<dyn io::Write + Send>, format: LineFormat) -> Self {
        SinkEntry {
            id: SinkId::next(),
            format,
            target: Mutex::new(SinkTarget::Stream(writer)),
        }
    }

    pub(crate) fn id(&self) -> SinkId {
        self.id
    }

    #[cfg(test)]
    pub(crate) fn format(&self) -> LineFormat {
        self.format
    }

    /// Path of the backing file, if this entry is file-backed.
    pub(crate) fn path(&self) -> Option<PathBuf> {
        match &*self.target.lock().unwrap_or_else(PoisonError::into_inner) {
            SinkTarget::File { path, .. } => Some(path.to_owned()),
            SinkTarget::Stream(_) => None,
        }
    }

    /// Write one line: this entry's timestamp header, the body, and a
    /// trailing newline. Concurrent writers to the same entry are serialized.
    pub(crate) fn write_line(&self, now: DateTime<Utc>, body: &str) -> io::Result<()> {
        let line = terminate_line(format!("{}{}", self.format.timestamp(now), body));
        self.target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_line(line.as_bytes())
    }

    /// Flush and release the underlying resource.
    ///
    /// Dropping an entry closes it as well, but silently; this surfaces the
    /// error for files so the caller can report it.
    pub(crate) fn close(self) -> io::Result<()> {
        match self.target.into_inner().unwrap_or_else(PoisonError::into_inner) {
            SinkTarget::File { file, .. } => file.sync_all(),
            SinkTarget::Stream(mut writer) => writer.flush(),
        }
    }
}

impl fmt::Debug for SinkEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkEntry")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("path", &self.path())
            .finish()
    }
}

/// Mapping from sink identity to its entry.
///
/// Ordered by id so iteration follows registration order.
#[derive(Debug, Default)]
pub(crate) struct SinkRegistry {
    entries: BTreeMap<SinkId, SinkEntry>,
}

impl SinkRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register an entry under its own id.
    pub(crate) fn add(&mut self, entry: SinkEntry) -> SinkId {
        let id = entry.id();
        self.entries.insert(id, entry);
        id
    }

    /// Unregister an entry, handing it back so the caller decides how to
    /// close it.
    pub(crate) fn remove(&mut self, id: SinkId) -> Option<SinkEntry> {
        self.entries.remove(&id)
    }

    /// Swap the entry registered under `id` for `entry`, keeping `id` as the
    /// key. Returns the previous entry, or `None` (and registers nothing)
    /// when `id` is unknown.
    pub(crate) fn replace(&mut self, id: SinkId, entry: SinkEntry) -> Option<SinkEntry> {
        let slot = self.entries.get_mut(&id)?;
        let entry = SinkEntry { id, ..entry };
        Some(std::mem::replace(slot, entry))
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: SinkId) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &SinkEntry> {
        self.entries.values()
    }

    /// Number of entries backed by a file.
    #[cfg(test)]
    pub(crate) fn file_count(&self) -> usize {
        self.entries().filter(|entry| entry.path().is_some()).count()
    }

    /// Look up a file-backed entry by the path it writes to.
    #[cfg(test)]
    pub(crate) fn find_file(&self, path: &std::path::Path) -> Option<SinkId> {
        self.entries()
            .find(|entry| entry.path().as_deref() == Some(path))
            .map(SinkEntry::id)
    }
}

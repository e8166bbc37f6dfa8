//! Multi-sink mode: rotate if needed, then deliver one line to every sink.

use {
    crate::{
        format::{fanout_body, LineFormat, Severity},
        rotation::{Clock, DailyRotation, RotationState},
        sink::{SinkEntry, SinkId, SinkRegistry},
        LoggerError,
    },
    chrono::{DateTime, Utc},
    std::{
        io,
        panic::{self, AssertUnwindSafe, Location},
        path::PathBuf,
        sync::{Arc, PoisonError, RwLock},
        thread,
    },
};

/// Everything a rotation may touch, kept behind one lock so that a fan-out
/// sees either the whole registry before a rotation or the whole registry
/// after it.
#[derive(Debug)]
struct MultiState {
    registry: SinkRegistry,
    rotation: RotationState,
}

/// A logger writing to the daily file plus any number of extra sinks.
#[derive(Debug)]
pub(crate) struct FanoutWriter {
    policy: DailyRotation,
    clock: Arc<dyn Clock>,
    state: RwLock<MultiState>,
}

impl FanoutWriter {
    /// Open today's file and register it alongside `extra` sinks.
    pub(crate) fn new(
        policy: DailyRotation,
        clock: Arc<dyn Clock>,
        extra: Vec<Box<dyn io::Write + Send>>,
    ) -> Result<Self, LoggerError> {
        let mut registry = SinkRegistry::new();
        let rotation = policy.open(&mut registry, policy.day_of(clock.now()))?;
        for writer in extra {
            registry.add(SinkEntry::stream(writer, policy.format));
        }
        Ok(FanoutWriter {
            policy,
            clock,
            state: RwLock::new(MultiState { registry, rotation }),
        })
    }

    /// Rotate if the day changed, then write the line to every sink and wait
    /// for all of them.
    ///
    /// Individual sink failures are dropped. A failure to open the new daily
    /// file is returned: the logger cannot keep running without it.
    pub(crate) fn write(&self, severity: Severity, location: &Location<'_>, message: &str) -> Result<(), LoggerError> {
        self.check_rotation()?;

        let now = self.clock.now();
        let body = fanout_body(severity, location, message);
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        thread::scope(|scope| {
            for entry in state.registry.entries() {
                let body = body.as_str();
                let spawned = thread::Builder::new()
                    .name(format!("daylog-{}", entry.id()))
                    .spawn_scoped(scope, move || deliver(entry, now, body));
                if let Err(err) = spawned {
                    tracing::trace!(sink = %entry.id(), error = %err, "failed to spawn sink writer, writing inline");
                    deliver(entry, now, body);
                }
            }
        });
        Ok(())
    }

    /// Double-checked day comparison: cheap shared check first, exclusive
    /// check-and-swap only when the day looks stale.
    fn check_rotation(&self) -> Result<(), LoggerError> {
        let now = self.clock.now();
        let stale = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            self.policy.should_rotate(&state.rotation, now)
        };
        if stale {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let MultiState { registry, rotation } = &mut *guard;
            self.policy.rotate(rotation, registry, now)?;
        }
        Ok(())
    }

    pub(crate) fn add_sink(&self, writer: Box<dyn io::Write + Send>) -> SinkId {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.registry.add(SinkEntry::stream(writer, self.policy.format))
    }

    pub(crate) fn remove_sink(&self, id: SinkId) -> Result<(), LoggerError> {
        let old = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if id == state.rotation.file_id {
                return Err(LoggerError::FileSinkProtected(id));
            }
            state.registry.remove(id).ok_or(LoggerError::UnknownSink(id))?
        };
        old.close()?;
        Ok(())
    }

    pub(crate) fn replace_sink(&self, id: SinkId, writer: Box<dyn io::Write + Send>) -> Result<(), LoggerError> {
        let old = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if id == state.rotation.file_id {
                return Err(LoggerError::FileSinkProtected(id));
            }
            let entry = SinkEntry::stream(writer, self.policy.format);
            state.registry.replace(id, entry).ok_or(LoggerError::UnknownSink(id))?
        };
        old.close()?;
        Ok(())
    }

    pub(crate) fn sink_count(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).registry.len()
    }

    #[cfg(test)]
    pub(crate) fn file_sink_count(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).registry.file_count()
    }

    pub(crate) fn file_sink_id(&self) -> SinkId {
        self.state.read().unwrap_or_else(PoisonError::into_inner).rotation.file_id
    }

    pub(crate) fn current_day(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rotation
            .day
            .clone()
    }

    pub(crate) fn log_path(&self) -> PathBuf {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rotation
            .path
            .clone()
    }

    pub(crate) fn base_name(&self) -> &str {
        &self.policy.base_name
    }

    pub(crate) fn format(&self) -> LineFormat {
        self.policy.format
    }
}

/// Write to one sink, swallowing both errors and panics raised by the sink.
fn deliver(entry: &SinkEntry, now: DateTime<Utc>, body: &str) {
    match panic::catch_unwind(AssertUnwindSafe(|| entry.write_line(now, body))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::trace!(sink = %entry.id(), error = %err, "sink write failed"),
        Err(_) => tracing::trace!(sink = %entry.id(), "sink panicked while writing"),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{rotation::TimeZone, sink::tests::Capture},
        chrono::TimeZone as _,
        std::{
            fs,
            io::Write as _,
            sync::{Barrier, Mutex},
            time::Duration,
        },
        tempfile::TempDir,
    };

    #[derive(Debug)]
    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn at(day: u32) -> Arc<Self> {
            Arc::new(ManualClock(Mutex::new(Utc.with_ymd_and_hms(2025, 4, day, 9, 0, 0).unwrap())))
        }

        fn set_day(&self, day: u32) {
            *self.0.lock().unwrap() = Utc.with_ymd_and_hms(2025, 4, day, 9, 0, 0).unwrap();
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    struct Failing;

    impl io::Write for Failing {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Delays every write, to show the caller waits for it.
    struct Slow {
        capture: Capture,
        delay: Duration,
    }

    impl io::Write for Slow {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            thread::sleep(self.delay);
            self.capture.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Panicking;

    impl io::Write for Panicking {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            panic!("sink exploded");
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn boxed(writer: impl io::Write + Send + 'static) -> Box<dyn io::Write + Send> {
        Box::new(writer)
    }

    fn policy(directory: &std::path::Path) -> DailyRotation {
        DailyRotation {
            directory: directory.to_path_buf(),
            base_name: "svc".to_string(),
            time_zone: TimeZone::UTC,
            file_mode: None,
            create_dir: false,
            format: LineFormat::new(),
        }
    }

    #[test]
    fn test_every_sink_gets_one_line() {
        let dir = TempDir::new().unwrap();
        let captures: Vec<Capture> = (0..4).map(|_| Capture::default()).collect();
        let extra = captures.iter().map(|c| boxed(c.clone())).collect();
        let writer = FanoutWriter::new(policy(dir.path()), ManualClock::at(1), extra).unwrap();
        assert_eq!(writer.sink_count(), 5);

        let location = Location::caller();
        writer.write(Severity::Info, location, "ready").unwrap();

        let expected = format!("{}:{}\tINFO\tready\n", location.file(), location.line());
        for capture in &captures {
            assert_eq!(capture.contents(), expected);
        }
        assert_eq!(fs::read_to_string(writer.log_path()).unwrap(), expected);
    }

    #[test]
    fn test_waits_for_slow_sinks() {
        let dir = TempDir::new().unwrap();
        let capture = Capture::default();
        let slow = Slow {
            capture: capture.clone(),
            delay: Duration::from_millis(150),
        };
        let writer = FanoutWriter::new(policy(dir.path()), ManualClock::at(1), vec![boxed(slow)]).unwrap();

        writer.write(Severity::Debug, Location::caller(), "late").unwrap();
        assert!(capture.contents().ends_with("\tDEBUG\tlate\n"));
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let dir = TempDir::new().unwrap();
        let capture = Capture::default();
        let writer = FanoutWriter::new(
            policy(dir.path()),
            ManualClock::at(1),
            vec![boxed(Failing), boxed(capture.clone()), boxed(Panicking)],
        )
        .unwrap();

        assert!(writer.write(Severity::Error, Location::caller(), "boom").is_ok());
        assert!(capture.contents().ends_with("\tERROR\tboom\n"));
        assert!(fs::read_to_string(writer.log_path()).unwrap().ends_with("\tERROR\tboom\n"));
    }

    #[test]
    fn test_rotation_on_day_change() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(1);
        let writer = FanoutWriter::new(policy(dir.path()), clock.clone(), Vec::new()).unwrap();
        let first_id = writer.file_sink_id();

        writer.write(Severity::Info, Location::caller(), "day one").unwrap();
        writer.write(Severity::Info, Location::caller(), "still day one").unwrap();
        assert_eq!(writer.file_sink_id(), first_id);

        clock.set_day(2);
        writer.write(Severity::Info, Location::caller(), "day two").unwrap();
        assert_ne!(writer.file_sink_id(), first_id);
        assert_eq!(writer.current_day(), "20250402");
        assert_eq!(writer.file_sink_count(), 1);

        let day_one = fs::read_to_string(dir.path().join("svc-20250401.log")).unwrap();
        let day_two = fs::read_to_string(dir.path().join("svc-20250402.log")).unwrap();
        assert_eq!(day_one.lines().count(), 2);
        assert!(day_two.ends_with("\tINFO\tday two\n"));
        assert_eq!(day_two.lines().count(), 1);
    }

    #[test]
    fn test_concurrent_callers_rotate_once() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(1);
        let writer = FanoutWriter::new(policy(dir.path()), clock.clone(), Vec::new()).unwrap();
        clock.set_day(2);

        let barrier = Barrier::new(8);
        let ids = Mutex::new(Vec::new());
        thread::scope(|scope| {
            for i in 0..8 {
                let (writer, barrier, ids) = (&writer, &barrier, &ids);
                scope.spawn(move || {
                    barrier.wait();
                    writer.write(Severity::Warn, Location::caller(), &format!("caller {i}")).unwrap();
                    ids.lock().unwrap().push(writer.file_sink_id());
                });
            }
        });

        let ids = ids.into_inner().unwrap();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(writer.file_sink_count(), 1);
        let day_two = fs::read_to_string(dir.path().join("svc-20250402.log")).unwrap();
        assert_eq!(day_two.lines().count(), 8);
        assert_eq!(fs::read_to_string(dir.path().join("svc-20250401.log")).unwrap(), "");
    }

    #[test]
    fn test_sink_management() {
        let dir = TempDir::new().unwrap();
        let writer = FanoutWriter::new(policy(dir.path()), ManualClock::at(1), Vec::new()).unwrap();
        let first = Capture::default();
        let second = Capture::default();

        let id = writer.add_sink(Box::new(first.clone()));
        writer.write(Severity::Info, Location::caller(), "one").unwrap();
        writer.replace_sink(id, Box::new(second.clone())).unwrap();
        writer.write(Severity::Info, Location::caller(), "two").unwrap();
        writer.remove_sink(id).unwrap();
        writer.write(Severity::Info, Location::caller(), "three").unwrap();

        assert!(first.contents().ends_with("\tone\n"));
        assert_eq!(first.contents().lines().count(), 1);
        assert!(second.contents().ends_with("\ttwo\n"));
        assert_eq!(second.contents().lines().count(), 1);
        assert_eq!(writer.sink_count(), 1);

        assert!(matches!(writer.remove_sink(id), Err(LoggerError::UnknownSink(_))));
        let file_id = writer.file_sink_id();
        assert!(matches!(writer.remove_sink(file_id), Err(LoggerError::FileSinkProtected(_))));
        assert!(matches!(
            writer.replace_sink(file_id, Box::new(Capture::default())),
            Err(LoggerError::FileSinkProtected(_))
        ));
    }
}

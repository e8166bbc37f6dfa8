#![allow(dead_code)]

use {
    chrono::{DateTime, TimeZone as _, Utc},
    daylog::Clock,
    std::{
        io,
        sync::{Arc, Mutex},
    },
};

/// In-memory sink that stays readable after being handed to a logger.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink whose every write fails.
pub struct Broken;

impl io::Write for Broken {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    /// Noon UTC on the given day of April 2025.
    pub fn april(day: u32) -> Self {
        ManualClock(Arc::new(Mutex::new(noon(day))))
    }

    pub fn set_april(&self, day: u32) {
        *self.0.lock().unwrap() = noon(day);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

fn noon(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, day, 12, 0, 0).unwrap()
}

pub fn boxed(writer: impl io::Write + Send + 'static) -> Box<dyn io::Write + Send> {
    Box::new(writer)
}

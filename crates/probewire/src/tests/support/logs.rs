//! In-memory log sink for asserting on emitted records.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Collects formatted log lines written while a closure runs.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Runs `action` with a plain-text subscriber, down to `DEBUG`, that
    /// writes into this sink.
    pub fn record<T>(&self, action: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_target(true)
            .with_max_level(Level::DEBUG)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, action)
    }

    /// Captured lines at `level`, for example `"ERROR"`.
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        let bytes = self.0.lock().expect("log capture lock").clone();
        String::from_utf8(bytes)
            .expect("log output should be utf-8")
            .lines()
            .filter(|line| line.trim_start().starts_with(level))
            .map(str::to_owned)
            .collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("log capture lock")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'writer> MakeWriter<'writer> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'writer self) -> Self::Writer {
        self.clone()
    }
}

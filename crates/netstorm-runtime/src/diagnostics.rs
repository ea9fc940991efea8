//! Human-readable diagnostics.
//!
//! Storm log records go to the NDJSON sink; everything meant for an operator
//! (progress, queued commands, warnings) goes through a [`Diagnostics`] handle
//! to stderr. Handles are cheap to clone and safe to share with the cycle
//! worker thread.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// How much operator output to produce.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    /// Warnings and fatal errors only.
    #[default]
    Quiet,
    /// Tick progress, command output.
    Verbose,
    /// Everything, including per-storm examination and queued commands.
    Debug,
}

enum Sink {
    Stderr,
    Buffer(Vec<u8>),
}

#[derive(Clone)]
pub struct Diagnostics {
    level: Verbosity,
    sink: Arc<Mutex<Sink>>,
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl Diagnostics {
    /// Diagnostics written to stderr.
    #[must_use]
    pub fn stderr(level: Verbosity) -> Self {
        Self {
            level,
            sink: Arc::new(Mutex::new(Sink::Stderr)),
        }
    }

    /// Diagnostics captured in memory (for testing).
    #[must_use]
    pub fn capture(level: Verbosity) -> Self {
        Self {
            level,
            sink: Arc::new(Mutex::new(Sink::Buffer(Vec::new()))),
        }
    }

    #[must_use]
    pub fn enabled(&self, level: Verbosity) -> bool {
        self.level >= level
    }

    /// Always shown.
    pub fn warn(&self, message: &str) {
        self.write(message);
    }

    pub fn verbose(&self, message: impl AsRef<str>) {
        if self.enabled(Verbosity::Verbose) {
            self.write(message.as_ref());
        }
    }

    /// Only formats the message when debug output is on.
    pub fn debug(&self, message: impl FnOnce() -> String) {
        if self.enabled(Verbosity::Debug) {
            self.write(&message());
        }
    }

    /// Text captured so far; empty for stderr diagnostics.
    #[must_use]
    pub fn captured(&self) -> String {
        match &*self.sink.lock() {
            Sink::Buffer(buf) => String::from_utf8_lossy(buf).into_owned(),
            Sink::Stderr => String::new(),
        }
    }

    fn write(&self, message: &str) {
        let mut sink = self.sink.lock();
        // Diagnostics are best effort; a closed stderr must not stop the storm.
        let _ = match &mut *sink {
            Sink::Stderr => writeln!(std::io::stderr().lock(), "{message}"),
            Sink::Buffer(buf) => writeln!(buf, "{message}"),
        };
    }
}

//! Injected logging capability.
//!
//! Components take an `Arc<dyn LogSink>` at construction instead of reaching
//! for a process-wide logger. [`NoopSink`] is the default; the binary wires
//! in [`TracingSink`].

use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;

use tracing::Level;

/// Destination for log lines emitted by the polling core.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Shared no-op sink, used by the plain constructors.
pub fn noop() -> Arc<dyn LogSink> {
    Arc::new(NoopSink)
}

/// Forwards to the `tracing` macros under the `railspeed` target.
#[derive(Clone, Debug)]
pub struct TracingSink {
    tag: &'static str,
}

impl TracingSink {
    pub fn new(tag: &'static str) -> Self {
        Self { tag }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new("rail-speed")
    }
}

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        let tag = self.tag;
        match level {
            Level::ERROR => tracing::error!(target: "railspeed", tag, "{}", message),
            Level::WARN => tracing::warn!(target: "railspeed", tag, "{}", message),
            Level::INFO => tracing::info!(target: "railspeed", tag, "{}", message),
            Level::DEBUG => tracing::debug!(target: "railspeed", tag, "{}", message),
            Level::TRACE => tracing::trace!(target: "railspeed", tag, "{}", message),
        }
    }
}

/// Keeps every line in memory for asserting on log output in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn log(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message.to_string()));
    }
}

// Log sinks - where pipeline and subprocess output ends up
//
// The pipeline hands every line to a LogSink. Emission happens from the
// control thread and from the two stream readers of each running command at
// the same time, so sinks serialize their own updates.
//
// - ConsoleSink: channel + handler thread writing colored lines to stdout
// - MemorySink: in-order capture, for embedding and tests

pub mod console;

pub use console::{ConsoleSink, ConsoleSinkHandle};

use crate::models::{LogEvent, LogTag};
use std::sync::Mutex;

/// Receiver of log lines.
///
/// `emit` may be called concurrently and must not block for long: it sits on
/// the hot path of output streaming. Lines from one stream arrive in order;
/// there is no ordering between stdout and stderr of the same command.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);

    fn info(&self, line: &str) {
        self.emit(LogEvent::info(line));
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything emitted so far, in arrival order.
    pub fn events(&self) -> Vec<LogEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Lines carrying `tag`, in arrival order.
    pub fn lines_tagged(&self, tag: LogTag) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.tag == tag)
            .map(|e| e.line)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: LogEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

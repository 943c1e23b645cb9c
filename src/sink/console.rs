// ConsoleSink - serializes concurrent log events onto a terminal
//
// Emitters never touch the terminal themselves. Each event goes into an
// unbounded channel and a single handler thread writes them out, so:
// - emit() never blocks the stream readers
// - lines are never torn or interleaved mid-line
// - nothing is dropped when the terminal is slow

use super::LogSink;
use crate::models::{LogEvent, LogTag};
use std::io::Write;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

const RESET: &str = "\x1b[0m";

/// ANSI style for each tag (empty for plain output).
fn style(tag: LogTag) -> &'static str {
    match tag {
        LogTag::Stdout => "",
        LogTag::Stderr => "\x1b[38;2;255;76;76m",
        LogTag::Info => "\x1b[38;2;65;188;228m",
        LogTag::Success => "\x1b[1;38;2;0;255;170m",
    }
}

/// Log sink that writes colored lines from a dedicated handler thread.
///
/// # Example
/// ```ignore
/// let (sink, handle) = ConsoleSink::stdout();
/// let sink: Arc<dyn LogSink> = Arc::new(sink);
/// sink.info("[*] starting");
/// drop(sink);
/// handle.join();
/// ```
#[derive(Clone)]
pub struct ConsoleSink {
    tx: mpsc::UnboundedSender<LogEvent>,
}

/// Owns the handler thread; joining it flushes every queued line.
pub struct ConsoleSinkHandle {
    thread: JoinHandle<()>,
}

impl ConsoleSink {
    /// Colored sink on the process's stdout.
    pub fn stdout() -> (Self, ConsoleSinkHandle) {
        Self::with_writer(Box::new(std::io::stdout()), true)
    }

    /// Sink on an arbitrary writer.
    ///
    /// The handler thread runs until every clone of the returned sink is
    /// dropped.
    pub fn with_writer(
        mut writer: Box<dyn Write + Send>,
        colored: bool,
    ) -> (Self, ConsoleSinkHandle) {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogEvent>();

        let thread = std::thread::spawn(move || {
            tracing::debug!("Console sink handler thread started");

            while let Some(event) = rx.blocking_recv() {
                let result = if colored && !style(event.tag).is_empty() {
                    writeln!(writer, "{}{}{}", style(event.tag), event.line, RESET)
                } else {
                    writeln!(writer, "{}", event.line)
                };

                if let Err(e) = result.and_then(|_| writer.flush()) {
                    tracing::warn!("Console sink write failed: {}", e);
                    break;
                }
            }

            tracing::debug!("Console sink handler thread terminated");
        });

        (Self { tx }, ConsoleSinkHandle { thread })
    }
}

impl LogSink for ConsoleSink {
    fn emit(&self, event: LogEvent) {
        tracing::debug!(tag = event.tag.as_str(), "{}", event.line);

        if self.tx.send(event).is_err() {
            tracing::warn!("Console sink handler has stopped - dropping log line");
        }
    }
}

impl ConsoleSinkHandle {
    /// Wait for the handler thread to drain the queue and exit.
    ///
    /// Drop every [`ConsoleSink`] clone first, or this blocks forever.
    pub fn join(self) {
        if self.thread.join().is_err() {
            tracing::error!("Console sink handler thread panicked");
        }
    }
}

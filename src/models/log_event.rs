use std::fmt;
use std::time::Duration;

/// Origin of a log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogTag {
    Stdout,
    Stderr,
    Info,
    Success,
}

impl LogTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::Info => "info",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One complete line handed to the log sink.
///
/// Events are independent values; the sink owns each one after `emit`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEvent {
    pub line: String,
    pub tag: LogTag,
}

impl LogEvent {
    pub fn new(line: impl Into<String>, tag: LogTag) -> Self {
        Self {
            line: line.into(),
            tag,
        }
    }

    pub fn info(line: impl Into<String>) -> Self {
        Self::new(line, LogTag::Info)
    }

    pub fn stdout(line: impl Into<String>) -> Self {
        Self::new(line, LogTag::Stdout)
    }

    pub fn stderr(line: impl Into<String>) -> Self {
        Self::new(line, LogTag::Stderr)
    }

    pub fn success(line: impl Into<String>) -> Self {
        Self::new(line, LogTag::Success)
    }
}

/// Outcome of one spawned command.
///
/// By the time this is returned every line the process wrote has already been
/// delivered to the sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessResult {
    pub command: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

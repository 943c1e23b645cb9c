// Performance metrics module
//
// Lightweight counters for the commands the pipeline spawns and the output
// they stream back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Pipeline-wide counters.
///
/// Uses atomic operations so the two stream readers of a running command can
/// count lines without locking. Summarized once at shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Commands spawned successfully
    pub commands_run: AtomicU64,

    /// Commands that failed to start or exited non-zero
    pub commands_failed: AtomicU64,

    /// Lines streamed from standard output
    pub stdout_lines: AtomicU64,

    /// Lines streamed from standard error
    pub stderr_lines: AtomicU64,

    /// Wall time spent inside spawned commands, in milliseconds
    pub total_command_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            commands_run: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
            stdout_lines: AtomicU64::new(0),
            stderr_lines: AtomicU64::new(0),
            total_command_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_command(&self, duration: Duration) {
        self.commands_run.fetch_add(1, Ordering::Relaxed);
        self.total_command_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_command_failed(&self) {
        self.commands_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stdout_line(&self) {
        self.stdout_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stderr_line(&self) {
        self.stderr_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average wall time per command in milliseconds
    pub fn avg_command_time_ms(&self) -> f64 {
        let total = self.total_command_time_ms.load(Ordering::Relaxed);
        let count = self.commands_run.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Pipeline Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Commands: {} run, {} failed",
            self.commands_run.load(Ordering::Relaxed),
            self.commands_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Command time: {:.2}s (avg: {:.2}ms per command)",
            self.total_command_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_command_time_ms()
        );
        tracing::info!(
            "Output lines: {} stdout, {} stderr",
            self.stdout_lines.load(Ordering::Relaxed),
            self.stderr_lines.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

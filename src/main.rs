//! wylandc - bootstrap build orchestrator for the Wyland project
//!
//! Main entry point for the command-line tool.
//!
//! # Overview
//!
//! This binary wires the library's pipeline to the real system:
//! - Configuration ([`ConfigManager`]: defaults plus `WYLANDC_*` variables)
//! - Logging infrastructure (daily rotating file, console layer in debug mode)
//! - Tokio async runtime (4 worker threads for subprocess streaming)
//! - A colored [`ConsoleSink`] for user-facing progress
//!
//! # Execution Flow
//!
//! 1. Load configuration, anchored at the current directory
//! 2. Initialize logging → logs/wylandc.<date>
//! 3. Create tokio runtime with 4 worker threads
//! 4. Run the pipeline to success or first failure
//! 5. Flush the console sink and log metrics
//!
//! The process exits with status 1 when the pipeline fails.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::sync::Arc;
use wylandc::services::{ProcessRunner, SystemProber};
use wylandc::{APP_NAME, ConfigManager, ConsoleSink, LogSink, Metrics, Pipeline, VERSION};

fn main() -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let root = Utf8PathBuf::try_from(cwd).context("Current directory is not valid UTF-8")?;

    let config = ConfigManager::new()
        .load_resolved(&root)
        .context("Failed to load configuration")?;

    // Held until exit so buffered log lines are flushed
    let log_guard = wylandc::logging::setup_logging(&config.log_dir, APP_NAME, config.debug, config.debug)?;

    tracing::info!("Starting {} v{} in {}", APP_NAME, VERSION, root);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(4)
        .thread_name("wylandc-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    tracing::info!("Tokio runtime initialized with {} worker threads", 4);

    let (console, console_handle) = ConsoleSink::stdout();
    let sink: Arc<dyn LogSink> = Arc::new(console);
    let metrics = Arc::new(Metrics::new());

    let runner = ProcessRunner::new(Arc::clone(&sink), Arc::clone(&metrics));
    let mut pipeline = Pipeline::new(config, SystemProber, runner, Arc::clone(&sink));

    let result = runtime.block_on(pipeline.run());

    pipeline.tracker().log_timings();

    // Every sink clone must be gone before the handler thread can finish
    drop(pipeline);
    drop(sink);
    console_handle.join();

    metrics.log_summary();
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    match result {
        Ok(outcome) => {
            tracing::info!(
                "Build finished with {} (fallback: {}, flags: {:?})",
                outcome.toolchain,
                outcome.used_fallback,
                outcome.flags.as_slice()
            );
            Ok(())
        }
        Err(failure) => {
            tracing::error!("Shutting down after failure in {}", failure.step);
            drop(log_guard);
            std::process::exit(1);
        }
    }
}

// wylandc - bootstrap build orchestrator for the Wyland project
//
// This is the library crate containing the pipeline, its services and the
// data model. The binary crate (main.rs) wires them to the real system.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod sink;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use error::{PipelineError, StepFailure};
pub use metrics::Metrics;
pub use models::{BuildConfig, LogEvent, LogTag, PipelineState, ToolchainContext, ToolchainRef};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use sink::{ConsoleSink, LogSink, MemorySink};
pub use state::{PipelineTracker, StateChange};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

//! Data models for the bootstrap pipeline.
//!
//! All values here live for one process run; nothing is persisted.
//! - [`PipelineState`]: Where the orchestrator currently is
//! - [`ToolchainRef`] / [`ToolchainContext`]: The active compiler pair and the
//!   environment overrides every later command receives
//! - [`BuildFlags`]: Ordered flags for the build-configuration tool
//! - [`LogEvent`] / [`LogTag`]: Lines handed to the log sink
//! - [`ProcessResult`]: Outcome of one spawned command
//! - [`BuildConfig`]: Compile-time defaults, overridable from the environment

pub mod build_config;
pub mod log_event;
pub mod pipeline_state;
pub mod toolchain;

pub use build_config::BuildConfig;
pub use log_event::{LogEvent, LogTag, ProcessResult};
pub use pipeline_state::PipelineState;
pub use toolchain::{BuildFlags, FIXED_BUILD_FLAGS, ToolchainContext, ToolchainRef};

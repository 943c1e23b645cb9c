//! Services module - the individual bootstrap steps.
//!
//! Each service does one thing and takes every collaborator as an explicit
//! parameter, so the pipeline can drive them against real tools or fakes.
//!
//! # Components
//!
//! - [`ProcessRunner`]: Spawns a shell command, streams stdout/stderr line by
//!   line to the log sink, and reports the exit status
//! - [`SystemProber`]: Looks tools up on the search path
//! - [`DependencyInstaller`]: Installs a missing tool with the host package manager
//! - [`ToolchainLocator`]: Picks the first present compiler pair
//! - [`FallbackToolchainBuilder`]: Builds GCC from source when no pair is found
//! - [`RepositoryManager`]: Clones the source repository and syncs submodules
//! - [`BuildConfigurator`] / [`BuildExecutor`]: Run cmake configure and build
//!
//! # Seams
//!
//! [`Prober`] and [`CommandRunner`] are traits. Everything above that spawns
//! or probes is generic over them.

pub mod cmake;
pub mod installer;
pub mod probe;
pub mod process;
pub mod repository;
pub mod toolchain;

pub use cmake::{BuildConfigurator, BuildExecutor};
pub use installer::{DependencyInstaller, PackageManager, Platform};
pub use probe::{Prober, SystemProber};
pub use process::{CommandRunner, Invocation, ProcessRunner};
pub use repository::RepositoryManager;
pub use toolchain::{
    DEFAULT_CANDIDATES, FallbackToolchain, FallbackToolchainBuilder, ToolchainLocator,
};

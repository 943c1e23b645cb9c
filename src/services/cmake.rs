//! Build configuration and execution through cmake.
//!
//! cmake is treated as an opaque external tool: the configurator generates a
//! build tree from the source tree plus [`BuildFlags`], the executor drives
//! that tree. Both run inside the build directory.

use crate::error::PipelineError;
use crate::models::{BuildFlags, ToolchainContext, ToolchainRef};
use crate::services::process::{CommandRunner, Invocation};
use crate::services::toolchain::quote;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Runs the build-configuration step.
#[derive(Debug, Clone)]
pub struct BuildConfigurator {
    source_dir: Utf8PathBuf,
    build_dir: Utf8PathBuf,
}

impl BuildConfigurator {
    pub fn new(source_dir: impl Into<Utf8PathBuf>, build_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
        }
    }

    /// Flags for the given toolchain state.
    ///
    /// Compiler flags are added whenever a toolchain is known. The context's
    /// explicit executables take precedence over the pair's names.
    pub fn flags(
        &self,
        toolchain: Option<&ToolchainRef>,
        context: &ToolchainContext,
        extended_precision: bool,
    ) -> BuildFlags {
        let names = toolchain.map(|t| context.compiler_names(t));
        BuildFlags::new(
            extended_precision,
            names.as_ref().map(|(cc, cxx)| (cc.as_str(), cxx.as_str())),
        )
    }

    /// Full cmake command line for `flags`.
    ///
    /// Flag values containing whitespace (compiler paths under a private
    /// prefix) are quoted so each flag stays a single argument.
    pub fn command(&self, flags: &BuildFlags) -> String {
        let mut parts = vec!["cmake".to_string(), quote(&self.source_dir)];
        parts.extend(flags.as_slice().iter().map(|flag| quote_flag(flag)));
        parts.join(" ")
    }

    /// Create the build directory and configure into it.
    pub async fn configure<R: CommandRunner>(
        &self,
        runner: &R,
        toolchain: &ToolchainRef,
        context: &ToolchainContext,
        extended_precision: bool,
    ) -> Result<BuildFlags, PipelineError> {
        fs::create_dir_all(&self.build_dir).map_err(|e| {
            PipelineError::io(format!("Failed to create build directory {}", self.build_dir), e)
        })?;

        let flags = self.flags(Some(toolchain), context, extended_precision);
        tracing::info!("Configuring with flags: {:?}", flags.as_slice());

        runner
            .run(
                &Invocation::new(self.command(&flags))
                    .dir(&self.build_dir)
                    .toolchain(context),
            )
            .await?;
        Ok(flags)
    }
}

/// Quote the value of a `-DNAME=value` flag when it contains whitespace.
fn quote_flag(flag: &str) -> String {
    match flag.split_once('=') {
        Some((name, value)) if value.chars().any(char::is_whitespace) => {
            format!("{}={}", name, quote(Utf8Path::new(value)))
        }
        _ => flag.to_string(),
    }
}

/// Drives the configured build tree.
#[derive(Debug, Clone)]
pub struct BuildExecutor {
    build_dir: Utf8PathBuf,
    jobs: u32,
}

impl BuildExecutor {
    pub fn new(build_dir: impl Into<Utf8PathBuf>, jobs: u32) -> Self {
        Self {
            build_dir: build_dir.into(),
            jobs,
        }
    }

    pub fn build_dir(&self) -> &Utf8Path {
        &self.build_dir
    }

    pub fn command(&self) -> String {
        format!("cmake --build . -j{}", self.jobs)
    }

    pub async fn build<R: CommandRunner>(
        &self,
        runner: &R,
        context: &ToolchainContext,
    ) -> Result<(), PipelineError> {
        runner
            .run(
                &Invocation::new(self.command())
                    .dir(&self.build_dir)
                    .toolchain(context),
            )
            .await?;
        Ok(())
    }
}

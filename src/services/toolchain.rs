//! Compiler toolchain detection, with a build-from-source fallback.
//!
//! Detection walks an ordered candidate list and trusts a pair once its C++
//! driver is on the search path; the C name is not checked separately.
//! When nothing is found, [`FallbackToolchainBuilder`] downloads a pinned GCC
//! release, builds it into a private prefix under the scratch directory and
//! returns a [`ToolchainContext`] pointing at it. Nothing is installed into
//! the system prefix and the host environment is left untouched.

use crate::error::PipelineError;
use crate::models::{BuildConfig, ToolchainContext, ToolchainRef};
use crate::services::probe::Prober;
use crate::services::process::{CommandRunner, Invocation};
use crate::sink::LogSink;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Candidate compiler pairs, highest priority first.
pub const DEFAULT_CANDIDATES: [(&str, &str); 3] =
    [("gcc", "g++"), ("clang", "clang++"), ("cl", "cl")];

/// Finds the first usable compiler pair.
#[derive(Debug, Clone)]
pub struct ToolchainLocator {
    candidates: Vec<ToolchainRef>,
}

impl ToolchainLocator {
    pub fn new(candidates: Vec<ToolchainRef>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[ToolchainRef] {
        &self.candidates
    }

    /// First candidate whose C++ driver is present, or `None`.
    ///
    /// `None` is an expected outcome and triggers the fallback build.
    pub fn detect<P: Prober>(&self, prober: &P) -> Option<ToolchainRef> {
        let found = self
            .candidates
            .iter()
            .find(|pair| prober.exists(&pair.cxx))
            .cloned();

        match &found {
            Some(pair) => tracing::info!("Detected toolchain {}", pair),
            None => tracing::warn!(
                "No toolchain found among {} candidates",
                self.candidates.len()
            ),
        }
        found
    }
}

impl Default for ToolchainLocator {
    fn default() -> Self {
        Self::new(
            DEFAULT_CANDIDATES
                .iter()
                .map(|(cc, cxx)| ToolchainRef::new(*cc, *cxx))
                .collect(),
        )
    }
}

/// Result of a successful fallback build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackToolchain {
    /// Generic `gcc`/`g++`, resolved through the context's search path
    pub toolchain: ToolchainRef,

    /// Search path and compiler overrides for every later command
    pub context: ToolchainContext,

    /// The pinned suite always supports extended precision
    pub extended_precision: bool,
}

/// Builds GCC from source into a private prefix.
///
/// Layout under the scratch directory:
/// ```text
/// temp/
///   gcc-<v>.tar.gz
///   gcc-<v>/
///     build/         <- configure / make run here
///     gcc-install/   <- --prefix
/// ```
/// Any failing step aborts the build and leaves the scratch directory in
/// place for inspection.
#[derive(Debug, Clone)]
pub struct FallbackToolchainBuilder {
    temp_dir: Utf8PathBuf,
    url: String,
    archive: String,
    source_name: String,
    jobs: u32,
}

impl FallbackToolchainBuilder {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            url: config.gcc_url(),
            archive: config.gcc_archive_name(),
            source_name: config.gcc_source_name(),
            jobs: config.jobs,
        }
    }

    pub fn source_dir(&self) -> Utf8PathBuf {
        self.temp_dir.join(&self.source_name)
    }

    pub fn build_dir(&self) -> Utf8PathBuf {
        self.source_dir().join("build")
    }

    pub fn install_prefix(&self) -> Utf8PathBuf {
        self.source_dir().join("gcc-install")
    }

    /// Download, extract, configure, build and install the pinned suite.
    pub async fn build<R: CommandRunner>(
        &self,
        runner: &R,
        sink: &dyn LogSink,
    ) -> Result<FallbackToolchain, PipelineError> {
        sink.info(&format!("[*] Installing GCC locally in {}", self.temp_dir));
        create_dir(&self.temp_dir)?;

        runner
            .run(&Invocation::new(format!("curl -LO {}", self.url)).dir(&self.temp_dir))
            .await?;
        runner
            .run(&Invocation::new(format!("tar -xzf {}", self.archive)).dir(&self.temp_dir))
            .await?;

        let source_dir = self.source_dir();
        runner
            .run(&Invocation::new("./contrib/download_prerequisites").dir(&source_dir))
            .await?;

        let build_dir = self.build_dir();
        create_dir(&build_dir)?;

        let prefix = self.install_prefix();
        runner
            .run(
                &Invocation::new(format!(
                    "../configure --prefix={} --disable-multilib",
                    quote(&prefix)
                ))
                .dir(&build_dir),
            )
            .await?;
        runner
            .run(&Invocation::new(format!("make -j{}", self.jobs)).dir(&build_dir))
            .await?;
        runner
            .run(&Invocation::new("make install").dir(&build_dir))
            .await?;

        let context = ToolchainContext::for_install(&prefix.join("bin"));
        tracing::info!("Fallback GCC installed under {}", prefix);

        Ok(FallbackToolchain {
            toolchain: ToolchainRef::gcc(),
            context,
            extended_precision: true,
        })
    }
}

fn create_dir(dir: &Utf8Path) -> Result<(), PipelineError> {
    fs::create_dir_all(dir)
        .map_err(|e| PipelineError::io(format!("Failed to create directory {}", dir), e))
}

/// Quote a path for the shell when it contains whitespace.
pub(crate) fn quote(path: &Utf8Path) -> String {
    if path.as_str().chars().any(char::is_whitespace) {
        format!("\"{}\"", path)
    } else {
        path.to_string()
    }
}

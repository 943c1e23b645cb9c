//! End-to-end bootstrap and build workflow.
//!
//! [`Pipeline`] is the only component that knows the full sequence. It drives
//! the services step by step, records every transition in a
//! [`PipelineTracker`], and reports the outcome to the log sink: a single
//! success event, or a single `[ERROR]` event naming the step that failed.
//! No step is retried and nothing is resumed.

use crate::error::{PipelineError, StepFailure};
use crate::models::{BuildConfig, BuildFlags, LogEvent, PipelineState, ToolchainContext, ToolchainRef};
use crate::services::{
    BuildConfigurator, BuildExecutor, CommandRunner, DependencyInstaller, FallbackToolchainBuilder,
    Platform, Prober, RepositoryManager, ToolchainLocator,
};
use crate::sink::LogSink;
use crate::state::{PipelineTracker, StateChange};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::broadcast;

pub const BANNER: &str = "--- WylandC++ Compiler (wylandc)";
pub const SUCCESS_LINE: &str = "OK: Wyland built successfully!";

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub toolchain: ToolchainRef,
    pub context: ToolchainContext,
    pub flags: BuildFlags,
    pub used_fallback: bool,
    pub extended_precision: bool,
}

/// Sequential bootstrap-and-build state machine.
pub struct Pipeline<P: Prober, R: CommandRunner> {
    config: BuildConfig,
    prober: P,
    runner: R,
    sink: Arc<dyn LogSink>,
    tracker: PipelineTracker,
    installer: DependencyInstaller,
    locator: ToolchainLocator,
}

impl<P: Prober, R: CommandRunner> Pipeline<P, R> {
    pub fn new(config: BuildConfig, prober: P, runner: R, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            prober,
            runner,
            sink,
            tracker: PipelineTracker::new(),
            installer: DependencyInstaller::for_host(),
            locator: ToolchainLocator::default(),
        }
    }

    /// Override the detected host platform (`None` = unrecognized).
    pub fn with_platform(mut self, platform: Option<Platform>) -> Self {
        self.installer = DependencyInstaller::new(platform);
        self
    }

    /// Replace the compiler candidate list.
    pub fn with_locator(mut self, locator: ToolchainLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.tracker.current()
    }

    pub fn tracker(&self) -> &PipelineTracker {
        &self.tracker
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.tracker.subscribe()
    }

    /// Run every step to completion or first failure.
    ///
    /// The failure is reported to the sink exactly once before returning.
    pub async fn run(&mut self) -> Result<PipelineOutcome, StepFailure> {
        self.sink.info(BANNER);

        match self.run_steps().await {
            Ok(outcome) => {
                self.sink.emit(LogEvent::success(SUCCESS_LINE));
                Ok(outcome)
            }
            Err(source) => {
                let failure = StepFailure {
                    step: self.tracker.current(),
                    source,
                };
                self.sink.emit(LogEvent::stderr(format!("[ERROR] {}", failure)));
                tracing::error!("Pipeline failed: {}", failure);
                if let Err(e) = self.tracker.fail(failure.source.to_string()) {
                    tracing::error!("{}", e);
                }
                Err(failure)
            }
        }
    }

    async fn run_steps(&mut self) -> Result<PipelineOutcome, PipelineError> {
        let sink = Arc::clone(&self.sink);

        self.enter(PipelineState::EnsureDownloadTool);
        self.installer
            .ensure(&self.config.download_tool, &self.prober, &self.runner, sink.as_ref())
            .await?;

        self.enter(PipelineState::CloneRepo);
        RepositoryManager::new(self.config.repo_url.clone(), self.config.repo_dir.clone())
            .ensure_cloned(&self.runner, sink.as_ref())
            .await?;

        self.enter(PipelineState::DetectToolchain);
        let (toolchain, context, extended_precision, used_fallback) =
            match self.locator.detect(&self.prober) {
                Some(found) => {
                    sink.info(&format!("[+] Compiler found: {}", found.cxx));
                    let extended = found.is_gcc();
                    (found, ToolchainContext::default(), extended, false)
                }
                None => {
                    self.enter(PipelineState::BuildFallbackToolchain);
                    let built = FallbackToolchainBuilder::new(&self.config)
                        .build(&self.runner, sink.as_ref())
                        .await?;
                    (built.toolchain, built.context, built.extended_precision, true)
                }
            };

        self.enter(PipelineState::Configure);
        let flags = BuildConfigurator::new(self.config.repo_dir.clone(), self.config.build_dir.clone())
            .configure(&self.runner, &toolchain, &context, extended_precision)
            .await?;

        self.enter(PipelineState::Build);
        BuildExecutor::new(self.config.build_dir.clone(), self.config.jobs)
            .build(&self.runner, &context)
            .await?;

        self.enter(PipelineState::CleanupTemp);
        self.cleanup_temp().await;

        self.enter(PipelineState::Succeeded);
        Ok(PipelineOutcome {
            toolchain,
            context,
            flags,
            used_fallback,
            extended_precision,
        })
    }

    /// Remove the fallback scratch directory. Failure is only a warning.
    async fn cleanup_temp(&self) {
        let temp = &self.config.temp_dir;
        if !fs::try_exists(temp).await.unwrap_or(false) {
            return;
        }

        self.sink.info("[*] Cleaning temporary GCC files");
        if let Err(e) = fs::remove_dir_all(temp).await {
            tracing::warn!("Failed to remove {}: {}", temp, e);
        }
    }

    fn enter(&mut self, next: PipelineState) {
        if let Err(e) = self.tracker.advance(next) {
            tracing::error!("{}", e);
        }
    }
}

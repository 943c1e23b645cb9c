//! Integration tests for the full bootstrap pipeline
//!
//! These tests verify:
//! - Step order with and without the fallback toolchain build
//! - The fallback build's commands, working directories and private prefix
//! - Extended-precision and compiler flags per detected toolchain
//! - A single `[ERROR]` line on failure and a single success line otherwise
//! - Best-effort cleanup of the scratch directory
//!
//! The pipeline runs against an in-memory prober and a recording runner, so
//! no real tool is ever spawned. Directories are real and live in a tempdir.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wylandc::models::ProcessResult;
use wylandc::services::{
    CommandRunner, FallbackToolchainBuilder, Invocation, Platform, Prober, RepositoryManager,
};
use wylandc::{
    BuildConfig, LogTag, MemorySink, Pipeline, PipelineError, PipelineState, StateChange,
    ToolchainRef,
};

/// Prober backed by a fixed set of tool names.
struct FakeProber(HashSet<&'static str>);

impl FakeProber {
    fn with(tools: &[&'static str]) -> Self {
        Self(tools.iter().copied().collect())
    }
}

impl Prober for FakeProber {
    fn exists(&self, tool: &str) -> bool {
        self.0.contains(tool)
    }
}

/// Records every invocation and succeeds unless the command starts with
/// `fail_on`. `git clone` creates the target directory like the real thing.
#[derive(Default)]
struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    fail_on: Option<(&'static str, i32)>,
    clone_target: Option<Utf8PathBuf>,
}

impl RecordingRunner {
    fn failing_on(prefix: &'static str, exit_code: i32) -> Self {
        Self {
            fail_on: Some((prefix, exit_code)),
            ..Default::default()
        }
    }

    fn cloning_into(dir: &Utf8Path) -> Self {
        Self {
            clone_target: Some(dir.to_owned()),
            ..Default::default()
        }
    }

    fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    fn commands(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|inv| inv.command().to_string())
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessResult, PipelineError> {
        self.invocations.lock().unwrap().push(invocation.clone());
        let command = invocation.command();

        if let Some((prefix, exit_code)) = self.fail_on {
            if command.starts_with(prefix) {
                return Err(PipelineError::ProcessFailure {
                    command: command.to_string(),
                    exit_code,
                });
            }
        }

        if command.starts_with("git clone") {
            if let Some(dir) = &self.clone_target {
                std::fs::create_dir_all(dir).unwrap();
            }
        }

        Ok(ProcessResult {
            command: command.to_string(),
            exit_code: 0,
            duration: Duration::from_millis(1),
        })
    }
}

fn workspace() -> (TempDir, BuildConfig) {
    let dir = TempDir::new().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
    (dir, BuildConfig::default().resolve_paths(&root))
}

fn pipeline(
    config: BuildConfig,
    tools: &[&'static str],
    runner: RecordingRunner,
) -> (Pipeline<FakeProber, RecordingRunner>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let pipeline = Pipeline::new(config, FakeProber::with(tools), runner, sink.clone())
        .with_platform(Some(Platform::Linux));
    (pipeline, sink)
}

fn error_lines(sink: &MemorySink) -> Vec<String> {
    sink.lines_tagged(LogTag::Stderr)
        .into_iter()
        .filter(|line| line.starts_with("[ERROR]"))
        .collect()
}

#[tokio::test]
async fn test_no_compiler_builds_fallback_toolchain() {
    let (_dir, config) = workspace();
    let temp_dir = config.temp_dir.clone();
    let builder = FallbackToolchainBuilder::new(&config);
    let (mut pipeline, sink) = pipeline(config, &["curl"], RecordingRunner::default());

    let outcome = pipeline.run().await.unwrap();

    assert!(outcome.used_fallback);
    assert_eq!(outcome.toolchain, ToolchainRef::new("gcc", "g++"));
    assert!(outcome.flags.contains("-DFLOAT128=ON"));
    assert!(
        outcome
            .flags
            .as_slice()
            .iter()
            .any(|f| f.starts_with("-DCMAKE_CXX_COMPILER=") && f.contains("gcc-install"))
    );

    let commands = pipeline.runner().commands();
    let expected_prefixes = [
        "git clone https://github.com/wys-prog/wyland.git",
        "git submodule update --init --recursive",
        "curl -LO https://ftp.gnu.org/gnu/gcc/gcc-13.2.0/gcc-13.2.0.tar.gz",
        "tar -xzf gcc-13.2.0.tar.gz",
        "./contrib/download_prerequisites",
        "../configure --prefix=",
        "make -j4",
        "make install",
        "cmake ",
        "cmake --build . -j4",
    ];
    assert_eq!(commands.len(), expected_prefixes.len());
    for (command, prefix) in commands.iter().zip(expected_prefixes) {
        assert!(command.starts_with(prefix), "{command} should start with {prefix}");
    }

    // Every fallback step runs where the source layout expects it
    let invocations = pipeline.runner().invocations();
    let fallback: Vec<(&str, Option<&Utf8Path>)> = invocations[2..8]
        .iter()
        .map(|inv| (inv.command(), inv.cwd()))
        .collect();
    let expected_configure = format!(
        "../configure --prefix={} --disable-multilib",
        builder.install_prefix()
    );
    let source_dir = builder.source_dir();
    let build_dir = builder.build_dir();
    assert_eq!(
        fallback,
        [
            (
                "curl -LO https://ftp.gnu.org/gnu/gcc/gcc-13.2.0/gcc-13.2.0.tar.gz",
                Some(temp_dir.as_path())
            ),
            ("tar -xzf gcc-13.2.0.tar.gz", Some(temp_dir.as_path())),
            ("./contrib/download_prerequisites", Some(source_dir.as_path())),
            (expected_configure.as_str(), Some(build_dir.as_path())),
            ("make -j4", Some(build_dir.as_path())),
            ("make install", Some(build_dir.as_path())),
        ]
    );
    assert!(builder.install_prefix().starts_with(&temp_dir));

    // Configure and build see the private install through their environment
    for inv in &pipeline.runner().invocations()[8..] {
        let keys: Vec<&str> = inv.env().iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"PATH"));
        assert!(keys.contains(&"CC"));
        assert!(keys.contains(&"CXX"));
    }

    assert!(!temp_dir.exists(), "scratch directory removed after success");
    assert!(sink.lines_tagged(LogTag::Info).contains(&"[*] Cleaning temporary GCC files".to_string()));
    assert_eq!(sink.lines_tagged(LogTag::Success), ["OK: Wyland built successfully!"]);
    assert_eq!(
        pipeline.tracker().history(),
        [
            PipelineState::Init,
            PipelineState::EnsureDownloadTool,
            PipelineState::CloneRepo,
            PipelineState::DetectToolchain,
            PipelineState::BuildFallbackToolchain,
            PipelineState::Configure,
            PipelineState::Build,
            PipelineState::CleanupTemp,
            PipelineState::Succeeded,
        ]
    );
}

#[tokio::test]
async fn test_detected_gcc_skips_fallback_and_requests_extended_precision() {
    let (_dir, config) = workspace();
    let (mut pipeline, sink) = pipeline(config, &["curl", "g++", "clang++"], RecordingRunner::default());

    let outcome = pipeline.run().await.unwrap();

    assert!(!outcome.used_fallback);
    assert!(outcome.extended_precision);
    assert!(outcome.flags.contains("-DFLOAT128=ON"));
    assert!(outcome.flags.contains("-DCMAKE_CXX_COMPILER=g++"));
    assert!(sink.lines_tagged(LogTag::Info).contains(&"[+] Compiler found: g++".to_string()));
    assert!(!pipeline.runner().commands().iter().any(|c| c.starts_with("curl")));
}

#[tokio::test]
async fn test_detected_clang_omits_extended_precision() {
    let (_dir, config) = workspace();
    let (mut pipeline, _sink) = pipeline(config, &["curl", "clang++"], RecordingRunner::default());

    let outcome = pipeline.run().await.unwrap();

    assert_eq!(outcome.toolchain, ToolchainRef::new("clang", "clang++"));
    assert!(!outcome.flags.contains("-DFLOAT128=ON"));
    assert_eq!(
        outcome.flags.as_slice()[3..],
        ["-DCMAKE_C_COMPILER=clang", "-DCMAKE_CXX_COMPILER=clang++"]
    );
    // Detected compilers run with the inherited environment
    assert!(pipeline.runner().invocations().iter().all(|inv| inv.env().is_empty()));
}

#[tokio::test]
async fn test_configure_failure_aborts_before_build() {
    let (_dir, config) = workspace();
    let runner = RecordingRunner::failing_on("cmake", 1);
    let (mut pipeline, sink) = pipeline(config, &["curl", "g++"], runner);

    let failure = pipeline.run().await.unwrap_err();

    assert_eq!(failure.step, PipelineState::Configure);
    assert!(matches!(failure.source, PipelineError::ProcessFailure { exit_code: 1, .. }));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(!pipeline.runner().commands().iter().any(|c| c.contains("--build")));

    let errors = error_lines(&sink);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Configure"));
    assert!(sink.lines_tagged(LogTag::Success).is_empty());
}

#[tokio::test]
async fn test_missing_curl_is_installed_with_one_command() {
    let (_dir, config) = workspace();
    let (mut pipeline, sink) = pipeline(config, &["apt", "pacman", "g++"], RecordingRunner::default());

    pipeline.run().await.unwrap();

    let commands = pipeline.runner().commands();
    let installs: Vec<&String> = commands.iter().filter(|c| c.contains("install -y")).collect();
    assert_eq!(installs, ["sudo apt update && sudo apt install -y curl"]);
    assert_eq!(commands[0], "sudo apt update && sudo apt install -y curl");
    assert!(
        sink.lines_tagged(LogTag::Stderr)
            .contains(&"[!] curl not found, installing...".to_string())
    );
}

#[tokio::test]
async fn test_unknown_platform_is_fatal() {
    let (_dir, config) = workspace();
    let sink = Arc::new(MemorySink::new());
    let mut pipeline = Pipeline::new(
        config,
        FakeProber::with(&["g++"]),
        RecordingRunner::default(),
        sink.clone(),
    )
    .with_platform(None);

    let failure = pipeline.run().await.unwrap_err();

    assert_eq!(failure.step, PipelineState::EnsureDownloadTool);
    assert!(matches!(failure.source, PipelineError::UnsupportedEnvironment(_)));
    assert!(pipeline.runner().commands().is_empty());
    assert_eq!(error_lines(&sink).len(), 1);
}

#[tokio::test]
async fn test_no_package_manager_is_fatal() {
    let (_dir, config) = workspace();
    let (mut pipeline, sink) = pipeline(config, &["g++"], RecordingRunner::default());

    let failure = pipeline.run().await.unwrap_err();

    assert!(matches!(failure.source, PipelineError::UnsupportedEnvironment(_)));
    assert!(error_lines(&sink)[0].contains("apt, dnf, pacman"));
}

#[tokio::test]
async fn test_fallback_failure_leaves_scratch_directory() {
    let (_dir, config) = workspace();
    let temp_dir = config.temp_dir.clone();
    let runner = RecordingRunner::failing_on("make -j", 2);
    let (mut pipeline, sink) = pipeline(config, &["curl"], runner);

    let failure = pipeline.run().await.unwrap_err();

    assert_eq!(failure.step, PipelineState::BuildFallbackToolchain);
    assert_eq!(failure.source.exit_code(), Some(2));
    assert!(temp_dir.exists(), "scratch directory kept for diagnosis");
    assert!(!pipeline.runner().commands().iter().any(|c| c == "make install"));
    assert_eq!(error_lines(&sink).len(), 1);
}

#[tokio::test]
async fn test_clone_failure_stops_pipeline() {
    let (_dir, config) = workspace();
    let runner = RecordingRunner::failing_on("git clone", 128);
    let (mut pipeline, sink) = pipeline(config, &["curl", "g++"], runner);

    let failure = pipeline.run().await.unwrap_err();

    assert_eq!(failure.step, PipelineState::CloneRepo);
    assert_eq!(pipeline.runner().commands().len(), 1);
    assert!(error_lines(&sink)[0].starts_with("[ERROR] Clone repository:"));
}

#[tokio::test]
async fn test_observers_receive_state_changes() {
    let (_dir, config) = workspace();
    let (mut pipeline, _sink) = pipeline(config, &["curl", "g++"], RecordingRunner::default());
    let mut rx = pipeline.subscribe();

    pipeline.run().await.unwrap();

    let mut started = Vec::new();
    let mut succeeded = false;
    while let Ok(change) = rx.try_recv() {
        match change {
            StateChange::StepStarted { step } => started.push(step),
            StateChange::Succeeded { .. } => succeeded = true,
            _ => {}
        }
    }

    assert!(succeeded);
    assert_eq!(started.first(), Some(&PipelineState::EnsureDownloadTool));
    assert_eq!(started.last(), Some(&PipelineState::CleanupTemp));
}

#[test]
fn test_ensure_cloned_twice_clones_once() {
    let (_dir, config) = workspace();
    let runner = RecordingRunner::cloning_into(&config.repo_dir);
    let sink = MemorySink::new();
    let repo = RepositoryManager::new(config.repo_url.clone(), config.repo_dir.clone());

    tokio_test::block_on(repo.ensure_cloned(&runner, &sink)).unwrap();
    tokio_test::block_on(repo.ensure_cloned(&runner, &sink)).unwrap();

    let commands = runner.commands();
    assert_eq!(commands.iter().filter(|c| c.starts_with("git clone")).count(), 1);
    assert_eq!(
        commands
            .iter()
            .filter(|c| c.starts_with("git submodule update"))
            .count(),
        2
    );
    assert!(
        runner
            .invocations()
            .iter()
            .filter(|inv| inv.command().starts_with("git submodule"))
            .all(|inv| inv.cwd() == Some(config.repo_dir.as_path()))
    );
}

#[tokio::test]
async fn test_cleanup_failure_does_not_revert_success() {
    let (_dir, config) = workspace();
    // A regular file where the scratch directory should be: it exists, but
    // directory removal fails
    std::fs::write(&config.temp_dir, b"not a directory").unwrap();
    let temp_dir = config.temp_dir.clone();
    let (mut pipeline, sink) = pipeline(config, &["curl", "g++"], RecordingRunner::default());

    let outcome = pipeline.run().await;

    assert!(outcome.is_ok());
    assert_eq!(pipeline.state(), PipelineState::Succeeded);
    assert!(temp_dir.is_file());
    assert!(sink.lines_tagged(LogTag::Info).contains(&"[*] Cleaning temporary GCC files".to_string()));
    assert_eq!(sink.lines_tagged(LogTag::Success), ["OK: Wyland built successfully!"]);
    assert!(error_lines(&sink).is_empty());
}

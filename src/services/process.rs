use crate::error::PipelineError;
use crate::metrics::Metrics;
use crate::models::{LogEvent, LogTag, ProcessResult, ToolchainContext};
use crate::sink::LogSink;
use camino::{Utf8Path, Utf8PathBuf};
use std::ffi::OsString;
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Shell exit status meaning "command not found".
#[cfg(unix)]
const COMMAND_NOT_FOUND: i32 = 127;

/// A shell command line plus where and how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    command: String,
    cwd: Option<Utf8PathBuf>,
    env: Vec<(String, OsString)>,
}

impl Invocation {
    /// A command line interpreted by the platform shell, so `&&` and
    /// redirections work.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Run inside `dir` instead of the current directory.
    pub fn dir(mut self, dir: &Utf8Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// Apply the toolchain's environment overrides.
    pub fn toolchain(mut self, context: &ToolchainContext) -> Self {
        self.env.extend(context.env_overrides());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn cwd(&self) -> Option<&Utf8Path> {
        self.cwd.as_deref()
    }

    pub fn env(&self) -> &[(String, OsString)] {
        &self.env
    }
}

/// Something that can execute an [`Invocation`].
///
/// The pipeline is generic over this so it can run against a fake.
pub trait CommandRunner: Send + Sync {
    /// Run to completion.
    ///
    /// Fails with [`PipelineError::Spawn`] when the command cannot start and
    /// with [`PipelineError::ProcessFailure`] on a non-zero exit.
    fn run(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = Result<ProcessResult, PipelineError>> + Send;
}

/// Runs commands through the platform shell and streams their output.
///
/// Each run spawns one reader task per output stream. Every complete line is
/// forwarded to the sink tagged with its stream. `run` returns only after the
/// process has exited and both readers have seen end-of-input, so no output
/// is lost. Order is kept within a stream, not across the two.
pub struct ProcessRunner {
    sink: Arc<dyn LogSink>,
    metrics: Arc<Metrics>,
}

impl ProcessRunner {
    pub fn new(sink: Arc<dyn LogSink>, metrics: Arc<Metrics>) -> Self {
        Self { sink, metrics }
    }

    fn shell_command(command: &str) -> Command {
        if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        }
    }

    fn spawn_failure(&self, command: &str, source: std::io::Error) -> PipelineError {
        self.metrics.record_command_failed();
        tracing::error!("Failed to spawn `{}`: {}", command, source);
        PipelineError::Spawn {
            command: command.to_string(),
            source,
        }
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessResult, PipelineError> {
        let command = invocation.command();
        self.sink.emit(LogEvent::info(format!("[CMD] {}", command)));
        tracing::info!("Executing: {} (cwd: {:?})", command, invocation.cwd());

        let start = Instant::now();

        let mut cmd = Self::shell_command(command);
        if let Some(dir) = invocation.cwd() {
            cmd.current_dir(dir);
        }
        cmd.envs(invocation.env().iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|source| self.spawn_failure(command, source))?;

        let readers = [
            child.stdout.take().map(|out| {
                tokio::spawn(forward_lines(
                    out,
                    LogTag::Stdout,
                    Arc::clone(&self.sink),
                    Arc::clone(&self.metrics),
                ))
            }),
            child.stderr.take().map(|err| {
                tokio::spawn(forward_lines(
                    err,
                    LogTag::Stderr,
                    Arc::clone(&self.sink),
                    Arc::clone(&self.metrics),
                ))
            }),
        ];

        let status = match child.wait().await {
            Ok(status) => status,
            Err(e) => {
                abort_readers(readers).await;
                self.metrics.record_command_failed();
                return Err(PipelineError::io(
                    format!("Failed to wait for `{}`", command),
                    e,
                ));
            }
        };

        // Drain both streams before reporting
        for reader in readers.into_iter().flatten() {
            if let Err(e) = reader.await {
                tracing::error!("Stream reader task failed: {}", e);
            }
        }

        let duration = start.elapsed();
        let exit_code = status.code().unwrap_or(-1);
        self.metrics.record_command(duration);

        tracing::info!(
            "Command completed in {:.2}s with exit code {}",
            duration.as_secs_f32(),
            exit_code
        );

        #[cfg(unix)]
        if exit_code == COMMAND_NOT_FOUND {
            return Err(self.spawn_failure(
                command,
                std::io::Error::new(std::io::ErrorKind::NotFound, "command not found"),
            ));
        }

        if exit_code != 0 {
            self.metrics.record_command_failed();
            return Err(PipelineError::ProcessFailure {
                command: command.to_string(),
                exit_code,
            });
        }

        Ok(ProcessResult {
            command: command.to_string(),
            exit_code,
            duration,
        })
    }
}

/// Stop the stream readers and wait until they are gone.
///
/// Used when the child can no longer be waited on, so its pipes may never
/// reach end-of-input.
async fn abort_readers(readers: [Option<JoinHandle<()>>; 2]) {
    for reader in readers.into_iter().flatten() {
        reader.abort();
        if let Err(e) = reader.await {
            if !e.is_cancelled() {
                tracing::error!("Stream reader task failed: {}", e);
            }
        }
    }
}

/// Forward every line of `stream` to the sink until end-of-input.
///
/// Bytes are decoded lossily so non-UTF-8 compiler output never stalls the
/// reader (a stalled reader would fill the pipe and hang the child).
async fn forward_lines<R>(stream: R, tag: LogTag, sink: Arc<dyn LogSink>, metrics: Arc<Metrics>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\n', '\r']);

                match tag {
                    LogTag::Stderr => metrics.record_stderr_line(),
                    _ => metrics.record_stdout_line(),
                }
                sink.emit(LogEvent::new(line, tag));
            }
            Err(e) => {
                tracing::warn!("Failed to read {} stream: {}", tag, e);
                break;
            }
        }
    }
}

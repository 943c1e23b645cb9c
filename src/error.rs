use crate::models::PipelineState;
use thiserror::Error;

/// Errors raised by a single pipeline step.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed with exit code {exit_code}: {command}")]
    ProcessFailure { command: String, exit_code: i32 },

    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Wrap an I/O error with a short description of what was attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Exit code of the failed command, if the error came from one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ProcessFailure { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

/// A [`PipelineError`] tagged with the step it aborted.
#[derive(Error, Debug)]
#[error("{step}: {source}")]
pub struct StepFailure {
    pub step: PipelineState,
    #[source]
    pub source: PipelineError,
}

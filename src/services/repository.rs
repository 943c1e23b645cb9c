use crate::error::PipelineError;
use crate::services::process::{CommandRunner, Invocation};
use crate::services::toolchain::quote;
use crate::sink::LogSink;
use camino::{Utf8Path, Utf8PathBuf};

/// Clones the source repository and keeps its submodules in sync.
#[derive(Debug, Clone)]
pub struct RepositoryManager {
    url: String,
    local_dir: Utf8PathBuf,
}

impl RepositoryManager {
    pub fn new(url: impl Into<String>, local_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            url: url.into(),
            local_dir: local_dir.into(),
        }
    }

    pub fn local_dir(&self) -> &Utf8Path {
        &self.local_dir
    }

    /// Clone if `local_dir` is missing, then update submodules recursively.
    ///
    /// An existing directory is taken as an existing clone without checking
    /// its remote. The submodule sync runs every time.
    pub async fn ensure_cloned<R: CommandRunner>(
        &self,
        runner: &R,
        sink: &dyn LogSink,
    ) -> Result<(), PipelineError> {
        if self.local_dir.exists() {
            sink.info(&format!("[+] Repository already cloned at {}", self.local_dir));
        } else {
            runner
                .run(&Invocation::new(format!(
                    "git clone {} {}",
                    self.url,
                    quote(&self.local_dir)
                )))
                .await?;
        }

        runner
            .run(&Invocation::new("git submodule update --init --recursive").dir(&self.local_dir))
            .await?;
        Ok(())
    }
}

//! Tool availability on the command search path.

/// Answers "is this tool on the search path?".
///
/// Absence is a normal `false`, never an error.
#[cfg_attr(test, mockall::automock)]
pub trait Prober: Send + Sync {
    fn exists(&self, tool: &str) -> bool;
}

/// Prober backed by the live `PATH` (and `PATHEXT` on Windows).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProber;

impl Prober for SystemProber {
    fn exists(&self, tool: &str) -> bool {
        match which::which(tool) {
            Ok(path) => {
                tracing::debug!("Found {} at {}", tool, path.display());
                true
            }
            Err(_) => {
                tracing::debug!("{} not found on PATH", tool);
                false
            }
        }
    }
}

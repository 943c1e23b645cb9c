use std::fmt;

/// Position of the orchestrator in the bootstrap sequence.
///
/// The sequence is strictly forward:
/// `Init → EnsureDownloadTool → CloneRepo → DetectToolchain → [BuildFallbackToolchain]
/// → Configure → Build → CleanupTemp → Succeeded`.
/// `Failed` is reachable from every non-terminal state and absorbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Init,
    EnsureDownloadTool,
    CloneRepo,
    DetectToolchain,
    BuildFallbackToolchain,
    Configure,
    Build,
    CleanupTemp,
    Succeeded,
    Failed,
}

impl PipelineState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Check a single transition against the state machine.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }

        matches!(
            (self, next),
            (Init, EnsureDownloadTool)
                | (EnsureDownloadTool, CloneRepo)
                | (CloneRepo, DetectToolchain)
                | (DetectToolchain, BuildFallbackToolchain)
                | (DetectToolchain, Configure)
                | (BuildFallbackToolchain, Configure)
                | (Configure, Build)
                | (Build, CleanupTemp)
                | (CleanupTemp, Succeeded)
        )
    }

    /// Human-readable step name used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Init => "Init",
            Self::EnsureDownloadTool => "Ensure download tool",
            Self::CloneRepo => "Clone repository",
            Self::DetectToolchain => "Detect toolchain",
            Self::BuildFallbackToolchain => "Build fallback toolchain",
            Self::Configure => "Configure",
            Self::Build => "Build",
            Self::CleanupTemp => "Cleanup temp",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

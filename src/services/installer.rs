//! Platform-dispatching installer for a single prerequisite tool.
//!
//! Each platform carries an ordered table of package managers. Installing a
//! tool is a lookup: the first manager the prober finds wins, and exactly one
//! install command runs through the [`CommandRunner`].

use crate::error::PipelineError;
use crate::models::LogEvent;
use crate::services::probe::Prober;
use crate::services::process::{CommandRunner, Invocation};
use crate::sink::LogSink;
use std::fmt;

/// Host platforms the installer knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

/// A package manager and its install command template.
///
/// `{package}` in the template is replaced by the manager-specific package id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackageManager {
    pub name: &'static str,
    pub install_template: &'static str,
}

const WINDOWS_MANAGERS: &[PackageManager] = &[
    PackageManager {
        name: "winget",
        install_template: "winget install --id {package} -e --silent",
    },
    PackageManager {
        name: "choco",
        install_template: "choco install {package} -y",
    },
];

const LINUX_MANAGERS: &[PackageManager] = &[
    PackageManager {
        name: "apt",
        install_template: "sudo apt update && sudo apt install -y {package}",
    },
    PackageManager {
        name: "dnf",
        install_template: "sudo dnf install -y {package}",
    },
    PackageManager {
        name: "pacman",
        install_template: "sudo pacman -Sy --noconfirm {package}",
    },
];

const MACOS_MANAGERS: &[PackageManager] = &[PackageManager {
    name: "brew",
    install_template: "brew install {package}",
}];

impl Platform {
    /// The platform this binary was compiled for, if supported.
    pub fn current() -> Option<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value.
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::MacOs),
            _ => None,
        }
    }

    /// Package managers in priority order.
    pub fn package_managers(self) -> &'static [PackageManager] {
        match self {
            Self::Windows => WINDOWS_MANAGERS,
            Self::Linux => LINUX_MANAGERS,
            Self::MacOs => MACOS_MANAGERS,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::MacOs => "macOS",
        })
    }
}

impl PackageManager {
    /// Package id of `tool` for this manager.
    pub fn package_id(&self, tool: &str) -> String {
        match (self.name, tool) {
            ("winget", "curl") => "CurlProject.Curl".to_string(),
            ("winget", "git") => "Git.Git".to_string(),
            ("winget", "cmake") => "Kitware.CMake".to_string(),
            _ => tool.to_string(),
        }
    }

    pub fn install_command(&self, tool: &str) -> String {
        self.install_template
            .replace("{package}", &self.package_id(tool))
    }
}

/// Installs missing prerequisite tools with the host's package manager.
#[derive(Debug, Clone, Copy)]
pub struct DependencyInstaller {
    platform: Option<Platform>,
}

impl DependencyInstaller {
    pub fn new(platform: Option<Platform>) -> Self {
        Self { platform }
    }

    /// Installer for the platform this binary runs on.
    pub fn for_host() -> Self {
        Self::new(Platform::current())
    }

    /// First package manager present on the search path.
    pub fn select_manager<P: Prober>(&self, prober: &P) -> Result<&'static PackageManager, PipelineError> {
        let platform = self.platform.ok_or_else(|| {
            PipelineError::UnsupportedEnvironment(format!(
                "unrecognized platform '{}'",
                std::env::consts::OS
            ))
        })?;

        platform
            .package_managers()
            .iter()
            .find(|pm| prober.exists(pm.name))
            .ok_or_else(|| {
                let names: Vec<&str> = platform.package_managers().iter().map(|pm| pm.name).collect();
                PipelineError::UnsupportedEnvironment(format!(
                    "no supported package manager found on {} (tried {})",
                    platform,
                    names.join(", ")
                ))
            })
    }

    /// Make sure `tool` is on the search path, installing it if needed.
    ///
    /// A no-op when the tool is already present. Otherwise runs exactly one
    /// install command.
    pub async fn ensure<P: Prober, R: CommandRunner>(
        &self,
        tool: &str,
        prober: &P,
        runner: &R,
        sink: &dyn LogSink,
    ) -> Result<(), PipelineError> {
        if prober.exists(tool) {
            sink.info(&format!("[+] {} found", tool));
            return Ok(());
        }

        sink.emit(LogEvent::stderr(format!("[!] {} not found, installing...", tool)));

        let manager = self.select_manager(prober)?;
        tracing::info!("Installing {} with {}", tool, manager.name);

        runner
            .run(&Invocation::new(manager.install_command(tool)))
            .await?;
        Ok(())
    }
}

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Build settings.
///
/// Defaults are the compile-time constants of the bootstrap; any field can be
/// overridden from a `WYLANDC_*` environment variable via
/// [`ConfigManager`](crate::config::ConfigManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Remote source repository
    pub repo_url: String,

    /// Local clone directory
    pub repo_dir: Utf8PathBuf,

    /// Persistent build-output directory
    pub build_dir: Utf8PathBuf,

    /// Scratch directory for the fallback toolchain, removed on success
    pub temp_dir: Utf8PathBuf,

    /// Download tool ensured before anything else
    pub download_tool: String,

    /// Pinned GCC version built when no compiler is found
    pub gcc_version: String,

    /// Base URL of the GCC release mirror
    pub gcc_mirror: String,

    /// Parallelism hint for make and the build driver
    pub jobs: u32,

    /// Directory for rotating log files
    pub log_dir: Utf8PathBuf,

    /// Debug-level logging plus a console tracing layer
    pub debug: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            repo_url: "https://github.com/wys-prog/wyland.git".to_string(),
            repo_dir: Utf8PathBuf::from("wyland"),
            build_dir: Utf8PathBuf::from("build"),
            temp_dir: Utf8PathBuf::from("temp"),
            download_tool: "curl".to_string(),
            gcc_version: "13.2.0".to_string(),
            gcc_mirror: "https://ftp.gnu.org/gnu/gcc".to_string(),
            jobs: 4,
            log_dir: Utf8PathBuf::from("logs"),
            debug: false,
        }
    }
}

impl BuildConfig {
    /// Name of the extracted GCC source directory, e.g. `gcc-13.2.0`.
    pub fn gcc_source_name(&self) -> String {
        format!("gcc-{}", self.gcc_version)
    }

    /// Name of the GCC source archive.
    pub fn gcc_archive_name(&self) -> String {
        format!("{}.tar.gz", self.gcc_source_name())
    }

    /// Full download URL of the GCC source archive.
    pub fn gcc_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.gcc_mirror.trim_end_matches('/'),
            self.gcc_source_name(),
            self.gcc_archive_name()
        )
    }

    /// Resolve relative directories against `root`.
    pub fn resolve_paths(mut self, root: &Utf8Path) -> Self {
        for dir in [
            &mut self.repo_dir,
            &mut self.build_dir,
            &mut self.temp_dir,
            &mut self.log_dir,
        ] {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        }
        self
    }
}

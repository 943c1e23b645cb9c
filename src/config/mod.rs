use crate::models::BuildConfig;
use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use config::{Config, Environment};

/// Prefix of environment variables that override build settings.
pub const ENV_PREFIX: &str = "WYLANDC";

/// Loads [`BuildConfig`] by layering sources with the `config` crate.
///
/// Layers, lowest priority first:
/// 1. Compile-time defaults ([`BuildConfig::default`])
/// 2. `WYLANDC_*` environment variables (e.g. `WYLANDC_JOBS=8`)
///
/// No configuration file is read or written.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    environment: Environment,
}

impl ConfigManager {
    /// Create a manager reading the live process environment.
    pub fn new() -> Self {
        Self::with_environment(Environment::with_prefix(ENV_PREFIX))
    }

    /// Create a manager with a custom environment source.
    ///
    /// Tests pass `Environment::with_prefix(..).source(Some(map))` here to avoid
    /// touching the real process environment.
    pub fn with_environment(environment: Environment) -> Self {
        Self { environment }
    }

    /// Load the layered configuration.
    pub fn load(&self) -> Result<BuildConfig> {
        let defaults = Config::try_from(&BuildConfig::default())
            .context("Failed to serialize default build config")?;

        let layered = Config::builder()
            .add_source(defaults)
            .add_source(self.environment.clone().try_parsing(true))
            .build()
            .context("Failed to build layered configuration")?;

        let config: BuildConfig = layered
            .try_deserialize()
            .context("Failed to parse build configuration")?;

        if config.jobs == 0 {
            bail!("{}_JOBS must be at least 1", ENV_PREFIX);
        }
        if config.repo_url.trim().is_empty() {
            bail!("{}_REPO_URL must not be empty", ENV_PREFIX);
        }

        tracing::debug!("Loaded build config: {:?}", config);
        Ok(config)
    }

    /// Load the configuration and anchor relative directories at `root`.
    pub fn load_resolved(&self, root: &Utf8Path) -> Result<BuildConfig> {
        Ok(self.load()?.resolve_paths(root))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

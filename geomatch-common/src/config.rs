//! Configuration loading and resolution
//!
//! Every setting resolves with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and resolution
//! continues with the remaining tiers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Comma-separated list of active source adapters, in query order
pub const ENV_PROVIDERS: &str = "GEOMATCH_PROVIDERS";
/// Per-adapter call timeout in seconds
pub const ENV_ADAPTER_TIMEOUT_SECS: &str = "GEOMATCH_ADAPTER_TIMEOUT_SECS";
/// Number of addresses reconciled concurrently in a batch
pub const ENV_WORKERS: &str = "GEOMATCH_WORKERS";
/// Score at which the orchestrator stops querying further adapters
pub const ENV_EARLY_STOP_SCORE: &str = "GEOMATCH_EARLY_STOP_SCORE";
/// Base URL of the ViaCEP service
pub const ENV_VIACEP_URL: &str = "GEOMATCH_VIACEP_URL";
/// Default tracing level when RUST_LOG is unset
pub const ENV_LOG_LEVEL: &str = "GEOMATCH_LOG_LEVEL";

/// Fully resolved engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Adapter names in the order they are queried
    pub providers: Vec<String>,
    /// Timeout applied to each adapter call
    pub adapter_timeout_secs: u64,
    /// Concurrent reconciliations per batch
    pub workers: usize,
    /// Adjusted score that ends adapter iteration early
    pub early_stop_score: f64,
    /// ViaCEP base URL (without the `/ws/...` path)
    pub viacep_base_url: String,
    /// Tracing level used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            providers: vec!["local".to_string(), "dummy".to_string()],
            adapter_timeout_secs: 5,
            workers: 4,
            early_stop_score: 95.0,
            viacep_base_url: "https://viacep.com.br".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Adapter timeout as a `Duration`
    pub fn adapter_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.adapter_timeout_secs)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.adapter_timeout_secs == 0 {
            return Err(Error::Config(
                "adapter_timeout_secs must be at least 1".to_string(),
            ));
        }
        if !(self.early_stop_score > 0.0 && self.early_stop_score <= 100.0) {
            return Err(Error::Config(format!(
                "early_stop_score must be in (0, 100], got {}",
                self.early_stop_score
            )));
        }
        if self.providers.is_empty() {
            warn!("No source adapters configured; every address will classify as NO_MATCH");
        }
        Ok(())
    }
}

/// Partial configuration from one tier (CLI flags, environment or TOML file)
///
/// `None` means "not set at this tier".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub providers: Option<Vec<String>>,
    pub adapter_timeout_secs: Option<u64>,
    pub workers: Option<usize>,
    pub early_stop_score: Option<f64>,
    pub viacep_base_url: Option<String>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Read overrides from `GEOMATCH_*` environment variables
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn from_env() -> Self {
        Self {
            providers: std::env::var(ENV_PROVIDERS)
                .ok()
                .map(|v| parse_provider_list(&v)),
            adapter_timeout_secs: env_number(ENV_ADAPTER_TIMEOUT_SECS),
            workers: env_number(ENV_WORKERS),
            early_stop_score: env_number(ENV_EARLY_STOP_SCORE),
            viacep_base_url: non_empty_env(ENV_VIACEP_URL),
            log_level: non_empty_env(ENV_LOG_LEVEL),
        }
    }

    /// Overwrite every field of `config` that is set here
    pub fn apply_to(&self, config: &mut EngineConfig) {
        if let Some(providers) = &self.providers {
            config.providers = providers
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Some(secs) = self.adapter_timeout_secs {
            config.adapter_timeout_secs = secs;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(score) = self.early_stop_score {
            config.early_stop_score = score;
        }
        if let Some(url) = &self.viacep_base_url {
            config.viacep_base_url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

/// Split a comma-separated adapter list, trimming entries and dropping empties
pub fn parse_provider_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = non_empty_env(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}

/// Default TOML location: `<config_dir>/geomatch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("geomatch").join("config.toml"))
}

/// Load a TOML config file
///
/// Returns `Ok(None)` when the file does not exist, `Err(Error::Config)` when
/// it exists but cannot be read or parsed.
pub fn load_toml_config(path: &Path) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        warn!("Config file not found: {} (using defaults)", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let overrides: ConfigOverrides = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(Some(overrides))
}

/// Resolves [`EngineConfig`] across all tiers
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver that looks for the TOML file at the platform default location
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Resolver that reads the TOML file at `path` instead of the default location
    pub fn with_config_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Resolve and validate the configuration
    ///
    /// # Arguments
    /// * `cli` - Overrides from command-line flags (highest priority)
    pub fn resolve(&self, cli: &ConfigOverrides) -> Result<EngineConfig> {
        let mut config = EngineConfig::default();

        let toml_path = self.config_path.clone().or_else(default_config_path);
        if let Some(path) = toml_path {
            if let Some(file_overrides) = load_toml_config(&path)? {
                file_overrides.apply_to(&mut config);
            }
        }

        ConfigOverrides::from_env().apply_to(&mut config);
        cli.apply_to(&mut config);

        config.validate()?;
        debug!(?config, "Resolved engine configuration");
        Ok(config)
    }
}

//! ---
//! utr_section: "01-shared-primitives"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Shared primitives and utilities for the unit runtime."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::filter::EnvFilter;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_log_filter() -> String {
    "info".to_owned()
}

fn default_warn_before_load() -> bool {
    true
}

fn default_error_message() -> String {
    "unspecified unit error".to_owned()
}

/// Primary configuration object for hosts embedding the unit runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FrameworkConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Metadata describing where a [`FrameworkConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedFrameworkConfig {
    pub config: FrameworkConfig,
    pub source: PathBuf,
}

impl FrameworkConfig {
    pub const ENV_CONFIG_PATH: &'static str = "UNITREE_CONFIG";

    /// Load configuration from disk, respecting the `UNITREE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedFrameworkConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedFrameworkConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedFrameworkConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Parse a single configuration file. `.yaml`/`.yml` files are read as YAML,
    /// everything else as TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            serde_yaml::from_str::<FrameworkConfig>(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            toml::from_str::<FrameworkConfig>(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.logging.validate()?;
        self.lifecycle.validate()
    }
}

impl std::str::FromStr for FrameworkConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: FrameworkConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Settings consumed by [`crate::logging::init_tracing`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Directory of the rolling log file.
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// File name stem; the runtime name when unset.
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Also write JSON events to a daily rolling file.
    #[serde(default)]
    pub file_output: bool,
    /// Filter directive used when neither `UNITREE_LOG` nor `RUST_LOG` is set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file_output: false,
            filter: default_log_filter(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.filter)
            .with_context(|| format!("logging.filter `{}` is not a valid directive", self.filter))?;
        Ok(())
    }
}

/// Knobs applied to every unit constructed with services derived from this config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Emit a diagnostic when `show`/`hide` run before the unit finished loading.
    #[serde(default = "default_warn_before_load")]
    pub warn_before_load: bool,
    /// Message used when `error()` is called without an explicit error value.
    #[serde(default = "default_error_message")]
    pub default_error_message: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            warn_before_load: default_warn_before_load(),
            default_error_message: default_error_message(),
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_error_message.trim().is_empty() {
            return Err(anyhow!("lifecycle.default_error_message must not be empty"));
        }
        Ok(())
    }
}

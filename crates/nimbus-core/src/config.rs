//! Configuration structures for Nimbus

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that supplies the project when the file does not
pub const PROJECT_ENV_VAR: &str = "GCP_PROJECT";

/// Main configuration for Nimbus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Audit engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Report export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Check catalogue settings
    #[serde(default)]
    pub checks: ChecksConfig,
}

/// General configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Project to audit
    #[serde(default)]
    pub project_id: Option<String>,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Output format (text, json, csv)
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            verbose: false,
            output_format: default_output_format(),
        }
    }
}

fn default_output_format() -> String {
    "text".to_string()
}

/// Audit engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run checks in parallel
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Upper bound on concurrently running checks
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-check timeout in seconds (0 disables the timeout)
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_workers: default_max_workers(),
            check_timeout_secs: default_check_timeout_secs(),
        }
    }
}

impl EngineConfig {
    /// Per-check timeout, `None` when disabled
    pub fn check_timeout(&self) -> Option<Duration> {
        if self.check_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.check_timeout_secs))
        }
    }
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

fn default_check_timeout_secs() -> u64 {
    60
}

/// Report export configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Emit a row for checks that produced only a note (skipped or errored)
    #[serde(default)]
    pub include_degraded: bool,

    /// Directory that receives exported files
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Check catalogue configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChecksConfig {
    /// Check IDs left out of the registry
    #[serde(default)]
    pub skip: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = if is_json(path) {
            serde_json::from_str(&content).map_err(|e| crate::error::NimbusError::Parse {
                context: path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            // Assume YAML for other extensions
            serde_yaml::from_str(&content).map_err(|e| crate::error::NimbusError::Parse {
                context: path.display().to_string(),
                message: e.to_string(),
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot be used
    pub fn validate(&self) -> crate::error::Result<()> {
        self.general
            .output_format
            .parse::<crate::traits::OutputFormat>()
            .map_err(crate::error::NimbusError::Config)?;

        if self.engine.max_workers == 0 {
            return Err(crate::error::NimbusError::Config(
                "engine.max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &Path) -> crate::error::Result<()> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)
                .map_err(|e| crate::error::NimbusError::Serialization(e.to_string()))?
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill unset values from the environment
    pub fn apply_env(mut self) -> Self {
        if self.general.project_id.is_none() {
            self.general.project_id = std::env::var(PROJECT_ENV_VAR)
                .ok()
                .filter(|p| !p.is_empty());
        }
        self
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

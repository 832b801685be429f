// crossregion-config - Configuration for the bidirectional replication command
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from CROSSREGION_CONFIG env var
// 3. Config file contents from CROSSREGION_CONFIG_CONTENT env var
// 4. Default config file locations (./crossregion.toml, ./.crossregion.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};
pub use validation::ValidationError;

/// Main runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Replication pairs. Only the first entry is provisioned.
    #[serde(default)]
    pub buckets: Vec<BucketPairConfig>,

    #[serde(default)]
    pub aws: AwsConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// One source/destination pair as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPairConfig {
    /// Source ("origin") bucket name
    pub bucket: String,
    #[serde(alias = "destinationBucket")]
    pub destination_bucket: String,
    #[serde(default, alias = "destinationRegion")]
    pub destination_region: String,
}

/// AWS client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Endpoint override, e.g. a local S3/IAM emulator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

/// Workflow behaviour switches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Delete everything created so far when a step fails.
    ///
    /// In us-east-1 S3 answers `createBucket` with success when the caller
    /// already owns the bucket, so a bucket that existed before the run is
    /// recorded like a new one. Rollback then deletes it if it is empty.
    #[serde(default)]
    pub rollback_on_failure: bool,
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file path, then apply env overrides
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Parse configuration from TOML text without consulting the environment
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RuntimeConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// The pair to provision. Extra entries are reported and ignored.
    pub fn replication_pair(&self) -> Option<&BucketPairConfig> {
        if self.buckets.len() > 1 {
            tracing::warn!(
                configured = self.buckets.len(),
                "Only the first bucket pair is provisioned; ignoring the rest"
            );
        }
        self.buckets.first()
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        validation::validate_config(self)
    }
}

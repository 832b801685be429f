// Configuration source loading.
//
// Priority order:
// 1. Environment variables (CROSSREGION_* prefix)
// 2. Config file path from CROSSREGION_CONFIG
// 3. Inline config content from CROSSREGION_CONFIG_CONTENT
// 4. Default config files (./crossregion.toml, ./.crossregion.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::RuntimeConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_PATHS: &[&str] = &["./crossregion.toml", "./.crossregion.toml"];

/// Load configuration using the process environment and default file locations.
pub fn load_config() -> Result<RuntimeConfig> {
    let mut config = load_from_file()?.unwrap_or_default();

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

fn load_from_file() -> Result<Option<RuntimeConfig>> {
    if let Ok(path) = env::var("CROSSREGION_CONFIG") {
        return read_file(&path).map(Some);
    }

    if let Ok(content) = env::var("CROSSREGION_CONFIG_CONTENT") {
        let config: RuntimeConfig = toml::from_str(&content)
            .context("Failed to parse inline config from CROSSREGION_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_PATHS {
        if Path::new(path).exists() {
            return read_file(path).map(Some);
        }
    }

    Ok(None)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let mut config = read_file(path)?;

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

fn read_file(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_file_parses_pairs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[buckets]]
            bucket = "origin-bucket"
            destination_bucket = "replica-bucket"
            destination_region = "eu-central-1"

            [log]
            level = "debug"
            format = "json"
            "#
        )
        .unwrap();

        let config = read_file(file.path()).unwrap();
        assert_eq!(config.buckets[0].bucket, "origin-bucket");
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_from_file_path(&missing).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }
}

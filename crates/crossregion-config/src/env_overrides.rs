use super::{BucketPairConfig, LogFormat, RuntimeConfig};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "CROSSREGION_";

/// Abstraction over environment-variable lookups so tests can supply
/// their own source of overrides.
pub trait EnvSource {
    /// Get a variable by its key, without the CROSSREGION_ prefix
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority after CLI flags).
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.log.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.log.format = format
            .parse::<LogFormat>()
            .context("Invalid CROSSREGION_LOG_FORMAT value")?;
    }

    // AWS client
    if let Some(region) = get_env_string(env, "AWS_REGION") {
        config.aws.region = Some(region);
    }
    if let Some(profile) = get_env_string(env, "AWS_PROFILE") {
        config.aws.profile = Some(profile);
    }
    if let Some(endpoint) = get_env_string(env, "AWS_ENDPOINT_URL") {
        config.aws.endpoint_url = Some(endpoint);
    }
    if let Some(val) = get_env_bool(env, "FORCE_PATH_STYLE")? {
        config.aws.force_path_style = val;
    }

    // Workflow
    if let Some(val) = get_env_bool(env, "ROLLBACK_ON_FAILURE")? {
        config.workflow.rollback_on_failure = val;
    }

    // Replication pair (always the first entry)
    if let Some(bucket) = get_env_string(env, "SOURCE_BUCKET") {
        ensure_pair(config).bucket = bucket;
    }
    if let Some(bucket) = get_env_string(env, "DESTINATION_BUCKET") {
        ensure_pair(config).destination_bucket = bucket;
    }
    if let Some(region) = get_env_string(env, "DESTINATION_REGION") {
        ensure_pair(config).destination_region = region;
    }

    Ok(())
}

fn ensure_pair(config: &mut RuntimeConfig) -> &mut BucketPairConfig {
    if config.buckets.is_empty() {
        config.buckets.push(BucketPairConfig {
            bucket: String::new(),
            destination_bucket: String::new(),
            destination_region: String::new(),
        });
    }
    &mut config.buckets[0]
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val.parse::<bool>().map_err(|e| {
                anyhow!(
                    "Failed to parse {}{} (expected bool): {}",
                    ENV_PREFIX,
                    key,
                    e
                )
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapEnv(HashMap<&'static str, &'static str>);

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    #[test]
    fn test_overrides_create_first_pair() {
        let env = MapEnv(HashMap::from([
            ("SOURCE_BUCKET", "bucket-a"),
            ("DESTINATION_BUCKET", "bucket-b"),
            ("DESTINATION_REGION", "us-west-2"),
        ]));
        let mut config = RuntimeConfig::default();
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.buckets.len(), 1);
        assert_eq!(config.buckets[0].bucket, "bucket-a");
        assert_eq!(config.buckets[0].destination_bucket, "bucket-b");
        assert_eq!(config.buckets[0].destination_region, "us-west-2");
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let env = MapEnv(HashMap::from([
            ("DESTINATION_BUCKET", "bucket-z"),
            ("LOG_FORMAT", "json"),
            ("ROLLBACK_ON_FAILURE", "true"),
            ("AWS_ENDPOINT_URL", "http://localhost:4566"),
        ]));
        let mut config = RuntimeConfig::from_toml_str(
            r#"
            [[buckets]]
            bucket = "bucket-a"
            destination_bucket = "bucket-b"
            "#,
        )
        .unwrap();
        apply_env_overrides(&mut config, &env).unwrap();

        assert_eq!(config.buckets[0].bucket, "bucket-a");
        assert_eq!(config.buckets[0].destination_bucket, "bucket-z");
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.workflow.rollback_on_failure);
        assert_eq!(
            config.aws.endpoint_url.as_deref(),
            Some("http://localhost:4566")
        );
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let env = MapEnv(HashMap::from([("FORCE_PATH_STYLE", "yes")]));
        let mut config = RuntimeConfig::default();
        let err = apply_env_overrides(&mut config, &env).unwrap_err();
        assert!(err.to_string().contains("CROSSREGION_FORCE_PATH_STYLE"));
    }
}

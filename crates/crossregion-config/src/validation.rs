// Configuration validation
//
// Validates that a replication pair is present and that names look like
// something S3 will accept before any provider call is made.

use crate::{BucketPairConfig, LogConfig, RuntimeConfig};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no bucket pair configured; add a [[buckets]] entry")]
    NoBucketPair,

    #[error("buckets[0].{field} must not be empty")]
    EmptyBucket { field: &'static str },

    #[error("buckets[0].{field} '{name}' is invalid: {reason}")]
    InvalidBucketName {
        field: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("source and destination bucket are both '{0}'")]
    SameBucket(String),

    #[error("log.level must not be empty")]
    EmptyLogLevel,
}

pub fn validate_config(config: &RuntimeConfig) -> Result<(), ValidationError> {
    let pair = config
        .buckets
        .first()
        .ok_or(ValidationError::NoBucketPair)?;
    validate_pair(pair)?;
    validate_log_config(&config.log)?;
    Ok(())
}

fn validate_pair(pair: &BucketPairConfig) -> Result<(), ValidationError> {
    validate_bucket_name("bucket", &pair.bucket)?;
    validate_bucket_name("destination_bucket", &pair.destination_bucket)?;

    if pair.bucket == pair.destination_bucket {
        return Err(ValidationError::SameBucket(pair.bucket.clone()));
    }

    if pair.destination_region.is_empty() {
        warn!("buckets[0].destination_region is not set");
    }

    Ok(())
}

fn validate_bucket_name(field: &'static str, name: &str) -> Result<(), ValidationError> {
    let invalid = |reason| ValidationError::InvalidBucketName {
        field,
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(ValidationError::EmptyBucket { field });
    }
    if name.len() < 3 || name.len() > 63 {
        return Err(invalid("must be 3-63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid(
            "must contain only lowercase letters, numbers, dots, and hyphens",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("cannot start or end with a hyphen"));
    }
    Ok(())
}

fn validate_log_config(config: &LogConfig) -> Result<(), ValidationError> {
    if config.level.trim().is_empty() {
        return Err(ValidationError::EmptyLogLevel);
    }
    Ok(())
}

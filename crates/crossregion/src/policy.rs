//! IAM and S3 document templates.
//!
//! Field order in the serialized documents follows struct declaration order,
//! so the JSON strings sent to IAM are stable byte-for-byte.

use serde::Serialize;
use serde_json::{json, Value};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const STORAGE_SERVICE_PRINCIPAL: &str = "s3.amazonaws.com";
pub const REPLICA_STORAGE_CLASS: &str = "STANDARD";

const SOURCE_BUCKET_ACTIONS: &[&str] = &["s3:GetReplicationConfiguration", "s3:ListBucket"];

const SOURCE_OBJECT_ACTIONS: &[&str] = &[
    "s3:GetObjectVersion",
    "s3:GetObjectVersionAcl",
    "s3:GetObjectVersionForReplication",
];

const DESTINATION_ACTIONS: &[&str] = &[
    "s3:ReplicateObject",
    "s3:ReplicateDelete",
    "s3:ReplicateTags",
    "s3:GetObjectVersionTagging",
];

pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{}", bucket)
}

/// Assume-role policy letting the S3 service principal act as the role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustPolicy {
    version: &'static str,
    statement: AssumeRoleStatement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleStatement {
    effect: &'static str,
    principal: Principal,
    action: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Principal {
    service: Vec<&'static str>,
}

impl TrustPolicy {
    pub fn storage_service() -> Self {
        Self {
            version: POLICY_VERSION,
            statement: AssumeRoleStatement {
                effect: "Allow",
                principal: Principal {
                    service: vec![STORAGE_SERVICE_PRINCIPAL],
                },
                action: "sts:AssumeRole",
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Permissions a replication role needs to copy `source` into `destination`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReplicationPolicy {
    version: &'static str,
    statement: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: &'static str,
    pub action: &'static [&'static str],
    pub resource: String,
}

impl ReplicationPolicy {
    pub fn new(source_bucket: &str, destination_bucket: &str) -> Self {
        let allow = |action: &'static [&'static str], bucket: &str| Statement {
            effect: "Allow",
            action,
            resource: bucket_arn(bucket),
        };

        Self {
            version: POLICY_VERSION,
            statement: vec![
                allow(SOURCE_BUCKET_ACTIONS, source_bucket),
                allow(SOURCE_OBJECT_ACTIONS, source_bucket),
                allow(DESTINATION_ACTIONS, destination_bucket),
            ],
        }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statement
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Replication configuration with one active rule routing every object
/// (empty prefix) to `destination_bucket`.
pub fn replication_configuration(role_arn: &str, destination_bucket: &str) -> Value {
    json!({
        "Role": role_arn,
        "Rules": [
            {
                "Destination": {
                    "Bucket": bucket_arn(destination_bucket),
                    "StorageClass": REPLICA_STORAGE_CLASS,
                },
                "Prefix": "",
                "Status": "Enabled",
            }
        ],
    })
}

//! Bucket creation and bidirectional replication setup.
//!
//! Every function here is a single awaited provider call, or a fixed
//! sequence of them. Nothing is issued concurrently and nothing is retried:
//! the first rejected call ends the run and its error is returned as-is.
//!
//! Steps, in order:
//!
//! 1. create source bucket, 2. enable versioning on it,
//! 3. create destination bucket, 4. enable versioning on it,
//! 5–8. role, policy, attachment and replication for source → destination,
//! 9–12. the same for destination → source.

use crate::error::{Result, WorkflowError};
use crate::policy::{replication_configuration, ReplicationPolicy, TrustPolicy};
use crate::provider::{ProviderRequest, Service};
use crate::rollback::{CreatedResource, CreatedResources};
use crossregion_config::BucketPairConfig;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const ROLE_ORIGIN_TO_DESTINATION: &str = "RoleOriginToDestination";
pub const POLICY_ORIGIN_TO_DESTINATION: &str = "Policy-OriginToDestination";
pub const ROLE_DESTINATION_TO_ORIGIN: &str = "RoleDestinationToOrigin";
pub const POLICY_DESTINATION_TO_ORIGIN: &str = "Policy-DestinationToOrigin";

/// The two buckets to provision. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationPair {
    pub source_bucket: String,
    pub destination_bucket: String,
    /// Carried for reporting; no provider call reads it.
    pub destination_region: String,
}

impl ReplicationPair {
    pub fn new(
        source_bucket: impl Into<String>,
        destination_bucket: impl Into<String>,
        destination_region: impl Into<String>,
    ) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            destination_bucket: destination_bucket.into(),
            destination_region: destination_region.into(),
        }
    }

    /// Replication directions in the order they are configured
    pub fn directions(&self) -> [Direction<'_>; 2] {
        [
            Direction {
                role_name: ROLE_ORIGIN_TO_DESTINATION,
                policy_name: POLICY_ORIGIN_TO_DESTINATION,
                from_bucket: &self.source_bucket,
                to_bucket: &self.destination_bucket,
            },
            Direction {
                role_name: ROLE_DESTINATION_TO_ORIGIN,
                policy_name: POLICY_DESTINATION_TO_ORIGIN,
                from_bucket: &self.destination_bucket,
                to_bucket: &self.source_bucket,
            },
        ]
    }
}

impl From<&BucketPairConfig> for ReplicationPair {
    fn from(config: &BucketPairConfig) -> Self {
        Self::new(
            config.bucket.clone(),
            config.destination_bucket.clone(),
            config.destination_region.clone(),
        )
    }
}

/// One replication direction and the IAM names used for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction<'a> {
    pub role_name: &'static str,
    pub policy_name: &'static str,
    pub from_bucket: &'a str,
    pub to_bucket: &'a str,
}

/// Role as echoed back by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedRole {
    pub role_name: String,
    pub arn: String,
}

impl CreatedRole {
    /// Read `Role.RoleName` and `Role.Arn` from a `createRole` response
    pub fn from_response(response: &Value) -> Result<Self> {
        Ok(Self {
            role_name: response_field(response, "createRole", "/Role/RoleName", "Role.RoleName")?,
            arn: response_field(response, "createRole", "/Role/Arn", "Role.Arn")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPolicy {
    pub arn: String,
}

impl CreatedPolicy {
    /// Read `Policy.Arn` from a `createPolicy` response
    pub fn from_response(response: &Value) -> Result<Self> {
        Ok(Self {
            arn: response_field(response, "createPolicy", "/Policy/Arn", "Policy.Arn")?,
        })
    }
}

/// Steps 1–4: both buckets, each followed by enabling versioning.
pub async fn create_buckets(
    provider: &dyn ProviderRequest,
    pair: &ReplicationPair,
    created: &mut CreatedResources,
) -> Result<()> {
    info!(
        source = %pair.source_bucket,
        destination = %pair.destination_bucket,
        destination_region = %pair.destination_region,
        "Creating buckets"
    );

    for bucket in [&pair.source_bucket, &pair.destination_bucket] {
        create_bucket(provider, bucket).await?;
        created.record(CreatedResource::Bucket(bucket.clone()));
        enable_versioning(provider, bucket).await?;
    }

    Ok(())
}

/// Steps 5–12: roles, policies and replication rules in both directions.
pub async fn attach_permissions(
    provider: &dyn ProviderRequest,
    pair: &ReplicationPair,
    created: &mut CreatedResources,
) -> Result<()> {
    for direction in pair.directions() {
        configure_direction(provider, direction, created).await?;
    }
    Ok(())
}

async fn configure_direction(
    provider: &dyn ProviderRequest,
    direction: Direction<'_>,
    created: &mut CreatedResources,
) -> Result<()> {
    info!(
        from = direction.from_bucket,
        to = direction.to_bucket,
        role = direction.role_name,
        "Configuring replication"
    );

    // The role exists once the call succeeds, whatever the response holds,
    // so it is recorded under the requested name before any field is read.
    let response = create_role(provider, direction.role_name).await?;
    created.record(CreatedResource::Role(direction.role_name.to_string()));
    let role = CreatedRole::from_response(&response)?;

    let response = create_policy(
        provider,
        direction.policy_name,
        direction.from_bucket,
        direction.to_bucket,
    )
    .await?;
    // Policies are deleted by ARN, so one without an ARN can't be recorded.
    let policy = CreatedPolicy::from_response(&response).inspect_err(|_| {
        warn!(
            policy = direction.policy_name,
            "Policy was created but the response has no ARN; it will not be rolled back"
        );
    })?;
    created.record(CreatedResource::Policy {
        arn: policy.arn.clone(),
    });

    attach_policy_to_role(provider, &policy.arn, &role.role_name).await?;
    created.record(CreatedResource::Attachment {
        role_name: role.role_name.clone(),
        policy_arn: policy.arn.clone(),
    });

    put_bucket_replication(
        provider,
        direction.from_bucket,
        direction.to_bucket,
        &role.arn,
    )
    .await?;
    created.record(CreatedResource::Replication {
        bucket: direction.from_bucket.to_string(),
    });

    Ok(())
}

pub async fn create_bucket(provider: &dyn ProviderRequest, name: &str) -> Result<Value> {
    call(provider, Service::S3, "createBucket", json!({ "Bucket": name })).await
}

pub async fn enable_versioning(provider: &dyn ProviderRequest, name: &str) -> Result<Value> {
    call(
        provider,
        Service::S3,
        "putBucketVersioning",
        json!({
            "Bucket": name,
            "VersioningConfiguration": {
                "MFADelete": "Disabled",
                "Status": "Enabled",
            },
        }),
    )
    .await
}

pub async fn create_role(provider: &dyn ProviderRequest, role_name: &str) -> Result<Value> {
    let document = TrustPolicy::storage_service().to_json()?;
    call(
        provider,
        Service::Iam,
        "createRole",
        json!({
            "RoleName": role_name,
            "AssumeRolePolicyDocument": document,
        }),
    )
    .await
}

pub async fn create_policy(
    provider: &dyn ProviderRequest,
    policy_name: &str,
    source_bucket: &str,
    destination_bucket: &str,
) -> Result<Value> {
    let document = ReplicationPolicy::new(source_bucket, destination_bucket).to_json()?;
    call(
        provider,
        Service::Iam,
        "createPolicy",
        json!({
            "PolicyName": policy_name,
            "PolicyDocument": document,
        }),
    )
    .await
}

pub async fn attach_policy_to_role(
    provider: &dyn ProviderRequest,
    policy_arn: &str,
    role_name: &str,
) -> Result<Value> {
    call(
        provider,
        Service::Iam,
        "attachRolePolicy",
        json!({
            "PolicyArn": policy_arn,
            "RoleName": role_name,
        }),
    )
    .await
}

pub async fn put_bucket_replication(
    provider: &dyn ProviderRequest,
    from_bucket: &str,
    to_bucket: &str,
    role_arn: &str,
) -> Result<Value> {
    call(
        provider,
        Service::S3,
        "putBucketReplication",
        json!({
            "Bucket": from_bucket,
            "ReplicationConfiguration": replication_configuration(role_arn, to_bucket),
        }),
    )
    .await
}

async fn call(
    provider: &dyn ProviderRequest,
    service: Service,
    action: &str,
    params: Value,
) -> Result<Value> {
    debug!(%service, action, %params, "Provider request");
    let response = provider.request(service, action, params).await?;
    info!(%service, action, "Provider request succeeded");
    Ok(response)
}

fn response_field(
    response: &Value,
    action: &'static str,
    pointer: &str,
    field: &'static str,
) -> Result<String> {
    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(WorkflowError::MalformedResponse { action, field })
}

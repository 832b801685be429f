//! Provider requests backed by the AWS SDK (S3 and IAM).

use crate::error::ProviderRequestError;
use crate::provider::{ProviderRequest, Service};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::types::{
    BucketLocationConstraint, BucketVersioningStatus, CreateBucketConfiguration, Destination,
    MfaDelete, ReplicationConfiguration, ReplicationRule, ReplicationRuleStatus, StorageClass,
    VersioningConfiguration,
};
use crossregion_config::AwsConfig;
use serde_json::{json, Value};
use std::fmt::Display;
use tracing::info;

/// Region where S3 rejects an explicit location constraint
const DEFAULT_S3_REGION: &str = "us-east-1";

/// Location constraint for `createBucket`.
///
/// An explicit constraint wins. Otherwise outside us-east-1 S3 requires one,
/// so it defaults to the client region.
fn location_constraint(explicit: Option<&str>, region: Option<&str>) -> Option<String> {
    explicit
        .or_else(|| region.filter(|region| *region != DEFAULT_S3_REGION))
        .map(str::to_string)
}

/// Sends provider requests to AWS
#[derive(Debug, Clone)]
pub struct AwsProvider {
    s3: aws_sdk_s3::Client,
    iam: aws_sdk_iam::Client,
    region: Option<String>,
}

impl AwsProvider {
    /// Build clients from the default credential chain plus config overrides
    pub async fn from_config(config: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let region = sdk_config.region().map(|r| r.as_ref().to_string());
        info!(
            region = region.as_deref().unwrap_or("<unset>"),
            endpoint = config.endpoint_url.as_deref().unwrap_or("<default>"),
            "Initialized AWS clients"
        );

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Self {
            s3: aws_sdk_s3::Client::from_conf(s3_config),
            iam: aws_sdk_iam::Client::new(&sdk_config),
            region,
        }
    }

    async fn create_bucket(&self, params: Params<'_>) -> Result<Value, ProviderRequestError> {
        let bucket = params.required("/Bucket")?;
        let mut request = self.s3.create_bucket().bucket(bucket);

        let constraint = location_constraint(
            params.optional("/CreateBucketConfiguration/LocationConstraint"),
            self.region.as_deref(),
        );
        if let Some(constraint) = constraint {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(constraint.as_str()))
                    .build(),
            );
        }

        let output = request
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;
        Ok(json!({ "Location": output.location() }))
    }

    async fn put_bucket_versioning(
        &self,
        params: Params<'_>,
    ) -> Result<Value, ProviderRequestError> {
        let bucket = params.required("/Bucket")?;
        let status = params.required("/VersioningConfiguration/Status")?;

        let mut versioning =
            VersioningConfiguration::builder().status(BucketVersioningStatus::from(status));
        if let Some(mfa_delete) = params.optional("/VersioningConfiguration/MFADelete") {
            versioning = versioning.mfa_delete(MfaDelete::from(mfa_delete));
        }

        self.s3
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(versioning.build())
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;
        Ok(json!({}))
    }

    // Rule prefixes are deprecated in favour of filters, but the rule shape
    // we send uses the plain prefix form.
    #[allow(deprecated)]
    async fn put_bucket_replication(
        &self,
        params: Params<'_>,
    ) -> Result<Value, ProviderRequestError> {
        let bucket = params.required("/Bucket")?;
        let role = params.required("/ReplicationConfiguration/Role")?;
        let rules = params
            .value
            .pointer("/ReplicationConfiguration/Rules")
            .and_then(Value::as_array)
            .ok_or_else(|| params.error("missing array parameter /ReplicationConfiguration/Rules"))?;

        let mut configuration = ReplicationConfiguration::builder().role(role);
        for rule in rules {
            let rule = params.nested(rule);
            let destination = Destination::builder()
                .bucket(rule.required("/Destination/Bucket")?)
                .set_storage_class(rule.optional("/Destination/StorageClass").map(StorageClass::from))
                .build()
                .map_err(|e| params.error(e))?;
            let built = ReplicationRule::builder()
                .destination(destination)
                .set_prefix(rule.optional("/Prefix").map(str::to_string))
                .status(ReplicationRuleStatus::from(rule.required("/Status")?))
                .build()
                .map_err(|e| params.error(e))?;
            configuration = configuration.rules(built);
        }
        let configuration = configuration.build().map_err(|e| params.error(e))?;

        self.s3
            .put_bucket_replication()
            .bucket(bucket)
            .replication_configuration(configuration)
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;
        Ok(json!({}))
    }

    async fn delete_bucket_replication(
        &self,
        params: Params<'_>,
    ) -> Result<Value, ProviderRequestError> {
        self.s3
            .delete_bucket_replication()
            .bucket(params.required("/Bucket")?)
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;
        Ok(json!({}))
    }

    async fn delete_bucket(&self, params: Params<'_>) -> Result<Value, ProviderRequestError> {
        self.s3
            .delete_bucket()
            .bucket(params.required("/Bucket")?)
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;
        Ok(json!({}))
    }

    async fn create_role(&self, params: Params<'_>) -> Result<Value, ProviderRequestError> {
        let output = self
            .iam
            .create_role()
            .role_name(params.required("/RoleName")?)
            .assume_role_policy_document(params.required("/AssumeRolePolicyDocument")?)
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;

        let role = output.role().map(|role| {
            json!({
                "RoleName": role.role_name(),
                "RoleId": role.role_id(),
                "Arn": role.arn(),
                "Path": role.path(),
            })
        });
        Ok(json!({ "Role": role }))
    }

    async fn create_policy(&self, params: Params<'_>) -> Result<Value, ProviderRequestError> {
        let output = self
            .iam
            .create_policy()
            .policy_name(params.required("/PolicyName")?)
            .policy_document(params.required("/PolicyDocument")?)
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;

        let policy = output.policy().map(|policy| {
            json!({
                "PolicyName": policy.policy_name(),
                "PolicyId": policy.policy_id(),
                "Arn": policy.arn(),
            })
        });
        Ok(json!({ "Policy": policy }))
    }

    async fn attach_role_policy(&self, params: Params<'_>) -> Result<Value, ProviderRequestError> {
        self.iam
            .attach_role_policy()
            .policy_arn(params.required("/PolicyArn")?)
            .role_name(params.required("/RoleName")?)
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;
        Ok(json!({}))
    }

    async fn detach_role_policy(&self, params: Params<'_>) -> Result<Value, ProviderRequestError> {
        self.iam
            .detach_role_policy()
            .policy_arn(params.required("/PolicyArn")?)
            .role_name(params.required("/RoleName")?)
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;
        Ok(json!({}))
    }

    async fn delete_policy(&self, params: Params<'_>) -> Result<Value, ProviderRequestError> {
        self.iam
            .delete_policy()
            .policy_arn(params.required("/PolicyArn")?)
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;
        Ok(json!({}))
    }

    async fn delete_role(&self, params: Params<'_>) -> Result<Value, ProviderRequestError> {
        self.iam
            .delete_role()
            .role_name(params.required("/RoleName")?)
            .send()
            .await
            .map_err(|e| params.error(DisplayErrorContext(&e)))?;
        Ok(json!({}))
    }
}

#[async_trait]
impl ProviderRequest for AwsProvider {
    async fn request(
        &self,
        service: Service,
        action: &str,
        params: Value,
    ) -> Result<Value, ProviderRequestError> {
        let params = Params {
            service,
            action,
            value: &params,
        };

        match (service, action) {
            (Service::S3, "createBucket") => self.create_bucket(params).await,
            (Service::S3, "putBucketVersioning") => self.put_bucket_versioning(params).await,
            (Service::S3, "putBucketReplication") => self.put_bucket_replication(params).await,
            (Service::S3, "deleteBucketReplication") => {
                self.delete_bucket_replication(params).await
            }
            (Service::S3, "deleteBucket") => self.delete_bucket(params).await,
            (Service::Iam, "createRole") => self.create_role(params).await,
            (Service::Iam, "createPolicy") => self.create_policy(params).await,
            (Service::Iam, "attachRolePolicy") => self.attach_role_policy(params).await,
            (Service::Iam, "detachRolePolicy") => self.detach_role_policy(params).await,
            (Service::Iam, "deletePolicy") => self.delete_policy(params).await,
            (Service::Iam, "deleteRole") => self.delete_role(params).await,
            _ => Err(params.error("unsupported action")),
        }
    }
}

/// Request parameters tagged with the call they belong to, for error reporting
#[derive(Debug, Clone, Copy)]
struct Params<'a> {
    service: Service,
    action: &'a str,
    value: &'a Value,
}

impl<'a> Params<'a> {
    fn required(&self, pointer: &str) -> Result<&'a str, ProviderRequestError> {
        self.optional(pointer)
            .ok_or_else(|| self.error(format!("missing string parameter {}", pointer)))
    }

    fn optional(&self, pointer: &str) -> Option<&'a str> {
        self.value.pointer(pointer).and_then(Value::as_str)
    }

    fn nested(&self, value: &'a Value) -> Self {
        Self { value, ..*self }
    }

    fn error(&self, message: impl Display) -> ProviderRequestError {
        ProviderRequestError::new(self.service, self.action, message.to_string())
    }
}

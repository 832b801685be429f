//! Ledger of resources created during a run, and best-effort compensation.

use crate::provider::{ProviderRequest, Service};
use serde_json::{json, Value};
use tracing::{info, warn};

/// A resource this run created and could delete again
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedResource {
    Bucket(String),
    Role(String),
    Policy {
        arn: String,
    },
    Attachment {
        role_name: String,
        policy_arn: String,
    },
    Replication {
        bucket: String,
    },
}

impl CreatedResource {
    /// The provider call that undoes this resource
    fn undo_request(&self) -> (Service, &'static str, Value) {
        match self {
            CreatedResource::Bucket(name) => (Service::S3, "deleteBucket", json!({ "Bucket": name })),
            CreatedResource::Role(name) => (Service::Iam, "deleteRole", json!({ "RoleName": name })),
            CreatedResource::Policy { arn } => {
                (Service::Iam, "deletePolicy", json!({ "PolicyArn": arn }))
            }
            CreatedResource::Attachment {
                role_name,
                policy_arn,
            } => (
                Service::Iam,
                "detachRolePolicy",
                json!({ "PolicyArn": policy_arn, "RoleName": role_name }),
            ),
            CreatedResource::Replication { bucket } => (
                Service::S3,
                "deleteBucketReplication",
                json!({ "Bucket": bucket }),
            ),
        }
    }
}

/// Resources in creation order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CreatedResources {
    resources: Vec<CreatedResource>,
}

impl CreatedResources {
    pub fn record(&mut self, resource: CreatedResource) {
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CreatedResource> {
        self.resources.iter()
    }

    /// Undo every recorded resource, newest first.
    ///
    /// Failures are logged and skipped so one stuck resource doesn't strand
    /// the rest. Returns how many undo calls succeeded.
    pub async fn rollback(&self, provider: &dyn ProviderRequest) -> usize {
        let mut undone = 0;
        for resource in self.resources.iter().rev() {
            let (service, action, params) = resource.undo_request();
            match provider.request(service, action, params).await {
                Ok(_) => {
                    info!(%service, action, ?resource, "Rolled back");
                    undone += 1;
                }
                Err(e) => {
                    warn!(error = %e, ?resource, "Rollback step failed; continuing");
                }
            }
        }
        undone
    }
}

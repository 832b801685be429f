//! The request seam every provider interaction goes through.

use crate::error::ProviderRequestError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Logical provider service a request is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    S3,
    Iam,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::S3 => "S3",
            Service::Iam => "IAM",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatches one provider action with a JSON parameter object.
///
/// Implementations return the provider's response as a JSON object shaped
/// like the provider API response (`{"Role": {"RoleName": .., "Arn": ..}}`
/// for `createRole`, `{"Policy": {"Arn": ..}}` for `createPolicy`).
#[async_trait]
pub trait ProviderRequest: Send + Sync {
    async fn request(
        &self,
        service: Service,
        action: &str,
        params: Value,
    ) -> Result<Value, ProviderRequestError>;
}

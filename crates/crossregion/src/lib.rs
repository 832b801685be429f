//! Bidirectional S3 replication setup.
//!
//! Creates two versioned buckets, then for each direction an IAM role, a
//! permission policy, the attachment between them, and a replication rule.
//! All provider traffic goes through [`ProviderRequest`]; [`AwsProvider`]
//! is the implementation backed by the AWS SDK.
//!
//! The work is exposed as a command with two lifecycle events
//! (`createBuckets`, `attachPermissions`), see [`lifecycle`].

pub mod aws;
pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod provider;
pub mod rollback;
pub mod workflow;

mod init;

pub use aws::AwsProvider;
pub use error::{ProviderRequestError, WorkflowError};
pub use init::init_tracing;
pub use lifecycle::{run_command, LifecycleEvent, COMMAND};
pub use provider::{ProviderRequest, Service};
pub use rollback::{CreatedResource, CreatedResources};
pub use workflow::ReplicationPair;

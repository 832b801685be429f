//! Error types for provider requests and the replication workflow.

use crate::provider::Service;
use thiserror::Error;

/// A provider call was rejected or could not be sent.
///
/// Wraps whatever the transport reported (network failure, auth failure,
/// validation rejection, throttling) without classifying it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{service} {action} request failed: {message}")]
pub struct ProviderRequestError {
    pub service: Service,
    pub action: String,
    pub message: String,
}

impl ProviderRequestError {
    pub fn new(service: Service, action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service,
            action: action.into(),
            message: message.into(),
        }
    }
}

/// Errors that abort the replication workflow
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Provider(#[from] ProviderRequestError),

    /// A create call succeeded but its response lacks a value a later step needs
    #[error("{action} response is missing {field}")]
    MalformedResponse {
        action: &'static str,
        field: &'static str,
    },

    #[error("failed to encode policy document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no hook registered for '{0}'")]
    UnknownHook(String),
}

/// Result type alias for WorkflowError
pub type Result<T> = std::result::Result<T, WorkflowError>;

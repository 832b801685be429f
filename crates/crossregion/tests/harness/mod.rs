//! Recording provider for driving the workflow without AWS.
//!
//! Every request is appended to an in-memory log. `createRole` and
//! `createPolicy` answer with ARNs derived from the requested name; every
//! other action answers `{}`. Failures can be injected by call number or by
//! action name.

#![allow(dead_code)]

use async_trait::async_trait;
use crossregion::{ProviderRequest, ProviderRequestError, Service};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Mutex;

pub const ACCOUNT_ID: &str = "123456789012";

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub service: Service,
    pub action: String,
    pub params: Value,
}

impl RecordedCall {
    /// String parameter at a JSON pointer, or "" when absent
    pub fn param(&self, pointer: &str) -> &str {
        self.params
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct RecordingProvider {
    calls: Mutex<Vec<RecordedCall>>,
    fail_at: Option<usize>,
    failing_actions: HashSet<String>,
    malformed_actions: HashSet<String>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the n-th request (1-based)
    pub fn failing_at(mut self, call_number: usize) -> Self {
        self.fail_at = Some(call_number);
        self
    }

    /// Reject every request for `action`
    pub fn failing_action(mut self, action: &str) -> Self {
        self.failing_actions.insert(action.to_string());
        self
    }

    /// Answer `{}` for `action` instead of a well-formed response
    pub fn malformed_action(mut self, action: &str) -> Self {
        self.malformed_actions.insert(action.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.action).collect()
    }
}

pub fn role_arn(role_name: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", ACCOUNT_ID, role_name)
}

pub fn policy_arn(policy_name: &str) -> String {
    format!("arn:aws:iam::{}:policy/{}", ACCOUNT_ID, policy_name)
}

#[async_trait]
impl ProviderRequest for RecordingProvider {
    async fn request(
        &self,
        service: Service,
        action: &str,
        params: Value,
    ) -> Result<Value, ProviderRequestError> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                service,
                action: action.to_string(),
                params: params.clone(),
            });
            calls.len()
        };

        if self.fail_at == Some(call_number) || self.failing_actions.contains(action) {
            return Err(ProviderRequestError::new(
                service,
                action,
                format!("AccessDenied: call {} rejected", call_number),
            ));
        }

        if self.malformed_actions.contains(action) {
            return Ok(json!({}));
        }

        let response = match (service, action) {
            (Service::Iam, "createRole") => {
                let name = params["RoleName"].as_str().unwrap_or_default();
                json!({ "Role": { "RoleName": name, "Arn": role_arn(name) } })
            }
            (Service::Iam, "createPolicy") => {
                let name = params["PolicyName"].as_str().unwrap_or_default();
                json!({ "Policy": { "PolicyName": name, "Arn": policy_arn(name) } })
            }
            (Service::S3, "createBucket") => {
                json!({ "Location": format!("/{}", params["Bucket"].as_str().unwrap_or_default()) })
            }
            _ => json!({}),
        };
        Ok(response)
    }
}

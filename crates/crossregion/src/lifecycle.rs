//! Command registration: one command, two lifecycle events, one hook each.

use crate::error::{Result, WorkflowError};
use crate::provider::ProviderRequest;
use crate::rollback::CreatedResources;
use crate::workflow::{self, ReplicationPair};
use tracing::{info, warn};

/// A command as advertised to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub lifecycle_events: &'static [LifecycleEvent],
    pub usage: &'static str,
}

pub const COMMAND: CommandSpec = CommandSpec {
    name: "bidirectionalReplication",
    lifecycle_events: &[LifecycleEvent::CreateBuckets, LifecycleEvent::AttachPermissions],
    usage: "Add replica configuration to buckets",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    CreateBuckets,
    AttachPermissions,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::CreateBuckets => "createBuckets",
            LifecycleEvent::AttachPermissions => "attachPermissions",
        }
    }

    /// Name of the hook bound to this event, e.g. `before:bidirectionalReplication:createBuckets`
    pub fn hook_name(&self) -> String {
        format!("before:{}:{}", COMMAND.name, self.as_str())
    }

    pub fn from_hook(hook: &str) -> Option<Self> {
        COMMAND
            .lifecycle_events
            .iter()
            .copied()
            .find(|event| event.hook_name() == hook)
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook names this command registers
pub fn hooks() -> Vec<String> {
    COMMAND
        .lifecycle_events
        .iter()
        .map(LifecycleEvent::hook_name)
        .collect()
}

/// Run the work bound to one hook
pub async fn run_hook(
    provider: &dyn ProviderRequest,
    pair: &ReplicationPair,
    hook: &str,
    created: &mut CreatedResources,
) -> Result<()> {
    match LifecycleEvent::from_hook(hook) {
        Some(LifecycleEvent::CreateBuckets) => {
            workflow::create_buckets(provider, pair, created).await
        }
        Some(LifecycleEvent::AttachPermissions) => {
            workflow::attach_permissions(provider, pair, created).await
        }
        None => Err(WorkflowError::UnknownHook(hook.to_string())),
    }
}

/// Run the selected lifecycle events in the order the command declares them.
///
/// On failure, if `rollback_on_failure` is set, everything created by this
/// run is deleted again before the original error is returned.
pub async fn run_command(
    provider: &dyn ProviderRequest,
    pair: &ReplicationPair,
    events: &[LifecycleEvent],
    rollback_on_failure: bool,
) -> Result<CreatedResources> {
    let mut created = CreatedResources::default();

    for event in COMMAND
        .lifecycle_events
        .iter()
        .filter(|event| events.contains(*event))
    {
        info!(command = COMMAND.name, event = event.as_str(), "Running lifecycle event");

        if let Err(e) = run_hook(provider, pair, &event.hook_name(), &mut created).await {
            if rollback_on_failure && !created.is_empty() {
                warn!(
                    error = %e,
                    resources = created.len(),
                    "Lifecycle event failed; rolling back created resources"
                );
                let undone = created.rollback(provider).await;
                info!(undone, total = created.len(), "Rollback finished");
            }
            return Err(e);
        }
    }

    Ok(created)
}

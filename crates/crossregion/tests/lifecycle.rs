//! Lifecycle events, hooks and rollback.

mod harness;

use crossregion::lifecycle::{self, COMMAND};
use crossregion::{run_command, CreatedResources, LifecycleEvent, ReplicationPair, WorkflowError};
use harness::{policy_arn, RecordingProvider};

fn pair() -> ReplicationPair {
    ReplicationPair::new("bucket-a", "bucket-b", "us-west-2")
}

#[tokio::test]
async fn test_full_command_runs_both_events() {
    let provider = RecordingProvider::new();
    let created = run_command(&provider, &pair(), COMMAND.lifecycle_events, false)
        .await
        .unwrap();

    assert_eq!(provider.calls().len(), 12);
    assert_eq!(created.len(), 10);
}

#[tokio::test]
async fn test_create_buckets_event_alone() {
    let provider = RecordingProvider::new();
    run_command(&provider, &pair(), &[LifecycleEvent::CreateBuckets], false)
        .await
        .unwrap();

    assert_eq!(
        provider.actions(),
        vec![
            "createBucket",
            "putBucketVersioning",
            "createBucket",
            "putBucketVersioning"
        ]
    );
}

#[tokio::test]
async fn test_attach_permissions_event_alone() {
    let provider = RecordingProvider::new();
    run_command(&provider, &pair(), &[LifecycleEvent::AttachPermissions], false)
        .await
        .unwrap();

    let actions = provider.actions();
    assert_eq!(actions.len(), 8);
    assert_eq!(actions[0], "createRole");
    assert_eq!(actions[7], "putBucketReplication");
}

#[tokio::test]
async fn test_events_run_in_declared_order() {
    let provider = RecordingProvider::new();
    run_command(
        &provider,
        &pair(),
        &[LifecycleEvent::AttachPermissions, LifecycleEvent::CreateBuckets],
        false,
    )
    .await
    .unwrap();

    let actions = provider.actions();
    assert_eq!(actions[0], "createBucket");
    assert_eq!(actions[4], "createRole");
}

#[tokio::test]
async fn test_hooks_dispatch_by_name() {
    let provider = RecordingProvider::new();
    let mut created = CreatedResources::default();

    for hook in lifecycle::hooks() {
        lifecycle::run_hook(&provider, &pair(), &hook, &mut created)
            .await
            .unwrap();
    }
    assert_eq!(provider.calls().len(), 12);

    let err = lifecycle::run_hook(
        &provider,
        &pair(),
        "before:bidirectionalReplication.createBuckets",
        &mut created,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownHook(_)));
    assert_eq!(provider.calls().len(), 12);
}

#[tokio::test]
async fn test_failure_without_rollback_leaves_resources() {
    let provider = RecordingProvider::new().failing_at(10);
    let err = run_command(&provider, &pair(), COMMAND.lifecycle_events, false)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Provider(_)));
    assert_eq!(provider.calls().len(), 10);
}

#[tokio::test]
async fn test_rollback_undoes_created_resources_newest_first() {
    let provider = RecordingProvider::new().failing_at(10);
    let err = run_command(&provider, &pair(), COMMAND.lifecycle_events, true)
        .await
        .unwrap_err();

    // The original failure is what the caller sees
    match err {
        WorkflowError::Provider(e) => assert_eq!(e.action, "createPolicy"),
        other => panic!("expected provider error, got {:?}", other),
    }

    let calls = provider.calls();
    let undo: Vec<(&str, &str)> = calls[10..]
        .iter()
        .map(|call| {
            let key = match call.action.as_str() {
                "deleteRole" => call.param("/RoleName"),
                "deletePolicy" | "detachRolePolicy" => call.param("/PolicyArn"),
                _ => call.param("/Bucket"),
            };
            (call.action.as_str(), key)
        })
        .collect();

    let origin_policy = policy_arn("Policy-OriginToDestination");
    assert_eq!(
        undo,
        vec![
            ("deleteRole", "RoleDestinationToOrigin"),
            ("deleteBucketReplication", "bucket-a"),
            ("detachRolePolicy", origin_policy.as_str()),
            ("deletePolicy", origin_policy.as_str()),
            ("deleteRole", "RoleOriginToDestination"),
            ("deleteBucket", "bucket-b"),
            ("deleteBucket", "bucket-a"),
        ]
    );
}

#[tokio::test]
async fn test_rollback_continues_past_failed_undo() {
    let provider = RecordingProvider::new()
        .failing_at(8)
        .failing_action("detachRolePolicy");
    run_command(&provider, &pair(), COMMAND.lifecycle_events, true)
        .await
        .unwrap_err();

    assert_eq!(
        provider.actions()[8..],
        [
            "detachRolePolicy",
            "deletePolicy",
            "deleteRole",
            "deleteBucket",
            "deleteBucket"
        ]
    );
}

#[tokio::test]
async fn test_rollback_skipped_when_nothing_was_created() {
    let provider = RecordingProvider::new().failing_at(1);
    run_command(&provider, &pair(), COMMAND.lifecycle_events, true)
        .await
        .unwrap_err();

    assert_eq!(provider.actions(), vec!["createBucket"]);
}

#[tokio::test]
async fn test_rollback_deletes_role_from_malformed_response() {
    let provider = RecordingProvider::new().malformed_action("createRole");
    let err = run_command(&provider, &pair(), COMMAND.lifecycle_events, true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::MalformedResponse {
            action: "createRole",
            ..
        }
    ));
    let calls = provider.calls();
    assert_eq!(
        provider.actions()[5..],
        ["deleteRole", "deleteBucket", "deleteBucket"]
    );
    assert_eq!(calls[5].param("/RoleName"), "RoleOriginToDestination");
}

#[tokio::test]
async fn test_policy_without_arn_is_not_rolled_back() {
    let provider = RecordingProvider::new().malformed_action("createPolicy");
    run_command(&provider, &pair(), COMMAND.lifecycle_events, true)
        .await
        .unwrap_err();

    assert_eq!(
        provider.actions()[6..],
        ["deleteRole", "deleteBucket", "deleteBucket"]
    );
}

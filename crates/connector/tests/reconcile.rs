//! Startup reconciliation against an in-memory remote webhook API.

mod common;

use std::sync::Arc;

use common::{config, gid, FakeWebhookApi, TARGET};
use connector::{
    ActionFilter, ChangeAction, ConnectorBuilder, ConnectorConfig, ConnectorError,
    ReconcileOutcome, Subscription, SubscriptionId, SubscriptionRegistry, WebhookReconciler,
    WorkspaceGid,
};

fn registry(resources: &[(&str, &str)]) -> SubscriptionRegistry {
    let mut registry = SubscriptionRegistry::new();
    for (id, resource) in resources {
        registry
            .insert(Subscription {
                id: SubscriptionId::new(*id).unwrap(),
                resource: gid(resource),
                filter: ActionFilter::Any,
            })
            .unwrap();
    }
    registry
}

#[tokio::test]
async fn zero_subscriptions_make_no_remote_calls() {
    let api = FakeWebhookApi::new();
    // Neither a workspace nor a base URL is needed when nothing is registered.
    let config = ConnectorConfig::new("token");

    let report = WebhookReconciler::new(Arc::new(api.clone()))
        .reconcile(&config, &SubscriptionRegistry::new())
        .await
        .unwrap();

    assert!(report.entries.is_empty());
    assert!(report.target.is_none());
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn missing_workspace_fails_before_any_call() {
    let api = FakeWebhookApi::new();
    let config = ConnectorConfig::new("token").with_base_url("https://bridge.example.com");

    let err = WebhookReconciler::new(Arc::new(api.clone()))
        .reconcile(&config, &registry(&[("s1", "r1")]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConnectorError::MissingConfiguration {
            field: "workspace_id"
        }
    ));
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn empty_workspace_in_config_counts_as_missing() {
    let api = FakeWebhookApi::new();
    let config: ConnectorConfig = serde_json::from_value(serde_json::json!({
        "access_token": "token",
        "base_url": "https://bridge.example.com",
        "workspace_id": "",
    }))
    .unwrap();
    assert!(config.workspace_id.is_none());

    let err = WebhookReconciler::new(Arc::new(api.clone()))
        .reconcile(&config, &registry(&[("s1", "r1")]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConnectorError::MissingConfiguration {
            field: "workspace_id"
        }
    ));
    assert_eq!(api.total_calls(), 0);
}

#[test]
fn empty_resource_gid_cannot_be_requested() {
    let result = serde_json::from_value::<connector::SubscriptionRequest>(serde_json::json!({
        "gid": "",
        "action": "added",
    }));
    assert!(result.is_err());
}

#[tokio::test]
async fn invalid_base_url_fails_before_any_call() {
    let api = FakeWebhookApi::new();
    let config = ConnectorConfig::new("token")
        .with_base_url("http://bridge.example.com")
        .with_workspace(WorkspaceGid::new("ws-1").unwrap());

    let err = WebhookReconciler::new(Arc::new(api.clone()))
        .reconcile(&config, &registry(&[("s1", "r1")]))
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::InvalidConfiguration { .. }));
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn listing_failure_is_fatal() {
    let api = FakeWebhookApi::new().failing_list();

    let err = WebhookReconciler::new(Arc::new(api.clone()))
        .reconcile(&config(), &registry(&[("s1", "r1")]))
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::RemoteFetchFailure { .. }));
    assert_eq!(api.list_calls(), 1);
    assert!(api.creates().is_empty());
}

#[tokio::test]
async fn existing_active_webhook_suppresses_creation() {
    let api = FakeWebhookApi::new().with_webhook("r1", TARGET, true);

    let report = WebhookReconciler::new(Arc::new(api.clone()))
        .reconcile(&config(), &registry(&[("s1", "r1")]))
        .await
        .unwrap();

    assert!(api.creates().is_empty());
    assert_eq!(report.target.as_deref(), Some(TARGET));
    assert!(matches!(
        report.entries[0].outcome,
        ReconcileOutcome::AlreadyRegistered { .. }
    ));
    assert_eq!(report.created(), 0);
}

#[tokio::test]
async fn inactive_or_foreign_webhooks_do_not_count() {
    let api = FakeWebhookApi::new()
        .with_webhook("r1", TARGET, false)
        .with_webhook("r1", "https://elsewhere.example.com/asana-connector/webhook", true)
        .with_webhook("r2", TARGET, true);

    let report = WebhookReconciler::new(Arc::new(api.clone()))
        .reconcile(&config(), &registry(&[("s1", "r1")]))
        .await
        .unwrap();

    assert_eq!(api.creates(), vec![("r1".to_owned(), TARGET.to_owned())]);
    assert!(matches!(
        report.entries[0].outcome,
        ReconcileOutcome::Created { .. }
    ));
}

#[tokio::test]
async fn second_pass_creates_nothing() {
    let api = FakeWebhookApi::new();
    let reconciler = WebhookReconciler::new(Arc::new(api.clone()));
    let subscriptions = registry(&[("s1", "r1"), ("s2", "r2")]);

    let first = reconciler.reconcile(&config(), &subscriptions).await.unwrap();
    assert_eq!(first.created(), 2);

    let second = reconciler.reconcile(&config(), &subscriptions).await.unwrap();
    assert_eq!(second.created(), 0);
    assert_eq!(api.creates().len(), 2);
    assert_eq!(api.list_calls(), 2);
}

#[tokio::test]
async fn creates_for_each_subscriptions_own_resource_in_order() {
    let api = FakeWebhookApi::new();

    WebhookReconciler::new(Arc::new(api.clone()))
        .reconcile(&config(), &registry(&[("s1", "r1"), ("s2", "r2"), ("s3", "r3")]))
        .await
        .unwrap();

    let resources: Vec<_> = api.creates().into_iter().map(|(r, _)| r).collect();
    assert_eq!(resources, ["r1", "r2", "r3"]);
}

#[tokio::test]
async fn same_resource_twice_creates_one_webhook() {
    let api = FakeWebhookApi::new();

    let report = WebhookReconciler::new(Arc::new(api.clone()))
        .reconcile(&config(), &registry(&[("s1", "r1"), ("s2", "r1")]))
        .await
        .unwrap();

    assert_eq!(api.creates().len(), 1);
    assert!(matches!(
        report.entries[1].outcome,
        ReconcileOutcome::AlreadyRegistered { .. }
    ));
}

#[tokio::test]
async fn create_failures_do_not_stop_the_pass() {
    let api = FakeWebhookApi::new()
        .failing_create_for("r1")
        .inactive_for("r2");

    let report = WebhookReconciler::new(Arc::new(api.clone()))
        .reconcile(&config(), &registry(&[("s1", "r1"), ("s2", "r2"), ("s3", "r3")]))
        .await
        .unwrap();

    assert_eq!(api.creates().len(), 3);
    assert!(matches!(
        report.entries[0].outcome,
        ReconcileOutcome::Failed(ConnectorError::RemoteCreateFailure { .. })
    ));
    assert!(matches!(
        report.entries[1].outcome,
        ReconcileOutcome::Inactive { .. }
    ));
    assert!(matches!(
        report.entries[2].outcome,
        ReconcileOutcome::Created { .. }
    ));

    let failed: Vec<_> = report
        .failures()
        .map(|entry| entry.subscription.as_str())
        .collect();
    assert_eq!(failed, ["s1", "s2"]);
}

#[tokio::test]
async fn custom_webhook_path_changes_the_target() {
    let api = FakeWebhookApi::new();
    let config = config().with_webhook_path("/hooks/asana");

    let mut builder = ConnectorBuilder::new(config);
    builder
        .on(
            connector::SubscriptionRequest::new(gid("r1"))
                .with_filter(ActionFilter::Only(ChangeAction::Added)),
            common::recording_handler("r1", &Default::default()),
        )
        .unwrap();
    let connector = builder.start(Arc::new(api.clone())).await.unwrap();

    assert_eq!(connector.webhook_path(), "/hooks/asana");
    assert_eq!(
        api.creates(),
        vec![(
            "r1".to_owned(),
            "https://bridge.example.com/hooks/asana".to_owned()
        )]
    );
}

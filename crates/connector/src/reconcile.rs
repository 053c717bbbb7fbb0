//! Startup reconciliation of local subscriptions against remote webhooks.
//!
//! Runs once, before the connector enters steady state. For every registered
//! subscription (in registration order) it makes sure an active Asana webhook
//! delivers that subscription's resource to this connector's target URL,
//! creating one only when none exists. Running it again against unchanged
//! remote state issues no create calls.
//!
//! Precondition failures and a failed listing are fatal. Individual create
//! failures are not: they are logged, recorded in the [`ReconcileReport`], and
//! the pass continues. Nothing is rolled back.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::config::validate_base_url;
use crate::{
    ConnectorConfig, ConnectorError, RemoteWebhook, ResourceGid, SubscriptionId,
    SubscriptionRegistry, WebhookApi, WebhookGid,
};

/// What reconciliation did for one subscription.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// An active webhook for the resource and target already existed.
    AlreadyRegistered { webhook: Option<WebhookGid> },
    /// A webhook was created and the handshake succeeded.
    Created { webhook: Option<WebhookGid> },
    /// A webhook was created but Asana reports it inactive (handshake not
    /// completed or rejected).
    Inactive { webhook: Option<WebhookGid> },
    /// The create call failed. Always a [`ConnectorError::RemoteCreateFailure`].
    Failed(ConnectorError),
}

impl ReconcileOutcome {
    /// `true` when the subscription ends the pass with an active webhook.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::AlreadyRegistered { .. } | Self::Created { .. })
    }
}

/// Per-subscription result of one reconciliation pass.
#[derive(Debug)]
pub struct ReconcileEntry {
    pub subscription: SubscriptionId,
    pub resource: ResourceGid,
    pub outcome: ReconcileOutcome,
}

/// Result of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Webhook target URL; `None` when there was nothing to reconcile.
    pub target: Option<String>,
    pub entries: Vec<ReconcileEntry>,
}

impl ReconcileReport {
    /// Number of create calls issued during the pass.
    pub fn created(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !matches!(e.outcome, ReconcileOutcome::AlreadyRegistered { .. }))
            .count()
    }

    /// Entries that did not end with an active webhook.
    pub fn failures(&self) -> impl Iterator<Item = &ReconcileEntry> {
        self.entries.iter().filter(|e| !e.outcome.is_active())
    }
}

/// Brings remote webhooks in line with the registered subscriptions.
#[derive(Clone)]
pub struct WebhookReconciler {
    api: Arc<dyn WebhookApi>,
}

impl WebhookReconciler {
    pub fn new(api: Arc<dyn WebhookApi>) -> Self {
        Self { api }
    }

    /// Runs one reconciliation pass.
    ///
    /// # Errors
    ///
    /// - [`ConnectorError::MissingConfiguration`] when subscriptions exist but
    ///   no workspace is configured.
    /// - [`ConnectorError::InvalidConfiguration`] when the base URL is invalid.
    /// - [`ConnectorError::RemoteFetchFailure`] when listing webhooks fails.
    ///
    /// All three are returned before any webhook is created.
    #[instrument(skip_all, fields(subscriptions = subscriptions.len()))]
    pub async fn reconcile(
        &self,
        config: &ConnectorConfig,
        subscriptions: &SubscriptionRegistry,
    ) -> Result<ReconcileReport, ConnectorError> {
        if subscriptions.is_empty() {
            return Ok(ReconcileReport::default());
        }

        let workspace = config
            .workspace_id
            .as_ref()
            .ok_or(ConnectorError::MissingConfiguration {
                field: "workspace_id",
            })?;
        let base_url = validate_base_url(config.base_url.as_deref())?;
        let target = base_url.webhook_target(config.webhook_path());

        let mut known = self
            .api
            .list_webhooks(workspace)
            .await
            .map_err(|source| ConnectorError::RemoteFetchFailure {
                workspace: workspace.clone(),
                source,
            })?;

        let mut entries = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions.iter() {
            let resource = &subscription.resource;
            let outcome = match known.iter().find(|hook| hook.serves(resource, &target)) {
                Some(existing) => {
                    info!(
                        resource = %resource,
                        target = %existing.target,
                        "using existing webhook"
                    );
                    ReconcileOutcome::AlreadyRegistered {
                        webhook: existing.gid.clone(),
                    }
                }
                None => self.create(resource, &target, &mut known).await,
            };
            entries.push(ReconcileEntry {
                subscription: subscription.id.clone(),
                resource: resource.clone(),
                outcome,
            });
        }

        Ok(ReconcileReport {
            target: Some(target),
            entries,
        })
    }

    async fn create(
        &self,
        resource: &ResourceGid,
        target: &str,
        known: &mut Vec<RemoteWebhook>,
    ) -> ReconcileOutcome {
        match self.api.create_webhook(resource, target).await {
            Ok(webhook) if webhook.active => {
                info!(
                    resource = %resource,
                    webhook = ?webhook.gid,
                    target = %webhook.target,
                    "webhook registered successfully"
                );
                let gid = webhook.gid.clone();
                known.push(webhook);
                ReconcileOutcome::Created { webhook: gid }
            }
            Ok(webhook) => {
                error!(
                    resource = %resource,
                    webhook = ?webhook.gid,
                    target = %webhook.target,
                    "webhook registration failure: webhook is inactive"
                );
                ReconcileOutcome::Inactive {
                    webhook: webhook.gid,
                }
            }
            Err(source) => {
                let err = ConnectorError::RemoteCreateFailure {
                    resource: resource.clone(),
                    source,
                };
                error!(resource = %resource, error = %err, "webhook registration failure");
                ReconcileOutcome::Failed(err)
            }
        }
    }
}

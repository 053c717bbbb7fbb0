//! Connector lifecycle: registration, startup, steady state.
//!
//! [`ConnectorBuilder`] owns the mutable registration phase. [`ConnectorBuilder::start`]
//! consumes it, reconciles remote webhooks, and only on success yields a
//! [`Connector`], whose registry can no longer change. Host code shares the
//! `Connector` with the HTTP boundary (usually as `Arc<Connector>`).

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::validate_webhook_path;
use crate::handshake::{DeliveryResponse, HandshakeOutcome, HandshakeResponder};
use crate::reconcile::{ReconcileReport, WebhookReconciler};
use crate::registry::default_subscription_id;
use crate::router::{EventRouter, RouteReport};
use crate::{
    ConnectorConfig, ConnectorError, ConnectorInstanceId, EventHandler, HandlerTable,
    NotificationBatch, Subscription, SubscriptionId, SubscriptionRegistry, SubscriptionRequest,
    WebhookApi,
};

/// Registration phase of a connector.
#[derive(Debug)]
pub struct ConnectorBuilder {
    config: ConnectorConfig,
    instance: ConnectorInstanceId,
    registry: SubscriptionRegistry,
    handlers: HandlerTable,
}

impl ConnectorBuilder {
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            config,
            instance: ConnectorInstanceId::new_random(),
            registry: SubscriptionRegistry::new(),
            handlers: HandlerTable::new(),
        }
    }

    /// Overrides the randomly generated instance id.
    #[must_use]
    pub fn with_instance_id(mut self, instance: ConnectorInstanceId) -> Self {
        self.instance = instance;
        self
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn instance_id(&self) -> ConnectorInstanceId {
        self.instance
    }

    /// Registers interest in changes to a resource.
    ///
    /// Returns the subscription id, which is also the event id `handler` is
    /// raised under.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::DuplicateSubscription`] if the (explicit or
    /// synthesised) id is already registered.
    pub fn on(
        &mut self,
        request: SubscriptionRequest,
        handler: Arc<dyn EventHandler>,
    ) -> Result<SubscriptionId, ConnectorError> {
        let filter = request.filter.unwrap_or_default();
        let id = request.id.unwrap_or_else(|| {
            default_subscription_id(self.config.webhook_path(), &request.gid, filter, self.instance)
        });

        self.registry.insert(Subscription {
            id: id.clone(),
            resource: request.gid,
            filter,
        })?;
        self.handlers.insert(id.clone(), handler);

        info!(subscription = %id, filter = %filter, "subscription registered");
        Ok(id)
    }

    /// Reconciles remote webhooks and enters steady state.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::InvalidConfiguration`] for an unusable webhook path,
    /// otherwise any fatal reconciliation error; see
    /// [`WebhookReconciler::reconcile`].
    #[instrument(skip_all, fields(instance = %self.instance))]
    pub async fn start(self, api: Arc<dyn WebhookApi>) -> Result<Connector, ConnectorError> {
        validate_webhook_path(self.config.webhook_path())?;
        let report = WebhookReconciler::new(Arc::clone(&api))
            .reconcile(&self.config, &self.registry)
            .await?;

        info!(
            subscriptions = self.registry.len(),
            created = report.created(),
            failures = report.failures().count(),
            "connector started"
        );

        let router = EventRouter::new(Arc::new(self.registry), Arc::new(self.handlers));
        Ok(Connector {
            config: self.config,
            instance: self.instance,
            api,
            router,
            report,
        })
    }
}

/// A delivery that has been answered but not yet routed.
#[derive(Debug)]
pub struct Accepted {
    /// What to send back to Asana.
    pub response: DeliveryResponse,
    /// The batch to route after responding; `None` for handshakes.
    pub batch: Option<NotificationBatch>,
}

/// A started connector.
pub struct Connector {
    config: ConnectorConfig,
    instance: ConnectorInstanceId,
    api: Arc<dyn WebhookApi>,
    router: EventRouter,
    report: ReconcileReport,
}

impl Connector {
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn instance_id(&self) -> ConnectorInstanceId {
        self.instance
    }

    /// Path the host must route webhook deliveries to.
    pub fn webhook_path(&self) -> &str {
        self.config.webhook_path()
    }

    /// Direct access to the remote API client for host code.
    pub fn api(&self) -> &Arc<dyn WebhookApi> {
        &self.api
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        self.router.registry()
    }

    /// Outcome of the startup reconciliation pass.
    pub fn reconcile_report(&self) -> &ReconcileReport {
        &self.report
    }

    /// Answers a delivery without routing it.
    ///
    /// The batch is decoded here, before the acknowledgment goes out, so a
    /// malformed payload is reported to the caller instead of being lost.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::MalformedPayload`] for a non-handshake delivery whose
    /// body is not a notification batch.
    pub fn accept(&self, secret: Option<&str>, body: &[u8]) -> Result<Accepted, ConnectorError> {
        match HandshakeResponder::respond(secret) {
            HandshakeOutcome::Verified(response) => Ok(Accepted {
                response,
                batch: None,
            }),
            HandshakeOutcome::Acknowledged(response) => {
                let batch = NotificationBatch::from_slice(body)?;
                Ok(Accepted {
                    response,
                    batch: Some(batch),
                })
            }
        }
    }

    /// Routes a batch to the matching subscriptions.
    pub async fn route(&self, batch: &NotificationBatch) -> RouteReport {
        self.router.route(batch).await
    }

    /// Accepts and routes a delivery inline, returning once every handler has
    /// run.
    ///
    /// # Errors
    ///
    /// See [`Connector::accept`].
    pub async fn handle(
        &self,
        secret: Option<&str>,
        body: &[u8],
    ) -> Result<DeliveryResponse, ConnectorError> {
        let accepted = self.accept(secret, body)?;
        if let Some(batch) = &accepted.batch {
            self.route(batch).await;
        }
        Ok(accepted.response)
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("config", &self.config)
            .field("instance", &self.instance)
            .field("subscriptions", self.subscriptions())
            .finish_non_exhaustive()
    }
}

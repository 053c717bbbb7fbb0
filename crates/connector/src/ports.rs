//! Port traits implemented by infrastructure crates.
//!
//! The connector never speaks HTTP itself. [`WebhookApi`] is implemented by the
//! `asana` crate, [`EventBus`] by the host automation engine (or by the
//! in-process [`crate::HandlerTable`]), and [`EventHandler`] by consumers.
//! All three are object safe so they can be held as `Arc<dyn …>`.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::{HandlerError, RemoteApiError, RemoteWebhook, ResourceGid, SubscriptionId, WorkspaceGid};

/// The subset of the remote service's webhook API the reconciler needs.
#[async_trait]
pub trait WebhookApi: Send + Sync {
    /// Lists every webhook registered in `workspace`. Implementations follow
    /// pagination themselves and return the full list.
    async fn list_webhooks(
        &self,
        workspace: &WorkspaceGid,
    ) -> Result<Vec<RemoteWebhook>, RemoteApiError>;

    /// Creates a webhook delivering changes on `resource` to `target`.
    ///
    /// Asana completes the handshake synchronously, so the returned
    /// `active` flag reflects whether the target answered it.
    async fn create_webhook(
        &self,
        resource: &ResourceGid,
        target: &str,
    ) -> Result<RemoteWebhook, RemoteApiError>;
}

/// The host's event-delivery primitive: raise an event by id and wait for
/// every handler registered under that id.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn raise(&self, event_id: &SubscriptionId, payload: Value) -> Result<(), HandlerError>;
}

/// A consumer callback invoked with the merged event payload.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, payload: Value) -> Result<(), HandlerError>;
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, payload: Value) -> Result<(), HandlerError> {
        (self)(payload).await
    }
}

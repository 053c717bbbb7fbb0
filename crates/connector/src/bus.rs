//! In-process event bus backed by a handler table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{EventBus, EventHandler, HandlerError, SubscriptionId};

/// Maps subscription ids to their handlers.
///
/// Filled during registration; read-only once the connector has started.
#[derive(Default, Clone)]
pub struct HandlerTable {
    handlers: HashMap<SubscriptionId, Arc<dyn EventHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `id`, replacing any previous handler.
    pub fn insert(&mut self, id: SubscriptionId, handler: Arc<dyn EventHandler>) {
        self.handlers.insert(id, handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

#[async_trait]
impl EventBus for HandlerTable {
    async fn raise(&self, event_id: &SubscriptionId, payload: Value) -> Result<(), HandlerError> {
        let handler = self
            .handlers
            .get(event_id)
            .ok_or_else(|| HandlerError::Unregistered(event_id.clone()))?;
        debug!(event_id = %event_id, "invoking handler");
        handler.handle(payload).await
    }
}

//! Steady-state routing of notification batches to local subscriptions.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, error, instrument, warn};

use crate::{EventBus, Notification, NotificationBatch, Subscription, SubscriptionRegistry};

/// Counters for one routed batch.
///
/// Routing itself never fails: handler errors and panics are counted here
/// and logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteReport {
    pub notifications: usize,
    pub dispatched: usize,
    pub failed: usize,
}

/// Fans each notification out to every subscription whose filter accepts it.
#[derive(Clone)]
pub struct EventRouter {
    registry: Arc<SubscriptionRegistry>,
    bus: Arc<dyn EventBus>,
}

impl EventRouter {
    pub fn new(registry: Arc<SubscriptionRegistry>, bus: Arc<dyn EventBus>) -> Self {
        Self { registry, bus }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Routes a batch in array order.
    ///
    /// Each match is raised on the bus and awaited before the next one, so
    /// handlers observe notifications in the order Asana sent them.
    #[instrument(skip_all, fields(events = batch.len()))]
    pub async fn route(&self, batch: &NotificationBatch) -> RouteReport {
        let mut report = RouteReport {
            notifications: batch.len(),
            ..RouteReport::default()
        };

        for notification in &batch.events {
            let mut matched = 0usize;
            for subscription in self.registry.matching(&notification.action) {
                matched += 1;
                let payload = merge_payload(subscription, notification);
                let raised = AssertUnwindSafe(self.bus.raise(&subscription.id, payload))
                    .catch_unwind()
                    .await;
                match raised {
                    Ok(Ok(())) => report.dispatched += 1,
                    Ok(Err(e)) => {
                        report.failed += 1;
                        warn!(
                            subscription = %subscription.id,
                            action = %notification.action,
                            error = %e,
                            "event handler failed"
                        );
                    }
                    Err(panic) => {
                        report.failed += 1;
                        error!(
                            subscription = %subscription.id,
                            action = %notification.action,
                            panic = panic_message(panic.as_ref()),
                            "event handler panicked"
                        );
                    }
                }
            }
            if matched == 0 {
                debug!(
                    action = %notification.action,
                    resource = notification.resource_gid().unwrap_or("-"),
                    "no subscription matches notification"
                );
            }
        }

        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Subscription options overlaid with the notification's fields.
///
/// On key collisions the notification wins.
fn merge_payload(subscription: &Subscription, notification: &Notification) -> Value {
    let mut payload: Map<String, Value> = subscription.options();
    payload.insert("action".into(), Value::String(notification.action.clone()));
    for (key, value) in &notification.fields {
        payload.insert(key.clone(), value.clone());
    }
    Value::Object(payload)
}

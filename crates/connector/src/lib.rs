//! Core domain of the Asana connector.
//!
//! Bridges Asana webhook notifications onto a host automation engine's event
//! bus. Consumers register interest in a resource (optionally narrowed to one
//! change kind); at startup the connector makes sure a matching Asana webhook
//! exists, then answers the webhook handshake and routes every notification
//! batch to the matching local subscriptions.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! Remote API calls go through [`WebhookApi`] (implemented by the `asana`
//! crate), HTTP delivery is adapted by the `listener` crate, and event
//! delivery goes through [`EventBus`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ResourceGid`, `SubscriptionId`, etc.) |
//! | [`types`] | Action filters, subscriptions, remote webhooks, notifications |
//! | [`errors`] | `ConnectorError` and port error types |
//! | [`config`] | `ConnectorConfig` and base URL validation |
//! | [`ports`] | `WebhookApi`, `EventBus`, `EventHandler` |
//! | [`registry`] | Ordered, id-unique subscription registry |
//! | [`bus`] | In-process `HandlerTable` event bus |
//! | [`reconcile`] | Startup webhook reconciliation |
//! | [`handshake`] | `X-Hook-Secret` handshake responder |
//! | [`router`] | Notification batch routing |
//! | [`connector`] | Builder and steady-state connector |

pub mod bus;
pub mod config;
pub mod connector;
pub mod errors;
pub mod handshake;
pub mod identifiers;
pub mod ports;
pub mod reconcile;
pub mod registry;
pub mod router;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use bus::HandlerTable;
pub use config::{
    validate_base_url, validate_webhook_path, BaseUrl, ConnectorConfig, DEFAULT_WEBHOOK_PATH,
};
pub use connector::{Accepted, Connector, ConnectorBuilder};
pub use errors::{ConnectorError, HandlerError, RemoteApiError};
pub use handshake::{DeliveryResponse, HandshakeOutcome, HandshakeResponder, HOOK_SECRET_HEADER};
pub use identifiers::{
    ConnectorInstanceId, EmptyIdentifier, ResourceGid, SubscriptionId, WebhookGid, WorkspaceGid,
};
pub use ports::{EventBus, EventHandler, WebhookApi};
pub use reconcile::{ReconcileEntry, ReconcileOutcome, ReconcileReport, WebhookReconciler};
pub use registry::SubscriptionRegistry;
pub use router::{EventRouter, RouteReport};
pub use types::{
    ActionFilter, ChangeAction, Notification, NotificationBatch, RemoteWebhook, Subscription,
    SubscriptionRequest,
};

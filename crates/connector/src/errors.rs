//! Error types for the connector domain.
//!
//! [`ConnectorError`] covers everything the connector itself can report.
//! Startup variants (`InvalidConfiguration`, `MissingConfiguration`,
//! `RemoteFetchFailure`) are fatal: [`crate::ConnectorBuilder::start`] returns
//! them and no steady-state [`crate::Connector`] is ever constructed.
//!
//! [`RemoteApiError`] is what a [`crate::WebhookApi`] adapter reports, and
//! [`HandlerError`] is what an [`crate::EventHandler`] reports. Neither crosses
//! into steady-state routing results: handler failures are logged and isolated.

use thiserror::Error;

use crate::{ResourceGid, SubscriptionId, WorkspaceGid};

// ---------------------------------------------------------------------------
// Connector-level errors
// ---------------------------------------------------------------------------

/// Errors produced by the connector domain.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The base URL (or another configured value) is malformed.
    ///
    /// Produced before any remote call is made.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the configuration problem.
        message: String,
    },

    /// A value required by the registered subscriptions was not configured.
    #[error("Missing configuration: {field} is required when subscriptions are registered")]
    MissingConfiguration {
        /// Name of the missing configuration field.
        field: &'static str,
    },

    /// Listing the workspace's existing webhooks failed. Not retried.
    #[error("Failed to list webhooks for workspace {workspace}: {source}")]
    RemoteFetchFailure {
        /// Workspace that was being listed.
        workspace: WorkspaceGid,
        /// Underlying adapter error.
        #[source]
        source: RemoteApiError,
    },

    /// Creating a single webhook failed.
    ///
    /// Soft failure: reconciliation records it in the report and moves on to
    /// the next subscription.
    #[error("Failed to create webhook for resource {resource}: {source}")]
    RemoteCreateFailure {
        /// Resource the webhook was requested for.
        resource: ResourceGid,
        /// Underlying adapter error.
        #[source]
        source: RemoteApiError,
    },

    /// A subscription with this id is already registered.
    #[error("Subscription '{id}' is already registered")]
    DuplicateSubscription {
        /// The conflicting id.
        id: SubscriptionId,
    },

    /// An inbound notification delivery could not be decoded.
    #[error("Malformed notification payload: {message}")]
    MalformedPayload {
        /// Decoder message.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Failure reported by a [`crate::WebhookApi`] implementation.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    /// The request never produced an HTTP response (DNS, connect, timeout…).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote service answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Failure reported by an event handler, or by the bus when no handler is
/// registered under the raised id.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler ran and reported a failure.
    #[error("handler failed: {0}")]
    Failed(String),

    /// Nothing is registered under the raised event id.
    #[error("no handler registered for '{0}'")]
    Unregistered(SubscriptionId),
}

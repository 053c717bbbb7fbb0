//! Asana connector webhook event source.
//!
//! Mounts the webhook path on an axum [`Router`] and adapts each inbound POST
//! to the connector:
//!
//! - **Handshake** (non-empty `X-Hook-Secret`): the secret is echoed back and
//!   nothing else happens.
//! - **Notification batch**: the body is decoded first. A malformed body gets
//!   `400 Bad Request`; a valid one is acknowledged with an empty `200` right
//!   away and routed on a spawned task, so slow handlers never make Asana
//!   time out and redeliver.
//!
//! Asana only activates a new webhook once its handshake has been answered,
//! and it sends that handshake while the create call is still in flight. The
//! endpoint therefore has to be served before the connector reconciles:
//!
//! 1. Build a [`WebhookEndpoint`] for the configured path, [`bind`] and
//!    [`serve`] it. Handshakes are answered from this point on; batches get
//!    `503 Service Unavailable` so Asana redelivers them later.
//! 2. Start the connector (this creates the webhooks).
//! 3. [`WebhookEndpoint::attach`] the started connector. Batches are routed
//!    from then on.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details live here. The [`connector`] crate
//! sees only header values and body bytes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use connector::{
    validate_webhook_path, Connector, ConnectorError, DeliveryResponse, HandshakeOutcome,
    HandshakeResponder, HOOK_SECRET_HEADER,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};

/// Errors from running the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error(transparent)]
    Configuration(#[from] ConnectorError),

    #[error("connector serves {connector} but the endpoint is mounted on {endpoint}")]
    PathMismatch { endpoint: String, connector: String },

    #[error("a connector is already attached to this endpoint")]
    AlreadyAttached,
}

/// The webhook endpoint, shared between the server and the startup code.
///
/// Cloning is cheap; every clone sees the same attached connector.
#[derive(Clone)]
pub struct WebhookEndpoint {
    path: Arc<str>,
    connector: Arc<OnceLock<Arc<Connector>>>,
}

impl WebhookEndpoint {
    /// An endpoint on `webhook_path` with no connector attached yet.
    ///
    /// # Errors
    ///
    /// [`ListenerError::Configuration`] if the path cannot be mounted.
    pub fn new(webhook_path: &str) -> Result<Self, ListenerError> {
        validate_webhook_path(webhook_path)?;
        Ok(Self {
            path: Arc::from(webhook_path),
            connector: Arc::new(OnceLock::new()),
        })
    }

    /// An endpoint already serving a started connector.
    pub fn for_connector(connector: Arc<Connector>) -> Self {
        Self {
            path: Arc::from(connector.webhook_path()),
            connector: Arc::new(OnceLock::from(connector)),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_attached(&self) -> bool {
        self.connector.get().is_some()
    }

    /// Starts routing notification batches to `connector`.
    ///
    /// # Errors
    ///
    /// [`ListenerError::PathMismatch`] if the connector expects deliveries on
    /// another path, [`ListenerError::AlreadyAttached`] on a second call.
    pub fn attach(&self, connector: Arc<Connector>) -> Result<(), ListenerError> {
        if connector.webhook_path() != self.path() {
            return Err(ListenerError::PathMismatch {
                endpoint: self.path().to_owned(),
                connector: connector.webhook_path().to_owned(),
            });
        }
        self.connector
            .set(connector)
            .map_err(|_| ListenerError::AlreadyAttached)?;
        info!(path = self.path(), "connector attached to webhook endpoint");
        Ok(())
    }

    /// Router with the endpoint mounted on its path.
    pub fn router(&self) -> Router {
        Router::new()
            .route(self.path(), post(receive))
            .with_state(self.clone())
    }
}

/// Builds the router for an already started connector.
pub fn router(connector: Arc<Connector>) -> Router {
    WebhookEndpoint::for_connector(connector).router()
}

/// Binds the listening socket.
///
/// # Errors
///
/// [`ListenerError::Bind`] if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ListenerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })
}

/// Serves `endpoint` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// [`ListenerError::Serve`] if the server stops with an I/O error.
pub async fn serve<F>(
    listener: TcpListener,
    endpoint: WebhookEndpoint,
    shutdown: F,
) -> Result<(), ListenerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(local) = listener.local_addr() {
        info!(addr = %local, path = endpoint.path(), "webhook listener started");
    }

    axum::serve(listener, endpoint.router())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ListenerError::Serve)
}

#[instrument(skip_all)]
async fn receive(
    State(endpoint): State<WebhookEndpoint>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let secret = match headers.get(HOOK_SECRET_HEADER).map(HeaderValue::to_str) {
        None => None,
        Some(Ok(secret)) => Some(secret),
        Some(Err(_)) => {
            warn!("handshake secret is not visible ASCII");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let Some(connector) = endpoint.connector.get() else {
        return match HandshakeResponder::respond(secret) {
            HandshakeOutcome::Verified(response) => into_http(response),
            HandshakeOutcome::Acknowledged(_) => {
                warn!("notification batch arrived before the connector started");
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }
        };
    };

    let accepted = match connector.accept(secret, &body) {
        Ok(accepted) => accepted,
        Err(e) => {
            warn!(error = %e, "rejecting webhook delivery");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    if let Some(batch) = accepted.batch {
        let connector = Arc::clone(connector);
        tokio::spawn(async move {
            let report = connector.route(&batch).await;
            debug!(
                notifications = report.notifications,
                dispatched = report.dispatched,
                failed = report.failed,
                "batch routed"
            );
        });
    }

    into_http(accepted.response)
}

fn into_http(delivery: DeliveryResponse) -> Response {
    let status = StatusCode::from_u16(delivery.status).unwrap_or(StatusCode::OK);
    let mut response = status.into_response();
    for (name, value) in delivery.headers {
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(name), value);
            }
            Err(_) => warn!(header = name, "dropping unrepresentable response header"),
        }
    }
    response
}

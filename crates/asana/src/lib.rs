//! Asana infrastructure adapter.
//!
//! Implements the [`connector::WebhookApi`] port over the Asana REST API
//! (`GET /webhooks`, `POST /webhooks`) using `reqwest` with bearer-token
//! authentication.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules. Asana API
//! details (envelopes, pagination, status handling) are handled here; the
//! [`connector`] crate only ever sees [`connector::RemoteWebhook`] and
//! [`connector::RemoteApiError`].
//!
//! ```rust,no_run
//! use asana::{AsanaClient, AsanaConfig};
//!
//! let client = AsanaClient::new(AsanaConfig::new("0/personal-access-token"))?;
//! # Ok::<(), asana::AsanaError>(())
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::{AsanaClient, AsanaConfig, DEFAULT_API_BASE};
pub use error::AsanaError;
pub use types::{ResourceRef, WebhookRecord};

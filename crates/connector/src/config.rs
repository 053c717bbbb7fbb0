//! Connector configuration and base URL validation.
//!
//! [`ConnectorConfig`] is set once at construction and read-only afterwards.
//! [`validate_base_url`] accepts `https`, a host, an optional port and an
//! optional trailing slash; anything else is rejected.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::identifiers::empty_as_none;
use crate::{ConnectorError, WorkspaceGid};

/// Path the webhook endpoint is mounted on when none is configured.
pub const DEFAULT_WEBHOOK_PATH: &str = "/asana-connector/webhook";

static BASE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https://[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)*(?::[0-9]{1,5})?)/?$")
        .expect("base URL pattern is valid")
});

/// Process-wide connector settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Personal access token (or OAuth bearer) used for Asana API calls.
    pub access_token: String,
    /// Externally reachable `https` origin Asana delivers webhooks to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Path override for the webhook endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_path: Option<String>,
    /// Workspace whose webhooks are reconciled. Required once any
    /// subscription is registered.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub workspace_id: Option<WorkspaceGid>,
}

impl ConnectorConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: None,
            webhook_path: None,
            workspace_id: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_webhook_path(mut self, path: impl Into<String>) -> Self {
        self.webhook_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_workspace(mut self, workspace: WorkspaceGid) -> Self {
        self.workspace_id = Some(workspace);
        self
    }

    /// The configured webhook path, or [`DEFAULT_WEBHOOK_PATH`].
    pub fn webhook_path(&self) -> &str {
        match self.webhook_path.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => DEFAULT_WEBHOOK_PATH,
        }
    }
}

impl std::fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("access_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("webhook_path", &self.webhook_path)
            .field("workspace_id", &self.workspace_id)
            .finish()
    }
}

/// A validated base URL in canonical form (no trailing slash).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseUrl(String);

impl BaseUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The full webhook target registered with Asana.
    pub fn webhook_target(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl std::fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validates and canonicalises the externally reachable base URL.
///
/// # Errors
///
/// [`ConnectorError::InvalidConfiguration`] when `url` is absent or is not of
/// the form `https://host[:port][/]`.
pub fn validate_base_url(url: Option<&str>) -> Result<BaseUrl, ConnectorError> {
    let Some(url) = url else {
        return Err(ConnectorError::InvalidConfiguration {
            message: "base_url is not set".into(),
        });
    };
    BASE_URL
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|origin| BaseUrl(origin.as_str().to_owned()))
        .ok_or_else(|| ConnectorError::InvalidConfiguration {
            message: format!("invalid base_url: {url}"),
        })
}

/// Checks that a webhook path can be appended to a base URL and mounted as a
/// route: absolute, no query or fragment, no whitespace.
///
/// # Errors
///
/// [`ConnectorError::InvalidConfiguration`] describing the offending path.
pub fn validate_webhook_path(path: &str) -> Result<(), ConnectorError> {
    let valid = path.starts_with('/')
        && !path.contains(|c: char| c == '?' || c == '#')
        && !path.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(ConnectorError::InvalidConfiguration {
            message: format!("invalid webhook_path: {path:?}"),
        })
    }
}

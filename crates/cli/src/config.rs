//! On-disk configuration for the `asana-connector` binary.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use asana::{AsanaConfig, DEFAULT_API_BASE};
use connector::identifiers::empty_as_none;
use connector::{ConnectorConfig, SubscriptionRequest, WorkspaceGid};
use serde::Deserialize;

/// Top-level TOML document.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub connector: ConnectorSection,
    #[serde(default)]
    pub asana: AsanaSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionRequest>,
}

/// `[connector]`: everything except the token may live in the file.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorSection {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub webhook_path: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub workspace_id: Option<WorkspaceGid>,
}

impl std::fmt::Debug for ConnectorSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorSection")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("webhook_path", &self.webhook_path)
            .field("workspace_id", &self.workspace_id)
            .finish()
    }
}

/// `[asana]`: REST client settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AsanaSection {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for AsanaSection {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// `[server]`: where the webhook listener binds.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// `[telemetry]`: OTLP export is off unless an endpoint is given.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: default_service_name(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_owned()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_service_name() -> String {
    "asana-connector".to_owned()
}

impl AppConfig {
    /// Reads and parses the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolves the connector settings. `token_override` (flag or
    /// `ASANA_ACCESS_TOKEN`) wins over the file.
    pub fn connector_config(&self, token_override: Option<&str>) -> Result<ConnectorConfig> {
        let section = &self.connector;
        let token = token_override
            .filter(|token| !token.is_empty())
            .or_else(|| section.access_token.as_deref().filter(|token| !token.is_empty()))
            .context("an Asana access token is required (connector.access_token or ASANA_ACCESS_TOKEN)")?;

        Ok(ConnectorConfig {
            access_token: token.to_owned(),
            base_url: section.base_url.clone(),
            webhook_path: section.webhook_path.clone(),
            workspace_id: section.workspace_id.clone(),
        })
    }

    pub fn asana_config(&self, connector: &ConnectorConfig) -> AsanaConfig {
        AsanaConfig::new(connector.access_token.clone())
            .with_api_base(self.asana.api_base.clone())
            .with_timeout(Duration::from_secs(self.asana.timeout_seconds))
    }
}

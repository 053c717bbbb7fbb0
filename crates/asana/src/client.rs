use std::time::Duration;

use async_trait::async_trait;
use connector::{RemoteApiError, RemoteWebhook, ResourceGid, WebhookApi, WorkspaceGid};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::error::AsanaError;
use crate::types::{CreateWebhookData, CreateWebhookRequest, DataEnvelope, Page, WebhookRecord};

/// Public Asana REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://app.asana.com/api/1.0";

/// Largest page Asana accepts on list endpoints.
const MAX_PAGE_SIZE: u32 = 100;

/// Connection settings for [`AsanaClient`].
#[derive(Clone)]
pub struct AsanaConfig {
    pub api_base: String,
    pub access_token: String,
    pub timeout: Duration,
    pub page_size: u32,
}

impl AsanaConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            access_token: access_token.into(),
            timeout: Duration::from_secs(30),
            page_size: MAX_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the page size for list calls, clamped to `1..=100`.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }
}

impl std::fmt::Debug for AsanaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsanaConfig")
            .field("api_base", &self.api_base)
            .field("access_token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Asana REST client implementing [`WebhookApi`].
pub struct AsanaClient {
    config: AsanaConfig,
    client: Client,
}

impl AsanaClient {
    /// Creates a client with its own connection pool and the configured
    /// timeout.
    ///
    /// # Errors
    ///
    /// [`AsanaError::Http`] if the TLS backend cannot be initialised.
    pub fn new(config: AsanaConfig) -> Result<Self, AsanaError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Creates a client around an existing `reqwest::Client`.
    pub fn with_client(config: AsanaConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &AsanaConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AsanaError> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .header("Accept", "application/json")
            .send()
            .await?;
        decode(response).await
    }

    /// Fetches every webhook in `workspace`, following `next_page` cursors.
    #[instrument(skip_all, fields(workspace = %workspace))]
    pub async fn webhooks(&self, workspace: &WorkspaceGid) -> Result<Vec<WebhookRecord>, AsanaError> {
        let limit = self.config.page_size.to_string();
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query = vec![("workspace", workspace.as_str()), ("limit", limit.as_str())];
            if let Some(offset) = offset.as_deref() {
                query.push(("offset", offset));
            }
            let page: Page<WebhookRecord> = self
                .send(self.client.get(self.url("/webhooks")).query(&query))
                .await?;

            debug!(count = page.data.len(), "fetched webhook page");
            records.extend(page.data);
            match page.next_page {
                Some(next) => offset = Some(next.offset),
                None => break,
            }
        }

        Ok(records)
    }

    /// Creates a webhook. Asana holds the response until the target has
    /// answered the handshake.
    #[instrument(skip_all, fields(resource = %resource))]
    pub async fn create(&self, resource: &ResourceGid, target: &str) -> Result<WebhookRecord, AsanaError> {
        let body = CreateWebhookRequest {
            data: CreateWebhookData {
                resource: resource.as_str(),
                target,
            },
        };
        let envelope: DataEnvelope<WebhookRecord> = self
            .send(self.client.post(self.url("/webhooks")).json(&body))
            .await?;
        Ok(envelope.data)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AsanaError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "asana request failed");
        return Err(AsanaError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| AsanaError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl WebhookApi for AsanaClient {
    async fn list_webhooks(
        &self,
        workspace: &WorkspaceGid,
    ) -> Result<Vec<RemoteWebhook>, RemoteApiError> {
        self.webhooks(workspace)
            .await?
            .into_iter()
            .map(|record| RemoteWebhook::try_from(record).map_err(RemoteApiError::from))
            .collect()
    }

    async fn create_webhook(
        &self,
        resource: &ResourceGid,
        target: &str,
    ) -> Result<RemoteWebhook, RemoteApiError> {
        let record = self.create(resource, target).await?;
        Ok(RemoteWebhook::try_from(record)?)
    }
}

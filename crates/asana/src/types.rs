//! Asana REST wire types.
//!
//! Every Asana response wraps its payload in `{"data": …}`; list endpoints add
//! a `next_page` cursor that is `null` on the last page.

use connector::{RemoteWebhook, ResourceGid, WebhookGid};
use serde::{Deserialize, Serialize};

use crate::error::AsanaError;

#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub next_page: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NextPage {
    pub offset: String,
}

/// Compact webhook record as returned by `GET /webhooks` and `POST /webhooks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRecord {
    #[serde(default)]
    pub gid: Option<String>,
    pub resource: ResourceRef,
    pub target: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub gid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

impl TryFrom<WebhookRecord> for RemoteWebhook {
    type Error = AsanaError;

    fn try_from(record: WebhookRecord) -> Result<Self, Self::Error> {
        let resource = ResourceGid::new(record.resource.gid).ok_or_else(|| {
            AsanaError::InvalidResponse("webhook resource has an empty gid".into())
        })?;
        Ok(RemoteWebhook {
            gid: record.gid.and_then(WebhookGid::new),
            resource,
            target: record.target,
            active: record.active,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateWebhookRequest<'a> {
    pub data: CreateWebhookData<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateWebhookData<'a> {
    pub resource: &'a str,
    pub target: &'a str,
}

//! Shared value types for the connector domain.
//!
//! Unlike the identifiers in [`crate::identifiers`], these types carry the
//! behaviour the connector needs: action filters decide which notifications a
//! subscription receives, and notifications expose the fields the router
//! merges into event payloads.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ConnectorError, ResourceGid, SubscriptionId, WebhookGid};

// ---------------------------------------------------------------------------
// Change kinds and filters
// ---------------------------------------------------------------------------

/// Kind of change Asana reports in a notification's `action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Added,
    Removed,
    Changed,
    Deleted,
    Undeleted,
}

impl ChangeAction {
    /// Returns the wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Deleted => "deleted",
            Self::Undeleted => "undeleted",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "added" => Ok(Self::Added),
            "removed" => Ok(Self::Removed),
            "changed" => Ok(Self::Changed),
            "deleted" => Ok(Self::Deleted),
            "undeleted" => Ok(Self::Undeleted),
            other => Err(ConnectorError::InvalidConfiguration {
                message: format!("unknown action filter '{other}'"),
            }),
        }
    }
}

/// Which notification actions a subscription receives.
///
/// Serialised as `"*"` or as the action's wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionFilter {
    /// Every action, including kinds this crate does not enumerate.
    #[default]
    Any,
    /// Exactly one action kind.
    Only(ChangeAction),
}

impl ActionFilter {
    /// Returns `true` if a notification with this `action` passes the filter.
    pub fn matches(self, action: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(kind) => kind.as_str() == action,
        }
    }
}

impl std::fmt::Display for ActionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Only(kind) => f.write_str(kind.as_str()),
        }
    }
}

impl FromStr for ActionFilter {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            Ok(Self::Any)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

impl TryFrom<String> for ActionFilter {
    type Error = ConnectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActionFilter> for String {
    fn from(filter: ActionFilter) -> Self {
        filter.to_string()
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// A consumer's request to be told about changes to one resource.
///
/// This is the registration surface: `filter` defaults to [`ActionFilter::Any`]
/// and `id` is synthesised by the builder when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// Resource whose changes are wanted.
    pub gid: ResourceGid,
    /// Optional action filter; `None` means `*`.
    #[serde(default, rename = "action", skip_serializing_if = "Option::is_none")]
    pub filter: Option<ActionFilter>,
    /// Optional explicit subscription id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SubscriptionId>,
}

impl SubscriptionRequest {
    /// Requests every change to `gid`.
    pub fn new(gid: ResourceGid) -> Self {
        Self {
            gid,
            filter: None,
            id: None,
        }
    }

    /// Narrows the request to one action kind (or back to `*`).
    #[must_use]
    pub fn with_filter(mut self, filter: ActionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Supplies an explicit subscription id.
    #[must_use]
    pub fn with_id(mut self, id: SubscriptionId) -> Self {
        self.id = Some(id);
        self
    }
}

/// A registered local subscription. Never mutated after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub resource: ResourceGid,
    pub filter: ActionFilter,
}

impl Subscription {
    /// The static part of every event payload raised for this subscription.
    ///
    /// Notification fields are overlaid on top of this by the router.
    pub fn options(&self) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert("id".into(), Value::String(self.id.to_string()));
        options.insert("gid".into(), Value::String(self.resource.to_string()));
        options.insert("asana_event".into(), Value::String(self.filter.to_string()));
        options
    }
}

// ---------------------------------------------------------------------------
// Remote webhooks
// ---------------------------------------------------------------------------

/// A webhook as reported by the remote service. Read-only snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWebhook {
    /// Remote gid; absent in some compact listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<WebhookGid>,
    pub resource: ResourceGid,
    pub target: String,
    pub active: bool,
}

impl RemoteWebhook {
    /// Returns `true` if this webhook already delivers `resource` to `target`.
    pub fn serves(&self, resource: &ResourceGid, target: &str) -> bool {
        self.active && &self.resource == resource && self.target == target
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// One change event inside a notification batch.
///
/// Only `action` is interpreted; every other field is kept verbatim so it
/// reaches handlers unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub action: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Notification {
    /// The gid of the resource that changed, when the event carries one.
    pub fn resource_gid(&self) -> Option<&str> {
        self.fields.get("resource")?.get("gid")?.as_str()
    }
}

/// The body of a non-handshake delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationBatch {
    pub events: Vec<Notification>,
}

impl NotificationBatch {
    /// Decodes a delivery body. A missing `events` field is an error, not an
    /// empty batch.
    pub fn from_slice(body: &[u8]) -> Result<Self, ConnectorError> {
        serde_json::from_slice(body).map_err(|e| ConnectorError::MalformedPayload {
            message: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parses_wildcard_and_kinds() {
        assert_eq!("*".parse::<ActionFilter>().unwrap(), ActionFilter::Any);
        assert_eq!(
            "undeleted".parse::<ActionFilter>().unwrap(),
            ActionFilter::Only(ChangeAction::Undeleted)
        );
        assert!(matches!(
            "renamed".parse::<ActionFilter>(),
            Err(ConnectorError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn wildcard_matches_unknown_actions() {
        assert!(ActionFilter::Any.matches("sync_error"));
        assert!(ActionFilter::Only(ChangeAction::Changed).matches("changed"));
        assert!(!ActionFilter::Only(ChangeAction::Changed).matches("added"));
    }

    #[test]
    fn request_deserialises_with_defaults() {
        let request: SubscriptionRequest = serde_json::from_str(r#"{"gid":"1201"}"#).unwrap();
        assert_eq!(request.gid.as_str(), "1201");
        assert_eq!(request.filter, None);
        assert_eq!(request.id, None);

        let request: SubscriptionRequest =
            serde_json::from_str(r#"{"gid":"1201","action":"deleted","id":"on-delete"}"#).unwrap();
        assert_eq!(request.filter, Some(ActionFilter::Only(ChangeAction::Deleted)));
        assert_eq!(request.id.unwrap().as_str(), "on-delete");
    }

    #[test]
    fn batch_keeps_unknown_fields() {
        let body = br#"{"events":[{"action":"changed","resource":{"gid":"55","resource_type":"task"},"user":{"gid":"9"}}]}"#;
        let batch = NotificationBatch::from_slice(body).unwrap();

        assert_eq!(batch.len(), 1);
        let event = &batch.events[0];
        assert_eq!(event.action, "changed");
        assert_eq!(event.resource_gid(), Some("55"));
        assert_eq!(event.fields["user"]["gid"], "9");
    }

    #[test]
    fn batch_without_events_is_malformed() {
        let err = NotificationBatch::from_slice(br#"{"data":[]}"#).unwrap_err();
        assert!(matches!(err, ConnectorError::MalformedPayload { .. }));

        let err = NotificationBatch::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, ConnectorError::MalformedPayload { .. }));
    }

    #[test]
    fn webhook_serves_only_when_active_and_matching() {
        let resource = ResourceGid::new("1").unwrap();
        let hook = RemoteWebhook {
            gid: None,
            resource: resource.clone(),
            target: "https://hooks.example.com/asana-connector/webhook".into(),
            active: true,
        };
        assert!(hook.serves(&resource, "https://hooks.example.com/asana-connector/webhook"));
        assert!(!hook.serves(&resource, "https://other.example.com/asana-connector/webhook"));

        let inactive = RemoteWebhook {
            active: false,
            ..hook
        };
        assert!(!inactive.serves(&resource, "https://hooks.example.com/asana-connector/webhook"));
    }
}

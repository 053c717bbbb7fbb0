//! In-process fakes for the connector's port traits.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use connector::{
    ConnectorConfig, EventBus, EventHandler, HandlerError, RemoteApiError, RemoteWebhook,
    ResourceGid, SubscriptionId, WebhookApi, WebhookGid, WorkspaceGid,
};
use serde_json::Value;

pub const BASE_URL: &str = "https://bridge.example.com/";
pub const TARGET: &str = "https://bridge.example.com/asana-connector/webhook";

pub fn gid(value: &str) -> ResourceGid {
    ResourceGid::new(value).unwrap()
}

pub fn config() -> ConnectorConfig {
    ConnectorConfig::new("0/test-token")
        .with_base_url(BASE_URL)
        .with_workspace(WorkspaceGid::new("ws-1").unwrap())
}

#[derive(Default)]
struct FakeState {
    webhooks: Vec<RemoteWebhook>,
    list_calls: usize,
    creates: Vec<(String, String)>,
    fail_list: bool,
    inactive_for: HashSet<String>,
    fail_create_for: HashSet<String>,
}

/// Remote webhook API that keeps its registrations in memory.
#[derive(Default, Clone)]
pub struct FakeWebhookApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeWebhookApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_webhook(self, resource: &str, target: &str, active: bool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let next = state.webhooks.len() + 1;
            state.webhooks.push(RemoteWebhook {
                gid: WebhookGid::new(format!("hook-{next}")),
                resource: gid(resource),
                target: target.to_owned(),
                active,
            });
        }
        self
    }

    pub fn failing_list(self) -> Self {
        self.state.lock().unwrap().fail_list = true;
        self
    }

    pub fn inactive_for(self, resource: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .inactive_for
            .insert(resource.to_owned());
        self
    }

    pub fn failing_create_for(self, resource: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_create_for
            .insert(resource.to_owned());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    /// `(resource, target)` of every create call, in order.
    pub fn creates(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().creates.clone()
    }

    pub fn total_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.list_calls + state.creates.len()
    }
}

#[async_trait]
impl WebhookApi for FakeWebhookApi {
    async fn list_webhooks(
        &self,
        _workspace: &WorkspaceGid,
    ) -> Result<Vec<RemoteWebhook>, RemoteApiError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.fail_list {
            return Err(RemoteApiError::Status {
                status: 403,
                body: "forbidden".into(),
            });
        }
        Ok(state.webhooks.clone())
    }

    async fn create_webhook(
        &self,
        resource: &ResourceGid,
        target: &str,
    ) -> Result<RemoteWebhook, RemoteApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .creates
            .push((resource.to_string(), target.to_owned()));
        if state.fail_create_for.contains(resource.as_str()) {
            return Err(RemoteApiError::Transport("connection reset".into()));
        }
        let active = !state.inactive_for.contains(resource.as_str());
        let next = state.webhooks.len() + 1;
        let webhook = RemoteWebhook {
            gid: WebhookGid::new(format!("hook-{next}")),
            resource: resource.clone(),
            target: target.to_owned(),
            active,
        };
        state.webhooks.push(webhook.clone());
        Ok(webhook)
    }
}

/// Event bus that records every raised event and can fail chosen ids.
#[derive(Default, Clone)]
pub struct RecordingBus {
    raised: Arc<Mutex<Vec<(String, Value)>>>,
    failing: Arc<HashSet<String>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(ids: &[&str]) -> Self {
        Self {
            raised: Arc::default(),
            failing: Arc::new(ids.iter().map(|id| (*id).to_owned()).collect()),
        }
    }

    pub fn raised(&self) -> Vec<(String, Value)> {
        self.raised.lock().unwrap().clone()
    }

    pub fn raised_ids(&self) -> Vec<String> {
        self.raised().into_iter().map(|(id, _)| id).collect()
    }
}

#[async_trait]
impl EventBus for RecordingBus {
    async fn raise(&self, event_id: &SubscriptionId, payload: Value) -> Result<(), HandlerError> {
        self.raised
            .lock()
            .unwrap()
            .push((event_id.to_string(), payload));
        if self.failing.contains(event_id.as_str()) {
            return Err(HandlerError::Failed(format!("{event_id} exploded")));
        }
        Ok(())
    }
}

/// Handler that appends `(label, payload)` to a shared log.
pub fn recording_handler(
    label: &'static str,
    log: &Arc<Mutex<Vec<(&'static str, Value)>>>,
) -> Arc<dyn EventHandler> {
    let log = Arc::clone(log);
    Arc::new(move |payload: Value| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push((label, payload));
            Ok::<_, HandlerError>(())
        }
    })
}

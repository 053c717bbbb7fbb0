use async_trait::async_trait;
use connector::{EventHandler, HandlerError};
use serde_json::Value;

/// Handler used by the standalone binary: every routed event becomes one
/// structured log line, for a log shipper or sidecar to pick up.
pub struct LogEventHandler;

#[async_trait]
impl EventHandler for LogEventHandler {
    async fn handle(&self, payload: Value) -> Result<(), HandlerError> {
        let field = |name: &str| {
            payload
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_owned()
        };
        tracing::info!(
            target: "asana_connector::events",
            subscription = %field("id"),
            action = %field("action"),
            payload = %payload,
            "asana event"
        );
        Ok(())
    }
}

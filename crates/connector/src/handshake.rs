//! Webhook handshake.
//!
//! When Asana creates a webhook it immediately POSTs to the target with an
//! `X-Hook-Secret` header and waits for the same value to come back. Until
//! that echo arrives the webhook stays inactive. Every later delivery carries
//! no secret and is acknowledged with an empty success response so Asana does
//! not redeliver the batch.

/// Header carrying the handshake secret, in both directions.
pub const HOOK_SECRET_HEADER: &str = "x-hook-secret";

/// Transport-neutral response to an inbound delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
}

impl DeliveryResponse {
    /// Empty `200 OK`.
    pub fn ok() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
        }
    }

    /// Value of `name` in the response, if set.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// How an inbound delivery must be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// A handshake: send the response and stop. There is no batch to route.
    Verified(DeliveryResponse),
    /// A notification delivery: send the acknowledgment, then route the batch.
    Acknowledged(DeliveryResponse),
}

impl HandshakeOutcome {
    pub fn response(&self) -> &DeliveryResponse {
        match self {
            Self::Verified(response) | Self::Acknowledged(response) => response,
        }
    }

    pub fn into_response(self) -> DeliveryResponse {
        match self {
            Self::Verified(response) | Self::Acknowledged(response) => response,
        }
    }
}

/// Answers the handshake, or acknowledges a notification delivery.
pub struct HandshakeResponder;

impl HandshakeResponder {
    /// Decides the response from the value of the `x-hook-secret` header.
    ///
    /// A non-empty secret is echoed byte for byte and never inspected. An
    /// empty header value is treated like no header at all.
    pub fn respond(secret: Option<&str>) -> HandshakeOutcome {
        match secret.filter(|secret| !secret.is_empty()) {
            Some(secret) => {
                tracing::info!("answering webhook handshake");
                HandshakeOutcome::Verified(DeliveryResponse {
                    status: 200,
                    headers: vec![(HOOK_SECRET_HEADER, secret.to_owned())],
                })
            }
            None => HandshakeOutcome::Acknowledged(DeliveryResponse::ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_secret_exactly() {
        let outcome = HandshakeResponder::respond(Some("abc123"));
        let HandshakeOutcome::Verified(response) = outcome else {
            panic!("expected a handshake response");
        };
        assert_eq!(response.status, 200);
        assert_eq!(response.header("X-Hook-Secret"), Some("abc123"));
        assert_eq!(response.headers.len(), 1);
    }

    #[test]
    fn empty_secret_is_a_notification_delivery() {
        let outcome = HandshakeResponder::respond(Some(""));
        assert_eq!(outcome, HandshakeOutcome::Acknowledged(DeliveryResponse::ok()));
        assert_eq!(outcome.response().header(HOOK_SECRET_HEADER), None);
    }

    #[test]
    fn no_secret_is_plain_acknowledgment() {
        let outcome = HandshakeResponder::respond(None);
        assert_eq!(outcome, HandshakeOutcome::Acknowledged(DeliveryResponse::ok()));
        assert!(outcome.into_response().headers.is_empty());
    }
}

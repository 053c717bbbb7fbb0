use connector::RemoteApiError;
use thiserror::Error;

/// Errors specific to the Asana client.
///
/// Converted into [`RemoteApiError`] at the [`connector::WebhookApi`] boundary.
#[derive(Debug, Error)]
pub enum AsanaError {
    /// An HTTP-level transport error occurred.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Asana returned a non-success status code.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response body was not the expected JSON envelope.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<AsanaError> for RemoteApiError {
    fn from(err: AsanaError) -> Self {
        match err {
            AsanaError::Http(e) if e.is_decode() => RemoteApiError::Decode(e.to_string()),
            AsanaError::Http(e) => RemoteApiError::Transport(e.to_string()),
            AsanaError::UnexpectedStatus { status, body } => RemoteApiError::Status { status, body },
            AsanaError::InvalidResponse(msg) => RemoteApiError::Decode(msg),
        }
    }
}

//! Newtype domain identifiers.
//!
//! Asana hands out every object identifier as an opaque numeric string (a
//! "gid"). Wrapping each kind in its own newtype prevents accidentally passing
//! a workspace gid where a resource gid is expected, even though both are
//! `String` under the hood.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// An identifier was given as an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} must not be empty")]
pub struct EmptyIdentifier(pub &'static str);

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display, and
// String conversions that serde goes through so empty values never deserialize.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyIdentifier;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(EmptyIdentifier(stringify!($name)))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: Asana-assigned gids
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies the Asana object (project, task, portfolio…) a webhook
    /// watches for changes.
    ResourceGid
}

string_id! {
    /// Identifies the Asana workspace whose webhooks are listed during
    /// reconciliation.
    WorkspaceGid
}

string_id! {
    /// Identifies a webhook registration on the Asana side.
    WebhookGid
}

// ---------------------------------------------------------------------------
// Identifiers: locally assigned
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a local subscription. Unique within one connector instance;
    /// also the event id under which matching notifications are raised on the
    /// host event bus.
    SubscriptionId
}

/// Deserializes an optional identifier, reading an empty string as absent.
///
/// For `serde(deserialize_with)` on configuration fields where `""` means
/// "not configured".
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<String, Error = EmptyIdentifier>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| T::try_from(value).ok()))
}

/// Identifies one connector instance inside the host process.
///
/// Generated fresh at construction unless the host supplies its own; it is
/// folded into synthesised subscription ids so two connectors watching the
/// same resource never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorInstanceId(Uuid);

impl ConnectorInstanceId {
    /// Generates a new random instance identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`ConnectorInstanceId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ConnectorInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Message model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Local identifier for a message, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Create a new unique message ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Generate a fresh client message id (the idempotency key for a send)
#[must_use]
pub fn new_client_message_id() -> String {
    Uuid::now_v7().to_string()
}

/// How the message body should be interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Plain UTF-8 text
    #[default]
    Text,
    /// Opaque ciphertext, never inspected by the engine
    Ciphertext,
}

impl ContentType {
    /// Stable wire/storage name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Ciphertext => "ciphertext",
        }
    }

    /// Parse a content type, accepting the common aliases remote peers send
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" | "text/plain" => Some(Self::Text),
            "ciphertext" | "encrypted" | "e2ee" => Some(Self::Ciphertext),
            _ => None,
        }
    }
}

/// Where a message row was first created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    /// Authored on this device
    Local,
    /// First observed from the remote peer
    Remote,
}

impl MessageSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => Some(Self::Local),
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

/// Delivery/merge state mirrored on the message row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    Synced,
    Retry,
    Failed,
}

impl SyncState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Retry => "retry",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "synced" => Some(Self::Synced),
            "retry" => Some(Self::Retry),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Canonical local view of a direct message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Local identifier
    pub id: MessageId,
    /// Identifier assigned by the server, once known
    pub server_message_id: Option<String>,
    /// Idempotency key shared with the outbox item
    pub client_message_id: String,
    pub sender_user_id: String,
    pub recipient_user_id: String,
    pub content_type: ContentType,
    pub content: String,
    pub source: MessageSource,
    pub sync_state: SyncState,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Read timestamp (Unix ms)
    pub read_at: Option<i64>,
    pub last_error: Option<String>,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Message {
    /// Returns the other participant of the conversation as seen by `viewer`.
    #[must_use]
    pub fn counterpart(&self, viewer_user_id: &str) -> &str {
        if self.sender_user_id == viewer_user_id {
            &self.recipient_user_id
        } else {
            &self.sender_user_id
        }
    }

    /// Whether `viewer` still has to read this message
    #[must_use]
    pub fn is_unread_by(&self, viewer_user_id: &str) -> bool {
        self.recipient_user_id == viewer_user_id && self.read_at.is_none()
    }
}

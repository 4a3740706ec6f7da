//! Normalization of remote message representations.
//!
//! Servers and older clients disagree on field naming (`clientMessageId`,
//! `client_message_id`, `senderUserId`, `from`, ...). Everything is folded
//! into [`RemoteMessage`] here, and a payload that lacks any required field is
//! rejected as a whole.

use serde_json::{Map, Value};

use super::ContentType;
use crate::util::parse_timestamp_ms;

const ID_KEYS: &[&str] = &[
    "id",
    "serverMessageId",
    "server_message_id",
    "messageId",
    "message_id",
];
const CLIENT_ID_KEYS: &[&str] = &["clientMessageId", "client_message_id", "clientId", "client_id"];
const FROM_KEYS: &[&str] = &[
    "fromUserId",
    "from_user_id",
    "senderUserId",
    "sender_user_id",
    "from",
];
const TO_KEYS: &[&str] = &[
    "toUserId",
    "to_user_id",
    "recipientUserId",
    "recipient_user_id",
    "to",
];
const CONTENT_TYPE_KEYS: &[&str] = &["contentType", "content_type"];
const CONTENT_KEYS: &[&str] = &["content", "body"];
const CREATED_AT_KEYS: &[&str] = &["createdAt", "created_at"];
const READ_AT_KEYS: &[&str] = &["readAt", "read_at"];

/// A message as reported by the remote system, in canonical shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMessage {
    pub server_message_id: String,
    pub client_message_id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub content_type: ContentType,
    pub content: String,
    /// Unix ms, when the payload carried a parseable timestamp
    pub created_at: Option<i64>,
    pub read_at: Option<i64>,
}

impl RemoteMessage {
    /// Normalize a single remote payload.
    ///
    /// Accepts the message object itself or an envelope carrying it under a
    /// `message` field. Returns `None` when `id`, `client_message_id`, `from`,
    /// `to` or `content` is missing.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = unwrap_envelope(value)?;

        Some(Self {
            server_message_id: text_field(object, ID_KEYS)?,
            client_message_id: text_field(object, CLIENT_ID_KEYS)?,
            from_user_id: text_field(object, FROM_KEYS)?,
            to_user_id: text_field(object, TO_KEYS)?,
            content: content_field(object)?,
            content_type: text_field(object, CONTENT_TYPE_KEYS)
                .and_then(|raw| ContentType::parse(&raw))
                .unwrap_or_default(),
            created_at: timestamp_field(object, CREATED_AT_KEYS),
            read_at: timestamp_field(object, READ_AT_KEYS),
        })
    }

    /// Normalize every item of a fetch response.
    ///
    /// The response is either `{ "items": [...] }` or a bare array. Malformed
    /// items are dropped; the count of dropped items is returned alongside.
    pub fn from_items(value: &Value) -> (Vec<Self>, usize) {
        let items = match value {
            Value::Array(items) => items.as_slice(),
            Value::Object(object) => object
                .get("items")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice),
            _ => &[],
        };

        let mut parsed = Vec::with_capacity(items.len());
        let mut discarded = 0;
        for item in items {
            match Self::from_value(item) {
                Some(message) => parsed.push(message),
                None => discarded += 1,
            }
        }
        (parsed, discarded)
    }

    /// Whether this message belongs to the conversation between two users
    #[must_use]
    pub fn is_between(&self, user_a: &str, user_b: &str) -> bool {
        (self.from_user_id == user_a && self.to_user_id == user_b)
            || (self.from_user_id == user_b && self.to_user_id == user_a)
    }
}

fn unwrap_envelope(value: &Value) -> Option<&Map<String, Value>> {
    let object = value.as_object()?;
    match object.get("message") {
        Some(Value::Object(inner)) => Some(inner),
        _ => Some(object),
    }
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let text = match lookup(object, keys)? {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

// Content is kept verbatim (no trimming), but must be a string.
fn content_field(object: &Map<String, Value>) -> Option<String> {
    match lookup(object, CONTENT_KEYS)? {
        Value::String(content) => Some(content.clone()),
        _ => None,
    }
}

fn timestamp_field(object: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    match lookup(object, keys)? {
        Value::String(raw) => parse_timestamp_ms(raw),
        Value::Number(number) => number.as_i64(),
        _ => None,
    }
}

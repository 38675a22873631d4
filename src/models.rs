use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shown when a reply payload carries neither a string nor a list of strings.
pub const FALLBACK_REPLY: &str = "I'm not sure how to respond to that.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Lenient ingest: only the exact string `"assistant"` maps to
    /// [`MessageRole::Assistant`]; anything else (including a missing value)
    /// is treated as a user message.
    pub fn from_wire(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("assistant") => MessageRole::Assistant,
            _ => MessageRole::User,
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message as held by the conversation view.
///
/// `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: i64,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role,
            content: content.into(),
            timestamp: now_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Decodes one entry of a history payload. Total: any JSON value yields a
    /// message, with defaults filled in for whatever is missing or mistyped.
    pub fn from_history_item(item: &Value, now: i64) -> Self {
        let id = match item.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => new_message_id(),
        };
        let content = item
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let timestamp = item
            .get("created_at")
            .and_then(Value::as_f64)
            .filter(|secs| secs.is_finite())
            .map(|secs| (secs * 1000.0) as i64)
            .unwrap_or(now);

        Self {
            id,
            role: MessageRole::from_wire(item.get("role")),
            content,
            timestamp,
        }
    }
}

pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// ── Wire decoders ────────────────────────────────────────────────────────────

/// Where the conversation identifier of a create-session response came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIdField {
    /// `conversation_id`, the preferred field.
    ConversationId(String),
    /// `id`, accepted when `conversation_id` is absent.
    Id(String),
    /// Neither field held a non-empty string.
    Missing,
}

impl SessionIdField {
    pub fn decode(body: &Value) -> Self {
        let field = |name: &str| {
            body.get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        if let Some(id) = field("conversation_id") {
            SessionIdField::ConversationId(id)
        } else if let Some(id) = field("id") {
            SessionIdField::Id(id)
        } else {
            SessionIdField::Missing
        }
    }

    pub fn into_id(self) -> Option<String> {
        match self {
            SessionIdField::ConversationId(id) | SessionIdField::Id(id) => Some(id),
            SessionIdField::Missing => None,
        }
    }
}

/// The `response` field of a send-message reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReplyPayload {
    Text(String),
    Lines(Vec<String>),
    /// Anything else, including a missing field. Renders as [`FALLBACK_REPLY`].
    Unrecognized(Value),
}

impl ReplyPayload {
    pub fn decode(body: &Value) -> Self {
        match body.get("response") {
            Some(value) => serde_json::from_value(value.clone())
                .unwrap_or_else(|_| ReplyPayload::Unrecognized(value.clone())),
            None => ReplyPayload::Unrecognized(Value::Null),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ReplyPayload::Text(text) => text,
            ReplyPayload::Lines(lines) => lines.join("\n"),
            ReplyPayload::Unrecognized(_) => FALLBACK_REPLY.to_string(),
        }
    }
}

/// Decodes the `messages` array of a history payload. A missing or non-array
/// field yields an empty history.
pub fn decode_history(body: &Value, now: i64) -> Vec<Message> {
    body.get("messages")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| Message::from_history_item(item, now))
                .collect()
        })
        .unwrap_or_default()
}

/// Request body for `POST session/{id}/message`.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_id_prefers_conversation_id() {
        let body = json!({ "conversation_id": "conv_1", "id": "other" });
        assert_eq!(
            SessionIdField::decode(&body),
            SessionIdField::ConversationId("conv_1".into())
        );
    }

    #[test]
    fn session_id_falls_back_to_id() {
        let body = json!({ "id": "conv_2" });
        assert_eq!(SessionIdField::decode(&body), SessionIdField::Id("conv_2".into()));

        let body = json!({ "conversation_id": "", "id": "conv_3" });
        assert_eq!(SessionIdField::decode(&body).into_id().as_deref(), Some("conv_3"));
    }

    #[test]
    fn session_id_missing_when_neither_field_is_a_string() {
        assert_eq!(SessionIdField::decode(&json!({})), SessionIdField::Missing);
        assert_eq!(
            SessionIdField::decode(&json!({ "conversation_id": 42 })),
            SessionIdField::Missing
        );
        assert_eq!(SessionIdField::decode(&json!([1, 2])), SessionIdField::Missing);
    }

    #[test]
    fn reply_text_is_used_verbatim() {
        let reply = ReplyPayload::decode(&json!({ "response": "  hello\n" }));
        assert_eq!(reply, ReplyPayload::Text("  hello\n".into()));
        assert_eq!(reply.into_text(), "  hello\n");
    }

    #[test]
    fn reply_lines_are_joined_with_newlines() {
        let reply = ReplyPayload::decode(&json!({ "response": ["one", "two"] }));
        assert_eq!(reply.into_text(), "one\ntwo");
    }

    #[test]
    fn reply_falls_back_for_anything_else() {
        for body in [
            json!({}),
            json!({ "response": null }),
            json!({ "response": 7 }),
            json!({ "response": ["one", 2] }),
            json!({ "response": { "text": "nested" } }),
        ] {
            assert_eq!(ReplyPayload::decode(&body).into_text(), FALLBACK_REPLY, "{body}");
        }
    }

    #[test]
    fn history_item_defaults_are_total() {
        let now = 1_700_000_000_000;
        for item in [json!({}), json!(null), json!(3), json!({ "id": 5, "role": "system", "content": [] })] {
            let msg = Message::from_history_item(&item, now);
            assert!(!msg.id.is_empty());
            assert_eq!(msg.role, MessageRole::User);
            assert_eq!(msg.content, "");
            assert_eq!(msg.timestamp, now);
        }
    }

    #[test]
    fn history_item_converts_seconds_to_millis() {
        let item = json!({ "id": "m1", "role": "assistant", "content": "hi", "created_at": 1_700_000_000 });
        let msg = Message::from_history_item(&item, 0);
        assert_eq!(msg.id, "m1");
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, "hi");
        assert_eq!(msg.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn history_without_messages_array_is_empty() {
        assert!(decode_history(&json!({}), 0).is_empty());
        assert!(decode_history(&json!({ "messages": "nope" }), 0).is_empty());
        assert_eq!(decode_history(&json!({ "messages": [{}, {}] }), 0).len(), 2);
    }

    #[test]
    fn role_ingest_is_case_sensitive() {
        assert_eq!(MessageRole::from_wire(Some(&json!("Assistant"))), MessageRole::User);
        assert_eq!(MessageRole::from_wire(Some(&json!("assistant"))), MessageRole::Assistant);
        assert_eq!(MessageRole::from_wire(None), MessageRole::User);
    }
}

//! Outbound real-time events.
//!
//! Every event serialises to one flat JSON object:
//!
//! ```json
//! {
//!     "type": "message.new",
//!     "timestamp": "2025-10-26T10:30:00Z",
//!     "user_id": "uuid",
//!     "conversation_id": "uuid",
//!     "message_id": "uuid",
//!     ...
//! }
//! ```
//!
//! `user_id` is the user who caused the event, not the recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::message::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WebSocketEvent {
    #[serde(rename = "message.new")]
    MessageNew {
        message_id: Uuid,
        sender_id: Uuid,
        sender_name: String,
        content: String,
        created_at: DateTime<Utc>,
    },

    #[serde(rename = "message.deleted")]
    MessageDeleted { message_id: Uuid },

    #[serde(rename = "typing.started")]
    TypingStarted {},

    #[serde(rename = "conversation.created")]
    ConversationCreated {},
}

impl WebSocketEvent {
    pub fn message_new(message: &Message) -> Self {
        WebSocketEvent::MessageNew {
            message_id: message.id,
            sender_id: message.sender_id,
            sender_name: message.sender_name.clone(),
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            WebSocketEvent::MessageNew { .. } => "message.new",
            WebSocketEvent::MessageDeleted { .. } => "message.deleted",
            WebSocketEvent::TypingStarted {} => "typing.started",
            WebSocketEvent::ConversationCreated {} => "conversation.created",
        }
    }

    pub fn to_payload_value(
        &self,
        conversation_id: Uuid,
        actor_id: Uuid,
    ) -> Result<serde_json::Value, serde_json::Error> {
        let mut payload = serde_json::json!({
            "type": self.event_type(),
            "timestamp": Utc::now().to_rfc3339(),
            "user_id": actor_id,
            "conversation_id": conversation_id,
        });

        // Externally tagged: {"message.new": {...fields}}
        if let serde_json::Value::Object(tagged) = serde_json::to_value(self)? {
            for (_, fields) in tagged {
                if let serde_json::Value::Object(fields) = fields {
                    for (key, value) in fields {
                        payload[key.as_str()] = value;
                    }
                }
            }
        }

        Ok(payload)
    }

    pub fn to_payload(&self, conversation_id: Uuid, actor_id: Uuid) -> Result<String, serde_json::Error> {
        let value = self.to_payload_value(conversation_id, actor_id)?;
        serde_json::to_string(&value)
    }
}

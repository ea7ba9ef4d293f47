use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_postgres::Row;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl Message {
    /// Expects `id, conversation_id, sender_id, sender_name, content, created_at, is_read`.
    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            conversation_id: row.get("conversation_id"),
            sender_id: row.get("sender_id"),
            sender_name: row.get("sender_name"),
            content: row.get("content"),
            created_at: row.get("created_at"),
            is_read: row.get("is_read"),
        }
    }
}

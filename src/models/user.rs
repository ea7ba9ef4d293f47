use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::AppError;

/// Public profile; credentials never leave the store.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub tag: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            tag: row.get("tag"),
            email: row.get("email"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    pub fn nametag(&self) -> String {
        format!("{}#{}", self.name, self.tag)
    }
}

/// Splits `name#tag` on the last `#`.
pub fn parse_nametag(nametag: &str) -> Result<(&str, &str), AppError> {
    match nametag.rsplit_once('#') {
        Some((name, tag)) if !name.is_empty() && !tag.is_empty() => Ok((name, tag)),
        _ => Err(AppError::BadRequest("invalid nametag, expected name#tag".into())),
    }
}

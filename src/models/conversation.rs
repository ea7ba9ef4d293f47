use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    Private,
    Group,
}

impl ConversationType {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "private" => Some(Self::Private),
            "group" => Some(Self::Group),
            _ => None,
        }
    }

    pub fn to_db(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for ConversationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db())
    }
}

/// One row of a user's conversation list, derived per query.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_user_id: Uuid,
    pub other_user_name: String,
    pub other_user_tag: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetails {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ConversationType,
    pub participants: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_db_roundtrip() {
        for t in [ConversationType::Private, ConversationType::Group] {
            assert_eq!(ConversationType::from_db(t.to_db()), Some(t));
        }
        assert_eq!(ConversationType::from_db("direct"), None);
    }

    #[test]
    fn test_details_serialises_type_field() {
        let details = ConversationDetails {
            id: Uuid::nil(),
            kind: ConversationType::Private,
            participants: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let v = serde_json::to_value(&details).unwrap();
        assert_eq!(v["type"], "private");
        assert!(v.get("kind").is_none());
    }
}

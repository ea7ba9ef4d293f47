//! Friend graph edges. Each row is directed: `user_id` asked `friend_id`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

impl FriendStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    pub fn to_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for FriendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db())
    }
}

/// What `AddFriend` does given the current edge from requester to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddFriendAction {
    Insert,
    Reopen,
    AlreadyExists(FriendStatus),
    Blocked,
}

impl AddFriendAction {
    pub fn decide(existing: Option<FriendStatus>) -> Self {
        match existing {
            None => Self::Insert,
            Some(FriendStatus::Rejected) => Self::Reopen,
            Some(FriendStatus::Blocked) => Self::Blocked,
            Some(status @ (FriendStatus::Pending | FriendStatus::Accepted)) => {
                Self::AlreadyExists(status)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendUser {
    pub id: Uuid,
    pub name: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingFriend {
    /// Request id, passed back to accept/decline.
    pub id: Uuid,
    pub sender_id: Uuid,
    pub name: String,
    pub tag: String,
}

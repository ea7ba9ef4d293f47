pub mod conversation;
pub mod friend;
pub mod message;
pub mod user;

pub use conversation::{ConversationDetails, ConversationSummary, ConversationType};
pub use friend::{FriendStatus, FriendUser, PendingFriend};
pub use message::Message;
pub use user::User;

/// Clamped limit/offset pair handed to storage queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Out-of-range limits fall back to `default`; negative offsets become 0.
    pub fn clamp(limit: Option<i64>, offset: Option<i64>, max: i64, default: i64) -> Self {
        let limit = match limit {
            Some(l) if l > 0 && l <= max => l,
            _ => default,
        };
        let offset = offset.unwrap_or(0).max(0);
        Self { limit, offset }
    }
}

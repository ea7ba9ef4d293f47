use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ConversationDetails, ConversationSummary, ConversationType, Page};

pub const CONVERSATIONS_MAX_LIMIT: i64 = 50;
pub const CONVERSATIONS_DEFAULT_LIMIT: i64 = 20;

pub struct ConversationService;

impl ConversationService {
    /// Visible private conversations of `user_id`, freshest first, with the
    /// counterpart, the latest message and the counterpart's unread count.
    pub async fn list(
        db: &Pool,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> AppResult<Vec<ConversationSummary>> {
        let page = Page::clamp(
            limit,
            offset,
            CONVERSATIONS_MAX_LIMIT,
            CONVERSATIONS_DEFAULT_LIMIT,
        );
        let client = db.get().await?;

        let rows = client
            .query(
                r#"
                SELECT
                    c.id AS conversation_id,
                    other.user_id AS other_user_id,
                    u.name AS other_user_name,
                    u.tag AS other_user_tag,
                    last.content AS last_message,
                    last.created_at AS last_message_at,
                    unread.unread_count
                FROM conversation_participants me
                JOIN conversations c ON c.id = me.conversation_id
                JOIN conversation_participants other
                  ON other.conversation_id = c.id AND other.user_id <> me.user_id
                JOIN users u ON u.id = other.user_id
                LEFT JOIN LATERAL (
                    SELECT m.content, m.created_at
                    FROM messages m
                    WHERE m.conversation_id = c.id
                    ORDER BY m.created_at DESC, m.id DESC
                    LIMIT 1
                ) last ON TRUE
                CROSS JOIN LATERAL (
                    SELECT COUNT(*) AS unread_count
                    FROM messages m
                    WHERE m.conversation_id = c.id
                      AND m.sender_id = other.user_id
                      AND m.is_read = FALSE
                ) unread
                WHERE me.user_id = $1
                  AND me.left_at IS NULL
                  AND c.type = 'private'
                ORDER BY c.updated_at DESC, c.id DESC
                LIMIT $2 OFFSET $3
                "#,
                &[&user_id, &page.limit, &page.offset],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| ConversationSummary {
                id: row.get("conversation_id"),
                other_user_id: row.get("other_user_id"),
                other_user_name: row.get("other_user_name"),
                other_user_tag: row.get("other_user_tag"),
                last_message: row.get("last_message"),
                last_message_at: row.get("last_message_at"),
                unread_count: row.get("unread_count"),
            })
            .collect())
    }

    /// Full detail, but only for participants. Everyone else sees "not found".
    pub async fn get_by_id(
        db: &Pool,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<ConversationDetails> {
        let client = db.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT c.id, c.type, c.created_at, c.updated_at,
                       array_agg(cp.user_id ORDER BY cp.joined_at, cp.user_id) AS participants
                FROM conversations c
                JOIN conversation_participants cp ON cp.conversation_id = c.id
                WHERE c.id = $1
                  AND EXISTS (
                      SELECT 1 FROM conversation_participants me
                      WHERE me.conversation_id = c.id AND me.user_id = $2
                  )
                GROUP BY c.id, c.type, c.created_at, c.updated_at
                "#,
                &[&conversation_id, &user_id],
            )
            .await?
            .ok_or(AppError::NotFound("conversation"))?;

        let kind: String = row.get("type");
        let kind = ConversationType::from_db(&kind).ok_or_else(|| {
            tracing::error!(conversation_id = %conversation_id, kind = %kind, "unknown conversation type");
            AppError::Internal
        })?;

        Ok(ConversationDetails {
            id: row.get("id"),
            kind,
            participants: row.get("participants"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    /// The other participants of a conversation `actor_id` belongs to.
    /// Empty when the actor is not a participant, or has hidden the
    /// conversation and `visible_only` is set.
    pub async fn counterparts(
        db: &Pool,
        conversation_id: Uuid,
        actor_id: Uuid,
        visible_only: bool,
    ) -> AppResult<Vec<Uuid>> {
        let client = db.get().await?;
        let rows = client
            .query(
                r#"
                SELECT cp.user_id
                FROM conversation_participants cp
                WHERE cp.conversation_id = $1
                  AND cp.user_id <> $2
                  AND EXISTS (
                      SELECT 1 FROM conversation_participants me
                      WHERE me.conversation_id = $1 AND me.user_id = $2
                        AND (NOT $3 OR me.left_at IS NULL)
                  )
                "#,
                &[&conversation_id, &actor_id, &visible_only],
            )
            .await?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }
}

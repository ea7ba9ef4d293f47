use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Message, Page};
use crate::services::{commit, new_id};

pub const MESSAGES_MAX_LIMIT: i64 = 100;
pub const MESSAGES_DEFAULT_LIMIT: i64 = 50;

pub struct MessageService;

impl MessageService {
    /// Appends a message, bumps the conversation and un-hides it for every
    /// participant, all in one transaction.
    ///
    /// The sender must be a participant (hidden or not); otherwise nothing is
    /// written and the conversation is reported as not found.
    pub async fn new_message(
        db: &Pool,
        sender_id: Uuid,
        conversation_id: Uuid,
        content: &str,
    ) -> AppResult<Message> {
        let mut client = db.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(
                r#"
                WITH inserted AS (
                    INSERT INTO messages (id, conversation_id, sender_id, content, created_at)
                    SELECT $1::uuid, $2::uuid, $3::uuid, $4::text, clock_timestamp()
                    WHERE EXISTS (
                        SELECT 1 FROM conversation_participants
                        WHERE conversation_id = $2 AND user_id = $3
                    )
                    RETURNING id, conversation_id, sender_id, content, created_at, is_read
                )
                SELECT i.id, i.conversation_id, i.sender_id, u.name AS sender_name,
                       i.content, i.created_at, i.is_read
                FROM inserted i
                JOIN users u ON u.id = i.sender_id
                "#,
                &[&new_id(), &conversation_id, &sender_id, &content],
            )
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        let message = Message::from_row(&row);

        tx.execute(
            "UPDATE conversations SET updated_at = NOW() WHERE id = $1",
            &[&conversation_id],
        )
        .await?;
        tx.execute(
            r#"
            UPDATE conversation_participants
            SET left_at = NULL
            WHERE conversation_id = $1 AND left_at IS NOT NULL
            "#,
            &[&conversation_id],
        )
        .await?;

        commit(tx).await?;
        Ok(message)
    }

    /// Deletes the message if `requester` sent it, returning its conversation.
    ///
    /// Zero rows affected means someone else's (or no) message and is a denial.
    pub async fn delete_message(db: &Pool, requester: Uuid, message_id: Uuid) -> AppResult<Uuid> {
        let client = db.get().await?;
        let row = client
            .query_opt(
                "DELETE FROM messages WHERE id = $1 AND sender_id = $2 RETURNING conversation_id",
                &[&message_id, &requester],
            )
            .await?;

        match row {
            Some(row) => Ok(row.get("conversation_id")),
            None => Err(AppError::Forbidden(
                "message does not exist or was not sent by you".into(),
            )),
        }
    }

    /// Hides the conversation for `user_id` only. Messages are untouched.
    pub async fn hide(db: &Pool, user_id: Uuid, conversation_id: Uuid) -> AppResult<()> {
        let client = db.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE conversation_participants
                SET left_at = NOW()
                WHERE conversation_id = $1 AND user_id = $2
                "#,
                &[&conversation_id, &user_id],
            )
            .await?;

        if updated == 0 {
            return Err(AppError::NotFound("conversation"));
        }
        Ok(())
    }

    /// Newest first. A requester who is not a visible participant gets an
    /// empty page; membership is checked in the same statement.
    pub async fn list_messages(
        db: &Pool,
        requester: Uuid,
        conversation_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> AppResult<Vec<Message>> {
        let page = Page::clamp(limit, offset, MESSAGES_MAX_LIMIT, MESSAGES_DEFAULT_LIMIT);
        let client = db.get().await?;

        let rows = client
            .query(
                r#"
                SELECT m.id, m.conversation_id, m.sender_id, u.name AS sender_name,
                       m.content, m.created_at, m.is_read
                FROM messages m
                JOIN users u ON u.id = m.sender_id
                WHERE m.conversation_id = $1
                  AND EXISTS (
                      SELECT 1 FROM conversation_participants cp
                      WHERE cp.conversation_id = $1 AND cp.user_id = $2 AND cp.left_at IS NULL
                  )
                ORDER BY m.created_at DESC, m.id DESC
                LIMIT $3 OFFSET $4
                "#,
                &[&conversation_id, &requester, &page.limit, &page.offset],
            )
            .await?;

        Ok(rows.iter().map(Message::from_row).collect())
    }

    /// Marks every message from the other participants as read for `user_id`.
    pub async fn mark_read(db: &Pool, user_id: Uuid, conversation_id: Uuid) -> AppResult<u64> {
        let mut client = db.get().await?;
        let tx = client.transaction().await?;

        let is_participant = tx
            .query_opt(
                r#"
                SELECT 1 FROM conversation_participants
                WHERE conversation_id = $1 AND user_id = $2
                "#,
                &[&conversation_id, &user_id],
            )
            .await?
            .is_some();
        if !is_participant {
            return Err(AppError::NotFound("conversation"));
        }

        let updated = tx
            .execute(
                r#"
                UPDATE messages
                SET is_read = TRUE
                WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
                "#,
                &[&conversation_id, &user_id],
            )
            .await?;

        commit(tx).await?;
        Ok(updated)
    }
}

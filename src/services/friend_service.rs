use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::friend::AddFriendAction;
use crate::models::{FriendStatus, FriendUser, Page, PendingFriend};
use crate::services::{commit, new_id, UserService};

pub const FRIENDS_MAX_LIMIT: i64 = 100;
pub const FRIENDS_DEFAULT_LIMIT: i64 = 20;

pub struct FriendService;

impl FriendService {
    /// Sends a friend request to the user identified by `name#tag`.
    pub async fn add_friend(db: &Pool, user_id: Uuid, nametag: &str) -> AppResult<()> {
        let target = UserService::get_by_nametag(db, nametag).await?;
        if target.id == user_id {
            return Err(AppError::BadRequest("cannot add yourself as a friend".into()));
        }

        let mut client = db.get().await?;
        let tx = client.transaction().await?;

        let existing = tx
            .query_opt(
                "SELECT status FROM friends WHERE user_id = $1 AND friend_id = $2 FOR UPDATE",
                &[&user_id, &target.id],
            )
            .await?
            .map(|row| {
                let status: String = row.get("status");
                FriendStatus::from_db(&status).ok_or(AppError::Internal)
            })
            .transpose()?;

        match AddFriendAction::decide(existing) {
            AddFriendAction::Insert => {
                // A concurrent request for the same pair lands on the unique key.
                let inserted = tx
                    .execute(
                        r#"
                        INSERT INTO friends (id, user_id, friend_id, status)
                        VALUES ($1, $2, $3, 'pending')
                        ON CONFLICT (user_id, friend_id) DO NOTHING
                        "#,
                        &[&new_id(), &user_id, &target.id],
                    )
                    .await?;
                if inserted == 0 {
                    return Err(AppError::Conflict("friend request already exists".into()));
                }
            }
            AddFriendAction::Reopen => {
                tx.execute(
                    r#"
                    UPDATE friends SET status = 'pending', updated_at = NOW()
                    WHERE user_id = $1 AND friend_id = $2
                    "#,
                    &[&user_id, &target.id],
                )
                .await?;
            }
            AddFriendAction::AlreadyExists(status) => {
                return Err(AppError::Conflict(format!(
                    "friend request already exists: {status}"
                )));
            }
            AddFriendAction::Blocked => {
                return Err(AppError::Forbidden("friend request is blocked".into()));
            }
        }

        commit(tx).await?;
        tracing::debug!(user_id = %user_id, friend_id = %target.id, "friend request sent");
        Ok(())
    }

    /// Accepts an incoming request and records the reverse edge.
    pub async fn accept(db: &Pool, user_id: Uuid, request_id: Uuid) -> AppResult<()> {
        let mut client = db.get().await?;
        let tx = client.transaction().await?;

        let sender_id: Uuid = tx
            .query_opt(
                r#"
                UPDATE friends SET status = 'accepted', updated_at = NOW()
                WHERE id = $1 AND friend_id = $2
                RETURNING user_id
                "#,
                &[&request_id, &user_id],
            )
            .await?
            .ok_or(AppError::NotFound("friend request"))?
            .get("user_id");

        tx.execute(
            r#"
            INSERT INTO friends (id, user_id, friend_id, status)
            VALUES ($1, $2, $3, 'accepted')
            ON CONFLICT (user_id, friend_id)
            DO UPDATE SET status = 'accepted', updated_at = NOW()
            "#,
            &[&new_id(), &user_id, &sender_id],
        )
        .await?;

        commit(tx).await?;
        Ok(())
    }

    pub async fn decline(db: &Pool, user_id: Uuid, request_id: Uuid) -> AppResult<()> {
        let client = db.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE friends SET status = 'rejected', updated_at = NOW()
                WHERE id = $1 AND friend_id = $2
                "#,
                &[&request_id, &user_id],
            )
            .await?;

        if updated == 0 {
            return Err(AppError::NotFound("friend request"));
        }
        Ok(())
    }

    /// Accepted friendships are removed in both directions; a pending
    /// outgoing request is simply withdrawn.
    pub async fn delete(db: &Pool, user_id: Uuid, friend_id: Uuid) -> AppResult<()> {
        let mut client = db.get().await?;
        let tx = client.transaction().await?;

        let status: String = tx
            .query_opt(
                "SELECT status FROM friends WHERE user_id = $1 AND friend_id = $2 FOR UPDATE",
                &[&user_id, &friend_id],
            )
            .await?
            .ok_or(AppError::NotFound("friend"))?
            .get("status");

        match FriendStatus::from_db(&status) {
            Some(FriendStatus::Accepted) => {
                tx.execute(
                    r#"
                    DELETE FROM friends
                    WHERE (user_id = $1 AND friend_id = $2)
                       OR (user_id = $2 AND friend_id = $1)
                    "#,
                    &[&user_id, &friend_id],
                )
                .await?;
            }
            Some(FriendStatus::Pending) => {
                tx.execute(
                    "DELETE FROM friends WHERE user_id = $1 AND friend_id = $2",
                    &[&user_id, &friend_id],
                )
                .await?;
            }
            Some(other) => {
                return Err(AppError::BadRequest(format!(
                    "cannot delete friend with status {other}"
                )));
            }
            None => return Err(AppError::Internal),
        }

        commit(tx).await?;
        Ok(())
    }

    /// Incoming pending requests, newest first.
    pub async fn get_pending(db: &Pool, user_id: Uuid) -> AppResult<Vec<PendingFriend>> {
        let client = db.get().await?;
        let rows = client
            .query(
                r#"
                SELECT f.id, u.id AS sender_id, u.name, u.tag
                FROM friends f
                JOIN users u ON u.id = f.user_id
                WHERE f.friend_id = $1 AND f.status = 'pending'
                ORDER BY f.created_at DESC, f.id DESC
                "#,
                &[&user_id],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| PendingFriend {
                id: row.get("id"),
                sender_id: row.get("sender_id"),
                name: row.get("name"),
                tag: row.get("tag"),
            })
            .collect())
    }

    pub async fn list(
        db: &Pool,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> AppResult<Vec<FriendUser>> {
        let page = Page::clamp(limit, offset, FRIENDS_MAX_LIMIT, FRIENDS_DEFAULT_LIMIT);
        let client = db.get().await?;
        let rows = client
            .query(
                r#"
                SELECT u.id, u.name, u.tag
                FROM friends f
                JOIN users u ON u.id = f.friend_id
                WHERE f.user_id = $1 AND f.status = 'accepted'
                ORDER BY f.created_at DESC, f.id DESC
                LIMIT $2 OFFSET $3
                "#,
                &[&user_id, &page.limit, &page.offset],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| FriendUser {
                id: row.get("id"),
                name: row.get("name"),
                tag: row.get("tag"),
            })
            .collect())
    }
}

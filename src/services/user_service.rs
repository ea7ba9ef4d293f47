use deadpool_postgres::Pool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::user::{parse_nametag, User};

const USER_COLUMNS: &str = "id, name, tag, email, created_at, updated_at";

pub struct UserService;

impl UserService {
    pub async fn get_by_id(db: &Pool, user_id: Uuid) -> AppResult<User> {
        let client = db.get().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        client
            .query_opt(sql.as_str(), &[&user_id])
            .await?
            .map(|row| User::from_row(&row))
            .ok_or(AppError::NotFound("user"))
    }

    /// Looks a user up by `name#tag`.
    pub async fn get_by_nametag(db: &Pool, nametag: &str) -> AppResult<User> {
        let (name, tag) = parse_nametag(nametag)?;
        let client = db.get().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE name = $1 AND tag = $2");
        client
            .query_opt(sql.as_str(), &[&name, &tag])
            .await?
            .map(|row| User::from_row(&row))
            .ok_or(AppError::NotFound("user"))
    }
}

use actix_web::{delete, get, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::routes::{ok, ok_empty, IdBody, PaginationQuery};
use crate::services::friend_service::FRIENDS_MAX_LIMIT;
use crate::services::{with_deadline, FriendService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddFriendRequest {
    pub nametag: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteFriendRequest {
    pub friend_id: Uuid,
}

#[post("/friend/add")]
pub async fn add_friend(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<AddFriendRequest>,
) -> Result<HttpResponse, AppError> {
    let nametag = body.nametag.trim();
    with_deadline(
        state.config.context_timeout,
        FriendService::add_friend(&state.db, user.id, nametag),
    )
    .await?;
    Ok(ok_empty())
}

#[get("/friend/pending")]
pub async fn get_pending(state: web::Data<AppState>, user: User) -> Result<HttpResponse, AppError> {
    let pending = with_deadline(
        state.config.context_timeout,
        FriendService::get_pending(&state.db, user.id),
    )
    .await?;
    Ok(ok(pending))
}

#[post("/friend/accept")]
pub async fn accept(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<IdBody>,
) -> Result<HttpResponse, AppError> {
    with_deadline(
        state.config.context_timeout,
        FriendService::accept(&state.db, user.id, body.id),
    )
    .await?;
    Ok(ok_empty())
}

#[post("/friend/decline")]
pub async fn decline(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<IdBody>,
) -> Result<HttpResponse, AppError> {
    with_deadline(
        state.config.context_timeout,
        FriendService::decline(&state.db, user.id, body.id),
    )
    .await?;
    Ok(ok_empty())
}

#[delete("/friend/delete")]
pub async fn delete_friend(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<DeleteFriendRequest>,
) -> Result<HttpResponse, AppError> {
    with_deadline(
        state.config.context_timeout,
        FriendService::delete(&state.db, user.id, body.friend_id),
    )
    .await?;
    Ok(ok_empty())
}

#[get("/friend/list")]
pub async fn list_friends(
    state: web::Data<AppState>,
    user: User,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate(FRIENDS_MAX_LIMIT)?;
    let friends = with_deadline(
        state.config.context_timeout,
        FriendService::list(&state.db, user.id, query.limit, query.offset),
    )
    .await?;
    Ok(ok(friends))
}

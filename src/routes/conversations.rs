use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::routes::{ok, ok_empty, IdBody, PaginationQuery};
use crate::services::conversation_service::CONVERSATIONS_MAX_LIMIT;
use crate::services::{with_deadline, ConversationService, MessageService};
use crate::state::AppState;
use crate::websocket::events::WebSocketEvent;

#[derive(Debug, Deserialize)]
pub struct GetOrCreateRequest {
    pub target_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub id: Uuid,
}

/// POST /api/v1/user/conversation/getOrCreate
///
/// Idempotent per pair; the counterpart hears about it only on first creation.
#[post("/conversation/getOrCreate")]
pub async fn get_or_create(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<GetOrCreateRequest>,
) -> Result<HttpResponse, AppError> {
    let resolved = with_deadline(
        state.config.context_timeout,
        state.resolver.get_or_create(user.id, body.target_id),
    )
    .await?;

    if resolved.created {
        state.delivery.dispatch(
            resolved.conversation_id,
            user.id,
            WebSocketEvent::ConversationCreated {},
        );
    }
    Ok(ok(serde_json::json!({ "id": resolved.conversation_id })))
}

#[get("/conversation/list")]
pub async fn list_conversations(
    state: web::Data<AppState>,
    user: User,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate(CONVERSATIONS_MAX_LIMIT)?;
    let conversations = with_deadline(
        state.config.context_timeout,
        ConversationService::list(&state.db, user.id, query.limit, query.offset),
    )
    .await?;
    Ok(ok(conversations))
}

#[get("/conversation/get")]
pub async fn get_conversation(
    state: web::Data<AppState>,
    user: User,
    query: web::Query<ConversationQuery>,
) -> Result<HttpResponse, AppError> {
    let details = with_deadline(
        state.config.context_timeout,
        ConversationService::get_by_id(&state.db, user.id, query.id),
    )
    .await?;
    Ok(ok(details))
}

#[post("/conversation/hide")]
pub async fn hide_conversation(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<IdBody>,
) -> Result<HttpResponse, AppError> {
    with_deadline(
        state.config.context_timeout,
        MessageService::hide(&state.db, user.id, body.id),
    )
    .await?;
    Ok(ok_empty())
}

#[post("/conversation/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<IdBody>,
) -> Result<HttpResponse, AppError> {
    let updated = with_deadline(
        state.config.context_timeout,
        MessageService::mark_read(&state.db, user.id, body.id),
    )
    .await?;
    Ok(ok(serde_json::json!({ "updated": updated })))
}

use actix_web::{delete, get, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::routes::{ok, ok_empty, IdBody, PaginationQuery};
use crate::services::message_service::MESSAGES_MAX_LIMIT;
use crate::services::{with_deadline, MessageService};
use crate::state::AppState;
use crate::websocket::events::WebSocketEvent;

pub const MAX_CONTENT_CHARS: usize = 4096;

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub id: Uuid,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewMessageRequest {
    pub id: Uuid,
    pub content: String,
}

/// Rejects blank or oversized content. Accepted content is stored as sent.
pub fn validate_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("content must not be empty".into()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::BadRequest(format!(
            "content exceeds {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}

#[get("/conversation/message/list")]
pub async fn list_messages(
    state: web::Data<AppState>,
    user: User,
    query: web::Query<ListMessagesQuery>,
) -> Result<HttpResponse, AppError> {
    let page = PaginationQuery {
        limit: query.limit,
        offset: query.offset,
    };
    page.validate(MESSAGES_MAX_LIMIT)?;

    let messages = with_deadline(
        state.config.context_timeout,
        MessageService::list_messages(&state.db, user.id, query.id, page.limit, page.offset),
    )
    .await?;
    Ok(ok(messages))
}

/// POST /api/v1/user/conversation/message/new
///
/// The push to the counterpart happens after commit and never fails the request.
#[post("/conversation/message/new")]
pub async fn new_message(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<NewMessageRequest>,
) -> Result<HttpResponse, AppError> {
    validate_content(&body.content)?;

    let message = with_deadline(
        state.config.context_timeout,
        MessageService::new_message(&state.db, user.id, body.id, &body.content),
    )
    .await?;

    state
        .delivery
        .dispatch(body.id, user.id, WebSocketEvent::message_new(&message));

    Ok(ok(serde_json::json!({ "id": message.id })))
}

#[delete("/conversation/message/delete")]
pub async fn delete_message(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<IdBody>,
) -> Result<HttpResponse, AppError> {
    let conversation_id = with_deadline(
        state.config.context_timeout,
        MessageService::delete_message(&state.db, user.id, body.id),
    )
    .await?;

    state.delivery.dispatch(
        conversation_id,
        user.id,
        WebSocketEvent::MessageDeleted { message_id: body.id },
    );
    Ok(ok_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content() {
        assert!(validate_content("  hi  ").is_ok());
        assert!(validate_content("   ").is_err());
        assert!(validate_content("").is_err());

        let max = "é".repeat(MAX_CONTENT_CHARS);
        assert!(validate_content(&max).is_ok());
        let over = "a".repeat(MAX_CONTENT_CHARS + 1);
        assert!(matches!(validate_content(&over), Err(AppError::BadRequest(_))));
        let padded = format!(" {max}");
        assert!(validate_content(&padded).is_err());
    }
}

use actix_web::{get, web, HttpResponse};

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::routes::ok;
use crate::services::{with_deadline, UserService};
use crate::state::AppState;

/// GET /api/v1/user/me
#[get("/me")]
pub async fn me(state: web::Data<AppState>, user: User) -> Result<HttpResponse, AppError> {
    let profile = with_deadline(
        state.config.context_timeout,
        UserService::get_by_id(&state.db, user.id),
    )
    .await?;
    Ok(ok(profile))
}

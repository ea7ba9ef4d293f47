pub mod conversations;
pub mod friends;
pub mod messages;
pub mod users;
pub mod wsroute;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::AppError;
use crate::metrics::metrics_handler;
use crate::middleware::JwtAuth;

/// `{"success": true, "data": ...}`
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "success": true, "data": data }))
}

/// `{"success": true}` for operations with nothing to return.
pub fn ok_empty() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "success": true }))
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationQuery {
    /// Rejects values outside `1..=max` / `>= 0` before they reach storage.
    pub fn validate(&self, max: i64) -> Result<(), AppError> {
        if let Some(limit) = self.limit {
            if !(1..=max).contains(&limit) {
                return Err(AppError::BadRequest(format!("limit must be between 1 and {max}")));
            }
        }
        if matches!(self.offset, Some(o) if o < 0) {
            return Err(AppError::BadRequest("offset must not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct IdBody {
    pub id: Uuid,
}

/// Extractor failures become 400s in the common error envelope.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }));
}

/// Mounts every route. `jwt` guards everything under `/api/v1/user`.
pub fn configure(jwt: JwtConfig) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        extractor_config(cfg);
        cfg.route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics_handler))
            .service(
                web::scope("/api/v1/user")
                    .wrap(JwtAuth::new(&jwt))
                    .service(users::me)
                    .service(friends::add_friend)
                    .service(friends::get_pending)
                    .service(friends::accept)
                    .service(friends::decline)
                    .service(friends::delete_friend)
                    .service(friends::list_friends)
                    .service(conversations::get_or_create)
                    .service(conversations::list_conversations)
                    .service(conversations::get_conversation)
                    .service(conversations::hide_conversation)
                    .service(conversations::mark_read)
                    .service(messages::list_messages)
                    .service(messages::new_message)
                    .service(messages::delete_message)
                    .service(wsroute::ws_handler),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_bounds() {
        let q = PaginationQuery { limit: Some(50), offset: Some(0) };
        assert!(q.validate(50).is_ok());
        assert!(q.validate(49).is_err());

        let q = PaginationQuery { limit: Some(0), offset: None };
        assert!(q.validate(100).is_err());

        let q = PaginationQuery { limit: None, offset: Some(-1) };
        assert!(matches!(q.validate(100), Err(AppError::BadRequest(_))));

        assert!(PaginationQuery::default().validate(100).is_ok());
    }
}

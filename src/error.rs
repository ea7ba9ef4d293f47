use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("operation timed out")]
    Timeout,

    #[error("internal server error")]
    Internal,
}

impl From<tokio_postgres::Error> for AppError {
    fn from(e: tokio_postgres::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Cache(e.to_string())
    }
}

impl AppError {
    /// Infrastructure failures the caller may retry; nothing was committed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Cache(_) | AppError::Timeout
        )
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) => 400,
            AppError::Unauthorized => 401,
            AppError::Forbidden(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::Database(_) | AppError::Cache(_) => 503,
            AppError::Timeout => 504,
            AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "INVALID_REQUEST",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Database(_) => "DATABASE_UNAVAILABLE",
            AppError::Cache(_) => "CACHE_UNAVAILABLE",
            AppError::Timeout => "TIMEOUT",
            AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
                "INTERNAL_SERVER_ERROR"
            }
        }
    }

    /// Message shown to clients; infrastructure details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Cache(_) => {
                "temporarily unavailable, retry later".to_string()
            }
            AppError::Config(_) | AppError::StartServer(_) => {
                AppError::Internal.to_string()
            }
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(AppError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_retryable() || AppError::status_code(self) >= 500 {
            tracing::error!(error = %self, "request failed");
        }

        HttpResponse::build(ResponseError::status_code(self)).json(json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.public_message(),
                "retryable": self.is_retryable(),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(AppError::Unauthorized.status_code(), 401);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(AppError::NotFound("conversation").status_code(), 404);
        assert_eq!(AppError::Conflict("x".into()).status_code(), 409);
        assert_eq!(AppError::Database("x".into()).status_code(), 503);
        assert_eq!(AppError::Timeout.status_code(), 504);
    }

    #[test]
    fn test_only_infrastructure_errors_are_retryable() {
        assert!(AppError::Database("io".into()).is_retryable());
        assert!(AppError::Cache("io".into()).is_retryable());
        assert!(AppError::Timeout.is_retryable());
        assert!(!AppError::BadRequest("self".into()).is_retryable());
        assert!(!AppError::NotFound("message").is_retryable());
        assert!(!AppError::Forbidden("not sender".into()).is_retryable());
    }

    #[actix_rt::test]
    async fn test_error_body_hides_infrastructure_detail() {
        let resp = AppError::Database("password authentication failed".into()).error_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"]["code"], "DATABASE_UNAVAILABLE");
        assert_eq!(v["error"]["retryable"], true);
        assert!(!v["error"]["message"]
            .as_str()
            .unwrap()
            .contains("password"));
    }
}

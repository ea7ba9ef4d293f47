//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` is the user id. Issuance lives outside
//! this service; [`issue_token`] exists for tests and local tooling.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::AppError;

/// User id extracted from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

struct Verifier {
    key: DecodingKey,
    validation: Validation,
}

impl Verifier {
    fn new(cfg: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[cfg.issuer.as_str()]);
        Self {
            key: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
        }
    }

    fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AppError::Unauthorized
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| {
            tracing::warn!("token subject is not a uuid");
            AppError::Unauthorized
        })
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// `Authorization: Bearer` first, then `?token=` for WebSocket upgrades.
fn extract_token(req: &ServiceRequest) -> Option<String> {
    if let Some(header) = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        return header.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }
    web::Query::<TokenQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().token)
        .filter(|t| !t.is_empty())
}

/// JWT authentication middleware.
#[derive(Clone)]
pub struct JwtAuth {
    verifier: Arc<Verifier>,
}

impl JwtAuth {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            verifier: Arc::new(Verifier::new(cfg)),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct JwtAuthService<S> {
    service: Rc<S>,
    verifier: Arc<Verifier>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let verifier = self.verifier.clone();

        Box::pin(async move {
            let token = extract_token(&req).ok_or(AppError::Unauthorized)?;
            let user_id = verifier.verify(&token)?;
            req.extensions_mut().insert(UserId(user_id));
            service.call(req).await
        })
    }
}

/// Signs a token for `user_id` valid for `ttl_secs`.
pub fn issue_token(
    cfg: &JwtConfig,
    user_id: Uuid,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iss: cfg.issuer.clone(),
        exp: now + ttl_secs,
        iat: now,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
}

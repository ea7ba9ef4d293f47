use actix_web::{dev::Payload, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::UserId;

/// The authenticated caller. Requires [`JwtAuth`](crate::middleware::JwtAuth)
/// upstream.
#[derive(Debug, Clone, Copy)]
pub struct User {
    pub id: Uuid,
}

impl FromRequest for User {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req
            .extensions()
            .get::<UserId>()
            .map(|u| User { id: u.0 })
            .ok_or_else(|| AppError::Unauthorized.into());
        ready(user)
    }
}

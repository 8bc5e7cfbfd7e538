use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::services::{JwtKeys, SessionUser};
use crate::error::AppError;

/// Extracts and validates the session token, rejecting with 401.
pub struct AuthUser(pub SessionUser);

/// Like [`AuthUser`] but yields `None` instead of rejecting.
pub struct MaybeAuthUser(pub Option<SessionUser>);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Auth("unauthorized".into()))?;

    // Expect "Bearer <token>"
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or_else(|| AppError::Auth("invalid auth scheme".into()))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from_ref(state);
        match keys.verify(token) {
            Ok(user) => Ok(AuthUser(user)),
            Err(e) => {
                warn!("invalid or expired token");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = bearer_token(parts)
            .ok()
            .and_then(|token| JwtKeys::from_ref(state).verify(token).ok());
        Ok(MaybeAuthUser(user))
    }
}

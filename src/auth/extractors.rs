use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use super::repo_types::Role;
use crate::error::ApiError;

/// Header the web client sends its token in.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Authenticated caller, resolved from `x-auth-token` or `Authorization: Bearer`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

/// Authenticated caller holding the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

fn token_from_parts(parts: &Parts) -> Option<&str> {
    if let Some(token) = parts
        .headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(token.trim());
    }
    let auth = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthorized("Token is not valid".into())
        })?;

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            warn!(user_id = %user.id, "admin route denied");
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}

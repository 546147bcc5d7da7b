use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;
use crate::users::repo_types::User;

/// Map a session token to the stored user it names.
pub async fn resolve(state: &AppState, token: &str) -> Result<User, AppError> {
    let username = state
        .keys
        .verify_session(token)
        .map_err(|_| AppError::Unauthenticated)?;
    match state.store.find_user_by_username(&username).await? {
        Some(user) => Ok(user),
        None => {
            warn!(username = %username, "token subject has no user");
            Err(AppError::Unauthenticated)
        }
    }
}

/// Like [`resolve`], but a disabled account fails with `InactiveAccount`.
pub async fn resolve_active(state: &AppState, token: &str) -> Result<User, AppError> {
    let user = resolve(state, token).await?;
    if user.disabled {
        warn!(user_id = %user.id, "inactive user attempted an authenticated action");
        return Err(AppError::InactiveAccount);
    }
    Ok(user)
}

/// Raw token from `Authorization: Bearer <token>`.
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Unauthenticated)?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        Ok(BearerToken(token.to_string()))
    }
}

/// Authenticated, non-disabled caller.
pub struct ActiveUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        resolve_active(state, &token).await.map(ActiveUser)
    }
}

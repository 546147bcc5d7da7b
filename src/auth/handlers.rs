use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        claims::TokenKind,
        dto::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
            ResetPasswordRequest, ResetTokenResponse, TokenResponse,
        },
        extractors::{ActiveUser, BearerToken},
        services,
    },
    error::AppError,
    state::AppState,
    users::dto::PublicUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/token", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/change-password", post(change_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let access_token = services::authenticate(&state, &payload.username, &payload.password).await?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.keys.ttl(TokenKind::Session).as_secs(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ResetTokenResponse>, AppError> {
    let reset_token = services::request_password_reset(&state, &payload.email).await?;
    Ok(Json(ResetTokenResponse {
        reset_token,
        token_type: "reset",
        expires_in: state.keys.ttl(TokenKind::Reset).as_secs(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    services::complete_password_reset(&state, &payload.token, &payload.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, token, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    services::change_password(&state, &token, &payload.old_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(user), fields(user_id = %user.id))]
pub async fn get_me(ActiveUser(user): ActiveUser) -> Json<PublicUser> {
    Json(user.into())
}

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{
        extractors::{ActiveUser, BearerToken},
        services::authorize_and_apply,
    },
    error::AppError,
    pagination::Pagination,
    state::AppState,
    users::{
        dto::{AccountStatusResponse, ProfileUpdate, PublicUser, UserProductsResponse},
        services::{self, DisableUser, EnableUser, UpdateProfile},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user).patch(update_user))
        .route("/users/:id/disable", post(disable_user))
        .route("/users/:id/enable", post(enable_user))
        .route("/users/:id/products", get(user_products))
}

#[instrument(skip(state, _actor))]
pub async fn list_users(
    State(state): State<AppState>,
    ActiveUser(_actor): ActiveUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    p.validate()?;
    let users = state.store.list_users(p.offset, p.limit).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, _actor))]
pub async fn get_user(
    State(state): State<AppState>,
    ActiveUser(_actor): ActiveUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::get_user(state.store.as_ref(), id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, token, changes))]
pub async fn update_user(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(id): Path<Uuid>,
    Json(changes): Json<ProfileUpdate>,
) -> Result<Json<PublicUser>, AppError> {
    let user = authorize_and_apply(&state, &token, UpdateProfile { user_id: id, changes }).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, token))]
pub async fn disable_user(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountStatusResponse>, AppError> {
    let (user, status) = authorize_and_apply(&state, &token, DisableUser { user_id: id }).await?;
    Ok(Json(AccountStatusResponse {
        user: user.into(),
        changed: status.changed(),
        status,
    }))
}

#[instrument(skip(state, token))]
pub async fn enable_user(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountStatusResponse>, AppError> {
    let (user, status) = authorize_and_apply(&state, &token, EnableUser { user_id: id }).await?;
    Ok(Json(AccountStatusResponse {
        user: user.into(),
        changed: status.changed(),
        status,
    }))
}

#[instrument(skip(state))]
pub async fn user_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProductsResponse>, AppError> {
    let user = services::get_user(state.store.as_ref(), id).await?;
    let products = state.store.list_products_by_merchant(user.id).await?;
    Ok(Json(UserProductsResponse {
        user: user.into(),
        products,
    }))
}

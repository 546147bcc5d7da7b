use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{extractors::BearerToken, services::authorize_and_apply},
    error::AppError,
    pagination::Pagination,
    products::{
        dto::ProductDraft,
        repo_types::Product,
        services::{self, CreateProduct, DeleteProduct, UpdateProduct},
    },
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[instrument(skip(state, token, draft))]
pub async fn create_product(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, HeaderMap, Json<Product>), AppError> {
    let product = authorize_and_apply(&state, &token, CreateProduct(draft)).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/products/{}", product.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(product)))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Product>>, AppError> {
    p.validate()?;
    let products = state.store.list_products(p.offset, p.limit).await?;
    Ok(Json(products))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    let product = services::get_product(state.store.as_ref(), id).await?;
    Ok(Json(product))
}

#[instrument(skip(state, token, changes))]
pub async fn update_product(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(id): Path<Uuid>,
    Json(changes): Json<ProductDraft>,
) -> Result<Json<Product>, AppError> {
    let product = authorize_and_apply(
        &state,
        &token,
        UpdateProduct {
            product_id: id,
            changes,
        },
    )
    .await?;
    Ok(Json(product))
}

#[instrument(skip(state, token))]
pub async fn delete_product(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    authorize_and_apply(&state, &token, DeleteProduct { product_id: id }).await?;
    Ok(StatusCode::NO_CONTENT)
}

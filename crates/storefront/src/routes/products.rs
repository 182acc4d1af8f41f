//! Product management for store owners.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use bazaar_core::ProductId;

use crate::error::{AppError, Result};
use crate::middleware::{RequireUser, Tenant};
use crate::models::{Product, ProductDraft, ProductUpdate};
use crate::routes::owner_store;
use crate::state::AppState;

/// All products of the owner's store, newest first.
pub async fn index(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Product>>> {
    let store = owner_store(&state, &tenant, user.id).await?;
    let products = state.backend().list_products(store.id).await?;
    Ok(Json(products))
}

/// Add a product. The slug is derived from the title.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>)> {
    let store = owner_store(&state, &tenant, user.id).await?;
    let draft = draft.normalize().map_err(AppError::BadRequest)?;

    let product = state.backend().create_product(store.id, draft).await?;
    tracing::info!(store_id = %store.id, product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// One product, published or not.
pub async fn show(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let store = owner_store(&state, &tenant, user.id).await?;
    state
        .backend()
        .get_product(store.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Apply a partial update.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
    Path(id): Path<ProductId>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    let store = owner_store(&state, &tenant, user.id).await?;
    let product = state.backend().update_product(store.id, id, &update).await?;
    Ok(Json(product))
}

/// Delete a product no order refers to.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn destroy(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let store = owner_store(&state, &tenant, user.id).await?;
    state.backend().delete_product(store.id, id).await?;
    tracing::info!(store_id = %store.id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

//! Shopper-facing catalog endpoints.
//!
//! The store comes from the request host. On the bare base domain the first
//! active store is served so a single-store deployment works without DNS.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::error::{AppError, Result};
use crate::middleware::Tenant;
use crate::models::{Product, ShippingClass, Store, TenantContext, TenantResolution};
use crate::state::AppState;

async fn public_store(state: &AppState, tenant: &TenantContext) -> Result<Store> {
    match tenant.resolution() {
        TenantResolution::Resolved(store) => Ok(store.clone()),
        TenantResolution::Unresolved { .. } => Err(AppError::StoreNotFound),
        TenantResolution::NoTenant => state
            .backend()
            .first_active_store()
            .await?
            .ok_or(AppError::StoreNotFound),
    }
}

/// The store this host serves.
pub async fn store(State(state): State<AppState>, Tenant(tenant): Tenant) -> Result<Json<Store>> {
    public_store(&state, &tenant).await.map(Json)
}

/// Published products, newest first.
pub async fn products(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
) -> Result<Json<Vec<Product>>> {
    let store = public_store(&state, &tenant).await?;
    let products = state.backend().list_published_products(store.id).await?;
    Ok(Json(products))
}

/// One published product by slug.
pub async fn product(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    let store = public_store(&state, &tenant).await?;
    state
        .backend()
        .find_published_product_by_slug(store.id, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))
}

/// Active shipping classes, cheapest first.
pub async fn shipping_classes(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
) -> Result<Json<Vec<ShippingClass>>> {
    let store = public_store(&state, &tenant).await?;
    let classes = state.backend().list_active_shipping_classes(store.id).await?;
    Ok(Json(classes))
}

//! Shipping class management for store owners.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use bazaar_core::ShippingClassId;

use crate::error::{AppError, Result};
use crate::middleware::{RequireUser, Tenant};
use crate::models::{NewShippingClass, ShippingClass};
use crate::routes::owner_store;
use crate::state::AppState;

/// All shipping classes of the owner's store, active or not.
pub async fn index(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<ShippingClass>>> {
    let store = owner_store(&state, &tenant, user.id).await?;
    let classes = state.backend().list_shipping_classes(store.id).await?;
    Ok(Json(classes))
}

/// Add a shipping class.
pub async fn create(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
    Json(class): Json<NewShippingClass>,
) -> Result<(StatusCode, Json<ShippingClass>)> {
    let store = owner_store(&state, &tenant, user.id).await?;
    let class = class.normalize().map_err(AppError::BadRequest)?;
    let class = state.backend().create_shipping_class(store.id, class).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

/// Deactivate a shipping class. Checkouts that name it are then charged nothing
/// for shipping.
pub async fn deactivate(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
    Path(id): Path<ShippingClassId>,
) -> Result<StatusCode> {
    let store = owner_store(&state, &tenant, user.id).await?;
    state
        .backend()
        .deactivate_shipping_class(store.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

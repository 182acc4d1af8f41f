//! Store management for owners.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{StoreId, Subdomain, UserId};

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::{NewStore, Store, StoreProfile, StoreUpdate};
use crate::state::AppState;

/// Body of `POST /api/stores`.
#[derive(Debug, Deserialize)]
pub struct CreateStore {
    pub subdomain: String,
    #[serde(flatten)]
    pub profile: StoreProfile,
}

/// Body of `PUT /api/stores/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateStore {
    /// Accepted only when unchanged.
    pub subdomain: Option<String>,
    #[serde(flatten)]
    pub update: StoreUpdate,
}

async fn owned(state: &AppState, id: StoreId, owner: UserId) -> Result<Store> {
    let store = state
        .backend()
        .get_store(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("store {id}")))?;
    if !store.is_owned_by(owner) {
        return Err(AppError::Forbidden("you do not manage this store".to_string()));
    }
    Ok(store)
}

/// Claim a subdomain and open a store.
#[instrument(skip_all, fields(subdomain = %body.subdomain))]
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<CreateStore>,
) -> Result<(StatusCode, Json<Store>)> {
    let subdomain = Subdomain::parse(body.subdomain.trim())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    body.profile.validate().map_err(AppError::BadRequest)?;

    let store = state
        .backend()
        .create_store(NewStore {
            owner_id: user.id,
            subdomain,
            profile: body.profile,
        })
        .await?;

    tracing::info!(store_id = %store.id, owner_id = %user.id, "Store created");
    Ok((StatusCode::CREATED, Json(store)))
}

/// Stores owned by the current user.
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Store>>> {
    let stores = state.backend().list_stores_owned_by(user.id).await?;
    Ok(Json(stores))
}

/// One store of the current user.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
) -> Result<Json<Store>> {
    owned(&state, id, user.id).await.map(Json)
}

/// Change display attributes. The subdomain never changes.
#[instrument(skip_all, fields(store_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
    Json(body): Json<UpdateStore>,
) -> Result<Json<Store>> {
    let store = owned(&state, id, user.id).await?;
    if let Some(subdomain) = &body.subdomain
        && subdomain.trim() != store.subdomain.as_str()
    {
        return Err(AppError::BadRequest(
            "subdomain cannot be changed".to_string(),
        ));
    }
    body.update.validate().map_err(AppError::BadRequest)?;

    let store = state.backend().update_store(id, &body.update).await?;
    Ok(Json(store))
}

/// Deactivate a store. Its subdomain stays claimed.
#[instrument(skip_all, fields(store_id = %id))]
pub async fn deactivate(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<StoreId>,
) -> Result<StatusCode> {
    owned(&state, id, user.id).await?;
    state.backend().deactivate_store(id).await?;
    tracing::info!("Store deactivated");
    Ok(StatusCode::NO_CONTENT)
}

//! Checkout and order management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{OrderId, OrderStatus};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{RequireTenant, RequireUser, Tenant};
use crate::models::{CurrentUser, Order, OrderRequest, TenantContext};
use crate::routes::owner_store;
use crate::services::OrderFulfillment;
use crate::state::AppState;

/// Query parameters of the order list.
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

/// Body of `PUT /api/orders/{id}`.
#[derive(Debug, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    pub notes: Option<String>,
}

/// Place an order with the store this host serves.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireTenant(tenant): RequireTenant,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = OrderFulfillment::new(state.backend())
        .create_order(&tenant, request)
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", order.order_number.as_str())]),
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// Orders of the owner's store, newest first.
pub async fn index(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>> {
    let tenant = owned_tenant(&state, &tenant, &user).await?;
    let orders = OrderFulfillment::new(state.backend())
        .list_orders(&tenant, user.id, query.status)
        .await?;
    Ok(Json(orders))
}

/// One order of the owner's store.
pub async fn show(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let tenant = owned_tenant(&state, &tenant, &user).await?;
    let order = OrderFulfillment::new(state.backend())
        .get_order(&tenant, user.id, id)
        .await?;
    Ok(Json(order))
}

/// Change an order's status and optionally its notes.
#[instrument(skip_all, fields(order_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
    Json(body): Json<OrderStatusUpdate>,
) -> Result<Json<Order>> {
    let tenant = owned_tenant(&state, &tenant, &user).await?;
    let order = OrderFulfillment::new(state.backend())
        .update_order_status(&tenant, user.id, id, body.status, body.notes)
        .await?;
    Ok(Json(order))
}

/// The tenant an owner's order request acts on: the host's store, or the
/// user's own store when the host names none.
async fn owned_tenant(
    state: &AppState,
    tenant: &TenantContext,
    user: &CurrentUser,
) -> Result<TenantContext> {
    let store = owner_store(state, tenant, user.id).await?;
    let slug = store.subdomain.as_str().to_owned();
    Ok(TenantContext::resolved(slug, store))
}

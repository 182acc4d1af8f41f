//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (data store ping)
//!
//! # Auth (rate limited)
//! POST /api/auth/otp/request         - Issue a login code for a phone
//! POST /api/auth/otp/verify          - Verify code, start session
//! POST /api/auth/logout              - End session
//! GET  /api/auth/me                  - Current user
//!
//! # Public (tenant from Host)
//! GET  /api/public/store             - Resolved store
//! GET  /api/public/products          - Published products
//! GET  /api/public/products/{slug}   - Published product by slug
//! GET  /api/public/shipping-classes  - Active shipping classes
//!
//! # Orders
//! POST /api/orders                   - Checkout (public, rate limited)
//! GET  /api/orders?status=           - Order list (owner)
//! GET  /api/orders/{id}              - Order detail (owner)
//! PUT  /api/orders/{id}              - Update status/notes (owner)
//!
//! # Stores (requires auth)
//! POST   /api/stores                 - Create store
//! GET    /api/stores                 - Stores owned by the current user
//! GET    /api/stores/{id}            - Store
//! PUT    /api/stores/{id}            - Update display attributes
//! DELETE /api/stores/{id}            - Deactivate
//!
//! # Catalog management (requires auth)
//! GET    /api/products               - All products
//! POST   /api/products               - Create product
//! GET    /api/products/{id}          - Product
//! PUT    /api/products/{id}          - Update product
//! DELETE /api/products/{id}          - Delete product
//! GET    /api/shipping-classes       - All shipping classes
//! POST   /api/shipping-classes       - Create shipping class
//! DELETE /api/shipping-classes/{id}  - Deactivate shipping class
//! ```

pub mod auth;
pub mod orders;
pub mod products;
pub mod public;
pub mod shipping;
pub mod stores;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};

use bazaar_core::UserId;

use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, checkout_rate_limiter};
use crate::models::{Store, TenantContext, TenantResolution};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/otp/request", post(auth::request_otp))
        .route("/otp/verify", post(auth::verify_otp))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .layer(auth_rate_limiter())
}

/// Create the public storefront routes router.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/store", get(public::store))
        .route("/products", get(public::products))
        .route("/products/{slug}", get(public::product))
        .route("/shipping-classes", get(public::shipping_classes))
}

/// Create the order routes router.
///
/// Only checkout is rate limited; owners paging through orders are not.
pub fn order_routes() -> Router<AppState> {
    let checkout = Router::new()
        .route("/", post(orders::create))
        .layer(checkout_rate_limiter());

    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show).put(orders::update))
        .merge(checkout)
}

/// Create the store management routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index).post(stores::create))
        .route(
            "/{id}",
            get(stores::show)
                .put(stores::update)
                .delete(stores::deactivate),
        )
}

/// Create the product management routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
}

/// Create the shipping class management routes router.
pub fn shipping_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shipping::index).post(shipping::create))
        .route("/{id}", delete(shipping::deactivate))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes())
        .nest("/api/public", public_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/stores", store_routes())
        .nest("/api/products", product_routes())
        .nest("/api/shipping-classes", shipping_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the data store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.backend().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// The store an owner manages in this request.
///
/// A resolved tenant must belong to `owner`. Without any tenant the owner's
/// first store is used, so management works from the bare base domain.
pub(crate) async fn owner_store(
    state: &AppState,
    tenant: &TenantContext,
    owner: UserId,
) -> Result<Store, AppError> {
    match tenant.resolution() {
        TenantResolution::Resolved(store) if store.is_owned_by(owner) => Ok(store.clone()),
        TenantResolution::Resolved(_) => Err(AppError::Forbidden(
            "you do not manage this store".to_string(),
        )),
        TenantResolution::Unresolved { .. } => Err(AppError::StoreNotFound),
        TenantResolution::NoTenant => state
            .backend()
            .find_store_owned_by(owner)
            .await?
            .ok_or_else(|| AppError::NotFound("you do not own a store yet".to_string())),
    }
}

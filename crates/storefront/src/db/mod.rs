//! Data access for the storefront.
//!
//! # Tables
//!
//! - `users` - Phone-identified accounts (store owners)
//! - `stores` - Tenants, one per subdomain
//! - `products` - Per-store catalog
//! - `shipping_classes` - Per-store flat shipping rates
//! - `orders` / `order_items` - Committed orders and their line snapshots
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! Handlers and services talk to the data store through the traits below, so
//! the same code runs against `PostgreSQL` ([`PgBackend`]) and, in tests, the
//! in-memory backend.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod catalog;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod stores;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{
    OrderId, OrderNumber, OrderStatus, Phone, ProductId, ShippingClassId, StoreId, UserId,
};

use crate::models::{
    NewOrder, NewShippingClass, NewStore, Order, Product, ProductDraft, ProductUpdate,
    ShippingClass, Store, StoreUpdate, User,
};

pub use catalog::CatalogRepository;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryBackend;
pub use orders::OrderRepository;
pub use postgres::PgBackend;
pub use stores::StoreRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., subdomain already taken).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A partial update produced an invalid record.
    #[error("invalid update: {0}")]
    Invalid(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to [`RepositoryError::Conflict`]
    /// with `message`; every other error stays a database error.
    pub(crate) fn conflict_on_violation(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Reasons an atomic order commit was rolled back.
#[derive(Debug, Error)]
pub enum CommitError {
    /// A conditional stock decrement found less stock than ordered.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    /// The product disappeared from the store between validation and commit.
    #[error("product {0} is no longer available")]
    ProductUnavailable(ProductId),

    /// Another order already holds this order number.
    #[error("order number {0} already exists")]
    OrderNumberCollision(OrderNumber),

    /// Any other storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CommitError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Read-only store lookups used by tenant resolution.
#[async_trait]
pub trait StoreDirectory: Send + Sync {
    /// Find the active store whose subdomain is exactly `subdomain`.
    async fn find_active_store_by_subdomain(
        &self,
        subdomain: &str,
    ) -> Result<Option<Store>, RepositoryError>;

    /// Find the first (oldest) active store owned by `owner`.
    async fn find_store_owned_by(&self, owner: UserId) -> Result<Option<Store>, RepositoryError>;

    /// Find the oldest active store on the deployment.
    async fn first_active_store(&self) -> Result<Option<Store>, RepositoryError>;
}

/// Owner-facing store management.
#[async_trait]
pub trait StoreManagement: Send + Sync {
    /// Insert a store.
    ///
    /// Returns [`RepositoryError::Conflict`] when the subdomain is taken.
    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError>;

    /// All stores owned by `owner`, active or not, oldest first.
    async fn list_stores_owned_by(&self, owner: UserId) -> Result<Vec<Store>, RepositoryError>;

    /// Fetch a store by id regardless of its activity flag.
    async fn get_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    /// Apply a display-attribute update.
    async fn update_store(&self, id: StoreId, update: &StoreUpdate)
    -> Result<Store, RepositoryError>;

    /// Soft-deactivate a store.
    async fn deactivate_store(&self, id: StoreId) -> Result<(), RepositoryError>;
}

/// Store-scoped catalog lookups consumed by checkout and public pages.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// A product of `store_id` that is visible to shoppers.
    async fn find_published_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<Option<Product>, RepositoryError>;

    /// A published product of `store_id` by slug.
    async fn find_published_product_by_slug(
        &self,
        store_id: StoreId,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError>;

    /// An active shipping class of `store_id`.
    async fn find_active_shipping_class(
        &self,
        store_id: StoreId,
        class_id: ShippingClassId,
    ) -> Result<Option<ShippingClass>, RepositoryError>;

    /// Published products of `store_id`, newest first.
    async fn list_published_products(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Active shipping classes of `store_id`, cheapest first.
    async fn list_active_shipping_classes(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ShippingClass>, RepositoryError>;
}

/// Owner-facing catalog management.
#[async_trait]
pub trait CatalogManagement: Send + Sync {
    /// All products of `store_id`, published or not, newest first.
    async fn list_products(&self, store_id: StoreId) -> Result<Vec<Product>, RepositoryError>;

    async fn get_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Insert a product, deriving a slug unique within the store.
    async fn create_product(
        &self,
        store_id: StoreId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError>;

    async fn update_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError>;

    /// Delete a product.
    ///
    /// Returns [`RepositoryError::Conflict`] when orders still reference it.
    async fn delete_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError>;

    /// All shipping classes of `store_id`, active or not.
    async fn list_shipping_classes(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ShippingClass>, RepositoryError>;

    async fn create_shipping_class(
        &self,
        store_id: StoreId,
        class: NewShippingClass,
    ) -> Result<ShippingClass, RepositoryError>;

    async fn deactivate_shipping_class(
        &self,
        store_id: StoreId,
        class_id: ShippingClassId,
    ) -> Result<(), RepositoryError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order and its items and decrement stock, all or nothing.
    ///
    /// Each decrement is conditional on sufficient stock at commit time.
    async fn commit_order(&self, order: NewOrder) -> Result<Order, CommitError>;

    /// Orders of `store_id`, newest first, optionally filtered by status.
    async fn list_orders(
        &self,
        store_id: StoreId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError>;

    async fn get_order(
        &self,
        store_id: StoreId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Set the status and, when given, replace the notes.
    async fn update_order(
        &self,
        store_id: StoreId,
        order_id: OrderId,
        status: OrderStatus,
        notes: Option<String>,
    ) -> Result<Order, RepositoryError>;
}

/// User accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Fetch the user with `phone`, creating it on first sight.
    async fn find_or_create_user_by_phone(&self, phone: &Phone) -> Result<User, RepositoryError>;
}

/// Everything the HTTP layer needs from the data store.
#[async_trait]
pub trait Backend:
    StoreDirectory + StoreManagement + CatalogGateway + CatalogManagement + OrderStore + UserDirectory
{
    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

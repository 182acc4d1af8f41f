//! `PostgreSQL` implementation of the data-access traits.

use async_trait::async_trait;
use sqlx::PgPool;

use bazaar_core::{OrderId, OrderStatus, Phone, ProductId, ShippingClassId, StoreId, UserId};

use super::{
    Backend, CatalogGateway, CatalogManagement, CatalogRepository, CommitError, OrderRepository,
    OrderStore, RepositoryError, StoreDirectory, StoreManagement, StoreRepository, UserDirectory,
    UserRepository,
};
use crate::models::{
    NewOrder, NewShippingClass, NewStore, Order, Product, ProductDraft, ProductUpdate,
    ShippingClass, Store, StoreUpdate, User,
};

/// Backend over a `PostgreSQL` connection pool.
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn stores(&self) -> StoreRepository<'_> {
        StoreRepository::new(&self.pool)
    }

    fn catalog(&self) -> CatalogRepository<'_> {
        CatalogRepository::new(&self.pool)
    }

    fn orders(&self) -> OrderRepository<'_> {
        OrderRepository::new(&self.pool)
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }
}

#[async_trait]
impl StoreDirectory for PgBackend {
    async fn find_active_store_by_subdomain(
        &self,
        subdomain: &str,
    ) -> Result<Option<Store>, RepositoryError> {
        self.stores().get_active_by_subdomain(subdomain).await
    }

    async fn find_store_owned_by(&self, owner: UserId) -> Result<Option<Store>, RepositoryError> {
        self.stores().get_first_owned_by(owner).await
    }

    async fn first_active_store(&self) -> Result<Option<Store>, RepositoryError> {
        self.stores().get_first_active().await
    }
}

#[async_trait]
impl StoreManagement for PgBackend {
    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError> {
        self.stores().create(&store).await
    }

    async fn list_stores_owned_by(&self, owner: UserId) -> Result<Vec<Store>, RepositoryError> {
        self.stores().list_owned_by(owner).await
    }

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        self.stores().get_by_id(id).await
    }

    async fn update_store(
        &self,
        id: StoreId,
        update: &StoreUpdate,
    ) -> Result<Store, RepositoryError> {
        self.stores().update(id, update).await
    }

    async fn deactivate_store(&self, id: StoreId) -> Result<(), RepositoryError> {
        self.stores().deactivate(id).await
    }
}

#[async_trait]
impl CatalogGateway for PgBackend {
    async fn find_published_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        self.catalog().get_product(store_id, product_id, true).await
    }

    async fn find_published_product_by_slug(
        &self,
        store_id: StoreId,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        self.catalog().get_published_by_slug(store_id, slug).await
    }

    async fn find_active_shipping_class(
        &self,
        store_id: StoreId,
        class_id: ShippingClassId,
    ) -> Result<Option<ShippingClass>, RepositoryError> {
        self.catalog()
            .get_shipping_class(store_id, class_id, true)
            .await
    }

    async fn list_published_products(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.catalog().list_products(store_id, true).await
    }

    async fn list_active_shipping_classes(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ShippingClass>, RepositoryError> {
        self.catalog().list_shipping_classes(store_id, true).await
    }
}

#[async_trait]
impl CatalogManagement for PgBackend {
    async fn list_products(&self, store_id: StoreId) -> Result<Vec<Product>, RepositoryError> {
        self.catalog().list_products(store_id, false).await
    }

    async fn get_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        self.catalog().get_product(store_id, product_id, false).await
    }

    async fn create_product(
        &self,
        store_id: StoreId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError> {
        self.catalog().create_product(store_id, draft).await
    }

    async fn update_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        self.catalog()
            .update_product(store_id, product_id, update)
            .await
    }

    async fn delete_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        self.catalog().delete_product(store_id, product_id).await
    }

    async fn list_shipping_classes(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ShippingClass>, RepositoryError> {
        self.catalog().list_shipping_classes(store_id, false).await
    }

    async fn create_shipping_class(
        &self,
        store_id: StoreId,
        class: NewShippingClass,
    ) -> Result<ShippingClass, RepositoryError> {
        self.catalog().create_shipping_class(store_id, &class).await
    }

    async fn deactivate_shipping_class(
        &self,
        store_id: StoreId,
        class_id: ShippingClassId,
    ) -> Result<(), RepositoryError> {
        self.catalog()
            .deactivate_shipping_class(store_id, class_id)
            .await
    }
}

#[async_trait]
impl OrderStore for PgBackend {
    async fn commit_order(&self, order: NewOrder) -> Result<Order, CommitError> {
        self.orders().commit(&order).await
    }

    async fn list_orders(
        &self,
        store_id: StoreId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        self.orders().list(store_id, status).await
    }

    async fn get_order(
        &self,
        store_id: StoreId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        self.orders().get(store_id, order_id).await
    }

    async fn update_order(
        &self,
        store_id: StoreId,
        order_id: OrderId,
        status: OrderStatus,
        notes: Option<String>,
    ) -> Result<Order, RepositoryError> {
        self.orders()
            .update(store_id, order_id, status, notes)
            .await
    }
}

#[async_trait]
impl UserDirectory for PgBackend {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.users().get_by_id(id).await
    }

    async fn find_or_create_user_by_phone(&self, phone: &Phone) -> Result<User, RepositoryError> {
        self.users().get_or_create_by_phone(phone).await
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

//! In-memory backend for tests.
//!
//! Mirrors the `PostgreSQL` semantics the rest of the crate relies on: unique
//! subdomains, per-store slugs and order numbers, store-scoped lookups, and
//! all-or-nothing order commits. A commit validates every decrement and then
//! applies all writes under one lock, so it can never be observed half done.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sqlx::types::Json;
use tokio::sync::Barrier;

use bazaar_core::{
    OrderId, OrderItemId, OrderStatus, Phone, ProductId, ShippingClassId, StoreId, UserId,
};

use super::{
    Backend, CatalogGateway, CatalogManagement, CommitError, OrderStore, RepositoryError,
    StoreDirectory, StoreManagement, UserDirectory,
};
use crate::models::product::{slugify, unique_slug};
use crate::models::{
    NewOrder, NewShippingClass, NewStore, Order, OrderItem, Product, ProductDraft, ProductUpdate,
    ShippingClass, Store, StoreUpdate, User,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    stores: BTreeMap<StoreId, Store>,
    products: BTreeMap<ProductId, Product>,
    shipping_classes: BTreeMap<ShippingClassId, ShippingClass>,
    orders: BTreeMap<OrderId, Order>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Thread-safe in-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<Mutex<Tables>>,
    fail_lookups: Arc<AtomicBool>,
    commit_gate: Arc<Mutex<Option<Arc<Barrier>>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make store directory lookups fail with a database error, to exercise
    /// degraded tenant resolution.
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Hold every order commit at `barrier` until enough commits arrive to
    /// release it, so concurrent orders reach the commit together.
    pub fn gate_commits(&self, barrier: Arc<Barrier>) {
        *self.commit_gate.lock() = Some(barrier);
    }

    /// Current stock of a product, if it exists.
    #[must_use]
    pub fn stock_of(&self, product_id: ProductId) -> Option<i32> {
        self.tables
            .lock()
            .products
            .get(&product_id)
            .map(|p| p.stock)
    }

    /// Number of committed orders across all stores.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.tables.lock().orders.len()
    }

    fn check_lookup(&self) -> Result<(), RepositoryError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreDirectory for MemoryBackend {
    async fn find_active_store_by_subdomain(
        &self,
        subdomain: &str,
    ) -> Result<Option<Store>, RepositoryError> {
        self.check_lookup()?;
        Ok(self
            .tables
            .lock()
            .stores
            .values()
            .find(|s| s.is_active && s.subdomain.as_str() == subdomain)
            .cloned())
    }

    async fn find_store_owned_by(&self, owner: UserId) -> Result<Option<Store>, RepositoryError> {
        self.check_lookup()?;
        Ok(self
            .tables
            .lock()
            .stores
            .values()
            .find(|s| s.is_active && s.owner_id == owner)
            .cloned())
    }

    async fn first_active_store(&self) -> Result<Option<Store>, RepositoryError> {
        self.check_lookup()?;
        Ok(self
            .tables
            .lock()
            .stores
            .values()
            .find(|s| s.is_active)
            .cloned())
    }
}

#[async_trait]
impl StoreManagement for MemoryBackend {
    async fn create_store(&self, new: NewStore) -> Result<Store, RepositoryError> {
        let mut tables = self.tables.lock();
        if tables.stores.values().any(|s| s.subdomain == new.subdomain) {
            return Err(RepositoryError::Conflict(
                "subdomain already taken".to_owned(),
            ));
        }
        if !tables.users.contains_key(&new.owner_id) {
            return Err(RepositoryError::Conflict("owner does not exist".to_owned()));
        }

        let id = StoreId::new(tables.next_id());
        let profile = new.profile;
        let store = Store {
            id,
            subdomain: new.subdomain,
            name: profile.name.trim().to_string(),
            name_bn: profile.name_bn,
            logo: profile.logo,
            brand_color: profile.brand_color,
            currency: profile.currency,
            phone: profile.phone,
            whatsapp: profile.whatsapp,
            facebook_pixel_id: profile.facebook_pixel_id,
            default_language: profile.default_language,
            is_active: true,
            owner_id: new.owner_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.stores.insert(id, store.clone());
        Ok(store)
    }

    async fn list_stores_owned_by(&self, owner: UserId) -> Result<Vec<Store>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .stores
            .values()
            .filter(|s| s.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        Ok(self.tables.lock().stores.get(&id).cloned())
    }

    async fn update_store(
        &self,
        id: StoreId,
        update: &StoreUpdate,
    ) -> Result<Store, RepositoryError> {
        let mut tables = self.tables.lock();
        let store = tables
            .stores
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        update.apply_to(store);
        store.updated_at = Some(Utc::now());
        Ok(store.clone())
    }

    async fn deactivate_store(&self, id: StoreId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock();
        let store = tables
            .stores
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        store.is_active = false;
        store.updated_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl CatalogGateway for MemoryBackend {
    async fn find_published_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .products
            .get(&product_id)
            .filter(|p| p.store_id == store_id && p.is_published)
            .cloned())
    }

    async fn find_published_product_by_slug(
        &self,
        store_id: StoreId,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .products
            .values()
            .find(|p| p.store_id == store_id && p.is_published && p.slug == slug)
            .cloned())
    }

    async fn find_active_shipping_class(
        &self,
        store_id: StoreId,
        class_id: ShippingClassId,
    ) -> Result<Option<ShippingClass>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .shipping_classes
            .get(&class_id)
            .filter(|c| c.store_id == store_id && c.is_active)
            .cloned())
    }

    async fn list_published_products(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<Product>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .products
            .values()
            .rev()
            .filter(|p| p.store_id == store_id && p.is_published)
            .cloned()
            .collect())
    }

    async fn list_active_shipping_classes(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ShippingClass>, RepositoryError> {
        let mut classes: Vec<ShippingClass> = self
            .tables
            .lock()
            .shipping_classes
            .values()
            .filter(|c| c.store_id == store_id && c.is_active)
            .cloned()
            .collect();
        classes.sort_by(|a, b| a.cost.cmp(&b.cost).then(a.id.cmp(&b.id)));
        Ok(classes)
    }
}

#[async_trait]
impl CatalogManagement for MemoryBackend {
    async fn list_products(&self, store_id: StoreId) -> Result<Vec<Product>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .products
            .values()
            .rev()
            .filter(|p| p.store_id == store_id)
            .cloned()
            .collect())
    }

    async fn get_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .products
            .get(&product_id)
            .filter(|p| p.store_id == store_id)
            .cloned())
    }

    async fn create_product(
        &self,
        store_id: StoreId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.lock();
        if !tables.stores.contains_key(&store_id) {
            return Err(RepositoryError::Conflict("store does not exist".to_owned()));
        }

        let slug = unique_slug(&slugify(&draft.title), |candidate| {
            tables
                .products
                .values()
                .any(|p| p.store_id == store_id && p.slug == candidate)
        });

        let id = ProductId::new(tables.next_id());
        let product = Product {
            id,
            store_id,
            title: draft.title,
            title_bn: draft.title_bn,
            description: draft.description,
            description_bn: draft.description_bn,
            slug,
            price: draft.price,
            discount_price: draft.discount_price,
            stock: draft.stock,
            images: Json(draft.images),
            is_published: draft.is_published,
            meta_title: draft.meta_title,
            meta_description: draft.meta_description,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.lock();
        let product = tables
            .products
            .get_mut(&product_id)
            .filter(|p| p.store_id == store_id)
            .ok_or(RepositoryError::NotFound)?;
        update.apply_to(product).map_err(RepositoryError::Invalid)?;
        product.updated_at = Some(Utc::now());
        Ok(product.clone())
    }

    async fn delete_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock();
        if !tables
            .products
            .get(&product_id)
            .is_some_and(|p| p.store_id == store_id)
        {
            return Err(RepositoryError::NotFound);
        }
        let referenced = tables
            .orders
            .values()
            .flat_map(|o| &o.items)
            .any(|item| item.product_id == product_id);
        if referenced {
            return Err(RepositoryError::Conflict(
                "product is referenced by orders".to_owned(),
            ));
        }
        tables.products.remove(&product_id);
        Ok(())
    }

    async fn list_shipping_classes(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<ShippingClass>, RepositoryError> {
        let mut classes: Vec<ShippingClass> = self
            .tables
            .lock()
            .shipping_classes
            .values()
            .filter(|c| c.store_id == store_id)
            .cloned()
            .collect();
        classes.sort_by(|a, b| a.cost.cmp(&b.cost).then(a.id.cmp(&b.id)));
        Ok(classes)
    }

    async fn create_shipping_class(
        &self,
        store_id: StoreId,
        class: NewShippingClass,
    ) -> Result<ShippingClass, RepositoryError> {
        let mut tables = self.tables.lock();
        if !tables.stores.contains_key(&store_id) {
            return Err(RepositoryError::Conflict("store does not exist".to_owned()));
        }
        let id = ShippingClassId::new(tables.next_id());
        let class = ShippingClass {
            id,
            store_id,
            name: class.name,
            name_bn: class.name_bn,
            cost: class.cost,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.shipping_classes.insert(id, class.clone());
        Ok(class)
    }

    async fn deactivate_shipping_class(
        &self,
        store_id: StoreId,
        class_id: ShippingClassId,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock();
        let class = tables
            .shipping_classes
            .get_mut(&class_id)
            .filter(|c| c.store_id == store_id)
            .ok_or(RepositoryError::NotFound)?;
        class.is_active = false;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryBackend {
    async fn commit_order(&self, order: NewOrder) -> Result<Order, CommitError> {
        let gate = self.commit_gate.lock().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }

        let mut tables = self.tables.lock();

        if tables
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(CommitError::OrderNumberCollision(order.order_number));
        }

        // Validate every decrement before touching anything
        let decrements = order.stock_decrements();
        for (&product_id, &quantity) in &decrements {
            let product = tables
                .products
                .get(&product_id)
                .filter(|p| p.store_id == order.store_id && p.is_published)
                .ok_or(CommitError::ProductUnavailable(product_id))?;
            if i64::from(product.stock) < quantity {
                return Err(CommitError::InsufficientStock(product_id));
            }
        }

        for (product_id, quantity) in decrements {
            if let Some(product) = tables.products.get_mut(&product_id) {
                product.stock = i32::try_from(i64::from(product.stock) - quantity).unwrap_or(0);
                product.updated_at = Some(Utc::now());
            }
        }

        let order_id = OrderId::new(tables.next_id());
        let items = order
            .lines
            .into_iter()
            .map(|line| OrderItem {
                id: OrderItemId::new(tables.next_id()),
                order_id,
                product_id: line.product_id,
                product_title: line.product_title,
                quantity: line.quantity,
                price: line.price,
                total: line.total,
            })
            .collect();

        let committed = Order {
            id: order_id,
            store_id: order.store_id,
            order_number: order.order_number,
            status: OrderStatus::Pending,
            customer: order.customer,
            shipping_class_id: order.shipping_class_id,
            subtotal: order.subtotal,
            shipping_cost: order.shipping_cost,
            total: order.total,
            notes: order.notes,
            created_at: Utc::now(),
            updated_at: None,
            items,
        };
        tables.orders.insert(order_id, committed.clone());
        Ok(committed)
    }

    async fn list_orders(
        &self,
        store_id: StoreId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .orders
            .values()
            .rev()
            .filter(|o| o.store_id == store_id && status.is_none_or(|s| o.status == s))
            .cloned()
            .collect())
    }

    async fn get_order(
        &self,
        store_id: StoreId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .orders
            .get(&order_id)
            .filter(|o| o.store_id == store_id)
            .cloned())
    }

    async fn update_order(
        &self,
        store_id: StoreId,
        order_id: OrderId,
        status: OrderStatus,
        notes: Option<String>,
    ) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.lock();
        let order = tables
            .orders
            .get_mut(&order_id)
            .filter(|o| o.store_id == store_id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = status;
        if notes.is_some() {
            order.notes = notes;
        }
        order.updated_at = Some(Utc::now());
        Ok(order.clone())
    }
}

#[async_trait]
impl UserDirectory for MemoryBackend {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables.lock().users.get(&id).cloned())
    }

    async fn find_or_create_user_by_phone(&self, phone: &Phone) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock();
        if let Some(user) = tables.users.values().find(|u| &u.phone == phone) {
            return Ok(user.clone());
        }
        let id = UserId::new(tables.next_id());
        let user = User {
            id,
            phone: phone.clone(),
            email: None,
            full_name: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_lookup()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use bazaar_core::{OrderNumber, Subdomain};

    use super::*;
    use crate::models::{CustomerDetails, NewOrderLine, StoreProfile};

    async fn seed() -> (MemoryBackend, Store, Product) {
        let backend = MemoryBackend::new();
        let owner = backend
            .find_or_create_user_by_phone(&Phone::parse("01700000001").unwrap())
            .await
            .unwrap();
        let store = backend
            .create_store(NewStore {
                owner_id: owner.id,
                subdomain: Subdomain::parse("shop1").unwrap(),
                profile: serde_json::from_str(r#"{"name": "Shop One"}"#).unwrap(),
            })
            .await
            .unwrap();
        let product = backend
            .create_product(
                store.id,
                serde_json::from_str(r#"{"title": "P1", "price": "100", "stock": 5}"#).unwrap(),
            )
            .await
            .unwrap();
        (backend, store, product)
    }

    fn new_order(store: &Store, product: &Product, quantity: i32) -> NewOrder {
        let total = product.price * Decimal::from(quantity);
        NewOrder {
            store_id: store.id,
            order_number: OrderNumber::generate(),
            customer: CustomerDetails {
                customer_name: "Karim".to_string(),
                customer_phone: Phone::parse("01800000000").unwrap(),
                customer_email: None,
                shipping_address: "Dhaka".to_string(),
                shipping_city: None,
                shipping_postal: None,
            },
            shipping_class_id: None,
            subtotal: total,
            shipping_cost: Decimal::ZERO,
            total,
            notes: None,
            lines: vec![NewOrderLine {
                product_id: product.id,
                product_title: product.title.clone(),
                quantity,
                price: product.price,
                total,
            }],
        }
    }

    #[tokio::test]
    async fn test_duplicate_subdomain_conflicts() {
        let (backend, store, _) = seed().await;
        let profile: StoreProfile = serde_json::from_str(r#"{"name": "Again"}"#).unwrap();
        let result = backend
            .create_store(NewStore {
                owner_id: store.owner_id,
                subdomain: store.subdomain.clone(),
                profile,
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_commit_decrements_stock() {
        let (backend, store, product) = seed().await;
        let order = backend
            .commit_order(new_order(&store, &product, 3))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(backend.stock_of(product.id), Some(2));
    }

    #[tokio::test]
    async fn test_commit_rejects_overdraw_without_writes() {
        let (backend, store, product) = seed().await;
        let result = backend
            .commit_order(new_order(&store, &product, 6))
            .await;
        assert!(matches!(result, Err(CommitError::InsufficientStock(id)) if id == product.id));
        assert_eq!(backend.stock_of(product.id), Some(5));
        assert_eq!(backend.order_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_rejects_reused_order_number() {
        let (backend, store, product) = seed().await;
        let first = new_order(&store, &product, 1);
        let mut second = new_order(&store, &product, 1);
        second.order_number = first.order_number.clone();

        backend.commit_order(first).await.unwrap();
        let result = backend.commit_order(second).await;
        assert!(matches!(result, Err(CommitError::OrderNumberCollision(_))));
        assert_eq!(backend.stock_of(product.id), Some(4));
    }

    #[tokio::test]
    async fn test_slugs_are_unique_per_store() {
        let (backend, store, product) = seed().await;
        let again = backend
            .create_product(
                store.id,
                serde_json::from_str(r#"{"title": "P1", "price": "5"}"#).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(product.slug, "p1");
        assert_eq!(again.slug, "p1-2");
    }

    #[tokio::test]
    async fn test_delete_referenced_product_conflicts() {
        let (backend, store, product) = seed().await;
        backend
            .commit_order(new_order(&store, &product, 1))
            .await
            .unwrap();
        let result = backend.delete_product(store.id, product.id).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_failed_lookups() {
        let (backend, _, _) = seed().await;
        backend.set_fail_lookups(true);
        assert!(backend.find_active_store_by_subdomain("shop1").await.is_err());
        backend.set_fail_lookups(false);
        assert!(
            backend
                .find_active_store_by_subdomain("shop1")
                .await
                .unwrap()
                .is_some()
        );
    }
}

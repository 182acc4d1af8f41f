//! Order fulfillment: validate a cart against live inventory, price it, and
//! commit the order with its stock decrements as one unit.

use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{OrderId, OrderNumber, OrderStatus, ProductId, UserId};

use crate::db::{CatalogGateway, CommitError, OrderStore, RepositoryError};
use crate::models::{NewOrder, NewOrderLine, Order, OrderRequest, Product, Store, TenantContext};

/// How many order numbers are tried before giving up on a commit.
pub const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// Largest amount a money column (`NUMERIC(12, 2)`) can hold.
// 9_999_999_999.99 (mantissa 999_999_999_999 = 0xE8_D4A5_0FFF, scale 2); `Decimal::new` is not const.
pub const MAX_ORDER_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Errors from order fulfillment and owner order operations.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The request did not resolve to a store.
    #[error("a store context is required")]
    StoreContextRequired,

    /// The request is malformed (empty cart, bad quantity, ...).
    #[error("invalid order request: {0}")]
    InvalidRequest(String),

    /// The product is missing, unpublished, or belongs to another store.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Less stock than requested.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    /// The order does not exist in the resolved store.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The caller does not own the resolved store.
    #[error("only the store owner may manage its orders")]
    Forbidden,

    /// Every generated order number was already taken.
    #[error("could not allocate a unique order number, last tried {0}")]
    OrderNumberCollision(OrderNumber),

    /// Storage failed; nothing was written.
    #[error("order fulfillment failed")]
    Failed(#[from] RepositoryError),
}

/// Order operations over a catalog and an order store.
pub struct OrderFulfillment<'a, B: ?Sized> {
    backend: &'a B,
    generate_number: fn() -> OrderNumber,
}

impl<'a, B> OrderFulfillment<'a, B>
where
    B: CatalogGateway + OrderStore + ?Sized,
{
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            generate_number: OrderNumber::generate,
        }
    }

    /// Replace the order number generator.
    #[must_use]
    pub fn with_number_generator(mut self, generate_number: fn() -> OrderNumber) -> Self {
        self.generate_number = generate_number;
        self
    }

    /// Validate, price, and commit a checkout request for the resolved store.
    ///
    /// All checks run before any write. The stock check here is advisory; the
    /// commit re-checks each product with a conditional decrement, so a
    /// concurrent order that drained stock in the meantime still fails with
    /// [`FulfillmentError::InsufficientStock`].
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::StoreContextRequired` if no store is resolved.
    /// Returns `FulfillmentError::InvalidRequest` for an empty cart or bad quantities.
    /// Returns `FulfillmentError::ProductNotFound` for missing, unpublished or foreign products.
    /// Returns `FulfillmentError::InsufficientStock` if a product cannot cover the request.
    /// Returns `FulfillmentError::OrderNumberCollision` if every order number attempt collided.
    /// Returns `FulfillmentError::Failed` if storage fails.
    #[instrument(skip_all, fields(store_id, order_number))]
    pub async fn create_order(
        &self,
        tenant: &TenantContext,
        request: OrderRequest,
    ) -> Result<Order, FulfillmentError> {
        let store = tenant
            .store()
            .ok_or(FulfillmentError::StoreContextRequired)?;
        tracing::Span::current().record("store_id", store.id.as_i64());

        request
            .validate()
            .map_err(FulfillmentError::InvalidRequest)?;

        let products = self.load_products(store, &request).await?;

        for (product_id, wanted) in request.demand() {
            let available = products
                .get(&product_id)
                .map_or(0, |product| i64::from(product.stock));
            if wanted > available {
                return Err(FulfillmentError::InsufficientStock(product_id));
            }
        }

        let mut lines = Vec::with_capacity(request.items.len());
        let mut subtotal = Decimal::ZERO;
        for line in &request.items {
            let product = products
                .get(&line.product_id)
                .ok_or(FulfillmentError::ProductNotFound(line.product_id))?;
            let price = product.effective_price();
            let total = within_limit(price.checked_mul(Decimal::from(line.quantity)))?;
            subtotal = within_limit(subtotal.checked_add(total))?;
            lines.push(NewOrderLine {
                product_id: product.id,
                product_title: product.title.clone(),
                quantity: line.quantity,
                price,
                total,
            });
        }

        let (shipping_class_id, shipping_cost) = match request.shipping_class_id {
            Some(class_id) => match self
                .backend
                .find_active_shipping_class(store.id, class_id)
                .await?
            {
                Some(class) => (Some(class.id), class.cost),
                None => {
                    tracing::info!(
                        shipping_class_id = %class_id,
                        "Shipping class not active in store, charging no shipping"
                    );
                    (None, Decimal::ZERO)
                }
            },
            None => (None, Decimal::ZERO),
        };

        let total = within_limit(subtotal.checked_add(shipping_cost))?;

        let notes = request.notes.filter(|n| !n.trim().is_empty());
        let mut pending = NewOrder {
            store_id: store.id,
            order_number: (self.generate_number)(),
            customer: request.customer,
            shipping_class_id,
            subtotal,
            shipping_cost,
            total,
            notes,
            lines,
        };

        let mut attempt = 1;
        loop {
            match self.backend.commit_order(pending.clone()).await {
                Ok(order) => {
                    tracing::Span::current().record("order_number", order.order_number.as_str());
                    tracing::info!(
                        order_id = %order.id,
                        total = %order.total,
                        items = order.items.len(),
                        "Order created"
                    );
                    return Ok(order);
                }
                Err(CommitError::OrderNumberCollision(number)) => {
                    if attempt >= MAX_ORDER_NUMBER_ATTEMPTS {
                        tracing::error!(order_number = %number, attempt, "Order number collisions exhausted retries");
                        return Err(FulfillmentError::OrderNumberCollision(number));
                    }
                    tracing::warn!(order_number = %number, attempt, "Order number collision, regenerating");
                    attempt += 1;
                    pending.order_number = (self.generate_number)();
                }
                Err(CommitError::InsufficientStock(product_id)) => {
                    tracing::info!(product_id = %product_id, "Stock ran out before commit");
                    return Err(FulfillmentError::InsufficientStock(product_id));
                }
                Err(CommitError::ProductUnavailable(product_id)) => {
                    return Err(FulfillmentError::ProductNotFound(product_id));
                }
                Err(CommitError::Repository(e)) => return Err(FulfillmentError::Failed(e)),
            }
        }
    }

    /// Fetch every distinct product of the request from the store's
    /// published catalog.
    async fn load_products(
        &self,
        store: &Store,
        request: &OrderRequest,
    ) -> Result<HashMap<ProductId, Product>, FulfillmentError> {
        let mut products = HashMap::with_capacity(request.items.len());
        for line in &request.items {
            if products.contains_key(&line.product_id) {
                continue;
            }
            let product = self
                .backend
                .find_published_product(store.id, line.product_id)
                .await?
                .ok_or(FulfillmentError::ProductNotFound(line.product_id))?;
            products.insert(line.product_id, product);
        }
        Ok(products)
    }

    /// Set an order's status and optionally replace its notes.
    ///
    /// Any status may follow any other. Moves that leave the forward lifecycle
    /// (going backwards, or leaving a terminal status) are applied but logged.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::StoreContextRequired` if no store is resolved.
    /// Returns `FulfillmentError::Forbidden` if `owner` does not own the store.
    /// Returns `FulfillmentError::OrderNotFound` if the order is not in the store.
    /// Returns `FulfillmentError::Failed` if storage fails.
    #[instrument(skip(self, tenant, notes), fields(store_id))]
    pub async fn update_order_status(
        &self,
        tenant: &TenantContext,
        owner: UserId,
        order_id: OrderId,
        status: OrderStatus,
        notes: Option<String>,
    ) -> Result<Order, FulfillmentError> {
        let store = owned_store(tenant, owner)?;
        tracing::Span::current().record("store_id", store.id.as_i64());

        let current = self
            .backend
            .get_order(store.id, order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;

        if !current.status.follows_lifecycle(status) {
            tracing::warn!(
                order_number = %current.order_number,
                from = %current.status,
                to = %status,
                "Order status change outside the usual lifecycle"
            );
        }

        let notes = notes.filter(|n| !n.trim().is_empty());
        let order = self
            .backend
            .update_order(store.id, order_id, status, notes)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => FulfillmentError::OrderNotFound(order_id),
                other => FulfillmentError::Failed(other),
            })?;

        tracing::info!(order_number = %order.order_number, status = %order.status, "Order updated");
        Ok(order)
    }

    /// Orders of the owner's resolved store, newest first.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::StoreContextRequired` if no store is resolved.
    /// Returns `FulfillmentError::Forbidden` if `owner` does not own the store.
    /// Returns `FulfillmentError::Failed` if storage fails.
    pub async fn list_orders(
        &self,
        tenant: &TenantContext,
        owner: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, FulfillmentError> {
        let store = owned_store(tenant, owner)?;
        Ok(self.backend.list_orders(store.id, status).await?)
    }

    /// One order of the owner's resolved store.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError::StoreContextRequired` if no store is resolved.
    /// Returns `FulfillmentError::Forbidden` if `owner` does not own the store.
    /// Returns `FulfillmentError::OrderNotFound` if the order is not in the store.
    /// Returns `FulfillmentError::Failed` if storage fails.
    pub async fn get_order(
        &self,
        tenant: &TenantContext,
        owner: UserId,
        order_id: OrderId,
    ) -> Result<Order, FulfillmentError> {
        let store = owned_store(tenant, owner)?;
        self.backend
            .get_order(store.id, order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))
    }
}

/// Reject amounts that overflowed or do not fit a money column.
fn within_limit(amount: Option<Decimal>) -> Result<Decimal, FulfillmentError> {
    amount
        .filter(|amount| *amount <= MAX_ORDER_AMOUNT)
        .ok_or_else(|| {
            FulfillmentError::InvalidRequest(format!("order total exceeds {MAX_ORDER_AMOUNT}"))
        })
}

fn owned_store(tenant: &TenantContext, owner: UserId) -> Result<&Store, FulfillmentError> {
    let store = tenant
        .store()
        .ok_or(FulfillmentError::StoreContextRequired)?;
    if !store.is_owned_by(owner) {
        return Err(FulfillmentError::Forbidden);
    }
    Ok(store)
}

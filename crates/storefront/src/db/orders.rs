//! Order repository: atomic order commits and owner queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use bazaar_core::{OrderId, OrderNumber, OrderStatus, Phone, ProductId, ShippingClassId, StoreId};

use super::{CommitError, RepositoryError};
use crate::models::{CustomerDetails, NewOrder, Order, OrderItem};

/// Name of the unique constraint on `orders.order_number`.
const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

const ORDER_COLUMNS: &str = "id, store_id, order_number, status, customer_name, customer_phone, \
     customer_email, shipping_address, shipping_city, shipping_postal, shipping_class_id, \
     subtotal, shipping_cost, total, notes, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_title, quantity, price, total";

/// Raw `orders` row before items are attached.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    store_id: StoreId,
    order_number: OrderNumber,
    status: OrderStatus,
    customer_name: String,
    customer_phone: String,
    customer_email: Option<String>,
    shipping_address: String,
    shipping_city: Option<String>,
    shipping_postal: Option<String>,
    shipping_class_id: Option<ShippingClassId>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let customer_phone = Phone::parse(&self.customer_phone).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid customer phone on order {}: {e}",
                self.id
            ))
        })?;

        Ok(Order {
            id: self.id,
            store_id: self.store_id,
            order_number: self.order_number,
            status: self.status,
            customer: CustomerDetails {
                customer_name: self.customer_name,
                customer_phone,
                customer_email: self.customer_email,
                shipping_address: self.shipping_address,
                shipping_city: self.shipping_city,
                shipping_postal: self.shipping_postal,
            },
            shipping_class_id: self.shipping_class_id,
            subtotal: self.subtotal,
            shipping_cost: self.shipping_cost,
            total: self.total,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Commit an order in one transaction: decrement stock for every product,
    /// insert the order row, and insert one item per line.
    ///
    /// Each decrement only applies while the product is still published in the
    /// order's store and holds enough stock, so concurrent commits can never
    /// drive stock below zero. Any failure drops the transaction, which rolls
    /// back every write made so far.
    ///
    /// # Errors
    ///
    /// Returns `CommitError::InsufficientStock` if a product has less stock than ordered.
    /// Returns `CommitError::ProductUnavailable` if a product is gone or unpublished.
    /// Returns `CommitError::OrderNumberCollision` if the order number is taken.
    /// Returns `CommitError::Repository` for other database errors.
    pub async fn commit(&self, order: &NewOrder) -> Result<Order, CommitError> {
        let mut tx = self.pool.begin().await?;

        // Ascending product id order keeps row locks consistent across commits
        for (product_id, quantity) in order.stock_decrements() {
            decrement_stock(&mut tx, order.store_id, product_id, quantity).await?;
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders (store_id, order_number, status, customer_name, customer_phone, \
                                 customer_email, shipping_address, shipping_city, shipping_postal, \
                                 shipping_class_id, subtotal, shipping_cost, total, notes) \
             VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.store_id)
        .bind(&order.order_number)
        .bind(&order.customer.customer_name)
        .bind(&order.customer.customer_phone)
        .bind(&order.customer.customer_email)
        .bind(&order.customer.shipping_address)
        .bind(&order.customer.shipping_city)
        .bind(&order.customer.shipping_postal)
        .bind(order.shipping_class_id)
        .bind(order.subtotal)
        .bind(order.shipping_cost)
        .bind(order.total)
        .bind(&order.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(ORDER_NUMBER_CONSTRAINT)
            {
                return CommitError::OrderNumberCollision(order.order_number.clone());
            }
            CommitError::from(e)
        })?;

        let mut items = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let item = sqlx::query_as::<_, OrderItem>(&format!(
                "INSERT INTO order_items (order_id, product_id, product_title, quantity, price, total) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING {ITEM_COLUMNS}"
            ))
            .bind(row.id)
            .bind(line.product_id)
            .bind(&line.product_title)
            .bind(line.quantity)
            .bind(line.price)
            .bind(line.total)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;

        Ok(row.into_order(items)?)
    }

    /// List orders of a store, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored phone number is invalid.
    pub async fn list(
        &self,
        store_id: StoreId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE store_id = $1 AND ($2::order_status IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(store_id)
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.id.as_i64()).collect();
        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;
        for item in items {
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }

    /// Get one order of a store with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored phone number is invalid.
    pub async fn get(
        &self,
        store_id: StoreId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, store_id, order_id).await
    }

    /// Set the status (and optionally the notes) of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist in the store.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        store_id: StoreId,
        order_id: OrderId,
        status: OrderStatus,
        notes: Option<String>,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET status = $3, notes = COALESCE($4, notes), updated_at = NOW() \
             WHERE id = $1 AND store_id = $2",
        )
        .bind(order_id)
        .bind(store_id)
        .bind(status)
        .bind(notes)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let order = fetch_order(&mut tx, store_id, order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(order)
    }
}

/// Conditionally take `quantity` units of a product.
async fn decrement_stock(
    conn: &mut PgConnection,
    store_id: StoreId,
    product_id: ProductId,
    quantity: i64,
) -> Result<(), CommitError> {
    let quantity =
        i32::try_from(quantity).map_err(|_| CommitError::InsufficientStock(product_id))?;

    let result = sqlx::query(
        "UPDATE products SET stock = stock - $3, updated_at = NOW() \
         WHERE id = $1 AND store_id = $2 AND is_published AND stock >= $3",
    )
    .bind(product_id)
    .bind(store_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let still_listed: Option<bool> = sqlx::query_scalar(
        "SELECT TRUE FROM products WHERE id = $1 AND store_id = $2 AND is_published",
    )
    .bind(product_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Err(if still_listed.is_some() {
        CommitError::InsufficientStock(product_id)
    } else {
        CommitError::ProductUnavailable(product_id)
    })
}

async fn fetch_order(
    conn: &mut PgConnection,
    store_id: StoreId,
    order_id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let Some(row) = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND store_id = $2"
    ))
    .bind(order_id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?
    else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    row.into_order(items).map(Some)
}

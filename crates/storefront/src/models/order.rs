//! Order domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{
    OrderId, OrderItemId, OrderNumber, OrderStatus, Phone, ProductId, ShippingClassId, StoreId,
};

/// Customer contact and delivery details captured at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub customer_name: String,
    pub customer_phone: Phone,
    pub customer_email: Option<String>,
    pub shipping_address: String,
    pub shipping_city: Option<String>,
    pub shipping_postal: Option<String>,
}

impl CustomerDetails {
    fn validate(&self) -> Result<(), String> {
        if self.customer_name.trim().is_empty() {
            return Err("customer name cannot be empty".to_string());
        }
        if self.shipping_address.trim().is_empty() {
            return Err("shipping address cannot be empty".to_string());
        }
        if let Some(email) = &self.customer_email
            && !email.contains('@')
        {
            return Err(format!("invalid customer email: {email}"));
        }
        Ok(())
    }
}

/// One requested line of a cart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A checkout request as submitted by a shopper.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    #[serde(flatten)]
    pub customer: CustomerDetails,
    pub shipping_class_id: Option<ShippingClassId>,
    pub items: Vec<OrderLineRequest>,
    pub notes: Option<String>,
}

impl OrderRequest {
    /// Shape checks that need no data access.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.items.is_empty() {
            return Err("order must contain at least one item".to_string());
        }
        if let Some(line) = self.items.iter().find(|line| line.quantity < 1) {
            return Err(format!(
                "quantity for product {} must be at least 1",
                line.product_id
            ));
        }
        self.customer.validate()
    }

    /// Total requested quantity per product, summed across duplicate lines.
    #[must_use]
    pub fn demand(&self) -> BTreeMap<ProductId, i64> {
        total_per_product(self.items.iter().map(|l| (l.product_id, l.quantity)))
    }
}

/// A persisted order with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub store_id: StoreId,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    #[serde(flatten)]
    pub customer: CustomerDetails,
    pub shipping_class_id: Option<ShippingClassId>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
}

/// A snapshot of one product as it was sold.
///
/// Title and unit price are copied at order time and never follow later
/// catalog edits.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_title: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

/// A fully priced order ready to be committed.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub store_id: StoreId,
    pub order_number: OrderNumber,
    pub customer: CustomerDetails,
    pub shipping_class_id: Option<ShippingClassId>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    /// Stock to decrement per product, ordered by product id.
    ///
    /// Writers lock products in this order so concurrent commits touching the
    /// same products cannot deadlock.
    #[must_use]
    pub fn stock_decrements(&self) -> BTreeMap<ProductId, i64> {
        total_per_product(self.lines.iter().map(|l| (l.product_id, l.quantity)))
    }
}

/// A priced line of a [`NewOrder`].
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub product_title: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

fn total_per_product(lines: impl Iterator<Item = (ProductId, i32)>) -> BTreeMap<ProductId, i64> {
    let mut totals = BTreeMap::new();
    for (product_id, quantity) in lines {
        *totals.entry(product_id).or_insert(0) += i64::from(quantity);
    }
    totals
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(items: &str) -> OrderRequest {
        serde_json::from_str(&format!(
            r#"{{
                "customer_name": "Rahim",
                "customer_phone": "01711-000000",
                "shipping_address": "House 1, Road 2",
                "items": {items}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_request_deserializes_flattened_customer() {
        let req = request(r#"[{"product_id": 7, "quantity": 2}]"#);
        assert_eq!(req.customer.customer_name, "Rahim");
        assert_eq!(req.customer.customer_phone.as_str(), "01711000000");
        assert!(req.shipping_class_id.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_rejects_empty_cart() {
        assert!(request("[]").validate().is_err());
    }

    #[test]
    fn test_request_rejects_non_positive_quantity() {
        assert!(
            request(r#"[{"product_id": 7, "quantity": 0}]"#)
                .validate()
                .is_err()
        );
        assert!(
            request(r#"[{"product_id": 7, "quantity": -2}]"#)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_demand_merges_duplicate_products() {
        let req = request(
            r#"[{"product_id": 7, "quantity": 2},
                {"product_id": 3, "quantity": 1},
                {"product_id": 7, "quantity": 4}]"#,
        );
        let demand: Vec<_> = req.demand().into_iter().collect();
        assert_eq!(
            demand,
            vec![(ProductId::new(3), 1), (ProductId::new(7), 6)]
        );
    }
}

//! Shipping class types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{ShippingClassId, StoreId};

/// A flat-rate shipping option offered by one store.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShippingClass {
    pub id: ShippingClassId,
    pub store_id: StoreId,
    pub name: String,
    pub name_bn: Option<String>,
    pub cost: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a shipping class.
#[derive(Debug, Clone, Deserialize)]
pub struct NewShippingClass {
    pub name: String,
    pub name_bn: Option<String>,
    pub cost: Decimal,
}

impl NewShippingClass {
    /// Check field values and round the cost to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn normalize(mut self) -> Result<Self, String> {
        if self.name.trim().is_empty() {
            return Err("shipping class name cannot be empty".to_string());
        }
        if self.cost.is_sign_negative() {
            return Err("shipping cost cannot be negative".to_string());
        }
        self.name = self.name.trim().to_string();
        self.cost = self.cost.round_dp(2);
        Ok(self)
    }
}

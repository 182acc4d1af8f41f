//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Phone, UserId};

/// A platform user. Store owners are users; shoppers are not.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Phone number used for OTP login.
    pub phone: Phone,
    /// Optional contact email.
    pub email: Option<String>,
    /// Optional display name.
    pub full_name: Option<String>,
    /// Inactive users cannot log in.
    pub is_active: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: Option<DateTime<Utc>>,
}

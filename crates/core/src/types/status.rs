//! Order status enum.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Every order is created as [`OrderStatus::Pending`]. Store owners may set any
/// status afterwards; [`OrderStatus::follows_lifecycle`] reports whether a
/// change matches the forward lifecycle
/// `pending -> confirmed -> processing -> shipped -> delivered` with
/// cancellation from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Wire and database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further lifecycle step exists.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    const fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Processing => Some(2),
            Self::Shipped => Some(3),
            Self::Delivered => Some(4),
            Self::Cancelled => None,
        }
    }

    /// Whether moving from `self` to `next` matches the forward lifecycle.
    ///
    /// Staying in the same status counts as following the lifecycle.
    #[must_use]
    pub const fn follows_lifecycle(self, next: Self) -> bool {
        if self.is_terminal() {
            return matches!(
                (self, next),
                (Self::Delivered, Self::Delivered) | (Self::Cancelled, Self::Cancelled)
            );
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to >= from,
            // Cancellation from any non-terminal state
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

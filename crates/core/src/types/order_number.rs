//! Customer-facing order numbers.

use core::fmt;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A globally unique, shareable order reference such as
/// `ORD3F9A1C0B7E2D1767225600`.
///
/// Layout: the `ORD` prefix, 12 uppercase hex characters (48 random bits), then
/// the Unix timestamp in seconds. No central sequence is involved; uniqueness is
/// backed by a unique index on `orders.order_number`, and a collision is reported
/// by the storage layer so the caller can regenerate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Prefix shared by every generated order number.
    pub const PREFIX: &'static str = "ORD";

    /// Generate a fresh order number from the thread-local RNG and the clock.
    #[must_use]
    pub fn generate() -> Self {
        let token: u64 = rand::rng().random::<u64>() & 0xFFFF_FFFF_FFFF;
        Self(format!(
            "{}{token:012X}{}",
            Self::PREFIX,
            Utc::now().timestamp()
        ))
    }

    /// Wrap an existing order number (e.g. read back from storage).
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generate_layout() {
        let number = OrderNumber::generate();
        let s = number.as_str();

        assert!(s.starts_with("ORD"));
        let token = s.get(3..15).unwrap_or_default();
        assert_eq!(token.len(), 12);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
        let timestamp = s.get(15..).unwrap_or_default();
        assert!(!timestamp.is_empty());
        assert!(timestamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_fits_column() {
        assert!(OrderNumber::generate().as_str().len() <= 50);
    }

    #[test]
    fn test_generate_100k_without_duplicates() {
        let mut seen = HashSet::with_capacity(100_000);
        for _ in 0..100_000 {
            assert!(seen.insert(OrderNumber::generate()));
        }
    }
}

//! Store subdomain type.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::host::RESERVED_SUBDOMAINS;

/// Errors that can occur when parsing a [`Subdomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubdomainError {
    /// The input is shorter than the minimum length.
    #[error("subdomain must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input is longer than the maximum length.
    #[error("subdomain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[a-z0-9-]`.
    #[error("subdomain contains invalid character {0:?}")]
    InvalidCharacter(char),
    /// The input starts or ends with a hyphen.
    #[error("subdomain cannot start or end with a hyphen")]
    EdgeHyphen,
    /// The input is a reserved name.
    #[error("subdomain {0:?} is reserved")]
    Reserved(String),
}

/// A store's claimed subdomain.
///
/// ## Constraints
///
/// - Length: 3-50 characters
/// - Characters: lowercase ASCII letters, digits, and hyphens
/// - Hyphens only in the interior
/// - Not one of the reserved names (`api`, `admin`, `www`)
///
/// A subdomain is immutable once claimed and unique across all stores; the
/// uniqueness half of that is enforced by the database.
///
/// ## Examples
///
/// ```
/// use bazaar_core::Subdomain;
///
/// assert!(Subdomain::parse("shop1").is_ok());
/// assert!(Subdomain::parse("dhaka-tea-house").is_ok());
///
/// assert!(Subdomain::parse("ab").is_err());      // too short
/// assert!(Subdomain::parse("-shop").is_err());   // edge hyphen
/// assert!(Subdomain::parse("Shop").is_err());    // uppercase
/// assert!(Subdomain::parse("admin").is_err());   // reserved
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Subdomain(String);

impl Subdomain {
    /// Minimum length of a subdomain.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum length of a subdomain.
    pub const MAX_LENGTH: usize = 50;

    /// Parse a `Subdomain` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input violates any of the constraints listed on
    /// the type.
    pub fn parse(s: &str) -> Result<Self, SubdomainError> {
        if s.len() < Self::MIN_LENGTH {
            return Err(SubdomainError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(SubdomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(SubdomainError::InvalidCharacter(c));
        }

        if s.starts_with('-') || s.ends_with('-') {
            return Err(SubdomainError::EdgeHyphen);
        }

        if s == "www" || RESERVED_SUBDOMAINS.contains(&s) {
            return Err(SubdomainError::Reserved(s.to_owned()));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the subdomain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Subdomain` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Subdomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Subdomain {
    type Err = SubdomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Subdomain {
    type Error = SubdomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Subdomain> for String {
    fn from(value: Subdomain) -> Self {
        value.0
    }
}

impl AsRef<str> for Subdomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Subdomain {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Subdomain {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Guarded by a CHECK constraint on stores.subdomain
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Subdomain {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

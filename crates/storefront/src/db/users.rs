//! User repository for database operations.

use sqlx::PgPool;

use bazaar_core::{Phone, UserId};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str = "id, phone, email, full_name, is_active, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get the user with a phone number, creating it when absent.
    ///
    /// The upsert is a single statement, so two concurrent first logins for
    /// the same phone both end up with the same row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create_by_phone(&self, phone: &Phone) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (phone) VALUES ($1) \
             ON CONFLICT (phone) DO UPDATE SET phone = EXCLUDED.phone \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(phone)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }
}

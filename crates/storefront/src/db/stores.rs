//! Store repository for database operations.

use sqlx::PgPool;

use bazaar_core::{StoreId, UserId};

use super::RepositoryError;
use crate::models::{NewStore, Store, StoreUpdate};

const STORE_COLUMNS: &str = "id, subdomain, name, name_bn, logo, brand_color, currency, phone, \
     whatsapp, facebook_pixel_id, default_language, is_active, owner_id, created_at, updated_at";

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an active store by subdomain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_subdomain(
        &self,
        subdomain: &str,
    ) -> Result<Option<Store>, RepositoryError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE subdomain = $1 AND is_active"
        ))
        .bind(subdomain)
        .fetch_optional(self.pool)
        .await?;

        Ok(store)
    }

    /// Get the oldest active store owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_first_owned_by(&self, owner: UserId) -> Result<Option<Store>, RepositoryError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores \
             WHERE owner_id = $1 AND is_active \
             ORDER BY id LIMIT 1"
        ))
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        Ok(store)
    }

    /// Get the oldest active store on the deployment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_first_active(&self) -> Result<Option<Store>, RepositoryError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE is_active ORDER BY id LIMIT 1"
        ))
        .fetch_optional(self.pool)
        .await?;

        Ok(store)
    }

    /// Get a store by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(store)
    }

    /// List every store owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_owned_by(&self, owner: UserId) -> Result<Vec<Store>, RepositoryError> {
        let stores = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        Ok(stores)
    }

    /// Create a new store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the subdomain is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewStore) -> Result<Store, RepositoryError> {
        let profile = &new.profile;
        sqlx::query_as::<_, Store>(&format!(
            "INSERT INTO stores (subdomain, name, name_bn, logo, brand_color, currency, phone, \
                                 whatsapp, facebook_pixel_id, default_language, owner_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(&new.subdomain)
        .bind(profile.name.trim())
        .bind(&profile.name_bn)
        .bind(&profile.logo)
        .bind(&profile.brand_color)
        .bind(&profile.currency)
        .bind(&profile.phone)
        .bind(&profile.whatsapp)
        .bind(&profile.facebook_pixel_id)
        .bind(&profile.default_language)
        .bind(new.owner_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_violation(e, "subdomain already taken"))
    }

    /// Update display attributes of a store.
    ///
    /// Reads the row under `FOR UPDATE`, merges the change, and writes it back
    /// in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: StoreId, update: &StoreUpdate) -> Result<Store, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        update.apply_to(&mut store);

        let store = sqlx::query_as::<_, Store>(&format!(
            "UPDATE stores SET name = $2, name_bn = $3, logo = $4, brand_color = $5, \
                 currency = $6, phone = $7, whatsapp = $8, facebook_pixel_id = $9, \
                 default_language = $10, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(id)
        .bind(&store.name)
        .bind(&store.name_bn)
        .bind(&store.logo)
        .bind(&store.brand_color)
        .bind(&store.currency)
        .bind(&store.phone)
        .bind(&store.whatsapp)
        .bind(&store.facebook_pixel_id)
        .bind(&store.default_language)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(store)
    }

    /// Mark a store inactive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn deactivate(&self, id: StoreId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE stores SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

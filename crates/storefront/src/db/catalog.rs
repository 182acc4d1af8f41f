//! Catalog repository: products and shipping classes.
//!
//! Every query is scoped by `store_id`; a product id alone never reaches
//! another tenant's catalog.

use sqlx::PgPool;
use sqlx::types::Json;

use bazaar_core::{ProductId, ShippingClassId, StoreId};

use super::RepositoryError;
use crate::models::product::{slugify, unique_slug};
use crate::models::{NewShippingClass, Product, ProductDraft, ProductUpdate, ShippingClass};

const PRODUCT_COLUMNS: &str = "id, store_id, title, title_bn, description, description_bn, slug, \
     price, discount_price, stock, images, is_published, meta_title, meta_description, \
     created_at, updated_at";

const SHIPPING_COLUMNS: &str = "id, store_id, name, name_bn, cost, is_active, created_at";

/// Repository for catalog database operations.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Get a product of a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
        published_only: bool,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE id = $1 AND store_id = $2 AND (is_published OR NOT $3)"
        ))
        .bind(product_id)
        .bind(store_id)
        .bind(published_only)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Get a published product of a store by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_published_by_slug(
        &self,
        store_id: StoreId,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE store_id = $1 AND slug = $2 AND is_published"
        ))
        .bind(store_id)
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// List products of a store, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(
        &self,
        store_id: StoreId,
        published_only: bool,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE store_id = $1 AND (is_published OR NOT $2) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(store_id)
        .bind(published_only)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Create a product with a slug unique within its store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a concurrent insert claimed the
    /// same slug.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_product(
        &self,
        store_id: StoreId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let base = slugify(&draft.title);
        let taken: Vec<String> = sqlx::query_scalar(
            "SELECT slug FROM products WHERE store_id = $1 AND (slug = $2 OR slug LIKE $2 || '-%')",
        )
        .bind(store_id)
        .bind(&base)
        .fetch_all(self.pool)
        .await?;
        let slug = unique_slug(&base, |candidate| taken.iter().any(|s| s == candidate));

        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (store_id, title, title_bn, description, description_bn, slug, \
                                   price, discount_price, stock, images, is_published, \
                                   meta_title, meta_description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(store_id)
        .bind(&draft.title)
        .bind(&draft.title_bn)
        .bind(&draft.description)
        .bind(&draft.description_bn)
        .bind(&slug)
        .bind(draft.price)
        .bind(draft.discount_price)
        .bind(draft.stock)
        .bind(Json(&draft.images))
        .bind(draft.is_published)
        .bind(&draft.meta_title)
        .bind(&draft.meta_description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_violation(e, "product slug already exists"))
    }

    /// Update a product of a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist in the store.
    /// Returns `RepositoryError::Invalid` if the merged product is invalid.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND store_id = $2 FOR UPDATE"
        ))
        .bind(product_id)
        .bind(store_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        update
            .apply_to(&mut product)
            .map_err(RepositoryError::Invalid)?;

        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET title = $3, title_bn = $4, description = $5, \
                 description_bn = $6, price = $7, discount_price = $8, stock = $9, \
                 images = $10, is_published = $11, meta_title = $12, meta_description = $13, \
                 updated_at = NOW() \
             WHERE id = $1 AND store_id = $2 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product_id)
        .bind(store_id)
        .bind(&product.title)
        .bind(&product.title_bn)
        .bind(&product.description)
        .bind(&product.description_bn)
        .bind(product.price)
        .bind(product.discount_price)
        .bind(product.stock)
        .bind(&product.images)
        .bind(product.is_published)
        .bind(&product.meta_title)
        .bind(&product.meta_description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(product)
    }

    /// Delete a product of a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist in the store.
    /// Returns `RepositoryError::Conflict` if order items still reference it.
    pub async fn delete_product(
        &self,
        store_id: StoreId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND store_id = $2")
            .bind(product_id)
            .bind(store_id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::conflict_on_violation(e, "product is referenced by orders")
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Shipping classes
    // =========================================================================

    /// Get a shipping class of a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_shipping_class(
        &self,
        store_id: StoreId,
        class_id: ShippingClassId,
        active_only: bool,
    ) -> Result<Option<ShippingClass>, RepositoryError> {
        let class = sqlx::query_as::<_, ShippingClass>(&format!(
            "SELECT {SHIPPING_COLUMNS} FROM shipping_classes \
             WHERE id = $1 AND store_id = $2 AND (is_active OR NOT $3)"
        ))
        .bind(class_id)
        .bind(store_id)
        .bind(active_only)
        .fetch_optional(self.pool)
        .await?;

        Ok(class)
    }

    /// List shipping classes of a store, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_shipping_classes(
        &self,
        store_id: StoreId,
        active_only: bool,
    ) -> Result<Vec<ShippingClass>, RepositoryError> {
        let classes = sqlx::query_as::<_, ShippingClass>(&format!(
            "SELECT {SHIPPING_COLUMNS} FROM shipping_classes \
             WHERE store_id = $1 AND (is_active OR NOT $2) \
             ORDER BY cost, id"
        ))
        .bind(store_id)
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(classes)
    }

    /// Create a shipping class.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_shipping_class(
        &self,
        store_id: StoreId,
        class: &NewShippingClass,
    ) -> Result<ShippingClass, RepositoryError> {
        let class = sqlx::query_as::<_, ShippingClass>(&format!(
            "INSERT INTO shipping_classes (store_id, name, name_bn, cost) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {SHIPPING_COLUMNS}"
        ))
        .bind(store_id)
        .bind(&class.name)
        .bind(&class.name_bn)
        .bind(class.cost)
        .fetch_one(self.pool)
        .await?;

        Ok(class)
    }

    /// Deactivate a shipping class. Orders keep their reference to it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the class does not exist in the store.
    pub async fn deactivate_shipping_class(
        &self,
        store_id: StoreId,
        class_id: ShippingClassId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shipping_classes SET is_active = FALSE WHERE id = $1 AND store_id = $2",
        )
        .bind(class_id)
        .bind(store_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use bazaar_core::{ProductId, StoreId};

use super::double_option;

/// Maximum length of a product slug.
pub const MAX_SLUG_LEN: usize = 200;

/// A product in one store's catalog.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub title: String,
    pub title_bn: Option<String>,
    pub description: Option<String>,
    pub description_bn: Option<String>,
    pub slug: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub stock: i32,
    pub images: Json<Vec<String>>,
    pub is_published: bool,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// The unit price charged at checkout: the discount price when set,
    /// otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }
}

/// Fields supplied when creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDraft {
    pub title: String,
    pub title_bn: Option<String>,
    pub description: Option<String>,
    pub description_bn: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

const fn default_published() -> bool {
    true
}

impl ProductDraft {
    /// Check field values and round money to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn normalize(mut self) -> Result<Self, String> {
        if self.title.trim().is_empty() {
            return Err("product title cannot be empty".to_string());
        }
        self.title = self.title.trim().to_string();
        self.price = self.price.round_dp(2);
        self.discount_price = self.discount_price.map(|d| d.round_dp(2));
        validate_pricing(self.price, self.discount_price)?;
        validate_stock(self.stock)?;
        Ok(self)
    }
}

/// Partial product update. Nullable fields accept `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub title_bn: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description_bn: Option<Option<String>>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub discount_price: Option<Option<Decimal>>,
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
    pub is_published: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub meta_description: Option<Option<String>>,
}

impl ProductUpdate {
    /// Apply the update to `product`, validating the merged result.
    ///
    /// The slug is left untouched so existing links keep working after a
    /// title change.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message when the merged product is invalid;
    /// `product` is left unchanged in that case.
    pub fn apply_to(&self, product: &mut Product) -> Result<(), String> {
        let mut next = product.clone();

        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err("product title cannot be empty".to_string());
            }
            next.title = title.trim().to_string();
        }
        if let Some(v) = &self.title_bn {
            next.title_bn.clone_from(v);
        }
        if let Some(v) = &self.description {
            next.description.clone_from(v);
        }
        if let Some(v) = &self.description_bn {
            next.description_bn.clone_from(v);
        }
        if let Some(price) = self.price {
            next.price = price.round_dp(2);
        }
        if let Some(discount) = self.discount_price {
            next.discount_price = discount.map(|d| d.round_dp(2));
        }
        if let Some(stock) = self.stock {
            next.stock = stock;
        }
        if let Some(images) = &self.images {
            next.images = Json(images.clone());
        }
        if let Some(published) = self.is_published {
            next.is_published = published;
        }
        if let Some(v) = &self.meta_title {
            next.meta_title.clone_from(v);
        }
        if let Some(v) = &self.meta_description {
            next.meta_description.clone_from(v);
        }

        validate_pricing(next.price, next.discount_price)?;
        validate_stock(next.stock)?;

        *product = next;
        Ok(())
    }
}

fn validate_pricing(price: Decimal, discount_price: Option<Decimal>) -> Result<(), String> {
    if price.is_sign_negative() {
        return Err("price cannot be negative".to_string());
    }
    if let Some(discount) = discount_price {
        if discount.is_sign_negative() {
            return Err("discount price cannot be negative".to_string());
        }
        if discount > price {
            return Err("discount price cannot exceed price".to_string());
        }
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<(), String> {
    if stock < 0 {
        Err("stock cannot be negative".to_string())
    } else {
        Ok(())
    }
}

/// Derive a URL slug from a product title.
///
/// Letters and digits (any script) are kept and lowercased, every other run of
/// characters becomes a single `-`. Falls back to `product` when nothing is left.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        return "product".to_string();
    }
    truncate_chars(&slug, MAX_SLUG_LEN)
}

/// Pick the first slug derived from `base` that `taken` does not already hold:
/// `base`, then `base-2`, `base-3`, ...
#[must_use]
pub fn unique_slug(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2_u32..)
        .map(|n| {
            let suffix = format!("-{n}");
            let stem = truncate_chars(base, MAX_SLUG_LEN.saturating_sub(suffix.len()));
            format!("{}{suffix}", stem.trim_end_matches('-'))
        })
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn product(price: &str, discount: Option<&str>) -> Product {
        Product {
            id: ProductId::new(1),
            store_id: StoreId::new(1),
            title: "Green Tea".to_string(),
            title_bn: None,
            description: None,
            description_bn: None,
            slug: "green-tea".to_string(),
            price: Decimal::from_str(price).unwrap(),
            discount_price: discount.map(|d| Decimal::from_str(d).unwrap()),
            stock: 5,
            images: Json(Vec::new()),
            is_published: true,
            meta_title: None,
            meta_description: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_effective_price_prefers_discount() {
        assert_eq!(product("100", None).effective_price(), Decimal::from(100));
        assert_eq!(
            product("100", Some("80")).effective_price(),
            Decimal::from(80)
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Green Tea 250g"), "green-tea-250g");
        assert_eq!(slugify("  --Hello,   World!-- "), "hello-world");
        assert_eq!(slugify("চা পাতা"), "চা-পাতা");
        assert_eq!(slugify("!!!"), "product");
        assert_eq!(slugify(&"a".repeat(300)).chars().count(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_unique_slug() {
        let taken = ["tea", "tea-2"];
        assert_eq!(unique_slug("coffee", |s| taken.contains(&s)), "coffee");
        assert_eq!(unique_slug("tea", |s| taken.contains(&s)), "tea-3");
    }

    #[test]
    fn test_draft_normalize() {
        let draft: ProductDraft =
            serde_json::from_str(r#"{"title": " Tea ", "price": "10.005"}"#).unwrap();
        let draft = draft.normalize().unwrap();
        assert_eq!(draft.title, "Tea");
        assert_eq!(draft.price, Decimal::from_str("10.00").unwrap());
        assert!(draft.is_published);
        assert_eq!(draft.stock, 0);
    }

    #[test]
    fn test_draft_rejects_invalid_values() {
        let draft: ProductDraft = serde_json::from_str(
            r#"{"title": "Tea", "price": "10", "discount_price": "12"}"#,
        )
        .unwrap();
        assert!(draft.normalize().is_err());

        let draft: ProductDraft =
            serde_json::from_str(r#"{"title": "Tea", "price": "10", "stock": -1}"#).unwrap();
        assert!(draft.normalize().is_err());
    }

    #[test]
    fn test_update_clears_discount_and_keeps_slug() {
        let mut p = product("100", Some("80"));
        let update: ProductUpdate =
            serde_json::from_str(r#"{"title": "Black Tea", "discount_price": null}"#).unwrap();
        update.apply_to(&mut p).unwrap();
        assert_eq!(p.title, "Black Tea");
        assert_eq!(p.slug, "green-tea");
        assert!(p.discount_price.is_none());
    }

    #[test]
    fn test_update_failure_leaves_product_unchanged() {
        let mut p = product("100", None);
        let update: ProductUpdate =
            serde_json::from_str(r#"{"title": "New", "stock": -3}"#).unwrap();
        assert!(update.apply_to(&mut p).is_err());
        assert_eq!(p.title, "Green Tea");
        assert_eq!(p.stock, 5);
    }
}

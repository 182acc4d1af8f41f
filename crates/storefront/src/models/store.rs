//! Store (tenant) domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{StoreId, Subdomain, UserId};

use super::double_option;

/// A tenant store.
///
/// Stores are deactivated rather than deleted, and the subdomain never changes
/// after creation.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Store {
    pub id: StoreId,
    pub subdomain: Subdomain,
    pub name: String,
    pub name_bn: Option<String>,
    pub logo: Option<String>,
    pub brand_color: String,
    pub currency: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub facebook_pixel_id: Option<String>,
    pub default_language: String,
    pub is_active: bool,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Store {
    /// Whether `user` owns this store.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }
}

/// Display and brand attributes supplied when a store is created.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreProfile {
    pub name: String,
    pub name_bn: Option<String>,
    pub logo: Option<String>,
    #[serde(default = "default_brand_color")]
    pub brand_color: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub facebook_pixel_id: Option<String>,
    #[serde(default = "default_language")]
    pub default_language: String,
}

fn default_brand_color() -> String {
    "#007bff".to_string()
}

fn default_currency() -> String {
    "BDT".to_string()
}

fn default_language() -> String {
    "bn".to_string()
}

impl StoreProfile {
    /// A profile with `name` and default display settings.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_bn: None,
            logo: None,
            brand_color: default_brand_color(),
            currency: default_currency(),
            phone: None,
            whatsapp: None,
            facebook_pixel_id: None,
            default_language: default_language(),
        }
    }

    /// Check field formats.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_brand_color(&self.brand_color)?;
        validate_currency(&self.currency)?;
        validate_language(&self.default_language)
    }
}

/// A store about to be inserted.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub owner_id: UserId,
    pub subdomain: Subdomain,
    pub profile: StoreProfile,
}

/// Partial update of a store's display attributes.
///
/// The subdomain is deliberately absent: it is immutable once claimed.
/// Nullable fields accept `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub name_bn: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub logo: Option<Option<String>>,
    pub brand_color: Option<String>,
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub whatsapp: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub facebook_pixel_id: Option<Option<String>>,
    pub default_language: Option<String>,
}

impl StoreUpdate {
    /// Check the formats of the fields being changed.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(color) = &self.brand_color {
            validate_brand_color(color)?;
        }
        if let Some(currency) = &self.currency {
            validate_currency(currency)?;
        }
        if let Some(language) = &self.default_language {
            validate_language(language)?;
        }
        Ok(())
    }

    /// Apply the update to an in-memory store record.
    pub fn apply_to(&self, store: &mut Store) {
        if let Some(name) = &self.name {
            store.name.clone_from(name);
        }
        if let Some(name_bn) = &self.name_bn {
            store.name_bn.clone_from(name_bn);
        }
        if let Some(logo) = &self.logo {
            store.logo.clone_from(logo);
        }
        if let Some(color) = &self.brand_color {
            store.brand_color.clone_from(color);
        }
        if let Some(currency) = &self.currency {
            store.currency.clone_from(currency);
        }
        if let Some(phone) = &self.phone {
            store.phone.clone_from(phone);
        }
        if let Some(whatsapp) = &self.whatsapp {
            store.whatsapp.clone_from(whatsapp);
        }
        if let Some(pixel) = &self.facebook_pixel_id {
            store.facebook_pixel_id.clone_from(pixel);
        }
        if let Some(language) = &self.default_language {
            store.default_language.clone_from(language);
        }
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("store name cannot be empty".to_string());
    }
    if trimmed.chars().count() > 255 {
        return Err("store name must be at most 255 characters".to_string());
    }
    Ok(())
}

fn validate_brand_color(color: &str) -> Result<(), String> {
    let valid = color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if valid {
        Ok(())
    } else {
        Err(format!("brand color must look like #RRGGBB, got {color:?}"))
    }
}

fn validate_currency(currency: &str) -> Result<(), String> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(format!(
            "currency must be a 3-letter ISO 4217 code, got {currency:?}"
        ))
    }
}

fn validate_language(language: &str) -> Result<(), String> {
    if language.len() == 2 && language.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(())
    } else {
        Err(format!(
            "default language must be a 2-letter code, got {language:?}"
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile(json: &str) -> StoreProfile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_profile_defaults() {
        let p = profile(r#"{"name": "Tea House"}"#);
        assert_eq!(p.brand_color, "#007bff");
        assert_eq!(p.currency, "BDT");
        assert_eq!(p.default_language, "bn");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_profile_rejects_bad_fields() {
        assert!(profile(r#"{"name": "  "}"#).validate().is_err());
        assert!(
            profile(r##"{"name": "x", "brand_color": "#12345"}"##)
                .validate()
                .is_err()
        );
        assert!(
            profile(r#"{"name": "x", "currency": "bdt"}"#)
                .validate()
                .is_err()
        );
        assert!(
            profile(r#"{"name": "x", "default_language": "eng"}"#)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let update: StoreUpdate = serde_json::from_str(r#"{"logo": null}"#).unwrap();
        assert_eq!(update.logo, Some(None));
        assert_eq!(update.phone, None);
    }

    #[test]
    fn test_update_rejects_subdomain_field() {
        // Unknown fields are ignored, so a subdomain in the body changes nothing
        let update: StoreUpdate = serde_json::from_str(r#"{"subdomain": "other"}"#).unwrap();
        assert!(update.name.is_none());
        assert!(update.validate().is_ok());
    }
}

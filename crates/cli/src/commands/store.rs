//! Store management commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli store create --phone 01711000000 --subdomain shop1 --name "Shop One"
//! ```

use bazaar_core::{Phone, StoreId, Subdomain};
use bazaar_storefront::db::{PgBackend, StoreManagement, UserDirectory};
use bazaar_storefront::models::{NewStore, StoreProfile};

use super::{CommandError, connect};

/// Create a store, creating its owner on first use of the phone number.
///
/// # Errors
///
/// Returns an error if an argument is invalid, the subdomain is taken, or the
/// database fails.
pub async fn create(phone: &str, subdomain: &str, name: &str) -> Result<StoreId, CommandError> {
    let phone =
        Phone::parse(phone).map_err(|e| CommandError::InvalidArgument("phone", e.to_string()))?;
    let subdomain = Subdomain::parse(subdomain)
        .map_err(|e| CommandError::InvalidArgument("subdomain", e.to_string()))?;
    let profile = StoreProfile::named(name);
    profile
        .validate()
        .map_err(|e| CommandError::InvalidArgument("name", e))?;

    let backend = PgBackend::new(connect().await?);

    let owner = backend.find_or_create_user_by_phone(&phone).await?;
    let store = backend
        .create_store(NewStore {
            owner_id: owner.id,
            subdomain,
            profile,
        })
        .await?;

    tracing::info!(
        store_id = %store.id,
        owner_id = %owner.id,
        subdomain = %store.subdomain,
        "Store created"
    );
    Ok(store.id)
}

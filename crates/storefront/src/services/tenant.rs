//! Tenant resolution: request host to store.

use tracing::instrument;

use bazaar_core::parse_subdomain;

use crate::db::StoreDirectory;
use crate::models::{TenantContext, UnresolvedReason};

/// Resolve the tenant for a request host.
///
/// Never fails: a host without a slug yields [`TenantContext::none`], and a
/// slug that names no active store (or whose lookup errors) yields an
/// unresolved context so handlers can apply their own policy.
#[instrument(skip(directory), fields(slug))]
pub async fn resolve_tenant<D>(host: &str, base_domain: &str, directory: &D) -> TenantContext
where
    D: StoreDirectory + ?Sized,
{
    let Some(slug) = parse_subdomain(host, base_domain) else {
        return TenantContext::none();
    };
    tracing::Span::current().record("slug", slug.as_str());

    match directory.find_active_store_by_subdomain(&slug).await {
        Ok(Some(store)) => TenantContext::resolved(slug, store),
        Ok(None) => {
            tracing::debug!("No active store for subdomain");
            TenantContext::unresolved(slug, UnresolvedReason::StoreNotFound)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Store lookup failed during tenant resolution");
            TenantContext::unresolved(slug, UnresolvedReason::LookupFailed)
        }
    }
}

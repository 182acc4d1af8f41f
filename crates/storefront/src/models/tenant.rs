//! Per-request tenant context.

use bazaar_core::StoreId;

use super::Store;

/// Why a slug did not resolve to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// No active store has this subdomain.
    StoreNotFound,
    /// The directory lookup itself failed.
    LookupFailed,
}

impl UnresolvedReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StoreNotFound => "store_not_found",
            Self::LookupFailed => "lookup_failed",
        }
    }
}

/// Outcome of mapping a request host to a store.
#[derive(Debug, Clone)]
pub enum TenantResolution {
    /// The host carried no tenant slug.
    NoTenant,
    /// The slug names an active store.
    Resolved(Store),
    /// The host carried a slug but no active store could be loaded for it.
    Unresolved { reason: UnresolvedReason },
}

/// Tenant identity for one request, inserted as a request extension by the
/// tenant middleware.
#[derive(Debug, Clone)]
pub struct TenantContext {
    slug: Option<String>,
    resolution: TenantResolution,
}

impl TenantContext {
    /// Context for a request without a tenant slug.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            slug: None,
            resolution: TenantResolution::NoTenant,
        }
    }

    /// Context for a slug that resolved to `store`.
    #[must_use]
    pub fn resolved(slug: impl Into<String>, store: Store) -> Self {
        Self {
            slug: Some(slug.into()),
            resolution: TenantResolution::Resolved(store),
        }
    }

    /// Context for a slug that could not be resolved.
    #[must_use]
    pub fn unresolved(slug: impl Into<String>, reason: UnresolvedReason) -> Self {
        Self {
            slug: Some(slug.into()),
            resolution: TenantResolution::Unresolved { reason },
        }
    }

    /// The raw slug parsed from the host, if any.
    #[must_use]
    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    #[must_use]
    pub const fn resolution(&self) -> &TenantResolution {
        &self.resolution
    }

    /// The resolved store, if any.
    #[must_use]
    pub const fn store(&self) -> Option<&Store> {
        match &self.resolution {
            TenantResolution::Resolved(store) => Some(store),
            _ => None,
        }
    }

    #[must_use]
    pub fn store_id(&self) -> Option<StoreId> {
        self.store().map(|store| store.id)
    }

    /// Whether the host named a tenant at all, resolved or not.
    #[must_use]
    pub const fn has_slug(&self) -> bool {
        self.slug.is_some()
    }

    /// Label for logs and spans.
    #[must_use]
    pub fn describe(&self) -> String {
        match (&self.slug, &self.resolution) {
            (_, TenantResolution::NoTenant) | (None, _) => "none".to_string(),
            (Some(slug), TenantResolution::Resolved(_)) => slug.clone(),
            (Some(slug), TenantResolution::Unresolved { reason }) => {
                format!("{slug} ({})", reason.as_str())
            }
        }
    }
}

//! Tenant resolution middleware and extractors.
//!
//! `tenant_middleware` runs before every handler: it maps the request host to
//! a [`TenantContext`] and stores it as a request extension. Handlers then pick
//! their policy with an extractor:
//!
//! - [`Tenant`] accepts any outcome, including no tenant at all.
//! - [`RequireTenant`] rejects requests that did not resolve to an active store.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::Span;

use crate::error::AppError;
use crate::models::{Store, TenantContext, TenantResolution};
use crate::services::resolve_tenant;
use crate::state::AppState;

/// Resolve the tenant for the request and attach it as an extension.
pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let host = request_host(&request).unwrap_or_default();
    let tenant = resolve_tenant(&host, &state.config().base_domain, state.backend()).await;

    Span::current().record("tenant", tenant.describe().as_str());
    if let Some(store) = tenant.store() {
        let store_id = store.id.to_string();
        sentry::configure_scope(|scope| {
            scope.set_tag("store_id", store_id);
        });
    }

    request.extensions_mut().insert(tenant);
    next.run(request).await
}

/// The host a request was addressed to: the `Host` header, or the URI
/// authority for HTTP/2 requests that carry none.
fn request_host(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_owned()))
}

/// Tenant context of the request, whatever the outcome.
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantContext);

impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant = parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .unwrap_or_else(TenantContext::none);
        Ok(Self(tenant))
    }
}

/// Tenant context that is guaranteed to hold an active store.
///
/// Rejects with `StoreContextRequired` when the host names no tenant and with
/// `StoreNotFound` when it names one that could not be loaded.
#[derive(Debug, Clone)]
pub struct RequireTenant(pub TenantContext);

impl RequireTenant {
    /// The resolved store.
    ///
    /// # Errors
    ///
    /// Never fails for a value built by the extractor.
    pub fn store(&self) -> Result<&Store, AppError> {
        self.0.store().ok_or(AppError::StoreContextRequired)
    }
}

impl<S> FromRequestParts<S> for RequireTenant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(Tenant(tenant)) = Tenant::from_request_parts(parts, state).await;
        match tenant.resolution() {
            TenantResolution::Resolved(_) => Ok(Self(tenant)),
            TenantResolution::NoTenant => Err(AppError::StoreContextRequired),
            TenantResolution::Unresolved { .. } => Err(AppError::StoreNotFound),
        }
    }
}

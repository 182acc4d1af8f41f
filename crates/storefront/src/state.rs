//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Backend;
use crate::services::OtpStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the persistence backend and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: Arc<dyn Backend>,
    otp: Arc<dyn OtpStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `backend` - Persistence backend (`PostgreSQL` in production)
    /// * `otp` - Store for pending login codes
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        backend: Arc<dyn Backend>,
        otp: Arc<dyn OtpStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                otp,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the persistence backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.inner.backend.as_ref()
    }

    /// Get a reference to the login code store.
    #[must_use]
    pub fn otp(&self) -> &dyn OtpStore {
        self.inner.otp.as_ref()
    }
}

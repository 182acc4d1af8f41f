//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request span with `request_id` and `tenant` fields)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions)
//! 5. Tenant resolution (host to store, stored as a request extension)
//! 6. Rate limiting on auth and checkout routes (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;
pub mod tenant;

pub use auth::{RequireUser, clear_current_user, set_current_user};
pub use rate_limit::{auth_rate_limiter, checkout_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use session::{create_session_layer, postgres_session_store};
pub use tenant::{RequireTenant, Tenant, tenant_middleware};

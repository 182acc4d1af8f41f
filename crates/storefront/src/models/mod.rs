//! Domain models for the storefront.
//!
//! These are the validated shapes that flow between route handlers, services,
//! and the data-access layer. Row types that only exist to decode query results
//! live next to their queries in `crate::db`.

pub mod order;
pub mod product;
pub mod session;
pub mod shipping;
pub mod store;
pub mod tenant;
pub mod user;

pub use order::{CustomerDetails, NewOrder, NewOrderLine, Order, OrderItem, OrderLineRequest, OrderRequest};
pub use product::{Product, ProductDraft, ProductUpdate};
pub use session::{CurrentUser, keys as session_keys};
pub use shipping::{NewShippingClass, ShippingClass};
pub use store::{NewStore, Store, StoreProfile, StoreUpdate};
pub use tenant::{TenantContext, TenantResolution, UnresolvedReason};
pub use user::User;

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: a missing
/// key stays `None`, `null` becomes `Some(None)`, a value becomes `Some(Some(v))`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    <Option<T> as serde::Deserialize>::deserialize(deserializer).map(Some)
}

//! Business services that sit between route handlers and the data store.

pub mod fulfillment;
pub mod otp;
pub mod tenant;

pub use fulfillment::{FulfillmentError, OrderFulfillment};
pub use otp::{MokaOtpStore, OtpStore, generate_code};
pub use tenant::resolve_tenant;

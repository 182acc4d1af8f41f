//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod order_number;
pub mod phone;
pub mod status;
pub mod subdomain;

pub use id::*;
pub use order_number::OrderNumber;
pub use phone::{Phone, PhoneError};
pub use status::*;
pub use subdomain::{Subdomain, SubdomainError};

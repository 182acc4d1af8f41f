//! Bazaar Core - Shared types library.
//!
//! This crate provides common types used across all Bazaar components:
//! - `storefront` - Multi-tenant storefront API server
//! - `cli` - Command-line tools for migrations and store management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, subdomains, phones, statuses
//!   and order numbers
//! - [`host`] - Host header parsing into tenant slugs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod host;
pub mod types;

pub use host::{RESERVED_SUBDOMAINS, parse_subdomain};
pub use types::*;

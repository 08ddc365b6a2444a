//! Avenue Core - Shared domain types.
//!
//! This crate provides common types used across all Avenue components:
//! - `client` - Typed backend client and view controllers
//! - `cli` - Command-line front end over the client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. Server resources (orders, reservations, campaigns) are owned by
//! the backend; these types are their client-side projections.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

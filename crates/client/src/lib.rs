//! Avenue client library.
//!
//! Typed access to the Avenue backend (shop, photo studio bookings, UGC
//! marketplace) plus the stateful controllers that sit between it and a
//! front end: cart, checkout, booking wizard, auth flows and the
//! inactivity logout tracker.
//!
//! The backend owns every business rule. This crate validates input before
//! sending it, keeps the auth token and cart in a [`store::LocalStore`], and
//! turns responses into typed values or a [`error::ClientError`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod booking;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod media;
pub mod notifications;
pub mod session;
pub mod store;
pub mod ugc;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result, ValidationError};
pub use store::LocalStore;

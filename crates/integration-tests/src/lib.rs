//! Integration tests for the Avenue client.
//!
//! Every test starts a `wiremock` server standing in for the backend and
//! drives the public client API against it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p avenue-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout` - inventory gate, coupons, delivery quotes
//! - `auth_flows` - password login, OAuth callback retries, MFA, terms
//! - `booking` - availability and reservation submission
//! - `marketplace` - notifications, UGC dashboards, media uploads

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::MockServer;

use avenue_client::cart::CartItem;
use avenue_client::{ApiClient, ClientConfig, LocalStore};
use avenue_core::ProductId;

/// Token stored by [`TestContext::logged_in`].
pub const TEST_TOKEN: &str = "test-token";

/// A mock backend and a client pointed at it.
pub struct TestContext {
    pub server: MockServer,
    pub store: LocalStore,
    pub api: ApiClient,
}

impl TestContext {
    /// Anonymous client with an in-memory store.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let store = LocalStore::in_memory();
        let config = ClientConfig::for_api_url(Url::parse(&server.uri()).unwrap());
        let api = ApiClient::new(&config, store.clone()).unwrap();
        Self { server, store, api }
    }

    /// Client with [`TEST_TOKEN`] already stored.
    pub async fn logged_in() -> Self {
        let ctx = Self::new().await;
        ctx.store
            .set_auth_token(&SecretString::from(TEST_TOKEN))
            .unwrap();
        ctx
    }
}

/// A cart line.
#[must_use]
pub fn cart_item(id: &str, price: i64, quantity: u32) -> CartItem {
    CartItem {
        product_id: ProductId::new(id),
        sku: None,
        name: id.to_uppercase(),
        price: Decimal::from(price),
        quantity,
        size: None,
        image: None,
    }
}

/// A user as the backend returns it.
#[must_use]
pub fn user_json(id: &str, email: &str) -> Value {
    json!({
        "id": id,
        "name": "Ana Gómez",
        "email": email,
        "role": "customer",
        "is_creator": false,
        "is_brand": false,
        "terms_accepted": true,
        "mfa_enabled": false
    })
}

//! Shop endpoints: delivery, coupons, inventory, checkout and orders.
//!
//! Amounts travel as JSON numbers in COP.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use avenue_core::{CouponId, OrderId, OrderStatus, PaymentStatus, ProductId};

use super::cache::{CacheValue, STORE_LOCATION_KEY};
use super::{Ack, ApiClient};
use crate::cart::{CartItem, UnavailableItem};
use crate::error::ClientError;

// =============================================================================
// Wire types
// =============================================================================

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Physical store used for pickup and as the delivery origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreLocation {
    #[serde(default)]
    pub name: Option<String>,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub hours: Option<String>,
}

impl StoreLocation {
    /// Store coordinates.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    #[default]
    Pickup,
    Delivery,
}

#[derive(Debug, Serialize)]
struct DeliveryQuoteRequest<'a> {
    lat: f64,
    lng: f64,
    address: &'a str,
}

/// Delivery cost computed by the backend for a location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeliveryQuote {
    #[serde(alias = "delivery_cost", with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub message: Option<String>,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct InventoryRequest<'a> {
    items: &'a [CartItem],
}

/// Result of re-validating the cart against current stock.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryValidation {
    #[serde(default = "default_true", alias = "all_available")]
    pub valid: bool,
    #[serde(default)]
    pub unavailable_items: Vec<UnavailableItem>,
}

impl InventoryValidation {
    /// Whether any item was reported unavailable.
    ///
    /// The list wins over the flag: a non-empty list blocks checkout even if
    /// `valid` is true.
    #[must_use]
    pub fn has_unavailable(&self) -> bool {
        !self.valid || !self.unavailable_items.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct ApplyCouponRequest<'a> {
    code: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    subtotal: Decimal,
}

/// Coupon metadata as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponInfo {
    #[serde(default)]
    pub id: Option<CouponId>,
    pub code: String,
    #[serde(default)]
    pub discount_type: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount_value: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Result of applying a coupon.
#[derive(Debug, Clone, Deserialize)]
pub struct CouponResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub coupon: Option<CouponInfo>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Customer billing details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    /// National ID number.
    pub document_id: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Order submission payload.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
    pub billing: BillingDetails,
    pub delivery_method: DeliveryMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub delivery_cost: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub accept_terms: bool,
}

/// Order creation result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutResponse {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    /// Hosted payment page to send the customer to.
    #[serde(default, alias = "checkout_url")]
    pub payment_url: Option<String>,
    /// Payment session to poll.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderItem {
    #[serde(alias = "id")]
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub size: Option<String>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Payment state of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentStatusResponse {
    #[serde(alias = "payment_status")]
    pub status: PaymentStatus,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

// =============================================================================
// Endpoints
// =============================================================================

impl ApiClient {
    /// `GET /api/shop/store-location`, cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn store_location(&self) -> Result<StoreLocation, ClientError> {
        if let Some(CacheValue::StoreLocation(location)) =
            self.inner.cache.get(STORE_LOCATION_KEY).await
        {
            debug!("Cache hit for store location");
            return Ok(*location);
        }

        let location: StoreLocation = self.get("/api/shop/store-location").await?;

        self.inner
            .cache
            .insert(
                STORE_LOCATION_KEY.to_string(),
                CacheValue::StoreLocation(Box::new(location.clone())),
            )
            .await;

        Ok(location)
    }

    /// `POST /api/shop/calculate-delivery`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the location is rejected.
    #[instrument(skip(self, address))]
    pub async fn calculate_delivery(
        &self,
        location: Coordinates,
        address: &str,
    ) -> Result<DeliveryQuote, ClientError> {
        self.post(
            "/api/shop/calculate-delivery",
            &DeliveryQuoteRequest {
                lat: location.lat,
                lng: location.lng,
                address,
            },
        )
        .await
    }

    /// `POST /api/shop/validate-inventory` with the full cart snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn validate_inventory(
        &self,
        items: &[CartItem],
    ) -> Result<InventoryValidation, ClientError> {
        self.post("/api/shop/validate-inventory", &InventoryRequest { items })
            .await
    }

    /// `POST /api/shop/apply-coupon`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the coupon is rejected.
    #[instrument(skip(self))]
    pub async fn apply_coupon(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<CouponResponse, ClientError> {
        self.post("/api/shop/apply-coupon", &ApplyCouponRequest { code, subtotal })
            .await
    }

    /// `POST /api/shop/use-coupon/{code}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn use_coupon(&self, code: &str) -> Result<Option<Ack>, ClientError> {
        self.post_empty(&format!("/api/shop/use-coupon/{}", path_segment(code)))
            .await
    }

    /// `POST /api/shop/checkout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the order is rejected.
    #[instrument(skip(self, request), fields(lines = request.items.len(), total = %request.total))]
    pub async fn checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, ClientError> {
        self.post("/api/shop/checkout", request).await
    }

    /// `GET /api/shop/orders/{id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found or the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: &OrderId) -> Result<Order, ClientError> {
        self.get(&format!("/api/shop/orders/{}", path_segment(id.as_str())))
            .await
    }

    /// `GET /api/shop/checkout/status/{session_id}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn payment_status(
        &self,
        session_id: &str,
    ) -> Result<PaymentStatusResponse, ClientError> {
        self.get(&format!(
            "/api/shop/checkout/status/{}",
            path_segment(session_id)
        ))
        .await
    }
}

/// Percent-encode a value for use as a single path segment.
pub(crate) fn path_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

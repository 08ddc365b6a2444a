//! Checkout controller.
//!
//! Holds the in-progress choices (delivery method and location, coupon) on
//! top of the persisted cart. Submission always re-validates stock with the
//! backend first; when anything is out of stock the order request is never
//! sent and the user must resolve the conflict.

mod totals;

pub use totals::Totals;

use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use avenue_core::{Email, OrderId, PaymentStatus};

use crate::api::ApiClient;
use crate::api::shop::{
    BillingDetails, CheckoutRequest, CheckoutResponse, Coordinates, DeliveryMethod, DeliveryQuote,
    Order, StoreLocation,
};
use crate::cart::{Cart, CartService, UnavailableItem};
use crate::error::{ClientError, ValidationError};

/// Delivery location picked on the map, with the backend's quote.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliverySelection {
    pub location: Coordinates,
    pub address: String,
    pub quote: DeliveryQuote,
}

/// Coupon accepted by the backend for a given subtotal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: Decimal,
    pub description: Option<String>,
    /// Subtotal the discount was quoted for.
    pub subtotal: Decimal,
}

impl AppliedCoupon {
    /// Whether the discount still applies to `cart`.
    #[must_use]
    pub fn applies_to(&self, cart: &Cart) -> bool {
        cart.subtotal() == self.subtotal
    }
}

/// Result of [`CheckoutController::submit`].
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// Order created; redirect to `payment_url` if present.
    Placed(CheckoutResponse),
    /// Stock changed; nothing was ordered.
    OutOfStock(Vec<UnavailableItem>),
}

/// How to continue after an out-of-stock report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfStockResolution {
    /// Drop the unavailable lines and stay in checkout.
    RemoveUnavailable,
    /// Clear the cart and leave checkout.
    Abandon,
}

/// Bounds for [`CheckoutController::poll_payment_status`].
#[derive(Debug, Clone, Copy)]
pub struct PaymentPolling {
    pub interval: Duration,
    pub max_polls: u32,
}

impl Default for PaymentPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_polls: 20,
        }
    }
}

/// Checkout flow over the persisted cart.
#[derive(Debug)]
pub struct CheckoutController {
    api: ApiClient,
    cart: CartService,
    delivery_method: DeliveryMethod,
    delivery: Option<DeliverySelection>,
    coupon: Option<AppliedCoupon>,
    unavailable: Vec<UnavailableItem>,
}

impl CheckoutController {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cart = CartService::new(api.store().clone());
        Self {
            api,
            cart,
            delivery_method: DeliveryMethod::Pickup,
            delivery: None,
            coupon: None,
            unavailable: Vec::new(),
        }
    }

    /// Current persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn cart(&self) -> Result<Cart, ClientError> {
        Ok(self.cart.load()?)
    }

    #[must_use]
    pub const fn delivery_method(&self) -> DeliveryMethod {
        self.delivery_method
    }

    /// Switch between pickup and delivery. A chosen location is kept so
    /// switching back does not lose it.
    pub fn set_delivery_method(&mut self, method: DeliveryMethod) {
        debug!(?method, "Delivery method changed");
        self.delivery_method = method;
    }

    #[must_use]
    pub const fn delivery(&self) -> Option<&DeliverySelection> {
        self.delivery.as_ref()
    }

    #[must_use]
    pub const fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    /// Items from the last out-of-stock report.
    #[must_use]
    pub fn unavailable(&self) -> &[UnavailableItem] {
        &self.unavailable
    }

    /// Pickup point.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn store_location(&self) -> Result<StoreLocation, ClientError> {
        self.api.store_location().await
    }

    /// Pick a delivery location and fetch its cost.
    ///
    /// The quote is returned either way; it is only kept when the backend
    /// says the location is served.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, address))]
    pub async fn set_delivery_location(
        &mut self,
        location: Coordinates,
        address: &str,
    ) -> Result<DeliveryQuote, ClientError> {
        let quote = self.api.calculate_delivery(location, address).await?;
        if quote.available {
            info!(cost = %quote.cost, "Delivery quote accepted");
            self.delivery = Some(DeliverySelection {
                location,
                address: address.trim().to_string(),
                quote: quote.clone(),
            });
        } else {
            warn!(message = ?quote.message, "Location outside delivery area");
            self.delivery = None;
        }
        Ok(quote)
    }

    /// Validate a coupon against the current subtotal and apply it,
    /// replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCouponCode` without a request, or the backend's
    /// rejection. A `valid: false` answer is reported like a 400.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&mut self, code: &str) -> Result<&AppliedCoupon, ClientError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyCouponCode.into());
        }

        let subtotal = self.cart.load()?.subtotal();
        let response = self.api.apply_coupon(code, subtotal).await?;
        if !response.valid {
            return Err(ClientError::Rejected {
                status: 400,
                message: response.message,
            });
        }

        let description = response.coupon.and_then(|c| c.description);
        info!(discount = %response.discount_amount, "Coupon applied");
        Ok(self.coupon.insert(AppliedCoupon {
            code: code.to_string(),
            discount: response.discount_amount,
            description,
            subtotal,
        }))
    }

    /// Drop the coupon locally.
    pub fn remove_coupon(&mut self) -> Option<AppliedCoupon> {
        self.coupon.take()
    }

    /// Totals for `cart` with the current choices.
    ///
    /// A coupon quoted for a different subtotal contributes no discount.
    #[must_use]
    pub fn totals_for(&self, cart: &Cart) -> Totals {
        let discount = self
            .coupon
            .as_ref()
            .filter(|c| c.applies_to(cart))
            .map_or(Decimal::ZERO, |c| c.discount);
        let delivery = match (self.delivery_method, &self.delivery) {
            (DeliveryMethod::Delivery, Some(selection)) => selection.quote.cost,
            _ => Decimal::ZERO,
        };
        Totals::compute(cart.subtotal(), discount, delivery)
    }

    /// Totals for the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn totals(&self) -> Result<Totals, ClientError> {
        Ok(self.totals_for(&self.cart.load()?))
    }

    /// Validate, re-check stock, and place the order.
    ///
    /// A coupon whose quote no longer matches the cart subtotal is dropped
    /// and the order is placed without it.
    ///
    /// # Errors
    ///
    /// Returns a validation error without any request, or the first failing
    /// request.
    #[instrument(skip(self, billing))]
    pub async fn submit(
        &mut self,
        billing: &BillingDetails,
        accept_terms: bool,
    ) -> Result<CheckoutOutcome, ClientError> {
        let cart = self.cart.load()?;
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        let email = validate_billing(billing)?;
        let delivery = match self.delivery_method {
            DeliveryMethod::Pickup => None,
            DeliveryMethod::Delivery => Some(
                self.delivery
                    .clone()
                    .ok_or(ValidationError::NoDeliveryLocation)?,
            ),
        };
        if !accept_terms {
            return Err(ValidationError::TermsNotAccepted.into());
        }

        let inventory = self.api.validate_inventory(cart.items()).await?;
        if inventory.has_unavailable() {
            warn!(
                count = inventory.unavailable_items.len(),
                "Checkout blocked by unavailable items"
            );
            self.unavailable.clone_from(&inventory.unavailable_items);
            return Ok(CheckoutOutcome::OutOfStock(inventory.unavailable_items));
        }

        if let Some(coupon) = self.coupon.take_if(|c| !c.applies_to(&cart)) {
            warn!(
                code = %coupon.code,
                quoted = %coupon.subtotal,
                subtotal = %cart.subtotal(),
                "Coupon dropped, cart changed since it was applied"
            );
        }

        let totals = self.totals_for(&cart);
        let request = CheckoutRequest {
            items: cart.items().to_vec(),
            billing: BillingDetails {
                email: email.into_inner(),
                ..billing.clone()
            },
            delivery_method: self.delivery_method,
            delivery_location: delivery.as_ref().map(|d| d.location),
            delivery_address: delivery.as_ref().map(|d| d.address.clone()),
            delivery_cost: totals.delivery,
            coupon_code: self.coupon.as_ref().map(|c| c.code.clone()),
            discount_amount: totals.discount,
            subtotal: totals.subtotal,
            total: totals.total,
            accept_terms,
        };

        let response = self.api.checkout(&request).await?;
        info!(order_id = ?response.order_id, total = %totals.total, "Order placed");

        if let Some(coupon) = self.coupon.take() {
            if let Err(e) = self.api.use_coupon(&coupon.code).await {
                warn!(error = %e, "Failed to mark coupon as used");
            }
        }
        if let Err(e) = self.cart.clear() {
            warn!(error = %e, "Failed to clear cart after order");
        }
        self.unavailable.clear();

        Ok(CheckoutOutcome::Placed(response))
    }

    /// Act on the last out-of-stock report.
    ///
    /// Removing lines changes the subtotal, so an applied coupon is dropped
    /// and must be applied again.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if there is no pending report, or a storage
    /// error.
    #[instrument(skip(self))]
    pub fn resolve_out_of_stock(
        &mut self,
        resolution: OutOfStockResolution,
    ) -> Result<Cart, ClientError> {
        if self.unavailable.is_empty() {
            return Err(ClientError::InvalidState("no out-of-stock report to resolve"));
        }
        let cart = match resolution {
            OutOfStockResolution::RemoveUnavailable => {
                self.cart.remove_unavailable(&self.unavailable)?
            }
            OutOfStockResolution::Abandon => {
                self.cart.clear()?;
                Cart::default()
            }
        };
        self.unavailable.clear();
        if self.coupon.take().is_some() {
            debug!("Coupon dropped after cart change");
        }
        Ok(cart)
    }

    /// Order details for the confirmation page.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn order(&self, id: &OrderId) -> Result<Order, ClientError> {
        self.api.order(id).await
    }

    /// Poll the payment gateway status until it is terminal or the poll
    /// budget runs out; returns the last status seen.
    ///
    /// # Errors
    ///
    /// Returns the first failing request.
    #[instrument(skip(self, polling))]
    pub async fn poll_payment_status(
        &self,
        session_id: &str,
        polling: PaymentPolling,
    ) -> Result<PaymentStatus, ClientError> {
        let mut status = PaymentStatus::Pending;
        for attempt in 1..=polling.max_polls.max(1) {
            status = self.api.payment_status(session_id).await?.status;
            debug!(attempt, %status, "Payment status");
            if status.is_terminal() {
                break;
            }
            if attempt < polling.max_polls {
                tokio::time::sleep(polling.interval).await;
            }
        }
        Ok(status)
    }
}

fn validate_billing(billing: &BillingDetails) -> Result<Email, ValidationError> {
    let required = [
        ("full_name", &billing.full_name),
        ("email", &billing.email),
        ("phone", &billing.phone),
        ("document_id", &billing.document_id),
    ];
    if let Some((field, _)) = required.into_iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ValidationError::MissingField(field));
    }
    Ok(Email::parse(&billing.email)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use avenue_core::ProductId;

    use super::*;
    use crate::cart::CartItem;
    use crate::store::LocalStore;

    fn offline_controller() -> CheckoutController {
        let api = ApiClient::with_http_client(
            &Url::parse("http://127.0.0.1:9").unwrap(),
            reqwest::Client::new(),
            LocalStore::in_memory(),
        );
        CheckoutController::new(api)
    }

    fn billing() -> BillingDetails {
        BillingDetails {
            full_name: "Ana Gómez".to_string(),
            email: "ana@avenue.studio".to_string(),
            phone: "3000000000".to_string(),
            document_id: "1020304050".to_string(),
            ..BillingDetails::default()
        }
    }

    fn add_item(controller: &CheckoutController) {
        controller
            .cart
            .add(CartItem {
                product_id: ProductId::new("tee"),
                sku: None,
                name: "Tee".to_string(),
                price: Decimal::from(100_000),
                quantity: 1,
                size: None,
                image: None,
            })
            .unwrap();
    }

    #[test]
    fn test_billing_requires_fields() {
        let mut b = billing();
        assert!(validate_billing(&b).is_ok());
        b.document_id = String::new();
        assert!(matches!(
            validate_billing(&b),
            Err(ValidationError::MissingField("document_id"))
        ));
        b = billing();
        b.email = "nope".to_string();
        assert!(matches!(
            validate_billing(&b),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_cart_rejected_before_request() {
        let mut controller = offline_controller();
        let err = controller.submit(&billing(), true).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(ValidationError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_delivery_requires_location() {
        let mut controller = offline_controller();
        add_item(&controller);
        controller.set_delivery_method(DeliveryMethod::Delivery);
        let err = controller.submit(&billing(), true).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::NoDeliveryLocation)
        ));
    }

    #[tokio::test]
    async fn test_terms_required() {
        let mut controller = offline_controller();
        add_item(&controller);
        let err = controller.submit(&billing(), false).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::TermsNotAccepted)
        ));
    }

    #[tokio::test]
    async fn test_empty_coupon_rejected_locally() {
        let mut controller = offline_controller();
        let err = controller.apply_coupon("  ").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::EmptyCouponCode)
        ));
    }

    #[test]
    fn test_delivery_cost_only_counts_when_delivering() {
        let mut controller = offline_controller();
        add_item(&controller);
        controller.delivery = Some(DeliverySelection {
            location: Coordinates { lat: 6.2, lng: -75.5 },
            address: "Cra 43A".to_string(),
            quote: DeliveryQuote {
                cost: Decimal::from(8_000),
                distance_km: Some(3.0),
                available: true,
                message: None,
            },
        });

        assert_eq!(controller.totals().unwrap().total, Decimal::from(100_000));
        controller.set_delivery_method(DeliveryMethod::Delivery);
        assert_eq!(controller.totals().unwrap().total, Decimal::from(108_000));
    }

    #[test]
    fn test_coupon_ignored_after_cart_change() {
        let mut controller = offline_controller();
        add_item(&controller);
        controller.coupon = Some(AppliedCoupon {
            code: "WELCOME10".to_string(),
            discount: Decimal::from(10_000),
            description: None,
            subtotal: Decimal::from(100_000),
        });
        assert_eq!(controller.totals().unwrap().total, Decimal::from(90_000));

        add_item(&controller);
        let totals = controller.totals().unwrap();
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::from(200_000));
    }

    #[test]
    fn test_resolve_without_report_is_invalid() {
        let mut controller = offline_controller();
        assert!(matches!(
            controller.resolve_out_of_stock(OutOfStockResolution::Abandon),
            Err(ClientError::InvalidState(_))
        ));
    }
}

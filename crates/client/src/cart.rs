//! Shopping cart.
//!
//! The cart is the only entity with durable client-side state: it is stored
//! under `avenue_cart` as a JSON array of line items and must round-trip
//! through storage unchanged. Once the backend reports items as unavailable,
//! those items are removed (or the whole cart is cleared) before the user can
//! continue.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use avenue_core::{Price, ProductId};

use crate::store::{LocalStore, StoreError};

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Backend product ID.
    #[serde(rename = "id")]
    pub product_id: ProductId,
    /// Variant SKU, when the product has variants.
    #[serde(default)]
    pub sku: Option<String>,
    /// Product name at the time it was added.
    pub name: String,
    /// Unit price at the time it was added.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Units of this product and size.
    pub quantity: u32,
    /// Selected size, if the product is sized.
    #[serde(default)]
    pub size: Option<String>,
    /// Thumbnail URL.
    #[serde(default)]
    pub image: Option<String>,
}

impl CartItem {
    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    fn same_line(&self, product_id: &ProductId, size: Option<&str>) -> bool {
        &self.product_id == product_id && self.size.as_deref() == size
    }
}

/// An item the backend reported as out of stock during checkout validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableItem {
    /// Backend product ID.
    #[serde(alias = "id")]
    pub product_id: ProductId,
    /// Product name, for display.
    #[serde(default)]
    pub name: String,
    /// Size that ran out, if sized.
    #[serde(default)]
    pub size: Option<String>,
    /// Quantity the cart asked for.
    #[serde(default)]
    pub requested: u32,
    /// Quantity actually in stock.
    #[serde(default)]
    pub available: u32,
}

/// Ordered list of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Build a cart from existing lines, keeping their order.
    #[must_use]
    pub const fn from_items(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines, saturating at `u32::MAX`.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Subtotal as a display price.
    #[must_use]
    pub fn subtotal_price(&self) -> Price {
        Price::cop(self.subtotal())
    }

    /// Add a line, merging with an existing line for the same product and size.
    ///
    /// Adding zero units is a no-op.
    pub fn add(&mut self, item: CartItem) {
        if item.quantity == 0 {
            return;
        }
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|line| line.same_line(&item.product_id, item.size.as_deref()))
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Set the quantity of a line; zero removes it. Returns whether the line existed.
    pub fn set_quantity(
        &mut self,
        product_id: &ProductId,
        size: Option<&str>,
        quantity: u32,
    ) -> bool {
        if quantity == 0 {
            return self.remove(product_id, size);
        }
        self.items
            .iter_mut()
            .find(|line| line.same_line(product_id, size))
            .map(|line| line.quantity = quantity)
            .is_some()
    }

    /// Remove a line. Returns whether it existed.
    pub fn remove(&mut self, product_id: &ProductId, size: Option<&str>) -> bool {
        let before = self.items.len();
        self.items.retain(|line| !line.same_line(product_id, size));
        self.items.len() != before
    }

    /// Drop every line the backend reported unavailable.
    ///
    /// An unavailable item without a size matches every size of that product.
    /// Returns the number of lines removed.
    pub fn remove_unavailable(&mut self, unavailable: &[UnavailableItem]) -> usize {
        let before = self.items.len();
        self.items.retain(|line| {
            !unavailable.iter().any(|gone| {
                gone.product_id == line.product_id
                    && (gone.size.is_none() || gone.size == line.size)
            })
        });
        before - self.items.len()
    }
}

// =============================================================================
// Persisted cart operations
// =============================================================================

/// Cart operations that read and write the persisted cart.
///
/// Each call loads the latest cart from the store, applies the change and
/// saves it back.
#[derive(Debug, Clone)]
pub struct CartService {
    store: LocalStore,
}

impl CartService {
    /// Create a service over `store`.
    #[must_use]
    pub const fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn load(&self) -> Result<Cart, StoreError> {
        self.store.cart()
    }

    /// Add an item and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    #[instrument(skip(self, item), fields(product_id = %item.product_id, quantity = item.quantity))]
    pub fn add(&self, item: CartItem) -> Result<Cart, StoreError> {
        self.update(|cart| cart.add(item))
    }

    /// Change a line's quantity and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn set_quantity(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        quantity: u32,
    ) -> Result<Cart, StoreError> {
        self.update(|cart| {
            cart.set_quantity(product_id, size, quantity);
        })
    }

    /// Remove a line and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn remove(&self, product_id: &ProductId, size: Option<&str>) -> Result<Cart, StoreError> {
        self.update(|cart| {
            cart.remove(product_id, size);
        })
    }

    /// Strip unavailable items and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    #[instrument(skip(self, unavailable), fields(count = unavailable.len()))]
    pub fn remove_unavailable(&self, unavailable: &[UnavailableItem]) -> Result<Cart, StoreError> {
        self.update(|cart| {
            let removed = cart.remove_unavailable(unavailable);
            debug!(removed, "Removed unavailable cart lines");
        })
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.clear_cart()
    }

    fn update(&self, change: impl FnOnce(&mut Cart)) -> Result<Cart, StoreError> {
        let mut cart = self.store.cart()?;
        change(&mut cart);
        self.store.save_cart(&cart)?;
        Ok(cart)
    }
}

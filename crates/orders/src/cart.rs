//! Client-side cart: selected items plus fulfillment choices, before an order exists.
//!
//! `Cart` is plain serde data so a client can persist it between sessions.
//! `checkout()` turns it into the snapshot submitted to order creation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_products::ProductId;

use crate::pricing::{PriceBreakdown, PricingOverflow, PricingPolicy};

/// A selected product with quantity and the price/image captured at add time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub product: ProductId,
    pub name: String,
    pub qty: u32,
    #[serde(default)]
    pub image: String,
    pub price: Decimal,
    #[serde(default)]
    pub count_in_stock: i64,
}

impl CartItem {
    /// `price × qty`, or `None` when the product is not representable.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.qty))
    }

    #[cfg(test)]
    pub(crate) fn for_test(price: Decimal, qty: u32) -> Self {
        Self {
            product: ProductId::new(storefront_core::AggregateId::new()),
            name: "Test item".to_string(),
            qty,
            image: String::new(),
            price,
            count_in_stock: 10,
        }
    }
}

/// Delivery address for an order. All fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Name of the first blank field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("address", &self.address),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
    }

    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("shipping address is missing")]
    MissingShippingAddress,

    #[error("payment method is missing")]
    MissingPaymentMethod,

    #[error(transparent)]
    AmountOutOfRange(#[from] PricingOverflow),
}

/// Finalized cart snapshot: the order-creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub order_items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

impl OrderDraft {
    pub fn prices(&self) -> PriceBreakdown {
        PriceBreakdown {
            items_price: self.items_price,
            tax_price: self.tax_price,
            shipping_price: self.shipping_price,
            total_price: self.total_price,
        }
    }
}

/// Cart state accumulated by the client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    cart_items: Vec<CartItem>,
    shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    payment_method: String,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.cart_items
    }

    pub fn shipping_address(&self) -> Option<&ShippingAddress> {
        self.shipping_address.as_ref()
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    /// Add an item; an existing line for the same product is replaced wholesale.
    pub fn add_item(&mut self, item: CartItem) {
        match self.cart_items.iter_mut().find(|x| x.product == item.product) {
            Some(existing) => *existing = item,
            None => self.cart_items.push(item),
        }
    }

    pub fn remove_item(&mut self, product: ProductId) {
        self.cart_items.retain(|x| x.product != product);
    }

    /// Set the quantity of a line. Unknown products are ignored.
    pub fn update_quantity(&mut self, product: ProductId, qty: u32) {
        if let Some(item) = self.cart_items.iter_mut().find(|x| x.product == product) {
            item.qty = qty;
        }
    }

    /// Empty the item list. Shipping address and payment method are kept.
    pub fn clear(&mut self) {
        self.cart_items.clear();
    }

    pub fn save_shipping_address(&mut self, address: ShippingAddress) {
        self.shipping_address = Some(address);
    }

    pub fn save_payment_method(&mut self, method: impl Into<String>) {
        self.payment_method = method.into();
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u64 {
        self.cart_items.iter().map(|i| u64::from(i.qty)).sum()
    }

    pub fn totals(&self, policy: &PricingPolicy) -> Result<PriceBreakdown, PricingOverflow> {
        policy.quote_items(&self.cart_items)
    }

    /// Build the order-creation payload.
    ///
    /// Requires at least one item, a complete shipping address and a payment method,
    /// in that order, and totals that fit in a `Decimal`.
    pub fn checkout(&self, policy: &PricingPolicy) -> Result<OrderDraft, CheckoutError> {
        if self.cart_items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let shipping_address = self
            .shipping_address
            .as_ref()
            .filter(|a| a.is_complete())
            .ok_or(CheckoutError::MissingShippingAddress)?;
        if self.payment_method.trim().is_empty() {
            return Err(CheckoutError::MissingPaymentMethod);
        }

        let prices = self.totals(policy)?;
        Ok(OrderDraft {
            order_items: self.cart_items.clone(),
            shipping_address: shipping_address.clone(),
            payment_method: self.payment_method.clone(),
            items_price: prices.items_price,
            tax_price: prices.tax_price,
            shipping_price: prices.shipping_price,
            total_price: prices.total_price,
        })
    }
}

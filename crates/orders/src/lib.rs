//! Orders domain module: checkout pricing, the client cart, and orders.
//!
//! This crate contains business rules for the checkout pipeline, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod cart;
pub mod order;
pub mod pricing;

pub use cart::{Cart, CartItem, CheckoutError, OrderDraft, ShippingAddress};
pub use order::{
    MarkDelivered, MarkPaid, Order, OrderCommand, OrderDelivered, OrderEvent, OrderId, OrderPaid,
    OrderPlaced, OrderStatus, PaymentResult, PlaceOrder,
};
pub use pricing::{PriceBreakdown, PricingOverflow, PricingPolicy};

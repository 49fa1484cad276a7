use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainEvent, UserId};

use crate::cart::{CartItem, ShippingAddress};
use crate::pricing::PriceBreakdown;

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Order status lifecycle, derived from the payment/delivery flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Paid,
    Delivered,
}

/// Opaque payment confirmation supplied by the client when paying.
///
/// Stored verbatim; nothing here is verified against a payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

/// Aggregate root: Order.
///
/// Immutable snapshot of a checkout. After placement only the payment and
/// delivery flags change; the item list and every price stay as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    id: OrderId,
    user: Option<UserId>,
    order_items: Vec<CartItem>,
    shipping_address: ShippingAddress,
    payment_method: String,
    #[serde(default)]
    payment_result: Option<PaymentResult>,
    items_price: Decimal,
    tax_price: Decimal,
    shipping_price: Decimal,
    total_price: Decimal,
    is_paid: bool,
    #[serde(default)]
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    #[serde(default)]
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(rename = "__v")]
    version: u64,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            user: None,
            order_items: Vec::new(),
            shipping_address: ShippingAddress::default(),
            payment_method: String::new(),
            payment_result: None,
            items_price: Decimal::ZERO,
            tax_price: Decimal::ZERO,
            shipping_price: Decimal::ZERO,
            total_price: Decimal::ZERO,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user == Some(user)
    }

    pub fn items(&self) -> &[CartItem] {
        &self.order_items
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn payment_result(&self) -> Option<&PaymentResult> {
        self.payment_result.as_ref()
    }

    pub fn prices(&self) -> PriceBreakdown {
        PriceBreakdown {
            items_price: self.items_price,
            tax_price: self.tax_price,
            shipping_price: self.shipping_price,
            total_price: self.total_price,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn is_delivered(&self) -> bool {
        self.is_delivered
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> OrderStatus {
        if self.is_delivered {
            OrderStatus::Delivered
        } else if self.is_paid {
            OrderStatus::Paid
        } else {
            OrderStatus::Created
        }
    }

    pub fn is_placed(&self) -> bool {
        self.version > 0
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
///
/// Prices are taken as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub user: UserId,
    pub order_items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub prices: PriceBreakdown,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkPaid {
    pub order_id: OrderId,
    pub payment_result: PaymentResult,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDelivered {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    MarkPaid(MarkPaid),
    MarkDelivered(MarkDelivered),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub user: UserId,
    pub order_items: Vec<CartItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub prices: PriceBreakdown,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaid {
    pub order_id: OrderId,
    pub payment_result: PaymentResult,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderDelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDelivered {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderPaid(OrderPaid),
    OrderDelivered(OrderDelivered),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::OrderPaid(_) => "orders.order.paid",
            OrderEvent::OrderDelivered(_) => "orders.order.delivered",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::OrderPaid(e) => e.occurred_at,
            OrderEvent::OrderDelivered(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.user = Some(e.user);
                self.order_items = e.order_items.clone();
                self.shipping_address = e.shipping_address.clone();
                self.payment_method = e.payment_method.clone();
                self.items_price = e.prices.items_price;
                self.tax_price = e.prices.tax_price;
                self.shipping_price = e.prices.shipping_price;
                self.total_price = e.prices.total_price;
                self.is_paid = false;
                self.paid_at = None;
                self.payment_result = None;
                self.is_delivered = false;
                self.delivered_at = None;
                self.created_at = e.occurred_at;
                self.updated_at = e.occurred_at;
            }
            OrderEvent::OrderPaid(e) => {
                self.is_paid = true;
                self.paid_at = Some(e.occurred_at);
                self.payment_result = Some(e.payment_result.clone());
                self.updated_at = e.occurred_at;
            }
            OrderEvent::OrderDelivered(e) => {
                self.is_delivered = true;
                self.delivered_at = Some(e.occurred_at);
                self.updated_at = e.occurred_at;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::MarkPaid(cmd) => self.handle_mark_paid(cmd),
            OrderCommand::MarkDelivered(cmd) => self.handle_mark_delivered(cmd),
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.is_placed() {
            return Err(DomainError::conflict("order already exists"));
        }

        if cmd.order_items.is_empty() {
            return Err(DomainError::validation("No order items"));
        }
        for item in &cmd.order_items {
            if item.qty == 0 {
                return Err(DomainError::validation(format!(
                    "Quantity for '{}' must be at least 1",
                    item.name
                )));
            }
            if item.price < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "Price for '{}' cannot be negative",
                    item.name
                )));
            }
        }
        let items_price = cmd
            .order_items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| {
                item.line_total().and_then(|line| acc.checked_add(line))
            });
        if items_price.is_none() {
            return Err(DomainError::validation("Order amounts are out of range"));
        }
        if let Some(field) = cmd.shipping_address.missing_field() {
            return Err(DomainError::validation(format!(
                "Shipping address is incomplete: {field} is required"
            )));
        }
        if cmd.payment_method.trim().is_empty() {
            return Err(DomainError::validation("Payment method is required"));
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            user: cmd.user,
            order_items: cmd.order_items.clone(),
            shipping_address: cmd.shipping_address.clone(),
            payment_method: cmd.payment_method.trim().to_string(),
            prices: cmd.prices,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// Paying is unconditional: a repeat payment overwrites `paid_at` and the result.
    fn handle_mark_paid(&self, cmd: &MarkPaid) -> Result<Vec<OrderEvent>, DomainError> {
        if !self.is_placed() {
            return Err(DomainError::not_found());
        }
        self.ensure_order_id(cmd.order_id)?;

        Ok(vec![OrderEvent::OrderPaid(OrderPaid {
            order_id: cmd.order_id,
            payment_result: cmd.payment_result.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_delivered(
        &self,
        cmd: &MarkDelivered,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        if !self.is_placed() {
            return Err(DomainError::not_found());
        }
        self.ensure_order_id(cmd.order_id)?;

        Ok(vec![OrderEvent::OrderDelivered(OrderDelivered {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PricingPolicy;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn test_order_id() -> OrderId {
        OrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    fn place_cmd(order_id: OrderId, items: Vec<CartItem>) -> PlaceOrder {
        let prices = PricingPolicy::STANDARD.quote_items(&items).unwrap();
        PlaceOrder {
            order_id,
            user: UserId::new(),
            order_items: items,
            shipping_address: address(),
            payment_method: "CreditCard".to_string(),
            prices,
            occurred_at: test_time(),
        }
    }

    fn placed_order() -> Order {
        let order_id = test_order_id();
        let mut order = Order::empty(order_id);
        let cmd = place_cmd(
            order_id,
            vec![
                CartItem::for_test(dec!(30), 2),
                CartItem::for_test(dec!(25), 1),
            ],
        );
        let events = order.handle(&OrderCommand::PlaceOrder(cmd)).unwrap();
        order.apply(&events[0]);
        order
    }

    fn pay(order: &mut Order, at: DateTime<Utc>) {
        let cmd = OrderCommand::MarkPaid(MarkPaid {
            order_id: order.id_typed(),
            payment_result: PaymentResult {
                id: Some("PAY-1".to_string()),
                status: Some("COMPLETED".to_string()),
                update_time: None,
                email_address: Some("buyer@example.com".to_string()),
            },
            occurred_at: at,
        });
        let events = order.handle(&cmd).unwrap();
        order.apply(&events[0]);
    }

    #[test]
    fn place_order_snapshots_cart_and_prices() {
        let order = placed_order();

        assert!(order.is_placed());
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.prices().items_price, dec!(85));
        assert_eq!(order.prices().tax_price, dec!(12.75));
        assert_eq!(order.prices().shipping_price, dec!(10));
        assert_eq!(order.prices().total_price, dec!(107.75));
        assert!(!order.is_paid());
        assert!(!order.is_delivered());
        assert_eq!(order.version(), 1);
    }

    #[test]
    fn submitted_prices_are_trusted_as_is() {
        let order_id = test_order_id();
        let order = Order::empty(order_id);
        let mut cmd = place_cmd(order_id, vec![CartItem::for_test(dec!(30), 2)]);
        cmd.prices.total_price = dec!(0.01);

        let events = order.handle(&OrderCommand::PlaceOrder(cmd)).unwrap();
        match &events[0] {
            OrderEvent::OrderPlaced(e) => assert_eq!(e.prices.total_price, dec!(0.01)),
            _ => panic!("Expected OrderPlaced event"),
        }
    }

    #[test]
    fn empty_order_is_rejected() {
        let order_id = test_order_id();
        let order = Order::empty(order_id);
        let err = order
            .handle(&OrderCommand::PlaceOrder(place_cmd(order_id, vec![])))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("No order items"));
    }

    #[test]
    fn zero_quantity_and_incomplete_address_are_rejected() {
        let order_id = test_order_id();
        let order = Order::empty(order_id);

        let cmd = place_cmd(order_id, vec![CartItem::for_test(dec!(30), 0)]);
        let err = order.handle(&OrderCommand::PlaceOrder(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut cmd = place_cmd(order_id, vec![CartItem::for_test(dec!(30), 1)]);
        cmd.shipping_address.country = String::new();
        let err = order.handle(&OrderCommand::PlaceOrder(cmd)).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("country") => {}
            other => panic!("Expected Validation for country, got {other:?}"),
        }

        let mut cmd = place_cmd(order_id, vec![CartItem::for_test(dec!(30), 1)]);
        cmd.payment_method = "  ".to_string();
        let err = order.handle(&OrderCommand::PlaceOrder(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn unrepresentable_item_totals_are_rejected() {
        let order_id = test_order_id();
        let order = Order::empty(order_id);
        let huge = dec!(70000000000000000000000000000);

        let cmd = PlaceOrder {
            order_items: vec![CartItem::for_test(huge, 4_000_000_000)],
            prices: PriceBreakdown::default(),
            ..place_cmd(order_id, vec![])
        };
        let err = order.handle(&OrderCommand::PlaceOrder(cmd)).unwrap_err();
        assert_eq!(err, DomainError::validation("Order amounts are out of range"));

        let cmd = PlaceOrder {
            order_items: vec![CartItem::for_test(huge, 1), CartItem::for_test(huge, 1)],
            prices: PriceBreakdown::default(),
            ..place_cmd(order_id, vec![])
        };
        assert!(order.handle(&OrderCommand::PlaceOrder(cmd)).is_err());
    }

    #[test]
    fn cannot_place_twice() {
        let order = placed_order();
        let cmd = place_cmd(order.id_typed(), vec![CartItem::for_test(dec!(1), 1)]);
        let err = order.handle(&OrderCommand::PlaceOrder(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn paying_sets_flag_and_timestamp_without_touching_prices() {
        let mut order = placed_order();
        let prices_before = order.prices();
        let items_before = order.items().to_vec();
        let now = test_time();

        pay(&mut order, now);

        assert!(order.is_paid());
        assert_eq!(order.paid_at(), Some(now));
        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(
            order.payment_result().and_then(|r| r.status.as_deref()),
            Some("COMPLETED")
        );
        assert_eq!(order.prices(), prices_before);
        assert_eq!(order.items(), items_before.as_slice());
    }

    #[test]
    fn paying_twice_overwrites_paid_at() {
        let mut order = placed_order();
        let first = test_time();
        let second = first + Duration::minutes(5);

        pay(&mut order, first);
        pay(&mut order, second);

        assert!(order.is_paid());
        assert_eq!(order.paid_at(), Some(second));
        assert_eq!(order.version(), 3);
    }

    #[test]
    fn paying_missing_order_is_not_found() {
        let order = Order::empty(test_order_id());
        let err = order
            .handle(&OrderCommand::MarkPaid(MarkPaid {
                order_id: order.id_typed(),
                payment_result: PaymentResult::default(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn full_lifecycle_created_to_paid_to_delivered() {
        let mut order = placed_order();
        pay(&mut order, test_time());

        let delivered_at = test_time();
        let events = order
            .handle(&OrderCommand::MarkDelivered(MarkDelivered {
                order_id: order.id_typed(),
                occurred_at: delivered_at,
            }))
            .unwrap();
        order.apply(&events[0]);

        assert_eq!(order.status(), OrderStatus::Delivered);
        assert!(order.is_paid());
        assert_eq!(order.delivered_at(), Some(delivered_at));
    }

    #[test]
    fn order_id_mismatch_is_rejected() {
        let order = placed_order();
        let err = order
            .handle(&OrderCommand::MarkDelivered(MarkDelivered {
                order_id: test_order_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn document_json_round_trips() {
        let mut order = placed_order();
        pay(&mut order, test_time());

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["_id"], order.id_typed().to_string());
        assert_eq!(json["isPaid"], true);
        assert_eq!(json["isDelivered"], false);
        assert_eq!(json["totalPrice"], 107.75);
        assert_eq!(json["paymentResult"]["email_address"], "buyer@example.com");
        assert_eq!(json["shippingAddress"]["postalCode"], "12345");

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: marking paid never alters any price field.
            #[test]
            fn mark_paid_preserves_prices(
                cents in proptest::collection::vec(0i64..50_000, 1..10),
                total_cents in 0i64..1_000_000,
            ) {
                let order_id = test_order_id();
                let mut order = Order::empty(order_id);
                let items = cents
                    .iter()
                    .map(|c| CartItem::for_test(Decimal::new(*c, 2), 1))
                    .collect();
                let mut cmd = place_cmd(order_id, items);
                cmd.prices.total_price = Decimal::new(total_cents, 2);
                let events = order.handle(&OrderCommand::PlaceOrder(cmd)).unwrap();
                order.apply(&events[0]);
                let before = order.prices();

                pay(&mut order, Utc::now());

                prop_assert!(order.is_paid());
                prop_assert!(order.paid_at().is_some());
                prop_assert_eq!(order.prices(), before);
            }
        }
    }
}

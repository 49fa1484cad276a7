//! Order total computation.
//!
//! The same policy is used by the cart (display) and by the server (audit of
//! client-submitted totals).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::CartItem;

/// Amounts too large to represent; raised instead of panicking on client input.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Order amounts are out of range")]
pub struct PricingOverflow;

/// Tax, shipping and total rules applied to a set of cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Fraction of `items_price` charged as tax.
    pub tax_rate: Decimal,
    /// Shipping is free when `items_price` is strictly above this amount.
    pub free_shipping_threshold: Decimal,
    /// Shipping charged at or below the threshold.
    pub flat_shipping_fee: Decimal,
}

impl PricingPolicy {
    /// 15% tax, free shipping above $100, otherwise $10.
    pub const STANDARD: Self = Self {
        tax_rate: Decimal::from_parts(15, 0, 0, false, 2),
        free_shipping_threshold: Decimal::ONE_HUNDRED,
        flat_shipping_fee: Decimal::TEN,
    };

    /// Price a list of `(unit_price, quantity)` lines.
    pub fn quote<I>(&self, lines: I) -> Result<PriceBreakdown, PricingOverflow>
    where
        I: IntoIterator<Item = (Decimal, u32)>,
    {
        let items_price = lines.into_iter().try_fold(Decimal::ZERO, |acc, (price, qty)| {
            price
                .checked_mul(Decimal::from(qty))
                .and_then(|line| acc.checked_add(line))
                .ok_or(PricingOverflow)
        })?;
        self.breakdown_for(items_price)
    }

    /// Price cart items using their snapshot prices.
    pub fn quote_items(&self, items: &[CartItem]) -> Result<PriceBreakdown, PricingOverflow> {
        self.quote(items.iter().map(|i| (i.price, i.qty)))
    }

    pub fn shipping_for(&self, items_price: Decimal) -> Decimal {
        if items_price > self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.flat_shipping_fee
        }
    }

    fn breakdown_for(&self, items_price: Decimal) -> Result<PriceBreakdown, PricingOverflow> {
        let tax_price = items_price.checked_mul(self.tax_rate).ok_or(PricingOverflow)?;
        let shipping_price = self.shipping_for(items_price);
        let total_price = items_price
            .checked_add(tax_price)
            .and_then(|t| t.checked_add(shipping_price))
            .ok_or(PricingOverflow)?;
        Ok(PriceBreakdown {
            items_price,
            tax_price,
            shipping_price,
            total_price,
        })
    }

    /// Recompute totals for `items` and return them when they differ from `submitted`.
    pub fn audit(
        &self,
        items: &[CartItem],
        submitted: &PriceBreakdown,
    ) -> Result<Option<PriceBreakdown>, PricingOverflow> {
        let expected = self.quote_items(items)?;
        if expected.normalized() == submitted.normalized() {
            Ok(None)
        } else {
            Ok(Some(expected))
        }
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Computed order amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

impl PriceBreakdown {
    /// Same amounts rounded to cents, for comparisons against client input.
    pub fn normalized(&self) -> Self {
        Self {
            items_price: self.items_price.round_dp(2),
            tax_price: self.tax_price.round_dp(2),
            shipping_price: self.shipping_price.round_dp(2),
            total_price: self.total_price.round_dp(2),
        }
    }
}

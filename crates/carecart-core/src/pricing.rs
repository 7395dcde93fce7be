//! # Pricing Calculator
//!
//! Pure functions turning a list of cart lines and an optional coupon into
//! the three numbers every cart screen shows.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  original_total   = Σ unit_price × quantity                             │
//! │                                                                         │
//! │  discount_amount  = 0                         (no coupon / empty cart)  │
//! │                   = 0                         (below minimum amount)    │
//! │                   = original × bps / 10000    (percentage)              │
//! │                   = min(value, original)      (fixed)                   │
//! │                                                                         │
//! │  discounted_total = max(0, original_total − discount_amount)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CartItem, Coupon, DiscountRule};

/// Derived pricing for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub original_total: Money,
    pub discount_amount: Money,
    pub discounted_total: Money,
}

impl PriceBreakdown {
    /// Breakdown with no discount.
    pub fn undiscounted(original_total: Money) -> Self {
        PriceBreakdown {
            original_total,
            discount_amount: Money::zero(),
            discounted_total: original_total,
        }
    }

    /// Builds a breakdown from totals the backend computed.
    ///
    /// Used after a coupon is applied: the server enforces rules (minimum
    /// order value, usage limits) that the client cannot see, so its numbers
    /// win over a local recomputation.
    pub fn from_server(original_total: Money, discounted_total: Money) -> Self {
        let discounted_total = discounted_total.max(Money::zero()).min(original_total);
        PriceBreakdown {
            original_total,
            discount_amount: original_total - discounted_total,
            discounted_total,
        }
    }

    /// `discounted == max(0, original − discount)` and nothing is negative.
    pub fn is_consistent(&self) -> bool {
        !self.original_total.is_negative()
            && !self.discount_amount.is_negative()
            && !self.discounted_total.is_negative()
            && self.discounted_total == self.original_total.saturating_sub_to_zero(self.discount_amount)
    }
}

/// Sum of line totals.
pub fn subtotal(items: &[CartItem]) -> Money {
    items.iter().map(CartItem::line_total).sum()
}

/// Discount a coupon yields on `original_total`.
///
/// Returns zero for an empty cart and for a subtotal below the coupon's
/// minimum amount. The result never exceeds `original_total`.
pub fn discount_for(original_total: Money, coupon: &Coupon) -> Money {
    if !original_total.is_positive() || !coupon.meets_minimum(original_total) {
        return Money::zero();
    }

    let discount = match coupon.rule {
        DiscountRule::Percentage { bps } => original_total.percentage(bps),
        DiscountRule::Fixed { amount } => amount.max(Money::zero()),
    };
    discount.min(original_total)
}

/// Computes the full breakdown for `items` with an optional coupon.
///
/// ```rust
/// use carecart_core::money::Money;
/// use carecart_core::pricing::calculate;
///
/// let breakdown = calculate(&[], None);
/// assert_eq!(breakdown.discounted_total, Money::zero());
/// ```
pub fn calculate(items: &[CartItem], coupon: Option<&Coupon>) -> PriceBreakdown {
    let original_total = subtotal(items);
    let discount_amount = coupon
        .map(|c| discount_for(original_total, c))
        .unwrap_or_default();

    PriceBreakdown {
        original_total,
        discount_amount,
        discounted_total: original_total.saturating_sub_to_zero(discount_amount),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Domain Types
//!
//! Core domain types used throughout CareCart.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    CartItem     │   │     Coupon      │   │  FamilyMember   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │   │  code           │   │  id             │       │
//! │  │  quantity ≥ 1   │   │  rule (%/fixed) │   │  relation       │       │
//! │  │  unit_price     │   │  minimum_amount │   │  date_of_birth  │       │
//! │  │  product snap   │   │  expires_at     │   │  age (derived)  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Address      │   │ Hospital/Doctor │   │  PaymentOrder   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  pincode (6)    │   │  admin CRUD     │   │  order_id       │       │
//! │  │  landmark?      │   │  consult fee    │   │  amount (paise) │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identity is owned by the backend: every id here is the opaque string the
//! REST API hands out.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Cart Item
// =============================================================================

/// Product data frozen onto a cart line when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    /// Test or package name.
    pub name: String,

    /// Turnaround shown to the patient, e.g. "24 hours".
    pub report_time: Option<String>,
}

/// A line item in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub product_id: String,
    /// Always ≥ 1. Removing the last unit removes the line.
    pub quantity: i64,
    /// Price per unit as confirmed by the backend.
    pub unit_price: Money,
    pub product: ProductSnapshot,
}

impl CartItem {
    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// Wire-level discount kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// How a coupon reduces the subtotal.
///
/// Percentages are held in basis points so that `12.5%` survives without
/// floating point: `Percentage { bps: 1250 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DiscountRule {
    Percentage { bps: u32 },
    Fixed { amount: Money },
}

impl DiscountRule {
    pub fn discount_type(&self) -> DiscountType {
        match self {
            DiscountRule::Percentage { .. } => DiscountType::Percentage,
            DiscountRule::Fixed { .. } => DiscountType::Fixed,
        }
    }
}

/// A named discount applicable to one cart at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub rule: DiscountRule,
    /// Subtotal the cart must reach for the coupon to apply.
    pub minimum_amount: Option<Money>,
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
}

impl Coupon {
    /// Whether `subtotal` satisfies the coupon's minimum order value.
    pub fn meets_minimum(&self, subtotal: Money) -> bool {
        self.minimum_amount.map_or(true, |min| subtotal >= min)
    }

    /// Whether the coupon had expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// =============================================================================
// Family Member & Address
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// A person a booking can be made for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// "Self", "Spouse", "Father", ...
    pub relation: String,
    pub gender: Gender,
    #[ts(as = "String")]
    pub date_of_birth: NaiveDate,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl FamilyMember {
    /// Age in completed years on `today`.
    pub fn age(&self, today: NaiveDate) -> u32 {
        age_on(self.date_of_birth, today)
    }
}

/// Completed years between `dob` and `today` (0 for future dates).
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    if today <= dob {
        return 0;
    }
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// A sample-collection address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub landmark: Option<String>,
}

// =============================================================================
// Hospitals & Doctors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub hospital_id: String,
    pub name: String,
    pub specialization: String,
    pub experience_years: u32,
    pub consultation_fee: Money,
    pub image_url: Option<String>,
}

// =============================================================================
// Payments
// =============================================================================

/// What a payment order is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseKind {
    /// Everything in the cart.
    Cart,
    /// A single product bought without going through the cart.
    Direct,
}

/// A payment order created on the backend, ready for the payment widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub order_id: String,
    /// Amount in minor units, exactly as the widget expects it.
    pub amount: Money,
    pub currency: String,
}

/// What the payment widget hands back after a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentConfirmation {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let dob = date(1990, 6, 15);
        assert_eq!(age_on(dob, date(2026, 6, 14)), 35);
        assert_eq!(age_on(dob, date(2026, 6, 15)), 36);
        assert_eq!(age_on(dob, date(1980, 1, 1)), 0);
    }

    #[test]
    fn test_coupon_minimum_and_expiry() {
        let coupon = Coupon {
            code: "HEALTH10".to_string(),
            rule: DiscountRule::Percentage { bps: 1000 },
            minimum_amount: Some(Money::from_rupees(500)),
            expires_at: Some(Utc::now() - chrono::Duration::days(1)),
            usage_limit: None,
        };
        assert!(!coupon.meets_minimum(Money::from_rupees(499)));
        assert!(coupon.meets_minimum(Money::from_rupees(500)));
        assert!(coupon.is_expired(Utc::now()));
        assert_eq!(coupon.rule.discount_type(), DiscountType::Percentage);
    }

    #[test]
    fn test_line_total() {
        let item = CartItem {
            id: "i1".to_string(),
            cart_id: "c1".to_string(),
            product_id: "p1".to_string(),
            quantity: 3,
            unit_price: Money::from_rupees(299),
            product: ProductSnapshot {
                name: "Lipid Profile".to_string(),
                report_time: Some("24 hours".to_string()),
            },
        };
        assert_eq!(item.line_total(), Money::from_rupees(897));
    }
}

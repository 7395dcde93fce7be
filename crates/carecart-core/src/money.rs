//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  The web client summed prices as JS numbers:                            │
//! │    499.99 × 3 = 1499.9699999999998  ❌ WRONG!                           │
//! │                                                                         │
//! │  A stale float total then leaks into the payment order amount.          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    49999 paise × 3 = 149997 paise                                       │
//! │    Rupees only exist at the wire boundary and in Display               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use carecart_core::money::Money;
//!
//! let price = Money::from_paise(49_900); // ₹499.00
//! let line = price.multiply_quantity(2); // ₹998.00
//! assert_eq!(line.paise(), 99_800);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 of a rupee).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  CartItem.unit_price ──► line total ──► PriceBreakdown.original_total   │
/// │                                              │                          │
/// │                          Coupon ──► discount_amount                     │
/// │                                              │                          │
/// │                                              ▼                          │
/// │                              discounted_total ──► payment order amount  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ```rust
    /// use carecart_core::money::Money;
    ///
    /// let fee = Money::from_paise(50_000); // ₹500.00
    /// assert_eq!(fee.paise(), 50_000);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Converts a decimal rupee amount from the wire into paise.
    ///
    /// ## Note
    /// Only the backend DTO layer calls this. The backend reports cart
    /// totals as JSON numbers in rupees; everything past the boundary is
    /// integer paise. Rounds half away from zero to the nearest paisa.
    pub fn from_rupees_f64(rupees: f64) -> Self {
        Money((rupees * 100.0).round() as i64)
    }

    /// Rupee value for the wire (decimal JSON number).
    pub fn to_rupees_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use carecart_core::money::Money;
    ///
    /// let unit_price = Money::from_paise(29_900);
    /// assert_eq!(unit_price.multiply_quantity(3).paise(), 89_700);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps` basis points of this amount (1000 bps = 10%).
    ///
    /// ## Implementation
    /// Integer math with half-up rounding: `(amount * bps + 5000) / 10000`.
    /// i128 keeps large carts from overflowing.
    ///
    /// ```rust
    /// use carecart_core::money::Money;
    ///
    /// let subtotal = Money::from_rupees(1000);
    /// assert_eq!(subtotal.percentage(1000), Money::from_rupees(100));
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let part = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_paise(part as i64)
    }

    /// Subtracts `other`, flooring the result at zero.
    ///
    /// A discount can never push a payable amount below ₹0.00.
    #[inline]
    pub fn saturating_sub_to_zero(self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Human-readable rupee format. UI localisation happens in the front end.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(49_950);
        assert_eq!(money.paise(), 49_950);
        assert_eq!(money.rupees(), 499);
        assert_eq!(money.paise_part(), 50);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(49_950).to_string(), "₹499.50");
        assert_eq!(Money::from_rupees(5).to_string(), "₹5.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_wire_conversion_rounds_float_noise() {
        // 1499.97 arrives as 1499.9699999999998 from a JS client
        assert_eq!(Money::from_rupees_f64(1499.969_999_999_999_8).paise(), 149_997);
        assert_eq!(Money::from_rupees_f64(0.1 + 0.2).paise(), 30);
        assert!((Money::from_paise(149_997).to_rupees_f64() - 1499.97).abs() < 1e-9);
    }

    #[test]
    fn test_percentage() {
        let subtotal = Money::from_rupees(1000);
        assert_eq!(subtotal.percentage(1000).paise(), 10_000);
        // 12.5% of ₹3.33 = 41.625 paise → 42
        assert_eq!(Money::from_paise(333).percentage(1250).paise(), 42);
    }

    #[test]
    fn test_saturating_sub_to_zero() {
        let subtotal = Money::from_rupees(200);
        assert_eq!(subtotal.saturating_sub_to_zero(Money::from_rupees(500)), Money::zero());
        assert_eq!(
            subtotal.saturating_sub_to_zero(Money::from_rupees(50)),
            Money::from_rupees(150)
        );
    }

    #[test]
    fn test_sum_and_arithmetic() {
        let total: Money = [Money::from_rupees(1), Money::from_paise(50)].into_iter().sum();
        assert_eq!(total.paise(), 150);
        assert_eq!((total * 2).paise(), 300);
        assert_eq!((total - Money::from_paise(50)).paise(), 100);
    }
}

//! # carecart-core: Pure Business Logic for CareCart
//!
//! This crate holds every rule of the CareCart client as pure functions and
//! plain state machines with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CareCart Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Front end (web / carecart-cli)                  │   │
//! │  │    Tests ──► Cart ──► Members/Address ──► Payment ──► Booking   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    carecart-client                              │   │
//! │  │   CartEngine, CheckoutSession, ConsultationBooking, HTTP        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ carecart-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────────────┐        │   │
//! │  │   │ pricing │ │  cart   │ │ checkout │ │ consultation │        │   │
//! │  │   │ Money   │ │ Ledger  │ │ Stepper  │ │ OTP + phases │        │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └──────────────┘        │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO CLOCK (callers pass "today")        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in integer paise
//! - [`types`] - Domain types (CartItem, Coupon, FamilyMember, ...)
//! - [`pricing`] - Subtotal / discount / payable calculation
//! - [`cart`] - Cart and the optimistic two-tier ledger
//! - [`checkout`] - Items → Members & Address → Payment stepper
//! - [`consultation`] - OTP-gated consultation booking state
//! - [`admin`] - Hospital / doctor edit drafts
//! - [`validation`] - Form validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use carecart_core::money::Money;
//! use carecart_core::pricing::calculate;
//! use carecart_core::types::{Coupon, DiscountRule};
//!
//! let coupon = Coupon {
//!     code: "HEALTH10".to_string(),
//!     rule: DiscountRule::Percentage { bps: 1000 },
//!     minimum_amount: None,
//!     expires_at: None,
//!     usage_limit: None,
//! };
//!
//! // No items: nothing to discount, whatever the coupon says.
//! let breakdown = calculate(&[], Some(&coupon));
//! assert_eq!(breakdown.discounted_total, Money::zero());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod consultation;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLedger, MutationTicket, Resource, Settled};
pub use error::{CoreError, CoreResult, StepGuardError, ValidationError};
pub use money::Money;
pub use pricing::PriceBreakdown;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches a typo like 100 instead of 1 before it reaches the backend.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Number of OTP digit boxes.
pub const OTP_LENGTH: usize = 6;

/// Seconds before another OTP may be requested.
pub const DEFAULT_RESEND_COOLDOWN_SECS: u32 = 30;

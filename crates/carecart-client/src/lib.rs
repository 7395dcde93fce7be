//! # carecart-client: Backend Client & Flows for CareCart
//!
//! Runs the pure state machines of `carecart-core` against the commerce
//! backend and the hosted payment widget.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Client Architecture                            │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌───────────────────────┐  │
//! │  │  CartEngine    │  │  CheckoutSession   │  │  ConsultationBooking  │  │
//! │  │                │  │                    │  │                       │  │
//! │  │ optimistic     │◄─┤ stepper, members,  │  │ form ──► OTP ──►      │  │
//! │  │ edits, coupon, │  │ addresses, order   │  │ payment ──► verify    │  │
//! │  │ rollback       │  │ ──► widget ──►     │  │ resend cooldown task  │  │
//! │  │ watch channel  │  │ booking            │  │                       │  │
//! │  └───────┬────────┘  └─────────┬──────────┘  └───────────┬───────────┘  │
//! │          │                     │                         │              │
//! │          └─────────────┬───────┴─────────────────────────┘              │
//! │                        ▼                                                │
//! │  ┌────────────────────────────────────┐   ┌──────────────────────────┐  │
//! │  │  CommerceBackend (trait)           │   │  PaymentWidget (trait)   │  │
//! │  │  └── HttpBackend (reqwest + JSON)  │   │  options ──► outcome     │  │
//! │  └────────────────────────────────────┘   └──────────────────────────┘  │
//! │                                                                         │
//! │  SessionContext ── AuthEvent broadcast ──► CartEngine (refetch/clear)   │
//! │  Notifier ── toasts (ToastQueue auto-dismiss)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`api`] - Wire DTOs and envelopes for the REST endpoints
//! - [`backend`] - `CommerceBackend` trait and the `HttpBackend` client
//! - [`cart_engine`] - Optimistic cart with rollback and stale-response drop
//! - [`checkout`] - Checkout stepper and cart/direct payment hand-off
//! - [`booking`] - OTP-gated consultation booking
//! - [`admin`] - Hospital and doctor management
//! - [`session`] - Injected login session with expiry and auth events
//! - [`payment`] - Payment widget options and outcome
//! - [`notify`] - Toast notifications
//! - [`config`] - TOML configuration with environment overrides
//! - [`error`] - Client error taxonomy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use carecart_client::{CartEngine, ClientConfig, HttpBackend, SessionContext};
//!
//! let config = ClientConfig::load(None)?;
//! let session = SessionContext::new(config.session_path());
//! session.restore()?;
//!
//! let backend = Arc::new(HttpBackend::new(&config, session.clone())?);
//! let cart = Arc::new(CartEngine::new(backend, session, &config));
//! let _listener = cart.spawn_auth_listener();
//!
//! cart.fetch_cart().await?;
//! cart.add_item("p1", 1).await?;
//! println!("Total: {}", cart.snapshot().cart.pricing.discounted_total);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod notify;
pub mod payment;
pub mod session;

// Flows
pub mod admin;
pub mod booking;
pub mod cart_engine;
pub mod checkout;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use admin::{AdminService, EntityKind, SavedEntity};
pub use backend::{CommerceBackend, HttpBackend};
pub use booking::ConsultationBooking;
pub use cart_engine::{CartEngine, CartView};
pub use checkout::{CheckoutOutcome, CheckoutSession, DirectPurchase};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use notify::{NoOpNotifier, Notification, Notifier, Severity, ToastQueue};
pub use payment::{PaymentOptions, PaymentWidget, Prefill, WidgetOutcome};
pub use session::{AuthEvent, LogoutReason, Session, SessionContext};

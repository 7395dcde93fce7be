//! # Checkout Session
//!
//! Runs the checkout stepper against the backend and hands the payment off
//! to the widget.
//!
//! ## Payment Hand-off
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  pay() (stepper on Payment)          buy_now(product, qty, selections)  │
//! │     │  type: cart + couponCode          │  type: direct + productId/qty │
//! │     └──────────────┬────────────────────┘                               │
//! │                    ▼                                                    │
//! │   POST /api/bookings/create-payment-order ──► {orderId, amount}         │
//! │                    ▼                                                    │
//! │   widget.open(options)                                                  │
//! │     ├── Dismissed ──► "cancelled" toast, no booking, stay on Payment    │
//! │     ├── Failed ─────► error toast, stay on Payment                      │
//! │     └── Success ────► POST /api/bookings/create-booking                 │
//! │                          ├── Ok  ──► refetch cart, stepper reset        │
//! │                          └── Err ──► PaymentVerification (no retry)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

use carecart_core::checkout::{
    AddressDraft, BookingDraft, CheckoutSelections, CheckoutStep, CheckoutStepper, MemberDraft,
};
use carecart_core::types::{
    Address, CartItem, FamilyMember, PaymentOrder, ProductSnapshot, PurchaseKind,
};
use carecart_core::validation::validate_quantity;
use carecart_core::{CoreError, Money};
use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::api::{CreateBookingRequest, CreatePaymentOrderRequest};
use crate::backend::CommerceBackend;
use crate::booking::InFlight;
use crate::cart_engine::CartEngine;
use crate::config::PaymentSettings;
use crate::error::{ClientError, ClientResult};
use crate::notify::{NoOpNotifier, Notification, Notifier};
use crate::payment::{PaymentOptions, PaymentWidget, Prefill, WidgetOutcome};
use crate::session::{Session, SessionContext};

/// How a payment attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Booked { order_id: String, payment_id: String },
    /// The widget was closed without paying.
    Cancelled,
    Failed { reason: String },
}

/// A product bought straight from its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectPurchase {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl DirectPurchase {
    fn as_item(&self) -> CartItem {
        CartItem {
            id: String::new(),
            cart_id: String::new(),
            product_id: self.product_id.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            product: ProductSnapshot {
                name: self.name.clone(),
                report_time: None,
            },
        }
    }
}

fn guard(err: impl Into<CoreError>) -> ClientError {
    ClientError::from(err.into())
}

// =============================================================================
// Checkout Session
// =============================================================================

pub struct CheckoutSession<B, W> {
    backend: Arc<B>,
    cart: Arc<CartEngine<B>>,
    widget: Arc<W>,
    session: SessionContext,
    notifier: Arc<dyn Notifier>,
    payment: PaymentSettings,
    stepper: Mutex<CheckoutStepper>,
    paying: AtomicBool,
}

impl<B: CommerceBackend, W: PaymentWidget> CheckoutSession<B, W> {
    pub fn new(
        backend: Arc<B>,
        cart: Arc<CartEngine<B>>,
        widget: Arc<W>,
        session: SessionContext,
        payment: PaymentSettings,
    ) -> Self {
        CheckoutSession {
            backend,
            cart,
            widget,
            session,
            notifier: Arc::new(NoOpNotifier),
            payment,
            stepper: Mutex::new(CheckoutStepper::new()),
            paying: AtomicBool::new(false),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn with_stepper<R>(&self, f: impl FnOnce(&mut CheckoutStepper) -> R) -> R {
        let mut stepper = self.stepper.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut stepper)
    }

    // =========================================================================
    // Stepper
    // =========================================================================

    pub fn step(&self) -> CheckoutStep {
        self.with_stepper(|s| s.step())
    }

    pub fn selections(&self) -> CheckoutSelections {
        self.with_stepper(|s| s.selections().clone())
    }

    pub fn draft(&self) -> Option<BookingDraft> {
        self.with_stepper(|s| s.draft().cloned())
    }

    /// Advances one step; a failed guard is returned for inline display.
    pub fn next(&self) -> ClientResult<CheckoutStep> {
        let cart = self.cart.snapshot().cart;
        let step = self.with_stepper(|s| s.next(&cart)).map_err(guard)?;
        info!(?step, "Checkout advanced");
        Ok(step)
    }

    pub fn go_back(&self, to: CheckoutStep) -> ClientResult<CheckoutStep> {
        let step = self.with_stepper(|s| s.go_back(to)).map_err(guard)?;
        debug!(?step, "Checkout went back");
        Ok(step)
    }

    pub fn toggle_member(&self, member_id: &str) -> bool {
        self.with_stepper(|s| s.selections_mut().toggle_member(member_id))
    }

    pub fn select_address(&self, address_id: &str) {
        self.with_stepper(|s| s.selections_mut().select_address(address_id));
    }

    // =========================================================================
    // Members & Addresses
    // =========================================================================

    pub async fn members(&self) -> ClientResult<Vec<FamilyMember>> {
        let session = self.session.require()?;
        self.backend.list_members(&session.token).await
    }

    /// Creates (`id == None`) or updates a member after validating the form.
    pub async fn save_member(&self, id: Option<&str>, draft: &MemberDraft) -> ClientResult<FamilyMember> {
        let draft = draft.validate(Local::now().date_naive())?;
        let session = self.session.require()?;
        let member = self
            .backend
            .save_member(&session.token, id, &draft)
            .await
            .map_err(|e| self.reported(e))?;
        info!(member_id = %member.id, "Member saved");
        Ok(member)
    }

    /// Deletes a member and drops it from the selection.
    pub async fn delete_member(&self, id: &str) -> ClientResult<()> {
        let session = self.session.require()?;
        self.backend
            .delete_member(&session.token, id)
            .await
            .map_err(|e| self.reported(e))?;
        self.with_stepper(|s| s.selections_mut().forget_member(id));
        info!(member_id = id, "Member deleted");
        Ok(())
    }

    pub async fn addresses(&self) -> ClientResult<Vec<Address>> {
        let session = self.session.require()?;
        self.backend.list_addresses(&session.token).await
    }

    pub async fn save_address(&self, id: Option<&str>, draft: &AddressDraft) -> ClientResult<Address> {
        let draft = draft.validate()?;
        let session = self.session.require()?;
        let address = self
            .backend
            .save_address(&session.token, id, &draft)
            .await
            .map_err(|e| self.reported(e))?;
        info!(address_id = %address.id, "Address saved");
        Ok(address)
    }

    pub async fn delete_address(&self, id: &str) -> ClientResult<()> {
        let session = self.session.require()?;
        self.backend
            .delete_address(&session.token, id)
            .await
            .map_err(|e| self.reported(e))?;
        self.with_stepper(|s| s.selections_mut().forget_address(id));
        info!(address_id = id, "Address deleted");
        Ok(())
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Pays for the cart reviewed at the last step.
    ///
    /// The backend charges its current cart, so if the cart was edited
    /// since the stepper reached Payment nothing is charged and the stepper
    /// goes back to Items with `StepGuardError::CartChanged`.
    pub async fn pay(&self) -> ClientResult<CheckoutOutcome> {
        let step = self.step();
        if step != CheckoutStep::Payment {
            return Err(guard(CoreError::InvalidTransition {
                step: format!("{step:?}"),
                action: "pay".to_string(),
            }));
        }
        let cart = self.cart.snapshot().cart;
        let draft = self
            .with_stepper(|s| s.confirm_cart(&cart).cloned())
            .map_err(|e| {
                warn!(error = %e, "Cart changed on the payment step, back to review");
                guard(e)
            })?;
        let session = self.session.require()?;

        let request = CreatePaymentOrderRequest {
            user_id: session.user_id.clone(),
            kind: PurchaseKind::Cart,
            coupon_code: draft.coupon_code.clone(),
            product_id: None,
            quantity: None,
        };
        let outcome = self
            .hand_off(&session, request, &draft, "Lab test booking")
            .await?;

        if matches!(outcome, CheckoutOutcome::Booked { .. }) {
            self.with_stepper(|s| s.reset());
            if let Err(e) = self.cart.fetch_cart().await {
                warn!(error = %e, "Cart refresh after booking failed");
            }
        }
        Ok(outcome)
    }

    /// Buys one product without touching the cart.
    pub async fn buy_now(
        &self,
        purchase: &DirectPurchase,
        selections: &CheckoutSelections,
    ) -> ClientResult<CheckoutOutcome> {
        validate_quantity(purchase.quantity)?;
        selections.check_complete().map_err(guard)?;
        let session = self.session.require()?;

        let draft = BookingDraft {
            items: vec![purchase.as_item()],
            member_ids: selections.member_ids.clone(),
            address_id: selections.address_id.clone(),
            coupon_code: None,
        };
        let request = CreatePaymentOrderRequest {
            user_id: session.user_id.clone(),
            kind: PurchaseKind::Direct,
            coupon_code: None,
            product_id: Some(purchase.product_id.clone()),
            quantity: Some(purchase.quantity),
        };
        self.hand_off(&session, request, &draft, &purchase.name).await
    }

    async fn hand_off(
        &self,
        session: &Session,
        request: CreatePaymentOrderRequest,
        draft: &BookingDraft,
        description: &str,
    ) -> ClientResult<CheckoutOutcome> {
        let _guard = InFlight::enter(&self.paying, "payment")?;
        self.run_hand_off(session, request, draft, description).await
    }

    async fn run_hand_off(
        &self,
        session: &Session,
        request: CreatePaymentOrderRequest,
        draft: &BookingDraft,
        description: &str,
    ) -> ClientResult<CheckoutOutcome> {
        let kind = request.kind;
        debug!(?kind, coupon = ?request.coupon_code, "Creating payment order");
        let order: PaymentOrder = self
            .backend
            .create_payment_order(&session.token, &request)
            .await
            .map_err(|e| self.reported(e))?;
        info!(order_id = %order.order_id, amount = %order.amount, "Payment order created");

        let options = PaymentOptions::new(
            &self.payment,
            &order.order_id,
            order.amount,
            &order.currency,
            description,
        )
        .with_prefill(Prefill::from_session(session));

        let confirmation = match self.widget.open(options).await {
            WidgetOutcome::Success(confirmation) => confirmation,
            WidgetOutcome::Dismissed => {
                warn!(order_id = %order.order_id, "Payment widget dismissed, order left to expire");
                self.notifier.notify(Notification::warning(
                    "Payment cancelled",
                    "You closed the payment window. Nothing was charged.",
                ));
                return Ok(CheckoutOutcome::Cancelled);
            }
            WidgetOutcome::Failed(reason) => {
                warn!(order_id = %order.order_id, reason = %reason, "Payment failed in widget");
                self.notifier
                    .notify(Notification::error("Payment failed", reason.clone()));
                return Ok(CheckoutOutcome::Failed { reason });
            }
        };

        if confirmation.razorpay_order_id != order.order_id {
            return Err(self.verification_failed(
                &order.order_id,
                "payment confirmation is for a different order".to_string(),
            ));
        }

        let booking = CreateBookingRequest::from_draft(
            &session.user_id,
            kind,
            draft,
            &draft.items,
            &confirmation,
            order.amount,
        )
        .ok_or_else(|| {
            self.verification_failed(&order.order_id, "booking details are incomplete".into())
        })?;

        if let Err(e) = self.backend.create_booking(&session.token, &booking).await {
            return Err(self.verification_failed(&order.order_id, e.to_string()));
        }

        info!(
            order_id = %order.order_id,
            payment_id = %confirmation.razorpay_payment_id,
            "Booking created"
        );
        self.notifier.notify(Notification::success(
            "Booking confirmed",
            "Your tests are booked. We'll see you soon.",
        ));
        Ok(CheckoutOutcome::Booked {
            order_id: order.order_id,
            payment_id: confirmation.razorpay_payment_id,
        })
    }

    /// Payment was taken but the booking could not be recorded.
    fn verification_failed(&self, order_id: &str, reason: String) -> ClientError {
        error!(order_id, reason = %reason, "Booking failed after payment");
        let err = ClientError::PaymentVerification(reason);
        self.report(&err);
        err
    }

    fn report(&self, err: &ClientError) {
        if !err.is_auth() {
            self.notifier.notify(Notification::from_error(err));
        }
    }

    fn reported(&self, err: ClientError) -> ClientError {
        self.report(&err);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ToastQueue;
    use crate::testing::{logged_in, server_error, test_config, MockBackend, MockWidget, WidgetScript};
    use carecart_core::types::Gender;
    use carecart_core::StepGuardError;
    use chrono::NaiveDate;
    use std::time::Duration;

    struct Harness {
        backend: Arc<MockBackend>,
        widget: Arc<MockWidget>,
        toasts: Arc<ToastQueue>,
        cart: Arc<CartEngine<MockBackend>>,
        checkout: CheckoutSession<MockBackend, MockWidget>,
    }

    fn harness(script: Vec<WidgetScript>) -> Harness {
        let backend = MockBackend::new();
        let session = logged_in();
        let config = test_config();
        let toasts = Arc::new(ToastQueue::new(Duration::from_secs(4)));
        let cart = Arc::new(
            CartEngine::new(backend.clone(), session.clone(), &config).with_notifier(toasts.clone()),
        );
        let widget = MockWidget::new(script);
        let checkout = CheckoutSession::new(
            backend.clone(),
            cart.clone(),
            widget.clone(),
            session,
            config.payment.clone(),
        )
        .with_notifier(toasts.clone());
        Harness {
            backend,
            widget,
            toasts,
            cart,
            checkout,
        }
    }

    /// Cart of 2 × ₹500 with SAVE10, two members and an address selected,
    /// stepper on Payment.
    async fn ready_to_pay(h: &Harness) -> (String, String, String) {
        h.backend.seed_item("p1", 2);
        h.backend.seed_coupon("SAVE10");
        let m1 = h.backend.seed_member("Asha").id;
        let m2 = h.backend.seed_member("Ravi").id;
        let a1 = h.backend.seed_address("Home").id;
        h.cart.fetch_cart().await.unwrap();

        h.checkout.next().unwrap();
        h.checkout.toggle_member(&m1);
        h.checkout.toggle_member(&m2);
        h.checkout.select_address(&a1);
        assert_eq!(h.checkout.next().unwrap(), CheckoutStep::Payment);
        (m1, m2, a1)
    }

    fn step_error(err: ClientError) -> StepGuardError {
        match err {
            ClientError::Core(CoreError::Step(e)) => e,
            other => panic!("expected a step guard error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_start_checkout() {
        let h = harness(vec![]);
        let err = h.checkout.next().unwrap_err();
        assert_eq!(step_error(err), StepGuardError::EmptyCart);
        assert_eq!(h.checkout.step(), CheckoutStep::Items);
        assert!(h.toasts.all().is_empty());
    }

    #[tokio::test]
    async fn test_member_and_address_guards() {
        let h = harness(vec![]);
        h.backend.seed_item("p2", 1);
        h.cart.fetch_cart().await.unwrap();
        h.checkout.next().unwrap();

        assert_eq!(
            step_error(h.checkout.next().unwrap_err()),
            StepGuardError::MissingMemberAndAddress
        );

        h.checkout.toggle_member("m1");
        assert_eq!(
            step_error(h.checkout.next().unwrap_err()),
            StepGuardError::MissingAddress
        );

        h.checkout.toggle_member("m1");
        h.checkout.select_address("a1");
        assert_eq!(
            step_error(h.checkout.next().unwrap_err()),
            StepGuardError::MissingMember
        );
        assert_eq!(h.checkout.step(), CheckoutStep::MemberAndAddress);
    }

    #[tokio::test]
    async fn test_successful_payment_books_and_resets() {
        let h = harness(vec![WidgetScript::Pay]);
        let (m1, m2, a1) = ready_to_pay(&h).await;

        let outcome = h.checkout.pay().await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::Booked { .. }));

        let orders = h.backend.payment_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].kind, PurchaseKind::Cart);
        assert_eq!(orders[0].coupon_code.as_deref(), Some("SAVE10"));

        let opened = h.widget.opened();
        assert_eq!(opened[0].amount, 90_000);
        assert_eq!(opened[0].key, "rzp_test_key");

        let bookings = h.backend.bookings();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].member_id, m1);
        assert_eq!(bookings[0].member_ids, vec![m1, m2]);
        assert_eq!(bookings[0].address_id, a1);
        assert_eq!(bookings[0].amount, 90_000);
        assert_eq!(bookings[0].items.len(), 1);
        assert_eq!(bookings[0].razorpay_order_id, opened[0].order_id);

        assert_eq!(h.checkout.step(), CheckoutStep::Items);
        assert_eq!(h.checkout.selections(), CheckoutSelections::default());
        assert!(h.checkout.draft().is_none());
        assert!(h.cart.snapshot().cart.is_empty());
    }

    #[tokio::test]
    async fn test_dismissed_widget_books_nothing() {
        let h = harness(vec![WidgetScript::Dismiss]);
        ready_to_pay(&h).await;

        let outcome = h.checkout.pay().await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::Cancelled);
        assert_eq!(h.backend.call_count("create_booking"), 0);
        assert_eq!(h.checkout.step(), CheckoutStep::Payment);

        let toasts = h.toasts.all();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].title, "Payment cancelled");
    }

    #[tokio::test]
    async fn test_failed_widget_stays_on_payment() {
        let h = harness(vec![WidgetScript::Fail]);
        ready_to_pay(&h).await;

        let outcome = h.checkout.pay().await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::Failed { .. }));
        assert_eq!(h.backend.call_count("create_booking"), 0);
        assert_eq!(h.checkout.step(), CheckoutStep::Payment);
    }

    #[tokio::test]
    async fn test_booking_failure_after_payment_is_not_retried() {
        let h = harness(vec![WidgetScript::Pay]);
        ready_to_pay(&h).await;
        h.backend.fail_next("create_booking", server_error());

        let err = h.checkout.pay().await.unwrap_err();
        assert!(matches!(err, ClientError::PaymentVerification(_)));
        assert!(err.to_string().contains("contact support"));
        assert_eq!(h.backend.call_count("create_booking"), 1);
        assert_eq!(h.checkout.step(), CheckoutStep::Payment);

        let toasts = h.toasts.all();
        assert_eq!(toasts.len(), 1);
        assert!(!toasts[0].auto_dismiss);
    }

    #[tokio::test]
    async fn test_payment_order_failure_stays_on_payment() {
        let h = harness(vec![]);
        ready_to_pay(&h).await;
        h.backend.fail_next("create_payment_order", server_error());

        assert!(matches!(
            h.checkout.pay().await,
            Err(ClientError::Http { status: 500, .. })
        ));
        assert!(h.widget.opened().is_empty());
        assert_eq!(h.checkout.step(), CheckoutStep::Payment);
    }

    #[tokio::test]
    async fn test_pay_requires_payment_step() {
        let h = harness(vec![]);
        assert!(matches!(
            h.checkout.pay().await,
            Err(ClientError::Core(CoreError::InvalidTransition { .. }))
        ));
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cart_edited_after_review_is_not_charged() {
        let h = harness(vec![WidgetScript::Pay]);
        let (m1, _, _) = ready_to_pay(&h).await;
        h.cart.update_quantity("p1", 3).await.unwrap();

        let err = h.checkout.pay().await.unwrap_err();
        assert_eq!(step_error(err), StepGuardError::CartChanged);
        assert_eq!(h.checkout.step(), CheckoutStep::Items);
        assert!(h.checkout.selections().is_member_selected(&m1));
        assert!(h.backend.payment_orders().is_empty());
        assert!(h.widget.opened().is_empty());

        h.checkout.next().unwrap();
        h.checkout.next().unwrap();
        assert!(matches!(
            h.checkout.pay().await.unwrap(),
            CheckoutOutcome::Booked { .. }
        ));
        assert_eq!(h.backend.bookings()[0].items[0].quantity, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_payment_does_not_block_the_next() {
        let h = harness(vec![WidgetScript::Pay]);
        ready_to_pay(&h).await;
        h.backend
            .delay_next("create_payment_order", Duration::from_millis(100));

        let abandoned = tokio::time::timeout(Duration::from_millis(10), h.checkout.pay()).await;
        assert!(abandoned.is_err());

        assert!(matches!(
            h.checkout.pay().await.unwrap(),
            CheckoutOutcome::Booked { .. }
        ));
    }

    #[tokio::test]
    async fn test_going_back_to_items_drops_draft() {
        let h = harness(vec![]);
        ready_to_pay(&h).await;
        h.checkout.go_back(CheckoutStep::MemberAndAddress).unwrap();
        assert!(h.checkout.draft().is_some());

        h.checkout.go_back(CheckoutStep::Items).unwrap();
        assert!(h.checkout.draft().is_none());
        assert!(h.checkout.go_back(CheckoutStep::Payment).is_err());
    }

    #[tokio::test]
    async fn test_buy_now_skips_cart() {
        let h = harness(vec![WidgetScript::Pay]);
        let m1 = h.backend.seed_member("Asha").id;
        let a1 = h.backend.seed_address("Home").id;
        let selections = CheckoutSelections {
            member_ids: vec![m1.clone()],
            address_id: Some(a1),
        };
        let purchase = DirectPurchase {
            product_id: "p3".into(),
            name: "Vitamin D".into(),
            unit_price: Money::from_rupees(200),
            quantity: 2,
        };

        let outcome = h.checkout.buy_now(&purchase, &selections).await.unwrap();
        assert!(matches!(outcome, CheckoutOutcome::Booked { .. }));

        let order = &h.backend.payment_orders()[0];
        assert_eq!(order.kind, PurchaseKind::Direct);
        assert_eq!(order.product_id.as_deref(), Some("p3"));
        assert_eq!(order.quantity, Some(2));

        let booking = &h.backend.bookings()[0];
        assert_eq!(booking.kind, PurchaseKind::Direct);
        assert_eq!(booking.amount, 40_000);
        assert_eq!(booking.member_id, m1);
        assert_eq!(h.backend.call_count("fetch_cart"), 0);

        let incomplete = CheckoutSelections::default();
        assert!(h.checkout.buy_now(&purchase, &incomplete).await.is_err());
        assert_eq!(h.backend.payment_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_selected_member_and_address_forgets_them() {
        let h = harness(vec![]);
        let m1 = h.backend.seed_member("Asha").id;
        let a1 = h.backend.seed_address("Home").id;
        h.checkout.toggle_member(&m1);
        h.checkout.select_address(&a1);

        h.checkout.delete_member(&m1).await.unwrap();
        h.checkout.delete_address(&a1).await.unwrap();

        assert_eq!(h.checkout.selections(), CheckoutSelections::default());
        assert!(h.checkout.members().await.unwrap().is_empty());
        assert!(h.checkout.addresses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_member_form_never_reaches_backend() {
        let h = harness(vec![]);
        let draft = MemberDraft {
            name: "  ".into(),
            relation: "Mother".into(),
            gender: Gender::Female,
            date_of_birth: NaiveDate::from_ymd_opt(1960, 1, 1).unwrap(),
            email: None,
            phone: Some("98765".into()),
        };
        assert!(matches!(
            h.checkout.save_member(None, &draft).await,
            Err(ClientError::Validation(_))
        ));
        assert_eq!(h.backend.call_count("save_member"), 0);

        let valid = MemberDraft {
            name: "Meera".into(),
            phone: Some("9876543210".into()),
            ..draft
        };
        let saved = h.checkout.save_member(None, &valid).await.unwrap();
        assert_eq!(saved.name, "Meera");
        assert_eq!(h.checkout.members().await.unwrap(), vec![saved]);
    }
}

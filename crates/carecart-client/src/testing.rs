//! Scripted stand-ins for the backend and the payment widget.
//!
//! The mock backend keeps a small server-side cart and answers from it.
//! Each call can be scripted to fail or to stall; responses are computed
//! when the call arrives, so a stalled call returns the state of that
//! moment.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use carecart_core::admin::{DoctorDraft, HospitalDraft};
use carecart_core::checkout::{AddressDraft, MemberDraft};
use carecart_core::consultation::ConsultationOrder;
use carecart_core::pricing::calculate;
use carecart_core::types::{
    Address, CartItem, Coupon, DiscountRule, Doctor, FamilyMember, Hospital, PaymentConfirmation,
    PaymentOrder, ProductSnapshot, PurchaseKind,
};
use carecart_core::{Cart, Money, PriceBreakdown};
use chrono::NaiveDate;

use crate::api::{
    CreateBookingRequest, CreateConsultationPaymentRequest, CreatePaymentOrderRequest,
    VerifyConsultationPaymentRequest,
};
use crate::backend::{AppliedCoupon, CommerceBackend};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::payment::{PaymentOptions, PaymentWidget, WidgetOutcome};
use crate::session::{Session, SessionContext};

pub const VALID_OTP: &str = "123456";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
}

pub fn logged_in() -> SessionContext {
    let session = SessionContext::in_memory();
    session
        .login(Session::new("test-token", "user-1"))
        .unwrap();
    session
}

pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.initial_backoff_ms = 10;
    config.payment.key_id = "rzp_test_key".into();
    config
}

pub fn percent_coupon(code: &str, percent: u32) -> Coupon {
    Coupon {
        code: code.into(),
        rule: DiscountRule::Percentage { bps: percent * 100 },
        minimum_amount: None,
        expires_at: None,
        usage_limit: None,
    }
}

pub fn fixed_coupon(code: &str, rupees: i64) -> Coupon {
    Coupon {
        code: code.into(),
        rule: DiscountRule::Fixed {
            amount: Money::from_rupees(rupees),
        },
        minimum_amount: None,
        expires_at: None,
        usage_limit: None,
    }
}

// =============================================================================
// Mock Backend
// =============================================================================

#[derive(Default)]
struct MockState {
    products: HashMap<String, (Money, String)>,
    items: Vec<CartItem>,
    coupon: Option<Coupon>,
    coupons: HashMap<String, Coupon>,
    coupon_totals_override: Option<PriceBreakdown>,
    failures: HashMap<&'static str, VecDeque<ClientError>>,
    delays: HashMap<&'static str, VecDeque<Duration>>,
    calls: Vec<&'static str>,
    payment_orders: Vec<CreatePaymentOrderRequest>,
    bookings: Vec<CreateBookingRequest>,
    otp_sends: Vec<String>,
    consultation_payments: Vec<CreateConsultationPaymentRequest>,
    consultation_verifications: Vec<VerifyConsultationPaymentRequest>,
    members: Vec<FamilyMember>,
    addresses: Vec<Address>,
    hospitals: Vec<Hospital>,
    doctors: Vec<Doctor>,
    next_id: u64,
}

impl MockState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn cart(&self) -> Cart {
        Cart::new("cart-1", "user-1", self.items.clone(), self.coupon.clone())
    }

    fn line_mut(&mut self, product_id: &str) -> ClientResult<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| not_found("Item not in cart"))
    }
}

fn not_found(message: &str) -> ClientError {
    ClientError::Http {
        status: 404,
        message: message.into(),
    }
}

pub fn server_error() -> ClientError {
    ClientError::Http {
        status: 500,
        message: "Internal server error".into(),
    }
}

#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    /// Backend selling three lab tests, with coupons `SAVE10` (10 %) and
    /// `FLAT500` (₹500 off).
    pub fn new() -> Arc<Self> {
        let backend = MockBackend::default();
        backend.with_state(|s| {
            for (id, rupees, name) in [
                ("p1", 500, "Lipid Profile"),
                ("p2", 300, "Thyroid Panel"),
                ("p3", 200, "Vitamin D"),
            ] {
                s.products
                    .insert(id.into(), (Money::from_rupees(rupees), name.into()));
            }
            s.coupons.insert("SAVE10".into(), percent_coupon("SAVE10", 10));
            s.coupons.insert("FLAT500".into(), fixed_coupon("FLAT500", 500));
        });
        Arc::new(backend)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Puts `quantity` of `product_id` in the server cart.
    pub fn seed_item(&self, product_id: &str, quantity: i64) {
        self.with_state(|s| {
            let (price, name) = s.products[product_id].clone();
            let id = s.id("line-");
            s.items.push(CartItem {
                id,
                cart_id: "cart-1".into(),
                product_id: product_id.into(),
                quantity,
                unit_price: price,
                product: ProductSnapshot {
                    name,
                    report_time: Some("24 hours".into()),
                },
            });
        });
    }

    pub fn seed_coupon(&self, code: &str) {
        self.with_state(|s| s.coupon = s.coupons.get(code).cloned());
    }

    pub fn add_coupon(&self, coupon: Coupon) {
        self.with_state(|s| {
            s.coupons.insert(coupon.code.clone(), coupon);
        });
    }

    /// Totals the next coupon application reports instead of the real ones.
    pub fn override_coupon_totals(&self, totals: PriceBreakdown) {
        self.with_state(|s| s.coupon_totals_override = Some(totals));
    }

    pub fn seed_member(&self, name: &str) -> FamilyMember {
        self.with_state(|s| {
            let member = FamilyMember {
                id: s.id("m"),
                user_id: "user-1".into(),
                name: name.into(),
                relation: "Self".into(),
                gender: carecart_core::types::Gender::Female,
                date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
                email: None,
                phone: None,
            };
            s.members.push(member.clone());
            member
        })
    }

    pub fn seed_address(&self, name: &str) -> Address {
        self.with_state(|s| {
            let address = Address {
                id: s.id("a"),
                user_id: "user-1".into(),
                name: name.into(),
                address_line: "12 MG Road".into(),
                city: "Bengaluru".into(),
                state: "Karnataka".into(),
                pincode: "560001".into(),
                landmark: None,
            };
            s.addresses.push(address.clone());
            address
        })
    }

    /// The next call to `op` fails with `error`.
    pub fn fail_next(&self, op: &'static str, error: ClientError) {
        self.with_state(|s| s.failures.entry(op).or_default().push_back(error));
    }

    /// The next call to `op` takes `delay` to answer.
    pub fn delay_next(&self, op: &'static str, delay: Duration) {
        self.with_state(|s| s.delays.entry(op).or_default().push_back(delay));
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.with_state(|s| s.calls.iter().filter(|c| **c == op).count())
    }

    pub fn server_cart(&self) -> Cart {
        self.with_state(|s| s.cart())
    }

    pub fn payment_orders(&self) -> Vec<CreatePaymentOrderRequest> {
        self.with_state(|s| s.payment_orders.clone())
    }

    pub fn bookings(&self) -> Vec<CreateBookingRequest> {
        self.with_state(|s| s.bookings.clone())
    }

    pub fn otp_sends(&self) -> Vec<String> {
        self.with_state(|s| s.otp_sends.clone())
    }

    pub fn consultation_payments(&self) -> Vec<CreateConsultationPaymentRequest> {
        self.with_state(|s| s.consultation_payments.clone())
    }

    pub fn consultation_verifications(&self) -> Vec<VerifyConsultationPaymentRequest> {
        self.with_state(|s| s.consultation_verifications.clone())
    }

    pub fn hospitals(&self) -> Vec<Hospital> {
        self.with_state(|s| s.hospitals.clone())
    }

    pub fn doctors(&self) -> Vec<Doctor> {
        self.with_state(|s| s.doctors.clone())
    }

    /// Records the call, then either pops a scripted failure or runs `f`
    /// against the server state. Any scripted delay is served afterwards.
    async fn answer<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut MockState) -> ClientResult<T>,
    ) -> ClientResult<T> {
        let (delay, result) = self.with_state(|s| {
            s.calls.push(op);
            let delay = s.delays.get_mut(op).and_then(VecDeque::pop_front);
            let failure = s.failures.get_mut(op).and_then(VecDeque::pop_front);
            let result = match failure {
                Some(e) => Err(e),
                None => f(s),
            };
            (delay, result)
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

impl CommerceBackend for MockBackend {
    async fn fetch_cart(&self, _token: &str) -> ClientResult<Cart> {
        self.answer("fetch_cart", |s| Ok(s.cart())).await
    }

    async fn add_to_cart(&self, _token: &str, product_id: &str, quantity: i64) -> ClientResult<()> {
        self.answer("add_to_cart", |s| {
            if let Ok(line) = s.line_mut(product_id) {
                line.quantity += quantity;
                return Ok(());
            }
            let (price, name) = s
                .products
                .get(product_id)
                .cloned()
                .ok_or_else(|| not_found("Product not found"))?;
            let id = s.id("line-");
            s.items.push(CartItem {
                id,
                cart_id: "cart-1".into(),
                product_id: product_id.into(),
                quantity,
                unit_price: price,
                product: ProductSnapshot {
                    name,
                    report_time: None,
                },
            });
            Ok(())
        })
        .await
    }

    async fn update_cart_item(
        &self,
        _token: &str,
        product_id: &str,
        quantity: i64,
    ) -> ClientResult<()> {
        self.answer("update_cart_item", |s| {
            s.line_mut(product_id)?.quantity = quantity;
            Ok(())
        })
        .await
    }

    async fn remove_cart_item(&self, _token: &str, product_id: &str) -> ClientResult<()> {
        self.answer("remove_cart_item", |s| {
            s.line_mut(product_id)?;
            s.items.retain(|i| i.product_id != product_id);
            if s.items.is_empty() {
                s.coupon = None;
            }
            Ok(())
        })
        .await
    }

    async fn apply_coupon(&self, _token: &str, code: &str) -> ClientResult<AppliedCoupon> {
        self.answer("apply_coupon", |s| {
            let coupon = s
                .coupons
                .get(&code.to_uppercase())
                .cloned()
                .ok_or_else(|| ClientError::Coupon("Invalid coupon code".into()))?;
            let pricing = calculate(&s.items, Some(&coupon));
            if !coupon.meets_minimum(pricing.original_total) {
                return Err(ClientError::Coupon("Minimum order amount not met".into()));
            }
            s.coupon = Some(coupon.clone());
            let pricing = s.coupon_totals_override.take().unwrap_or(pricing);
            Ok(AppliedCoupon { coupon, pricing })
        })
        .await
    }

    async fn remove_coupon(&self, _token: &str) -> ClientResult<()> {
        self.answer("remove_coupon", |s| {
            s.coupon = None;
            Ok(())
        })
        .await
    }

    async fn create_payment_order(
        &self,
        _token: &str,
        request: &CreatePaymentOrderRequest,
    ) -> ClientResult<PaymentOrder> {
        let request = request.clone();
        self.answer("create_payment_order", move |s| {
            let amount = match request.kind {
                PurchaseKind::Cart => s.cart().pricing.discounted_total,
                PurchaseKind::Direct => {
                    let product_id = request.product_id.clone().unwrap_or_default();
                    let (price, _) = s
                        .products
                        .get(&product_id)
                        .cloned()
                        .ok_or_else(|| not_found("Product not found"))?;
                    price.multiply_quantity(request.quantity.unwrap_or(1))
                }
            };
            s.payment_orders.push(request);
            Ok(PaymentOrder {
                order_id: s.id("order_"),
                amount,
                currency: "INR".into(),
            })
        })
        .await
    }

    async fn create_booking(&self, _token: &str, request: &CreateBookingRequest) -> ClientResult<()> {
        let request = request.clone();
        self.answer("create_booking", move |s| {
            if request.kind == PurchaseKind::Cart {
                s.items.clear();
                s.coupon = None;
            }
            s.bookings.push(request);
            Ok(())
        })
        .await
    }

    async fn send_otp(&self, _token: &str, _user_id: &str, phone: &str) -> ClientResult<()> {
        let phone = phone.to_string();
        self.answer("send_otp", move |s| {
            s.otp_sends.push(phone);
            Ok(())
        })
        .await
    }

    async fn verify_otp(
        &self,
        _token: &str,
        _user_id: &str,
        _phone: &str,
        otp: &str,
    ) -> ClientResult<()> {
        let valid = otp == VALID_OTP;
        self.answer("verify_otp", move |_| {
            if valid {
                Ok(())
            } else {
                Err(ClientError::Http {
                    status: 400,
                    message: "Invalid OTP".into(),
                })
            }
        })
        .await
    }

    async fn create_consultation_payment(
        &self,
        _token: &str,
        request: &CreateConsultationPaymentRequest,
    ) -> ClientResult<ConsultationOrder> {
        let request = request.clone();
        self.answer("create_consultation_payment", move |s| {
            let amount = Money::from_rupees_f64(request.amount_paid);
            s.consultation_payments.push(request);
            Ok(ConsultationOrder {
                razorpay_order_id: s.id("order_c"),
                consultation_id: s.id("cons_"),
                amount,
                currency: "INR".into(),
            })
        })
        .await
    }

    async fn verify_consultation_payment(
        &self,
        _token: &str,
        request: &VerifyConsultationPaymentRequest,
    ) -> ClientResult<()> {
        let request = request.clone();
        self.answer("verify_consultation_payment", move |s| {
            s.consultation_verifications.push(request);
            Ok(())
        })
        .await
    }

    async fn list_members(&self, _token: &str) -> ClientResult<Vec<FamilyMember>> {
        self.answer("list_members", |s| Ok(s.members.clone())).await
    }

    async fn save_member(
        &self,
        _token: &str,
        id: Option<&str>,
        draft: &MemberDraft,
    ) -> ClientResult<FamilyMember> {
        let id = id.map(str::to_string);
        let draft = draft.clone();
        self.answer("save_member", move |s| {
            let id = match id {
                Some(id) => {
                    s.members.retain(|m| m.id != id);
                    id
                }
                None => s.id("m"),
            };
            let member = FamilyMember {
                id,
                user_id: "user-1".into(),
                name: draft.name,
                relation: draft.relation,
                gender: draft.gender,
                date_of_birth: draft.date_of_birth,
                email: draft.email,
                phone: draft.phone,
            };
            s.members.push(member.clone());
            Ok(member)
        })
        .await
    }

    async fn delete_member(&self, _token: &str, id: &str) -> ClientResult<()> {
        let id = id.to_string();
        self.answer("delete_member", move |s| {
            s.members.retain(|m| m.id != id);
            Ok(())
        })
        .await
    }

    async fn list_addresses(&self, _token: &str) -> ClientResult<Vec<Address>> {
        self.answer("list_addresses", |s| Ok(s.addresses.clone())).await
    }

    async fn save_address(
        &self,
        _token: &str,
        id: Option<&str>,
        draft: &AddressDraft,
    ) -> ClientResult<Address> {
        let id = id.map(str::to_string);
        let draft = draft.clone();
        self.answer("save_address", move |s| {
            let id = match id {
                Some(id) => {
                    s.addresses.retain(|a| a.id != id);
                    id
                }
                None => s.id("a"),
            };
            let address = Address {
                id,
                user_id: "user-1".into(),
                name: draft.name,
                address_line: draft.address_line,
                city: draft.city,
                state: draft.state,
                pincode: draft.pincode,
                landmark: draft.landmark,
            };
            s.addresses.push(address.clone());
            Ok(address)
        })
        .await
    }

    async fn delete_address(&self, _token: &str, id: &str) -> ClientResult<()> {
        let id = id.to_string();
        self.answer("delete_address", move |s| {
            s.addresses.retain(|a| a.id != id);
            Ok(())
        })
        .await
    }

    async fn list_hospitals(&self, _token: &str) -> ClientResult<Vec<Hospital>> {
        self.answer("list_hospitals", |s| Ok(s.hospitals.clone())).await
    }

    async fn save_hospital(&self, _token: &str, draft: &HospitalDraft) -> ClientResult<Hospital> {
        let draft = draft.clone();
        self.answer("save_hospital", move |s| {
            let id = match draft.id {
                Some(id) => {
                    s.hospitals.retain(|h| h.id != id);
                    id
                }
                None => s.id("h"),
            };
            let hospital = Hospital {
                id,
                name: draft.name,
                address: draft.address,
                city: draft.city,
                phone: draft.phone,
                image_url: draft.image_url,
            };
            s.hospitals.push(hospital.clone());
            Ok(hospital)
        })
        .await
    }

    async fn delete_hospital(&self, _token: &str, id: &str) -> ClientResult<()> {
        let id = id.to_string();
        self.answer("delete_hospital", move |s| {
            s.hospitals.retain(|h| h.id != id);
            Ok(())
        })
        .await
    }

    async fn list_doctors(&self, _token: &str) -> ClientResult<Vec<Doctor>> {
        self.answer("list_doctors", |s| Ok(s.doctors.clone())).await
    }

    async fn save_doctor(&self, _token: &str, draft: &DoctorDraft) -> ClientResult<Doctor> {
        let draft = draft.clone();
        self.answer("save_doctor", move |s| {
            let id = match draft.id {
                Some(id) => {
                    s.doctors.retain(|d| d.id != id);
                    id
                }
                None => s.id("d"),
            };
            let doctor = Doctor {
                id,
                hospital_id: draft.hospital_id,
                name: draft.name,
                specialization: draft.specialization,
                experience_years: draft.experience_years,
                consultation_fee: draft.consultation_fee,
                image_url: draft.image_url,
            };
            s.doctors.push(doctor.clone());
            Ok(doctor)
        })
        .await
    }

    async fn delete_doctor(&self, _token: &str, id: &str) -> ClientResult<()> {
        let id = id.to_string();
        self.answer("delete_doctor", move |s| {
            s.doctors.retain(|d| d.id != id);
            Ok(())
        })
        .await
    }
}

// =============================================================================
// Mock Payment Widget
// =============================================================================

/// How the scripted widget closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetScript {
    Pay,
    Dismiss,
    Fail,
}

/// Closes with the scripted outcomes in order, then pays.
#[derive(Default)]
pub struct MockWidget {
    script: Mutex<VecDeque<WidgetScript>>,
    opened: Mutex<Vec<PaymentOptions>>,
}

impl MockWidget {
    pub fn new(script: Vec<WidgetScript>) -> Arc<Self> {
        Arc::new(MockWidget {
            script: Mutex::new(script.into_iter().collect()),
            opened: Mutex::new(Vec::new()),
        })
    }

    pub fn paying() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn opened(&self) -> Vec<PaymentOptions> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PaymentWidget for MockWidget {
    async fn open(&self, options: PaymentOptions) -> WidgetOutcome {
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(WidgetScript::Pay);
        let order_id = options.order_id.clone();
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(options);

        match next {
            WidgetScript::Pay => WidgetOutcome::Success(PaymentConfirmation {
                razorpay_payment_id: format!("pay_{order_id}"),
                razorpay_order_id: order_id,
                razorpay_signature: "sig".into(),
            }),
            WidgetScript::Dismiss => WidgetOutcome::Dismissed,
            WidgetScript::Fail => WidgetOutcome::Failed("card declined".into()),
        }
    }
}

//! # Wire DTOs
//!
//! Request and response bodies of the commerce backend, in its camelCase
//! JSON shape.
//!
//! ## Money on the Wire
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart prices, totals, coupon values, fees ....... rupees (JSON number)  │
//! │  Payment order / booking `amount` ............... paise  (integer)      │
//! │                                                                         │
//! │  Every rupee value is converted to Money exactly once, in this file.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use carecart_core::admin::DoctorDraft;
use carecart_core::checkout::BookingDraft;
use carecart_core::types::{
    CartItem, Coupon, DiscountRule, DiscountType, Doctor, ProductSnapshot, PurchaseKind,
};
use carecart_core::{Cart, Money, PaymentConfirmation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Errors & Acknowledgements
// =============================================================================

/// Error body: `{message}` or `{error}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}

/// Generic `{success, message}` answer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Ack {
    /// `success: false` in a 2xx body still counts as a failure.
    pub fn is_failure(&self) -> bool {
        self.success == Some(false)
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub name: String,
    #[serde(default)]
    pub report_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    pub id: String,
    #[serde(default)]
    pub cart_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in rupees.
    pub price: f64,
    pub product: ProductDto,
}

impl From<CartItemDto> for CartItem {
    fn from(dto: CartItemDto) -> Self {
        CartItem {
            id: dto.id,
            cart_id: dto.cart_id,
            product_id: dto.product_id,
            quantity: dto.quantity.max(1),
            unit_price: Money::from_rupees_f64(dto.price),
            product: ProductSnapshot {
                name: dto.product.name,
                report_time: dto.product.report_time,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDto {
    pub code: String,
    pub discount_type: DiscountType,
    /// Percent (e.g. `12.5`) or rupees, depending on `discount_type`.
    pub discount_value: f64,
    #[serde(default)]
    pub minimum_amount: Option<f64>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
}

impl From<CouponDto> for Coupon {
    fn from(dto: CouponDto) -> Self {
        let rule = match dto.discount_type {
            DiscountType::Percentage => DiscountRule::Percentage {
                bps: (dto.discount_value.max(0.0) * 100.0).round() as u32,
            },
            DiscountType::Fixed => DiscountRule::Fixed {
                amount: Money::from_rupees_f64(dto.discount_value.max(0.0)),
            },
        };
        Coupon {
            code: dto.code,
            rule,
            minimum_amount: dto.minimum_amount.map(Money::from_rupees_f64),
            expires_at: dto.expires_at,
            usage_limit: dto.usage_limit,
        }
    }
}

/// `GET /api/cart`. Totals are ignored; they are recomputed locally.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDto {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<CartItemDto>,
    #[serde(default)]
    pub applied_coupon: Option<CouponDto>,
}

impl From<CartDto> for Cart {
    fn from(dto: CartDto) -> Self {
        Cart::new(
            dto.id,
            dto.user_id,
            dto.items.into_iter().map(CartItem::from).collect(),
            dto.applied_coupon.map(Coupon::from),
        )
    }
}

/// The cart, bare or wrapped as `{cart: ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CartEnvelope {
    Wrapped { cart: CartDto },
    Bare(CartDto),
}

impl From<CartEnvelope> for Cart {
    fn from(env: CartEnvelope) -> Self {
        match env {
            CartEnvelope::Wrapped { cart } | CartEnvelope::Bare(cart) => cart.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest<'a> {
    pub product_id: &'a str,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyCouponRequest<'a> {
    pub code: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyCouponResponse {
    pub coupon: CouponDto,
    pub original_total: f64,
    pub discounted_total: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCouponResponse {
    #[serde(default)]
    pub original_total: Option<f64>,
}

// =============================================================================
// Lab-Test Bookings
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentOrderRequest {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: PurchaseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentOrderResponse {
    #[serde(default)]
    pub success: Option<bool>,
    pub order_id: String,
    /// Paise.
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub items: Option<Vec<serde_json::Value>>,
}

fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingItemDto {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in rupees.
    pub price: f64,
}

impl From<&CartItem> for BookingItemDto {
    fn from(item: &CartItem) -> Self {
        BookingItemDto {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            price: item.unit_price.to_rupees_f64(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub user_id: String,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    /// Paise, exactly as charged.
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: PurchaseKind,
    pub items: Vec<BookingItemDto>,
    /// Primary member.
    pub member_id: String,
    pub member_ids: Vec<String>,
    pub address_id: String,
}

impl CreateBookingRequest {
    /// Builds the request from a completed draft; `None` if the draft is
    /// missing its member or address.
    pub fn from_draft(
        user_id: &str,
        kind: PurchaseKind,
        draft: &BookingDraft,
        items: &[CartItem],
        confirmation: &PaymentConfirmation,
        amount: Money,
    ) -> Option<Self> {
        Some(CreateBookingRequest {
            user_id: user_id.to_string(),
            razorpay_order_id: confirmation.razorpay_order_id.clone(),
            razorpay_payment_id: confirmation.razorpay_payment_id.clone(),
            razorpay_signature: confirmation.razorpay_signature.clone(),
            amount: amount.paise(),
            kind,
            items: items.iter().map(BookingItemDto::from).collect(),
            member_id: draft.primary_member()?.to_string(),
            member_ids: draft.member_ids.clone(),
            address_id: draft.address_id.clone()?,
        })
    }
}

// =============================================================================
// Consultations
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest<'a> {
    pub user_id: &'a str,
    pub phone_number: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest<'a> {
    pub user_id: &'a str,
    pub phone_number: &'a str,
    pub otp: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsultationPaymentRequest {
    pub user_id: String,
    pub doctor_id: String,
    pub hospital_id: String,
    pub patient_name: String,
    pub email: String,
    pub phone_number: String,
    /// `YYYY-MM-DD`
    pub appointment_date: String,
    /// `HH:MM`
    pub appointment_time: String,
    pub reason: String,
    /// Rupees.
    pub amount_paid: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsultationPaymentResponse {
    #[serde(default)]
    pub success: Option<bool>,
    pub razorpay_order_id: String,
    /// Paise.
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub consultation_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyConsultationPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    pub consultation_id: String,
}

// =============================================================================
// Admin
// =============================================================================

/// Doctor as the backend sends it (fee in rupees).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDto {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub hospital_id: String,
    pub name: String,
    pub specialization: String,
    #[serde(default)]
    pub experience_years: u32,
    pub consultation_fee: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<DoctorDto> for Doctor {
    fn from(dto: DoctorDto) -> Self {
        Doctor {
            id: dto.id,
            hospital_id: dto.hospital_id,
            name: dto.name,
            specialization: dto.specialization,
            experience_years: dto.experience_years,
            consultation_fee: Money::from_rupees_f64(dto.consultation_fee),
            image_url: dto.image_url,
        }
    }
}

impl From<&DoctorDraft> for DoctorDto {
    fn from(draft: &DoctorDraft) -> Self {
        DoctorDto {
            id: draft.id.clone().unwrap_or_default(),
            hospital_id: draft.hospital_id.clone(),
            name: draft.name.clone(),
            specialization: draft.specialization.clone(),
            experience_years: draft.experience_years,
            consultation_fee: draft.consultation_fee.to_rupees_f64(),
            image_url: draft.image_url.clone(),
        }
    }
}

/// Hospital body for create/update (no id).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalBody<'a> {
    pub name: &'a str,
    pub address: &'a str,
    pub city: &'a str,
    pub phone: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<&'a str>,
}

/// A list, bare or wrapped as `{data: [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Wrapped { data } | ListEnvelope::Bare(data) => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cart_dto_recomputes_totals() {
        let body = json!({
            "cart": {
                "id": "cart-9",
                "userId": "user-1",
                "items": [{
                    "id": "i1",
                    "cartId": "cart-9",
                    "productId": "thyroid",
                    "quantity": 2,
                    "price": 499.5,
                    "product": { "name": "Thyroid Profile", "reportTime": "12 hours" }
                }],
                "originalTotal": 1.0,
                "discountedTotal": 1.0,
                "appliedCoupon": {
                    "code": "HEALTH10",
                    "discountType": "percentage",
                    "discountValue": 10
                }
            }
        });

        let cart: Cart = serde_json::from_value::<CartEnvelope>(body).unwrap().into();
        assert_eq!(cart.pricing.original_total, Money::from_paise(99_900));
        assert_eq!(cart.pricing.discount_amount, Money::from_paise(9_990));
        assert_eq!(cart.total_items, 2);
        cart.check_invariants().unwrap();
    }

    #[test]
    fn test_bare_cart_and_empty_defaults() {
        let cart: Cart = serde_json::from_value::<CartEnvelope>(json!({ "items": [] }))
            .unwrap()
            .into();
        assert!(cart.is_empty());
        assert_eq!(cart.pricing.discounted_total, Money::zero());
    }

    #[test]
    fn test_coupon_dto_conversion() {
        let pct: Coupon = CouponDto {
            code: "HALF".into(),
            discount_type: DiscountType::Percentage,
            discount_value: 12.5,
            minimum_amount: Some(999.0),
            expires_at: None,
            usage_limit: Some(1),
        }
        .into();
        assert_eq!(pct.rule, DiscountRule::Percentage { bps: 1250 });
        assert_eq!(pct.minimum_amount, Some(Money::from_rupees(999)));

        let fixed: Coupon = CouponDto {
            code: "FLAT50".into(),
            discount_type: DiscountType::Fixed,
            discount_value: 50.0,
            minimum_amount: None,
            expires_at: None,
            usage_limit: None,
        }
        .into();
        assert_eq!(
            fixed.rule,
            DiscountRule::Fixed {
                amount: Money::from_rupees(50)
            }
        );
    }

    #[test]
    fn test_payment_order_request_shape() {
        let direct = CreatePaymentOrderRequest {
            user_id: "u1".into(),
            kind: PurchaseKind::Direct,
            coupon_code: None,
            product_id: Some("vitd".into()),
            quantity: Some(1),
        };
        let value = serde_json::to_value(&direct).unwrap();
        assert_eq!(value["type"], "direct");
        assert_eq!(value["productId"], "vitd");
        assert!(value.get("couponCode").is_none());
    }

    #[test]
    fn test_consultation_payment_request_shape() {
        let request = CreateConsultationPaymentRequest {
            user_id: "u1".into(),
            doctor_id: "d1".into(),
            hospital_id: "h1".into(),
            patient_name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            phone_number: "9876543210".into(),
            appointment_date: "2026-10-20".into(),
            appointment_time: "10:30".into(),
            reason: "Chest pain".into(),
            amount_paid: 800.0,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["phoneNumber"], "9876543210");
        assert_eq!(value["amountPaid"], 800.0);
        assert_eq!(value["appointmentTime"], "10:30");
        assert!(value.get("phone").is_none());
        assert!(value.get("consultationFee").is_none());
    }

    #[test]
    fn test_error_body_prefers_message() {
        let body: ErrorBody =
            serde_json::from_value(json!({ "message": "Invalid coupon", "error": "x" })).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid coupon"));

        let body: ErrorBody = serde_json::from_value(json!({ "error": "Expired" })).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Expired"));

        let body: ErrorBody = serde_json::from_value(json!({})).unwrap();
        assert_eq!(body.into_message(), None);
    }
}

//! # Commerce Backend
//!
//! The seam between the flows and the REST backend: the
//! [`CommerceBackend`] trait, and [`HttpBackend`], its reqwest
//! implementation.
//!
//! ## Request Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  flow ──► CommerceBackend::op(token, ...)                               │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  HttpBackend::execute()                                                 │
//! │     ├── no response ............... ClientError::Network                │
//! │     ├── 401 / 403 ................. session.reject() + ClientError::Auth │
//! │     ├── other non-2xx ............. ClientError::Http {status, message} │
//! │     │                               (message from {message} / {error})  │
//! │     ├── 2xx with success:false .... ClientError::Http                   │
//! │     └── 2xx ....................... typed DTO ──► core type              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;

use carecart_core::admin::{DoctorDraft, HospitalDraft};
use carecart_core::checkout::{AddressDraft, MemberDraft};
use carecart_core::consultation::ConsultationOrder;
use carecart_core::types::{Address, Coupon, Doctor, FamilyMember, Hospital, PaymentOrder};
use carecart_core::{Cart, Money, PriceBreakdown};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::api::{
    Ack, ApplyCouponRequest, ApplyCouponResponse, CartEnvelope, CartLineRequest,
    CreateBookingRequest, CreateConsultationPaymentRequest, CreateConsultationPaymentResponse,
    CreatePaymentOrderRequest, CreatePaymentOrderResponse, DoctorDto, ErrorBody, HospitalBody,
    ListEnvelope, SendOtpRequest, VerifyConsultationPaymentRequest, VerifyOtpRequest,
};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::SessionContext;

/// A coupon the backend accepted, with the totals it computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub coupon: Coupon,
    pub pricing: PriceBreakdown,
}

// =============================================================================
// Backend Trait
// =============================================================================

/// Everything the client asks of the backend.
///
/// `token` is the bearer token of the current session.
pub trait CommerceBackend: Send + Sync + 'static {
    // -- cart ---------------------------------------------------------------
    fn fetch_cart(&self, token: &str) -> impl Future<Output = ClientResult<Cart>> + Send;

    fn add_to_cart(
        &self,
        token: &str,
        product_id: &str,
        quantity: i64,
    ) -> impl Future<Output = ClientResult<()>> + Send;

    fn update_cart_item(
        &self,
        token: &str,
        product_id: &str,
        quantity: i64,
    ) -> impl Future<Output = ClientResult<()>> + Send;

    fn remove_cart_item(
        &self,
        token: &str,
        product_id: &str,
    ) -> impl Future<Output = ClientResult<()>> + Send;

    /// Rejections come back as [`ClientError::Coupon`].
    fn apply_coupon(
        &self,
        token: &str,
        code: &str,
    ) -> impl Future<Output = ClientResult<AppliedCoupon>> + Send;

    fn remove_coupon(&self, token: &str) -> impl Future<Output = ClientResult<()>> + Send;

    // -- lab-test bookings --------------------------------------------------
    fn create_payment_order(
        &self,
        token: &str,
        request: &CreatePaymentOrderRequest,
    ) -> impl Future<Output = ClientResult<PaymentOrder>> + Send;

    fn create_booking(
        &self,
        token: &str,
        request: &CreateBookingRequest,
    ) -> impl Future<Output = ClientResult<()>> + Send;

    // -- consultations ------------------------------------------------------
    fn send_otp(
        &self,
        token: &str,
        user_id: &str,
        phone: &str,
    ) -> impl Future<Output = ClientResult<()>> + Send;

    fn verify_otp(
        &self,
        token: &str,
        user_id: &str,
        phone: &str,
        otp: &str,
    ) -> impl Future<Output = ClientResult<()>> + Send;

    fn create_consultation_payment(
        &self,
        token: &str,
        request: &CreateConsultationPaymentRequest,
    ) -> impl Future<Output = ClientResult<ConsultationOrder>> + Send;

    fn verify_consultation_payment(
        &self,
        token: &str,
        request: &VerifyConsultationPaymentRequest,
    ) -> impl Future<Output = ClientResult<()>> + Send;

    // -- members & addresses ------------------------------------------------
    fn list_members(&self, token: &str)
        -> impl Future<Output = ClientResult<Vec<FamilyMember>>> + Send;

    /// Creates when `id` is `None`, updates otherwise.
    fn save_member(
        &self,
        token: &str,
        id: Option<&str>,
        draft: &MemberDraft,
    ) -> impl Future<Output = ClientResult<FamilyMember>> + Send;

    fn delete_member(&self, token: &str, id: &str)
        -> impl Future<Output = ClientResult<()>> + Send;

    fn list_addresses(&self, token: &str)
        -> impl Future<Output = ClientResult<Vec<Address>>> + Send;

    fn save_address(
        &self,
        token: &str,
        id: Option<&str>,
        draft: &AddressDraft,
    ) -> impl Future<Output = ClientResult<Address>> + Send;

    fn delete_address(&self, token: &str, id: &str)
        -> impl Future<Output = ClientResult<()>> + Send;

    // -- admin --------------------------------------------------------------
    fn list_hospitals(&self, token: &str)
        -> impl Future<Output = ClientResult<Vec<Hospital>>> + Send;

    fn save_hospital(
        &self,
        token: &str,
        draft: &HospitalDraft,
    ) -> impl Future<Output = ClientResult<Hospital>> + Send;

    fn delete_hospital(&self, token: &str, id: &str)
        -> impl Future<Output = ClientResult<()>> + Send;

    fn list_doctors(&self, token: &str) -> impl Future<Output = ClientResult<Vec<Doctor>>> + Send;

    fn save_doctor(
        &self,
        token: &str,
        draft: &DoctorDraft,
    ) -> impl Future<Output = ClientResult<Doctor>> + Send;

    fn delete_doctor(&self, token: &str, id: &str)
        -> impl Future<Output = ClientResult<()>> + Send;
}

// =============================================================================
// HTTP Backend
// =============================================================================

/// [`CommerceBackend`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    base: Url,
    session: SessionContext,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig, session: SessionContext) -> ClientResult<Self> {
        let mut base = config.base_url()?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("HTTP client: {e}")))?;

        Ok(HttpBackend {
            http,
            base,
            session,
        })
    }

    fn request(&self, method: Method, path: &str, token: &str) -> ClientResult<RequestBuilder> {
        let url = self.base.join(path.trim_start_matches('/'))?;
        debug!(%method, %url, "Backend request");
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    /// Sends the request and returns the raw body of a 2xx response.
    async fn execute(&self, request: RequestBuilder) -> ClientResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = status.as_u16(), "Backend rejected the session token");
            self.session.reject();
            let message = error_message(&body).unwrap_or_else(|| "session rejected".into());
            return Err(ClientError::Auth(message));
        }

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            });
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        if let Ok(ack) = serde_json::from_str::<Ack>(&body) {
            if ack.is_failure() {
                return Err(ClientError::Http {
                    status: status.as_u16(),
                    message: ack.message.unwrap_or_else(|| "Request failed".into()),
                });
            }
        }

        Ok(body)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn call_unit(&self, request: RequestBuilder) -> ClientResult<()> {
        self.execute(request).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, token: &str, path: &str) -> ClientResult<T> {
        self.call(self.request(Method::GET, path, token)?).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        token: &str,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.call(self.request(method, path, token)?.json(body))
            .await
    }

    async fn send_json_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        token: &str,
        path: &str,
        body: &B,
    ) -> ClientResult<()> {
        self.call_unit(self.request(method, path, token)?.json(body))
            .await
    }

    async fn delete(&self, token: &str, path: &str) -> ClientResult<()> {
        self.call_unit(self.request(Method::DELETE, path, token)?)
            .await
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
}

/// `/{collection}` for a create, `/{collection}/{id}` for an update.
fn save_target(collection: &str, id: Option<&str>) -> (Method, String) {
    match id {
        Some(id) => (Method::PUT, format!("{collection}/{id}")),
        None => (Method::POST, collection.to_string()),
    }
}

impl CommerceBackend for HttpBackend {
    async fn fetch_cart(&self, token: &str) -> ClientResult<Cart> {
        let envelope: CartEnvelope = self.get(token, "api/cart").await?;
        Ok(envelope.into())
    }

    async fn add_to_cart(&self, token: &str, product_id: &str, quantity: i64) -> ClientResult<()> {
        let body = CartLineRequest {
            product_id,
            quantity,
        };
        self.send_json_unit(Method::POST, token, "api/cart/add", &body)
            .await
    }

    async fn update_cart_item(
        &self,
        token: &str,
        product_id: &str,
        quantity: i64,
    ) -> ClientResult<()> {
        let body = CartLineRequest {
            product_id,
            quantity,
        };
        self.send_json_unit(Method::PUT, token, "api/cart/update", &body)
            .await
    }

    async fn remove_cart_item(&self, token: &str, product_id: &str) -> ClientResult<()> {
        self.delete(token, &format!("api/cart/remove/{product_id}"))
            .await
    }

    async fn apply_coupon(&self, token: &str, code: &str) -> ClientResult<AppliedCoupon> {
        let result: ClientResult<ApplyCouponResponse> = self
            .send_json(Method::POST, token, "api/cart/apply-coupon", &ApplyCouponRequest { code })
            .await;

        match result {
            Ok(response) => Ok(AppliedCoupon {
                coupon: response.coupon.into(),
                pricing: PriceBreakdown::from_server(
                    Money::from_rupees_f64(response.original_total),
                    Money::from_rupees_f64(response.discounted_total),
                ),
            }),
            Err(ClientError::Http { status, message }) if (400..500).contains(&status) => {
                Err(ClientError::Coupon(message))
            }
            Err(e) => Err(e),
        }
    }

    async fn remove_coupon(&self, token: &str) -> ClientResult<()> {
        self.call_unit(self.request(Method::POST, "api/cart/remove-coupon", token)?)
            .await
    }

    async fn create_payment_order(
        &self,
        token: &str,
        request: &CreatePaymentOrderRequest,
    ) -> ClientResult<PaymentOrder> {
        let response: CreatePaymentOrderResponse = self
            .send_json(
                Method::POST,
                token,
                "api/bookings/create-payment-order",
                request,
            )
            .await?;
        Ok(PaymentOrder {
            order_id: response.order_id,
            amount: Money::from_paise(response.amount),
            currency: response.currency,
        })
    }

    async fn create_booking(&self, token: &str, request: &CreateBookingRequest) -> ClientResult<()> {
        self.send_json_unit(Method::POST, token, "api/bookings/create-booking", request)
            .await
    }

    async fn send_otp(&self, token: &str, user_id: &str, phone: &str) -> ClientResult<()> {
        let body = SendOtpRequest {
            user_id,
            phone_number: phone,
        };
        self.send_json_unit(Method::POST, token, "api/doctor/send-otp", &body)
            .await
    }

    async fn verify_otp(
        &self,
        token: &str,
        user_id: &str,
        phone: &str,
        otp: &str,
    ) -> ClientResult<()> {
        let body = VerifyOtpRequest {
            user_id,
            phone_number: phone,
            otp,
        };
        self.send_json_unit(Method::POST, token, "api/doctor/verify-otp", &body)
            .await
    }

    async fn create_consultation_payment(
        &self,
        token: &str,
        request: &CreateConsultationPaymentRequest,
    ) -> ClientResult<ConsultationOrder> {
        let response: CreateConsultationPaymentResponse = self
            .send_json(Method::POST, token, "api/doctor/create-payment", request)
            .await?;
        Ok(ConsultationOrder {
            razorpay_order_id: response.razorpay_order_id,
            consultation_id: response.consultation_id,
            amount: Money::from_paise(response.amount),
            currency: response.currency,
        })
    }

    async fn verify_consultation_payment(
        &self,
        token: &str,
        request: &VerifyConsultationPaymentRequest,
    ) -> ClientResult<()> {
        self.send_json_unit(Method::POST, token, "api/doctor/verify-payment", request)
            .await
    }

    async fn list_members(&self, token: &str) -> ClientResult<Vec<FamilyMember>> {
        let list: ListEnvelope<FamilyMember> = self.get(token, "api/members").await?;
        Ok(list.into_vec())
    }

    async fn save_member(
        &self,
        token: &str,
        id: Option<&str>,
        draft: &MemberDraft,
    ) -> ClientResult<FamilyMember> {
        let (method, path) = save_target("api/members", id);
        self.send_json(method, token, &path, draft).await
    }

    async fn delete_member(&self, token: &str, id: &str) -> ClientResult<()> {
        self.delete(token, &format!("api/members/{id}")).await
    }

    async fn list_addresses(&self, token: &str) -> ClientResult<Vec<Address>> {
        let list: ListEnvelope<Address> = self.get(token, "api/addresses").await?;
        Ok(list.into_vec())
    }

    async fn save_address(
        &self,
        token: &str,
        id: Option<&str>,
        draft: &AddressDraft,
    ) -> ClientResult<Address> {
        let (method, path) = save_target("api/addresses", id);
        self.send_json(method, token, &path, draft).await
    }

    async fn delete_address(&self, token: &str, id: &str) -> ClientResult<()> {
        self.delete(token, &format!("api/addresses/{id}")).await
    }

    async fn list_hospitals(&self, token: &str) -> ClientResult<Vec<Hospital>> {
        let list: ListEnvelope<Hospital> = self.get(token, "api/hospitals").await?;
        Ok(list.into_vec())
    }

    async fn save_hospital(&self, token: &str, draft: &HospitalDraft) -> ClientResult<Hospital> {
        let (method, path) = save_target("api/hospitals", draft.id.as_deref());
        let body = HospitalBody {
            name: &draft.name,
            address: &draft.address,
            city: &draft.city,
            phone: &draft.phone,
            image_url: draft.image_url.as_deref(),
        };
        self.send_json(method, token, &path, &body).await
    }

    async fn delete_hospital(&self, token: &str, id: &str) -> ClientResult<()> {
        self.delete(token, &format!("api/hospitals/{id}")).await
    }

    async fn list_doctors(&self, token: &str) -> ClientResult<Vec<Doctor>> {
        let list: ListEnvelope<DoctorDto> = self.get(token, "api/doctors").await?;
        Ok(list.into_vec().into_iter().map(Doctor::from).collect())
    }

    async fn save_doctor(&self, token: &str, draft: &DoctorDraft) -> ClientResult<Doctor> {
        let (method, path) = save_target("api/doctors", draft.id.as_deref());
        let saved: DoctorDto = self
            .send_json(method, token, &path, &DoctorDto::from(draft))
            .await?;
        Ok(saved.into())
    }

    async fn delete_doctor(&self, token: &str, id: &str) -> ClientResult<()> {
        self.delete(token, &format!("api/doctors/{id}")).await
    }
}

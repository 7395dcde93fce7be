//! # Consultation Booking
//!
//! Drives one open booking modal through phone verification and payment.
//!
//! ## Booking Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────┐  send_otp()     ┌─────┐  verify_otp()   ┌─────────┐           │
//! │  │ Form │ ──────────────► │ Otp │ ──────────────► │ Payment │           │
//! │  └──────┘ valid + sent    └─────┘  code accepted  └────┬────┘           │
//! │     ▲ send failed:           │ wrong code:             │ pay()          │
//! │     └ backend message        └ inline error,           │                │
//! │                                cooldown untouched      ▼                │
//! │                                            create-payment ──► widget    │
//! │                                                         │               │
//! │                 ┌───────────────────┬───────────────────┤               │
//! │                 ▼ dismissed         ▼ verify-payment ok ▼ verify failed │
//! │           ┌───────────┐      ┌───────────┐   ┌────────────────────┐     │
//! │           │ Cancelled │      │ Completed │   │ VerificationFailed │     │
//! │           └───────────┘      └───────────┘   └────────────────────┘     │
//! │                                                                         │
//! │  Resend cooldown: ticks once a second on its own task; regenerate_otp   │
//! │  is refused until it reaches 0.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use carecart_core::consultation::{
    BookingPhase, ConsultationBookingState, ConsultationForm, ValidatedConsultation,
};
use carecart_core::types::Doctor;
use carecart_core::{CoreError, ValidationError};
use chrono::{Local, NaiveDate};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::api::{CreateConsultationPaymentRequest, VerifyConsultationPaymentRequest};
use crate::backend::CommerceBackend;
use crate::config::{ClientConfig, PaymentSettings};
use crate::error::{ClientError, ClientResult};
use crate::notify::{NoOpNotifier, Notification, Notifier};
use crate::payment::{PaymentOptions, PaymentWidget, Prefill, WidgetOutcome};
use crate::session::SessionContext;

const COOLDOWN_TICK: Duration = Duration::from_secs(1);

type SharedState = Arc<Mutex<ConsultationBookingState>>;

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, ConsultationBookingState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a backend exchange in flight; cleared on drop, so a cancelled
/// future cannot leave the flag stuck.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    pub(crate) fn enter(flag: &'a AtomicBool, what: &str) -> ClientResult<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(ClientError::Busy(what.to_string()));
        }
        Ok(InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Consultation Booking
// =============================================================================

pub struct ConsultationBooking<B, W> {
    backend: Arc<B>,
    widget: Arc<W>,
    session: SessionContext,
    notifier: Arc<dyn Notifier>,
    payment: PaymentSettings,
    slots: Vec<String>,
    close_delay: Duration,
    doctor: Doctor,
    state: SharedState,
    in_flight: AtomicBool,
    open: AtomicBool,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl<B: CommerceBackend, W: PaymentWidget> ConsultationBooking<B, W> {
    /// Opens a booking modal for `doctor`.
    pub fn new(
        backend: Arc<B>,
        widget: Arc<W>,
        session: SessionContext,
        config: &ClientConfig,
        doctor: Doctor,
    ) -> ClientResult<Self> {
        Ok(ConsultationBooking {
            backend,
            widget,
            session,
            notifier: Arc::new(NoOpNotifier),
            payment: config.payment.clone(),
            slots: config.booking.time_slots()?,
            close_delay: config.booking.close_delay(),
            doctor,
            state: Arc::new(Mutex::new(ConsultationBookingState::new(
                config.booking.otp_resend_secs,
            ))),
            in_flight: AtomicBool::new(false),
            open: AtomicBool::new(true),
            ticker: Mutex::new(None),
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ConsultationBookingState) -> R) -> R {
        f(&mut lock(&self.state))
    }

    // =========================================================================
    // Reads & Input
    // =========================================================================

    /// Snapshot of the modal's state.
    pub fn state(&self) -> ConsultationBookingState {
        self.with_state(|s| s.clone())
    }

    pub fn phase(&self) -> BookingPhase {
        self.with_state(|s| s.phase())
    }

    /// Bookable slots for the appointment time picker.
    pub fn time_slots(&self) -> &[String] {
        &self.slots
    }

    /// Whether the modal is still showing (it closes a moment after a
    /// completed booking).
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn set_form(&self, form: ConsultationForm) {
        self.with_state(|s| s.form = form);
    }

    pub fn type_digit(&self, c: char) -> bool {
        self.with_state(|s| s.otp_mut().type_char(c))
    }

    pub fn backspace(&self) {
        self.with_state(|s| s.otp_mut().backspace());
    }

    pub fn paste_otp(&self, text: &str) {
        self.with_state(|s| s.otp_mut().paste(text));
    }

    pub fn clear_otp(&self) {
        self.with_state(|s| s.otp_mut().clear());
    }

    pub fn focus_digit(&self, index: usize) {
        self.with_state(|s| s.otp_mut().set_focus(index));
    }

    fn validated(&self) -> ClientResult<ValidatedConsultation> {
        self.with_state(|s| s.validated().cloned())
            .ok_or_else(|| ValidationError::required("appointment details").into())
    }

    // =========================================================================
    // OTP
    // =========================================================================

    /// Validates the form and sends an OTP to the patient's phone.
    pub async fn send_otp(&self) -> ClientResult<()> {
        self.send_otp_on(Local::now().date_naive()).await
    }

    /// As [`ConsultationBooking::send_otp`], with appointment dates judged
    /// against `today`.
    pub async fn send_otp_on(&self, today: NaiveDate) -> ClientResult<()> {
        let _guard = InFlight::enter(&self.in_flight, "booking")?;
        let valid = self.with_state(|s| s.submit_form(today, &self.slots))?;
        let session = self.session.require()?;
        debug!(doctor_id = %self.doctor.id, "Sending OTP");

        match self
            .backend
            .send_otp(&session.token, &session.user_id, &valid.phone)
            .await
        {
            Ok(()) => {
                self.with_state(|s| s.otp_sent())?;
                self.start_cooldown();
                info!(phase = %BookingPhase::Otp, "OTP sent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "OTP send failed");
                self.with_state(|s| s.otp_send_failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Checks the six typed digits with the backend.
    pub async fn verify_otp(&self) -> ClientResult<()> {
        let _guard = InFlight::enter(&self.in_flight, "booking")?;
        let code = self.with_state(|s| s.begin_verify())?;
        let valid = self.validated()?;
        let session = self.session.require()?;
        debug!("Verifying OTP");

        match self
            .backend
            .verify_otp(&session.token, &session.user_id, &valid.phone, &code)
            .await
        {
            Ok(()) => {
                self.with_state(|s| s.otp_verified())?;
                info!(phase = %BookingPhase::Payment, "OTP verified");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "OTP rejected");
                self.with_state(|s| s.otp_rejected(e.to_string()));
                Err(e)
            }
        }
    }

    /// Sends a fresh OTP once the cooldown has run out.
    pub async fn regenerate_otp(&self) -> ClientResult<()> {
        let _guard = InFlight::enter(&self.in_flight, "booking")?;
        self.with_state(|s| s.begin_regenerate())?;
        let valid = self.validated()?;
        let session = self.session.require()?;
        debug!("Resending OTP");

        match self
            .backend
            .send_otp(&session.token, &session.user_id, &valid.phone)
            .await
        {
            Ok(()) => {
                self.with_state(|s| s.otp_resent());
                self.start_cooldown();
                info!("OTP resent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "OTP resend failed");
                self.with_state(|s| s.otp_send_failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// One second of cooldown, for front ends that drive their own clock.
    pub fn tick(&self) -> u32 {
        self.with_state(|s| s.tick())
    }

    /// (Re)starts the once-a-second cooldown task.
    fn start_cooldown(&self) {
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(COOLDOWN_TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if lock(&state).tick() == 0 {
                    break;
                }
            }
        });

        let previous = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Creates the payment order, opens the widget and verifies the result.
    ///
    /// Returns the phase the modal ended in. A verification failure is
    /// final: nothing is retried and the patient is sent to support.
    pub async fn pay(&self) -> ClientResult<BookingPhase> {
        let _guard = InFlight::enter(&self.in_flight, "booking")?;
        let phase = self.phase();
        if phase != BookingPhase::Payment {
            return Err(ClientError::from(CoreError::InvalidTransition {
                step: phase.to_string(),
                action: "pay".to_string(),
            }));
        }
        let valid = self.validated()?;
        let session = self.session.require()?;

        let request = CreateConsultationPaymentRequest {
            user_id: session.user_id.clone(),
            doctor_id: self.doctor.id.clone(),
            hospital_id: self.doctor.hospital_id.clone(),
            patient_name: valid.patient_name.clone(),
            email: valid.email.clone(),
            phone_number: valid.phone.clone(),
            appointment_date: valid.date.format("%Y-%m-%d").to_string(),
            appointment_time: valid.time.clone(),
            reason: valid.reason.clone(),
            amount_paid: self.doctor.consultation_fee.to_rupees_f64(),
        };
        debug!(doctor_id = %request.doctor_id, date = %request.appointment_date, "Creating consultation payment");

        let order = match self
            .backend
            .create_consultation_payment(&session.token, &request)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Consultation payment order failed");
                self.with_state(|s| s.payment_order_failed(e.to_string()));
                self.report(&e);
                return Err(e);
            }
        };
        self.with_state(|s| s.payment_order_created(order.clone()))?;
        info!(
            order_id = %order.razorpay_order_id,
            consultation_id = %order.consultation_id,
            "Consultation payment order created"
        );

        let options = PaymentOptions::new(
            &self.payment,
            &order.razorpay_order_id,
            order.amount,
            &order.currency,
            format!("Consultation with {}", self.doctor.name),
        )
        .with_prefill(Prefill {
            name: valid.patient_name,
            email: valid.email,
            contact: valid.phone,
        });

        let confirmation = match self.widget.open(options).await {
            WidgetOutcome::Success(confirmation) => confirmation,
            WidgetOutcome::Dismissed => {
                self.with_state(|s| s.payment_dismissed())?;
                warn!(order_id = %order.razorpay_order_id, "Payment widget dismissed, order left to expire");
                self.notifier.notify(Notification::warning(
                    "Payment cancelled",
                    "Your consultation was not booked.",
                ));
                return Ok(BookingPhase::Cancelled);
            }
            WidgetOutcome::Failed(reason) => {
                warn!(order_id = %order.razorpay_order_id, reason = %reason, "Payment failed in widget");
                self.with_state(|s| s.payment_order_failed(reason.clone()));
                self.notifier
                    .notify(Notification::error("Payment failed", reason));
                return Ok(BookingPhase::Payment);
            }
        };

        let verify = VerifyConsultationPaymentRequest {
            razorpay_order_id: confirmation.razorpay_order_id,
            razorpay_payment_id: confirmation.razorpay_payment_id,
            razorpay_signature: confirmation.razorpay_signature,
            consultation_id: order.consultation_id.clone(),
        };

        if let Err(e) = self
            .backend
            .verify_consultation_payment(&session.token, &verify)
            .await
        {
            error!(
                order_id = %order.razorpay_order_id,
                consultation_id = %order.consultation_id,
                error = %e,
                "Consultation payment verification failed"
            );
            let err = ClientError::PaymentVerification(e.to_string());
            self.with_state(|s| s.verification_failed(err.to_string()))?;
            self.report(&err);
            return Err(err);
        }

        self.with_state(|s| s.payment_verified())?;
        info!(consultation_id = %order.consultation_id, "Consultation booked");
        self.notifier.notify(Notification::success(
            "Consultation booked",
            format!("Your appointment with {} is confirmed.", self.doctor.name),
        ));

        tokio::time::sleep(self.close_delay).await;
        self.open.store(false, Ordering::SeqCst);
        Ok(BookingPhase::Completed)
    }

    fn report(&self, err: &ClientError) {
        if !err.is_auth() {
            self.notifier.notify(Notification::from_error(err));
        }
    }
}

impl<B, W> Drop for ConsultationBooking<B, W> {
    fn drop(&mut self) {
        if let Some(ticker) = self
            .ticker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            ticker.abort();
        }
    }
}

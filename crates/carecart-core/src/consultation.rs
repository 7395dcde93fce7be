//! # Consultation Booking State Machine
//!
//! The pure half of the OTP-gated consultation booking: form data, the six
//! OTP digit boxes, the resend cooldown and the phase transitions. The
//! client crate performs the network calls and feeds the results back in.
//!
//! ## Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────┐ otp_sent  ┌─────┐ otp_verified ┌─────────┐                    │
//! │  │ Form │ ────────► │ Otp │ ───────────► │ Payment │                    │
//! │  └──────┘           └─────┘              └────┬────┘                    │
//! │     ▲ send failed     │ ▲ wrong code          │                         │
//! │     └─(stay, error)   └─┘ (stay, error)       │                         │
//! │                                               ├── verified ──► Completed│
//! │                                               ├── dismissed ─► Cancelled│
//! │                                               └── rejected ──► VerificationFailed
//! │                                                                         │
//! │  Resend cooldown: 30 → 0, one tick per second; regenerate needs 0.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    parse_date, validate_appointment_date, validate_email, validate_name, validate_phone,
    validate_reason, validate_time_slot,
};
use crate::{DEFAULT_RESEND_COOLDOWN_SECS, OTP_LENGTH};

// =============================================================================
// Form
// =============================================================================

/// Raw appointment form as typed by the patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationForm {
    pub patient_name: String,
    pub email: String,
    pub phone: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, one of the generated slots.
    pub time: String,
    pub reason: String,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedConsultation {
    pub patient_name: String,
    pub email: String,
    pub phone: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub time: String,
    pub reason: String,
}

impl ConsultationForm {
    /// Validates every field, stopping at the first bad one.
    pub fn validate(
        &self,
        today: NaiveDate,
        slots: &[String],
    ) -> Result<ValidatedConsultation, ValidationError> {
        let patient_name = validate_name("patient name", &self.patient_name)?;
        let email = validate_email(&self.email)?;
        let phone = validate_phone(&self.phone)?;
        let date = parse_date("date", &self.date)?;
        validate_appointment_date(date, today)?;
        let time = validate_time_slot(&self.time, slots)?;
        let reason = validate_reason(&self.reason)?;

        Ok(ValidatedConsultation {
            patient_name,
            email,
            phone,
            date,
            time,
            reason,
        })
    }
}

// =============================================================================
// OTP Input
// =============================================================================

/// Six single-character boxes with a focus cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpInput {
    digits: [Option<char>; OTP_LENGTH],
    focus: usize,
}

impl OtpInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn digits(&self) -> &[Option<char>; OTP_LENGTH] {
        &self.digits
    }

    pub fn set_focus(&mut self, index: usize) {
        self.focus = index.min(OTP_LENGTH - 1);
    }

    /// Types into the focused box. A digit fills it and advances focus;
    /// anything else is ignored. Returns whether the input was accepted.
    pub fn type_char(&mut self, c: char) -> bool {
        if !c.is_ascii_digit() {
            return false;
        }
        self.digits[self.focus] = Some(c);
        if self.focus + 1 < OTP_LENGTH {
            self.focus += 1;
        }
        true
    }

    /// Backspace: clears the focused box, or if it is already empty moves
    /// focus back and clears the previous box.
    pub fn backspace(&mut self) {
        if self.digits[self.focus].is_some() {
            self.digits[self.focus] = None;
        } else if self.focus > 0 {
            self.focus -= 1;
            self.digits[self.focus] = None;
        }
    }

    /// Fills boxes from a pasted code, ignoring non-digits.
    pub fn paste(&mut self, text: &str) {
        for c in text.chars().filter(char::is_ascii_digit).take(OTP_LENGTH) {
            self.type_char(c);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    /// The six-digit code once every box is filled.
    pub fn code(&self) -> Option<String> {
        self.digits.iter().copied().collect()
    }
}

// =============================================================================
// Resend Cooldown
// =============================================================================

/// Seconds left before another OTP can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendCooldown {
    remaining: u32,
    period: u32,
}

impl Default for ResendCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_RESEND_COOLDOWN_SECS)
    }
}

impl ResendCooldown {
    /// An idle cooldown that starts at `period` seconds when triggered.
    pub fn new(period: u32) -> Self {
        ResendCooldown {
            remaining: 0,
            period,
        }
    }

    pub fn start(&mut self) {
        self.remaining = self.period;
    }

    /// One second elapsed. Returns the remaining seconds.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_ready(&self) -> bool {
        self.remaining == 0
    }
}

// =============================================================================
// Booking State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum BookingPhase {
    Form,
    Otp,
    Payment,
    Completed,
    Cancelled,
    VerificationFailed,
}

impl BookingPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingPhase::Completed | BookingPhase::Cancelled | BookingPhase::VerificationFailed
        )
    }
}

impl fmt::Display for BookingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingPhase::Form => "form",
            BookingPhase::Otp => "otp",
            BookingPhase::Payment => "payment",
            BookingPhase::Completed => "completed",
            BookingPhase::Cancelled => "cancelled",
            BookingPhase::VerificationFailed => "verificationFailed",
        };
        f.write_str(name)
    }
}

/// Payment order created for a consultation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsultationOrder {
    pub razorpay_order_id: String,
    pub consultation_id: String,
    pub amount: Money,
    pub currency: String,
}

/// All state for one open booking modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsultationBookingState {
    pub form: ConsultationForm,
    phase: BookingPhase,
    validated: Option<ValidatedConsultation>,
    otp: OtpInput,
    cooldown: ResendCooldown,
    error: Option<String>,
    order: Option<ConsultationOrder>,
}

impl Default for ConsultationBookingState {
    fn default() -> Self {
        Self::new(DEFAULT_RESEND_COOLDOWN_SECS)
    }
}

impl ConsultationBookingState {
    pub fn new(resend_cooldown_secs: u32) -> Self {
        ConsultationBookingState {
            form: ConsultationForm::default(),
            phase: BookingPhase::Form,
            validated: None,
            otp: OtpInput::new(),
            cooldown: ResendCooldown::new(resend_cooldown_secs),
            error: None,
            order: None,
        }
    }

    pub fn phase(&self) -> BookingPhase {
        self.phase
    }

    pub fn otp(&self) -> &OtpInput {
        &self.otp
    }

    pub fn otp_mut(&mut self) -> &mut OtpInput {
        &mut self.otp
    }

    pub fn resend_remaining(&self) -> u32 {
        self.cooldown.remaining()
    }

    /// Inline error for the current phase (backend message or validation).
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn validated(&self) -> Option<&ValidatedConsultation> {
        self.validated.as_ref()
    }

    pub fn order(&self) -> Option<&ConsultationOrder> {
        self.order.as_ref()
    }

    fn require(&self, phase: BookingPhase, action: &str) -> CoreResult<()> {
        if self.phase != phase {
            return Err(CoreError::InvalidTransition {
                step: self.phase.to_string(),
                action: action.to_string(),
            });
        }
        Ok(())
    }

    /// Validates the form ahead of sending an OTP.
    pub fn submit_form(
        &mut self,
        today: NaiveDate,
        slots: &[String],
    ) -> CoreResult<ValidatedConsultation> {
        self.require(BookingPhase::Form, "send OTP")?;
        match self.form.validate(today, slots) {
            Ok(valid) => {
                self.error = None;
                self.validated = Some(valid.clone());
                Ok(valid)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Backend sent the OTP: Form → Otp, cooldown starts.
    pub fn otp_sent(&mut self) -> CoreResult<()> {
        self.require(BookingPhase::Form, "enter OTP")?;
        self.phase = BookingPhase::Otp;
        self.otp.clear();
        self.cooldown.start();
        self.error = None;
        Ok(())
    }

    /// Send failed: stay in Form with the backend's message.
    pub fn otp_send_failed(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// The code to verify, once all six boxes are filled.
    pub fn begin_verify(&self) -> CoreResult<String> {
        self.require(BookingPhase::Otp, "verify OTP")?;
        self.otp
            .code()
            .ok_or_else(|| ValidationError::required("otp").into())
    }

    /// Correct code: Otp → Payment.
    pub fn otp_verified(&mut self) -> CoreResult<()> {
        self.require(BookingPhase::Otp, "proceed to payment")?;
        self.phase = BookingPhase::Payment;
        self.error = None;
        Ok(())
    }

    /// Wrong code: stay in Otp with an inline error. The cooldown is left
    /// alone.
    pub fn otp_rejected(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Checks an OTP may be re-sent now.
    pub fn begin_regenerate(&self) -> CoreResult<()> {
        self.require(BookingPhase::Otp, "resend OTP")?;
        if !self.cooldown.is_ready() {
            return Err(CoreError::ResendCooldown {
                remaining_secs: self.cooldown.remaining(),
            });
        }
        Ok(())
    }

    /// New OTP sent: timer restarts and the boxes are cleared.
    pub fn otp_resent(&mut self) {
        self.otp.clear();
        self.cooldown.start();
        self.error = None;
    }

    /// One second elapsed on the resend cooldown.
    pub fn tick(&mut self) -> u32 {
        self.cooldown.tick()
    }

    pub fn payment_order_created(&mut self, order: ConsultationOrder) -> CoreResult<()> {
        self.require(BookingPhase::Payment, "open payment")?;
        self.order = Some(order);
        self.error = None;
        Ok(())
    }

    /// Payment order creation failed; stay on Payment so the user can retry.
    pub fn payment_order_failed(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn payment_verified(&mut self) -> CoreResult<()> {
        self.require(BookingPhase::Payment, "complete booking")?;
        self.phase = BookingPhase::Completed;
        self.error = None;
        Ok(())
    }

    pub fn payment_dismissed(&mut self) -> CoreResult<()> {
        self.require(BookingPhase::Payment, "cancel payment")?;
        self.phase = BookingPhase::Cancelled;
        Ok(())
    }

    pub fn verification_failed(&mut self, message: impl Into<String>) -> CoreResult<()> {
        self.require(BookingPhase::Payment, "fail verification")?;
        self.phase = BookingPhase::VerificationFailed;
        self.error = Some(message.into());
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::generate_time_slots;
    use chrono::NaiveTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    fn slots() -> Vec<String> {
        generate_time_slots(
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 30, 0).unwrap(),
            30,
        )
    }

    fn valid_form() -> ConsultationForm {
        ConsultationForm {
            patient_name: "Ravi Kumar".to_string(),
            email: "ravi@example.in".to_string(),
            phone: "9876543210".to_string(),
            date: "2026-10-16".to_string(),
            time: "11:30".to_string(),
            reason: "Follow-up on blood work".to_string(),
        }
    }

    fn at_otp() -> ConsultationBookingState {
        let mut state = ConsultationBookingState::default();
        state.form = valid_form();
        state.submit_form(today(), &slots()).unwrap();
        state.otp_sent().unwrap();
        state
    }

    #[test]
    fn test_form_validation_errors_stay_in_form() {
        let mut state = ConsultationBookingState::default();
        state.form = valid_form();
        state.form.date = "2026-10-15".to_string();
        let err = state.submit_form(today(), &slots()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(state.phase(), BookingPhase::Form);
        assert!(state.error().is_some());
    }

    #[test]
    fn test_valid_form_then_otp_starts_cooldown() {
        let state = at_otp();
        assert_eq!(state.phase(), BookingPhase::Otp);
        assert_eq!(state.resend_remaining(), 30);
        assert_eq!(state.validated().unwrap().time, "11:30");
    }

    #[test]
    fn test_wrong_otp_keeps_phase_and_cooldown() {
        let mut state = at_otp();
        state.tick();
        state.otp_mut().paste("123456");
        assert_eq!(state.begin_verify().unwrap(), "123456");

        state.otp_rejected("Invalid OTP");
        assert_eq!(state.phase(), BookingPhase::Otp);
        assert_eq!(state.error(), Some("Invalid OTP"));
        assert_eq!(state.resend_remaining(), 29);

        state.otp_verified().unwrap();
        assert_eq!(state.phase(), BookingPhase::Payment);
        assert_eq!(state.error(), None);
    }

    #[test]
    fn test_verify_requires_six_digits() {
        let mut state = at_otp();
        state.otp_mut().paste("123");
        assert!(matches!(state.begin_verify(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_regenerate_only_after_cooldown() {
        let mut state = at_otp();
        state.otp_mut().paste("111111");
        assert!(matches!(
            state.begin_regenerate(),
            Err(CoreError::ResendCooldown { remaining_secs: 30 })
        ));

        for _ in 0..30 {
            state.tick();
        }
        assert_eq!(state.tick(), 0);
        state.begin_regenerate().unwrap();
        state.otp_resent();
        assert_eq!(state.resend_remaining(), 30);
        assert_eq!(state.otp().code(), None);
        assert_eq!(state.otp().focus(), 0);
    }

    #[test]
    fn test_otp_focus_movement() {
        let mut otp = OtpInput::new();
        assert!(otp.type_char('4'));
        assert!(otp.type_char('2'));
        assert!(!otp.type_char('x'));
        assert_eq!(otp.focus(), 2);

        // box 2 is empty: move back to box 1 and clear it
        otp.backspace();
        assert_eq!(otp.focus(), 1);
        assert_eq!(otp.digits()[1], None);
        assert_eq!(otp.digits()[0], Some('4'));

        otp.paste("23456");
        assert_eq!(otp.code().as_deref(), Some("423456"));
        assert_eq!(otp.focus(), OTP_LENGTH - 1);

        // last box is filled: backspace clears it in place
        otp.backspace();
        assert_eq!(otp.focus(), OTP_LENGTH - 1);
        assert!(!otp.is_complete());

        let mut empty = OtpInput::new();
        empty.backspace();
        assert_eq!(empty.focus(), 0);
    }

    #[test]
    fn test_transitions_out_of_order_are_rejected() {
        let mut state = ConsultationBookingState::default();
        assert!(matches!(
            state.otp_verified(),
            Err(CoreError::InvalidTransition { .. })
        ));
        assert!(state.begin_verify().is_err());
        assert!(state.payment_dismissed().is_err());
    }

    #[test]
    fn test_payment_outcomes_are_terminal() {
        let mut state = at_otp();
        state.otp_verified().unwrap();
        state
            .payment_order_created(ConsultationOrder {
                razorpay_order_id: "order_1".to_string(),
                consultation_id: "c1".to_string(),
                amount: Money::from_rupees(800),
                currency: "INR".to_string(),
            })
            .unwrap();

        let mut cancelled = state.clone();
        cancelled.payment_dismissed().unwrap();
        assert!(cancelled.phase().is_terminal());

        let mut failed = state.clone();
        failed.verification_failed("Signature mismatch").unwrap();
        assert_eq!(failed.phase(), BookingPhase::VerificationFailed);

        state.payment_verified().unwrap();
        assert_eq!(state.phase(), BookingPhase::Completed);
        assert!(state.payment_verified().is_err());
    }
}

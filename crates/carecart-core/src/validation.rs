//! # Validation Module
//!
//! Input validation for every form the client submits.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end                                                    │
//! │  ├── Input masks (digits only, max length)                             │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: carecart-client                                              │
//! │  └── THIS MODULE: runs before any request is built                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend                                                      │
//! │  ├── Coupon rules, OTP correctness                                     │
//! │  └── Ownership checks                                                  │
//! │                                                                         │
//! │  A ValidationError never reaches the network.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use carecart_core::validation::{validate_phone, validate_quantity};
//!
//! validate_quantity(5).unwrap();
//! assert_eq!(validate_phone(" 9876543210 ").unwrap(), "9876543210");
//! ```

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text field the backend accepts.
const MAX_TEXT_LEN: usize = 200;

/// Longest appointment reason.
const MAX_REASON_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Trims `value` and checks it is non-empty and at most `max` characters.
///
/// ## Example
/// ```rust
/// use carecart_core::validation::validate_text;
///
/// assert_eq!(validate_text("name", "  Asha  ", 50).unwrap(), "Asha");
/// assert!(validate_text("name", "   ", 50).is_err());
/// ```
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// A person's name (patient, member, doctor).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    validate_text(field, name, MAX_TEXT_LEN)
}

/// Reason for a consultation.
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    validate_text("reason", reason, MAX_REASON_LEN)
}

/// Validates a coupon code.
///
/// ## Rules
/// - Trimmed, must not be empty
/// - At most 32 characters
///
/// Eligibility (expiry, minimum, usage) is the backend's call.
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    validate_text("coupon code", code, 32)
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@` with a non-empty local part
/// - Domain has a dot that is neither first nor last
/// - No whitespace
///
/// ## Example
/// ```rust
/// use carecart_core::validation::validate_email;
///
/// assert!(validate_email("asha@example.in").is_ok());
/// assert!(validate_email("asha@example").is_err());
/// assert!(validate_email("asha example@x.in").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    let invalid = || ValidationError::invalid("email", "must be a valid email address");

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let dot_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..");
    if !dot_ok {
        return Err(invalid());
    }

    Ok(email.to_string())
}

/// Checks `value` is exactly `len` ASCII digits.
fn validate_digits(field: &str, value: &str, len: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.len() != len || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("must be exactly {len} digits"),
        });
    }

    Ok(value.to_string())
}

/// Validates a phone number: exactly 10 digits.
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    validate_digits("phone", phone, 10)
}

/// Validates a postal code: exactly 6 digits.
pub fn validate_pincode(pincode: &str) -> ValidationResult<String> {
    validate_digits("pincode", pincode, 6)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Add Test                                                         │
/// │                                                                         │
/// │  User picks quantity: 2                                                 │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(2) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → POST /api/cart/add                                      │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Quantity *updates* clamp below 1 instead of failing; see
/// [`crate::cart::CartLedger::begin_update_quantity`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount that must be strictly positive (fees).
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates cart size (number of distinct lines) before adding a new one.
///
/// ## Rules
/// - Must not exceed MAX_CART_ITEMS (100)
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Date & Time Validators
// =============================================================================

/// Validates an appointment date: tomorrow or later.
///
/// `today` is supplied by the caller so this stays deterministic.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use carecart_core::validation::validate_appointment_date;
///
/// let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
/// assert!(validate_appointment_date(today, today).is_err());
/// assert!(validate_appointment_date(today.succ_opt().unwrap(), today).is_ok());
/// ```
pub fn validate_appointment_date(date: NaiveDate, today: NaiveDate) -> ValidationResult<()> {
    if date <= today {
        return Err(ValidationError::invalid("date", "must be tomorrow or later"));
    }

    Ok(())
}

/// Parses `YYYY-MM-DD`.
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::invalid(field, "must be a date in YYYY-MM-DD format"))
}

/// Generates bookable slots from `start` to `end` (inclusive) every
/// `interval_mins`, rendered `HH:MM`.
///
/// ```rust
/// use chrono::NaiveTime;
/// use carecart_core::validation::generate_time_slots;
///
/// let slots = generate_time_slots(
///     NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
///     NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
///     30,
/// );
/// assert_eq!(slots, vec!["10:00", "10:30", "11:00"]);
/// ```
pub fn generate_time_slots(start: NaiveTime, end: NaiveTime, interval_mins: u32) -> Vec<String> {
    let mut slots = Vec::new();
    if interval_mins == 0 || end < start {
        return slots;
    }

    let step = Duration::minutes(interval_mins as i64);
    let mut current = start;
    loop {
        slots.push(format!("{:02}:{:02}", current.hour(), current.minute()));
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 || next > end {
            break;
        }
        current = next;
    }
    slots
}

/// Checks `slot` is one of the generated `slots`.
pub fn validate_time_slot(slot: &str, slots: &[String]) -> ValidationResult<String> {
    let slot = slot.trim();
    if slot.is_empty() {
        return Err(ValidationError::required("time"));
    }
    if !slots.iter().any(|s| s == slot) {
        return Err(ValidationError::NotAllowed {
            field: "time".to_string(),
            allowed: slots.to_vec(),
        });
    }
    Ok(slot.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Error Types
//!
//! Domain-specific error types for carecart-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  carecart-core errors (this file)                                      │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  ├── ValidationError  - Input validation failures (never hit network)  │
//! │  └── StepGuardError   - Checkout stepper refused to advance            │
//! │                                                                         │
//! │  carecart-client errors (separate crate)                               │
//! │  └── ClientError      - Auth / Network / Coupon / Payment failures     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → toast / inline msg  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The product is not a line item of the cart.
    #[error("Product {0} is not in the cart")]
    ItemNotInCart(String),

    /// A mutation for this resource is still waiting on the backend.
    ///
    /// ## When This Occurs
    /// - Tapping "+" twice on the same line before the first update resolves
    /// - Applying a coupon while a previous apply/remove is in flight
    #[error("{resource} is busy, wait for the pending change to finish")]
    ResourceBusy { resource: String },

    /// A recomputation found the cart's derived fields out of line with its
    /// items.
    #[error("Cart invariant violated: {0}")]
    InvariantViolation(String),

    /// The booking flow was asked to do something its current step forbids.
    ///
    /// ## When This Occurs
    /// - Verifying an OTP while still on the form step
    /// - Regenerating an OTP while the resend cooldown is running
    #[error("Cannot {action} while booking is at step '{step}'")]
    InvalidTransition { step: String, action: String },

    /// OTP regeneration requested before the cooldown expired.
    #[error("OTP can be resent in {remaining_secs} seconds")]
    ResendCooldown { remaining_secs: u32 },

    /// Checkout stepper guard.
    #[error(transparent)]
    Step(#[from] StepGuardError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are raised before any backend call so that a bad form never
/// produces a network request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (email, phone, pincode, date...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: &str) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Name of the offending field, for inline form errors.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

// =============================================================================
// Step Guard Error
// =============================================================================

/// Why the checkout stepper refused to move forward.
///
/// Each missing selection has its own variant so the UI can point at the
/// exact panel the user still has to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StepGuardError {
    #[error("Your cart is empty. Add a test or package to continue")]
    EmptyCart,

    #[error("Select at least one family member")]
    MissingMember,

    #[error("Select a collection address")]
    MissingAddress,

    #[error("Select at least one family member and a collection address")]
    MissingMemberAndAddress,

    /// Forward navigation from the Payment step.
    #[error("Payment is the final step")]
    AtFinalStep,

    /// Navigation to a step that is not behind the current one.
    #[error("Can only go back to an earlier step")]
    NotAPriorStep,

    /// The cart was edited after the payment step was reached.
    #[error("Your cart changed. Please review it before paying")]
    CartChanged,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::ResendCooldown { remaining_secs: 12 };
        assert_eq!(err.to_string(), "OTP can be resent in 12 seconds");

        let err = CoreError::InvalidTransition {
            step: "form".to_string(),
            action: "verify OTP".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot verify OTP while booking is at step 'form'");
    }

    #[test]
    fn test_validation_error_field() {
        let err = ValidationError::invalid("phone", "must be exactly 10 digits");
        assert_eq!(err.field(), "phone");
        assert_eq!(err.to_string(), "phone has invalid format: must be exactly 10 digits");
    }

    #[test]
    fn test_step_guard_converts_to_core_error() {
        let core_err: CoreError = StepGuardError::MissingAddress.into();
        assert!(matches!(core_err, CoreError::Step(StepGuardError::MissingAddress)));
        assert_eq!(core_err.to_string(), "Select a collection address");
    }
}

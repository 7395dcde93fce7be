//! # Client Error Types
//!
//! Error types for every operation that talks to the backend or the
//! payment widget.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │     Session     │  │    Transport    │  │     Domain              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Auth           │  │  Network        │  │  Validation (no I/O)    │ │
//! │  │  (401/403,      │  │  Http {status}  │  │  Coupon (backend msg)   │ │
//! │  │   expired JWT)  │  │  Serialization  │  │  Busy / Core            │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Payment      │  │  Configuration  │                              │
//! │  │                 │  │                 │                              │
//! │  │  Payment-       │  │  Config         │                              │
//! │  │  Verification   │  │  Io             │                              │
//! │  │  (never retry)  │  │                 │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use carecart_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Every failure a client operation can surface.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Session Errors
    // =========================================================================
    /// No session, an expired token, or the backend answered 401/403.
    /// The caller should send the user to login.
    #[error("Please log in to continue: {0}")]
    Auth(String),

    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Form input rejected before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Another change to the same item or coupon is still in flight.
    #[error("{0} is busy, please wait")]
    Busy(String),

    /// Domain rule violation (stepper guard, invalid phase transition, ...).
    #[error(transparent)]
    Core(CoreError),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    // =========================================================================
    // Business Errors
    // =========================================================================
    /// Backend rejected a coupon; the message is shown verbatim.
    #[error("{0}")]
    Coupon(String),

    /// Payment was captured but could not be verified or recorded.
    #[error("Payment verification failed: {0}. Please contact support.")]
    PaymentVerification(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => ClientError::Validation(v),
            CoreError::ResourceBusy { resource } => ClientError::Busy(resource),
            other => ClientError::Core(other),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Serialization(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(format!("invalid URL: {err}"))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ClientError {
    /// Returns true if the failed request may be retried as-is.
    ///
    /// Only transport failures and 5xx responses qualify. Callers must still
    /// restrict retries to idempotent reads.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the user has to log in again.
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_))
    }

    /// Title and message for a toast.
    pub fn user_message(&self) -> (&'static str, String) {
        let title = match self {
            ClientError::Auth(_) => "Login required",
            ClientError::Validation(_) => "Check your details",
            ClientError::Busy(_) => "Please wait",
            ClientError::Core(_) => "Not allowed",
            ClientError::Network(_) => "Connection problem",
            ClientError::Http { .. } => "Request failed",
            ClientError::Serialization(_) => "Unexpected response",
            ClientError::Coupon(_) => "Coupon not applied",
            ClientError::PaymentVerification(_) => "Payment verification failed",
            ClientError::Config(_) | ClientError::Io(_) => "Setup problem",
        };
        (title, self.to_string())
    }
}

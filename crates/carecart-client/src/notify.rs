//! # Notifications
//!
//! Transient toasts raised by the flows. Blocking errors (stepper guards,
//! form validation, a wrong OTP) are returned inline instead.
//!
//! ```text
//! flow ──► Arc<dyn Notifier> ──► ToastQueue   (front end renders `active()`)
//!                            └─► NoOpNotifier (tests, headless use)
//! ```

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// One toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    /// `false` keeps the toast until dismissed by hand.
    pub auto_dismiss: bool,
}

impl Notification {
    pub fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Notification {
            id: Uuid::new_v4(),
            title: title.into(),
            message: message.into(),
            severity,
            auto_dismiss: true,
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Success, title, message)
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, title, message)
    }

    /// Toast for a failed operation. Payment verification failures stay up
    /// until dismissed.
    pub fn from_error(err: &ClientError) -> Self {
        let (title, message) = err.user_message();
        let mut n = Self::error(title, message);
        n.auto_dismiss = !matches!(err, ClientError::PaymentVerification(_));
        n
    }

    pub fn sticky(mut self) -> Self {
        self.auto_dismiss = false;
        self
    }
}

// =============================================================================
// Notifier
// =============================================================================

/// Sink for toasts.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Discards everything.
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, _notification: Notification) {}
}

// =============================================================================
// Toast Queue
// =============================================================================

/// Live toasts with expiry.
pub struct ToastQueue {
    lifetime: Duration,
    toasts: Mutex<Vec<(Notification, Instant)>>,
}

impl ToastQueue {
    pub fn new(lifetime: Duration) -> Self {
        ToastQueue {
            lifetime,
            toasts: Mutex::new(Vec::new()),
        }
    }

    fn with_toasts<R>(&self, f: impl FnOnce(&mut Vec<(Notification, Instant)>) -> R) -> R {
        let mut toasts = self.toasts.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut toasts)
    }

    /// Removes a toast by hand. Returns whether it was present.
    pub fn dismiss(&self, id: Uuid) -> bool {
        self.with_toasts(|toasts| {
            let before = toasts.len();
            toasts.retain(|(n, _)| n.id != id);
            toasts.len() != before
        })
    }

    /// Drops auto-dismissing toasts older than the lifetime. Returns how
    /// many were dropped.
    pub fn prune(&self, now: Instant) -> usize {
        let lifetime = self.lifetime;
        self.with_toasts(|toasts| {
            let before = toasts.len();
            toasts.retain(|(n, shown)| !n.auto_dismiss || now.duration_since(*shown) < lifetime);
            before - toasts.len()
        })
    }

    /// Toasts still on screen at `now`, oldest first.
    pub fn active(&self, now: Instant) -> Vec<Notification> {
        self.prune(now);
        self.all()
    }

    /// Every queued toast, expired or not.
    pub fn all(&self) -> Vec<Notification> {
        self.with_toasts(|toasts| toasts.iter().map(|(n, _)| n.clone()).collect())
    }

    pub fn clear(&self) {
        self.with_toasts(Vec::clear);
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, notification: Notification) {
        debug!(title = %notification.title, severity = ?notification.severity, "Toast");
        self.with_toasts(|toasts| toasts.push((notification, Instant::now())));
    }
}

//! # Session Context
//!
//! Holds the logged-in user's token and announces login/logout to every
//! component that cares (the cart engine refetches or clears itself).
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   login(session) ──► persist {userToken, userId, userData}             │
//! │        │             broadcast AuthEvent::LoggedIn                      │
//! │        ▼                                                                │
//! │   require() ──► JWT `exp` in the past? ──yes──► clear + LoggedOut       │
//! │        │                                        (Expired)  → AuthError  │
//! │        ▼ no                                                             │
//! │   Session handed to the request                                         │
//! │                                                                         │
//! │   backend 401/403 ──► reject() ──► clear + LoggedOut (Rejected)        │
//! │   logout()        ──► clear + LoggedOut (UserRequested)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The token signature is the backend's business; the client only reads the
//! `exp` claim to avoid sending a request it knows will be rejected.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

/// Capacity of the auth event channel.
const AUTH_EVENT_CAPACITY: usize = 16;

// =============================================================================
// Session
// =============================================================================

/// A logged-in user. Field names match the persisted storage keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "userToken")]
    pub token: String,

    #[serde(rename = "userId")]
    pub user_id: String,

    /// Profile blob returned at login (name, email, role...).
    #[serde(rename = "userData", default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

impl Session {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Session {
            token: token.into(),
            user_id: user_id.into(),
            user_data: None,
        }
    }

    /// Expiry from the token's `exp` claim. `None` for opaque tokens and
    /// tokens without `exp`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<ExpiryClaim>(&self.token, &DecodingKey::from_secret(&[]), &validation)
            .ok()?;
        Utc.timestamp_opt(data.claims.exp?, 0).single()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    /// Whether the profile marks this user as an administrator.
    pub fn is_admin(&self) -> bool {
        self.user_data
            .as_ref()
            .and_then(|d| d.get("role"))
            .and_then(|r| r.as_str())
            .is_some_and(|r| r.eq_ignore_ascii_case("admin"))
    }
}

// =============================================================================
// Auth Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    UserRequested,
    /// The token's `exp` passed.
    Expired,
    /// The backend answered 401/403.
    Rejected,
}

/// Broadcast whenever the session changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn { user_id: String },
    LoggedOut { reason: LogoutReason },
}

// =============================================================================
// Session Context
// =============================================================================

/// Shared, injectable session state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionContext {
    current: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
    path: Option<PathBuf>,
}

impl SessionContext {
    /// Context persisting to `path` (nothing is persisted when `None`).
    pub fn new(path: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        SessionContext {
            current: Arc::new(RwLock::new(None)),
            events,
            path,
        }
    }

    /// Context that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Loads a persisted session. Returns whether a usable one was found.
    ///
    /// An expired session is discarded from disk.
    pub fn restore(&self) -> ClientResult<bool> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        if !path.exists() {
            debug!(?path, "No persisted session");
            return Ok(false);
        }

        let contents = std::fs::read_to_string(path)?;
        let session: Session = serde_json::from_str(&contents)?;
        if session.is_expired(Utc::now()) {
            info!(user_id = %session.user_id, "Persisted session has expired");
            std::fs::remove_file(path)?;
            return Ok(false);
        }

        info!(user_id = %session.user_id, "Session restored");
        self.set(Some(session));
        Ok(true)
    }

    /// Stores the session and announces the login.
    pub fn login(&self, session: Session) -> ClientResult<()> {
        if session.token.trim().is_empty() || session.user_id.trim().is_empty() {
            return Err(ClientError::Auth("login returned an empty token".into()));
        }

        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&session)?)?;
        }

        let user_id = session.user_id.clone();
        self.set(Some(session));
        info!(user_id = %user_id, "Logged in");
        self.emit(AuthEvent::LoggedIn { user_id });
        Ok(())
    }

    /// Clears the session and announces the logout.
    pub fn logout(&self, reason: LogoutReason) {
        let previous = self.take();
        if let Some(path) = &self.path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(?path, error = %e, "Failed to remove session file");
                }
            }
        }

        if previous.is_some() {
            info!(?reason, "Logged out");
            self.emit(AuthEvent::LoggedOut { reason });
        }
    }

    /// Called when the backend rejects the token.
    pub fn reject(&self) {
        self.logout(LogoutReason::Rejected);
    }

    /// Snapshot of the current session, if any.
    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current().is_some()
    }

    /// The session a request must carry, or `AuthError`.
    pub fn require(&self) -> ClientResult<Session> {
        self.require_at(Utc::now())
    }

    /// As [`SessionContext::require`], judging expiry at `now`.
    pub fn require_at(&self, now: DateTime<Utc>) -> ClientResult<Session> {
        let session = self
            .current()
            .ok_or_else(|| ClientError::Auth("not logged in".into()))?;

        if session.is_expired(now) {
            warn!(user_id = %session.user_id, "Session token expired");
            self.logout(LogoutReason::Expired);
            return Err(ClientError::Auth("session expired".into()));
        }

        Ok(session)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn set(&self, session: Option<Session>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn take(&self) -> Option<Session> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn emit(&self, event: AuthEvent) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(event);
    }
}

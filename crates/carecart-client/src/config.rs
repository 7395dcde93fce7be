//! # Client Configuration
//!
//! Configuration management for the CareCart client.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CARECART_API_URL=https://api.carecart.in                           │
//! │     CARECART_PAYMENT_KEY_ID=rzp_live_xxx                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/carecart/client.toml (Linux)                             │
//! │     ~/Library/Application Support/in.carecart.carecart/client.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     localhost backend, INR, 30 s OTP cooldown, 4 s toasts              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # client.toml
//! [api]
//! base_url = "https://api.carecart.in"
//! connect_timeout_secs = 10
//! fetch_retries = 2
//!
//! [payment]
//! key_id = "rzp_test_123"
//! currency = "INR"
//! merchant_name = "CareCart"
//! theme_color = "#0f766e"
//!
//! [booking]
//! otp_resend_secs = 30
//! slot_start = "10:00"
//! slot_end = "17:30"
//! slot_interval_mins = 30
//! close_delay_ms = 2000
//!
//! [notifications]
//! auto_dismiss_secs = 4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use carecart_core::validation::generate_time_slots;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};

const ENV_PREFIX: &str = "CARECART_";

// =============================================================================
// API Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Backend origin; endpoint paths (`/api/...`) are joined onto it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TCP connect timeout (seconds). No other request timeout applies.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Extra attempts for a failed `GET /api/cart`.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,

    /// First retry delay (milliseconds); doubles per attempt.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_fetch_retries() -> u32 {
    2
}

fn default_initial_backoff() -> u64 {
    300
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            fetch_retries: default_fetch_retries(),
            initial_backoff_ms: default_initial_backoff(),
        }
    }
}

// =============================================================================
// Payment Settings
// =============================================================================

/// Values passed to the payment widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Publishable key of the payment gateway account.
    #[serde(default)]
    pub key_id: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Shown as the merchant name in the widget.
    #[serde(default = "default_merchant_name")]
    pub merchant_name: String,

    #[serde(default = "default_theme_color")]
    pub theme_color: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_merchant_name() -> String {
    "CareCart".to_string()
}

fn default_theme_color() -> String {
    "#0f766e".to_string()
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            key_id: String::new(),
            currency: default_currency(),
            merchant_name: default_merchant_name(),
            theme_color: default_theme_color(),
        }
    }
}

// =============================================================================
// Booking Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSettings {
    /// Seconds before an OTP can be re-sent.
    #[serde(default = "default_otp_resend")]
    pub otp_resend_secs: u32,

    /// First bookable slot, `HH:MM`.
    #[serde(default = "default_slot_start")]
    pub slot_start: String,

    /// Last bookable slot, `HH:MM` (inclusive).
    #[serde(default = "default_slot_end")]
    pub slot_end: String,

    #[serde(default = "default_slot_interval")]
    pub slot_interval_mins: u32,

    /// How long the success state stays visible before the modal closes.
    #[serde(default = "default_close_delay")]
    pub close_delay_ms: u64,
}

fn default_otp_resend() -> u32 {
    carecart_core::DEFAULT_RESEND_COOLDOWN_SECS
}

fn default_slot_start() -> String {
    "10:00".to_string()
}

fn default_slot_end() -> String {
    "17:30".to_string()
}

fn default_slot_interval() -> u32 {
    30
}

fn default_close_delay() -> u64 {
    2000
}

impl Default for BookingSettings {
    fn default() -> Self {
        BookingSettings {
            otp_resend_secs: default_otp_resend(),
            slot_start: default_slot_start(),
            slot_end: default_slot_end(),
            slot_interval_mins: default_slot_interval(),
            close_delay_ms: default_close_delay(),
        }
    }
}

impl BookingSettings {
    fn parse_slot(field: &str, value: &str) -> ClientResult<NaiveTime> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .map_err(|_| ClientError::Config(format!("{field} must be HH:MM, got '{value}'")))
    }

    /// All bookable time slots.
    pub fn time_slots(&self) -> ClientResult<Vec<String>> {
        let start = Self::parse_slot("slot_start", &self.slot_start)?;
        let end = Self::parse_slot("slot_end", &self.slot_end)?;
        Ok(generate_time_slots(start, end, self.slot_interval_mins))
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }
}

// =============================================================================
// Notification & Session Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Toast lifetime, 3 to 5 seconds.
    #[serde(default = "default_auto_dismiss")]
    pub auto_dismiss_secs: u64,
}

fn default_auto_dismiss() -> u64 {
    4
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            auto_dismiss_secs: default_auto_dismiss(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Where the session file lives. Defaults to the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Main Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub payment: PaymentSettings,

    #[serde(default)]
    pub booking: BookingSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,

    #[serde(default)]
    pub session: SessionSettings,
}

impl ClientConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (client.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Client config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.api.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.payment.currency.trim().is_empty() {
            return Err(ClientError::Config("payment currency is empty".into()));
        }

        if !(3..=5).contains(&self.notifications.auto_dismiss_secs) {
            return Err(ClientError::Config(format!(
                "auto_dismiss_secs must be between 3 and 5, got {}",
                self.notifications.auto_dismiss_secs
            )));
        }

        if self.booking.time_slots()?.is_empty() {
            return Err(ClientError::Config(
                "booking slot range produces no time slots".into(),
            ));
        }

        Ok(())
    }

    /// Applies `CARECART_*` overrides. `lookup` is `std::env::var` outside
    /// of tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(url) = var("API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(retries) = var("FETCH_RETRIES") {
            match retries.parse::<u32>() {
                Ok(n) => self.api.fetch_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring non-numeric CARECART_FETCH_RETRIES"),
            }
        }

        if let Some(key) = var("PAYMENT_KEY_ID") {
            debug!("Overriding payment key from environment");
            self.payment.key_id = key;
        }

        if let Some(currency) = var("CURRENCY") {
            self.payment.currency = currency;
        }

        if let Some(secs) = var("OTP_RESEND_SECS") {
            match secs.parse::<u32>() {
                Ok(n) => self.booking.otp_resend_secs = n,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric CARECART_OTP_RESEND_SECS"),
            }
        }

        if let Some(secs) = var("TOAST_SECS") {
            if let Ok(n) = secs.parse::<u64>() {
                self.notifications.auto_dismiss_secs = n;
            }
        }

        if let Some(path) = var("SESSION_PATH") {
            self.session.path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("in", "carecart", "carecart")
            .map(|dirs| dirs.config_dir().join("client.toml"))
    }

    /// Session file location: configured, else the platform data directory.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session.path.clone().or_else(|| {
            directories::ProjectDirs::from("in", "carecart", "carecart")
                .map(|dirs| dirs.data_dir().join("session.json"))
        })
    }

    /// Parsed backend origin.
    pub fn base_url(&self) -> ClientResult<Url> {
        Ok(Url::parse(&self.api.base_url)?)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.api.connect_timeout_secs)
    }

    pub fn toast_lifetime(&self) -> Duration {
        Duration::from_secs(self.notifications.auto_dismiss_secs)
    }

    /// Loads a config from an explicit file only (no env), for tooling.
    pub fn from_file(path: &Path) -> ClientResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

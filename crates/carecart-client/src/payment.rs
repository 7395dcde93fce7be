//! # Payment Widget
//!
//! The hosted payment widget is an external capability: the front end opens
//! it with [`PaymentOptions`] and reports back a [`WidgetOutcome`]. Flows
//! only ever talk to the [`PaymentWidget`] trait.
//!
//! ```text
//! backend order ──► PaymentOptions ──► widget.open() ──┬─► Success(confirmation)
//!                                                     ├─► Dismissed
//!                                                     └─► Failed(reason)
//! ```

use std::future::Future;

use carecart_core::types::PaymentConfirmation;
use carecart_core::Money;
use serde::Serialize;

use crate::config::PaymentSettings;
use crate::session::Session;

/// Contact details prefilled in the widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

impl Prefill {
    /// Whatever the login profile knows about the user.
    pub fn from_session(session: &Session) -> Self {
        let field = |key: &str| {
            session
                .user_data
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Prefill {
            name: field("name"),
            email: field("email"),
            contact: field("phone"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub color: String,
}

/// Everything the widget needs to take one payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOptions {
    pub key: String,
    /// Minor units (paise), exactly as the backend returned them.
    pub amount: i64,
    pub currency: String,
    pub order_id: String,
    pub name: String,
    pub description: String,
    pub prefill: Prefill,
    pub theme: Theme,
}

impl PaymentOptions {
    pub fn new(
        settings: &PaymentSettings,
        order_id: impl Into<String>,
        amount: Money,
        currency: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        PaymentOptions {
            key: settings.key_id.clone(),
            amount: amount.paise(),
            currency: currency.into(),
            order_id: order_id.into(),
            name: settings.merchant_name.clone(),
            description: description.into(),
            prefill: Prefill::default(),
            theme: Theme {
                color: settings.theme_color.clone(),
            },
        }
    }

    pub fn with_prefill(mut self, prefill: Prefill) -> Self {
        self.prefill = prefill;
        self
    }
}

/// How the widget was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetOutcome {
    Success(PaymentConfirmation),
    /// Closed by the user before paying.
    Dismissed,
    /// The widget could not take the payment.
    Failed(String),
}

/// Opens the payment widget and waits for it to close.
pub trait PaymentWidget: Send + Sync + 'static {
    fn open(&self, options: PaymentOptions) -> impl Future<Output = WidgetOutcome> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_carry_minor_units_and_merchant() {
        let settings = PaymentSettings {
            key_id: "rzp_test_abc".into(),
            ..Default::default()
        };
        let options = PaymentOptions::new(
            &settings,
            "order_9",
            Money::from_paise(49_950),
            "INR",
            "Lab tests",
        )
        .with_prefill(Prefill {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            contact: "9876543210".into(),
        });

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["amount"], 49_950);
        assert_eq!(json["key"], "rzp_test_abc");
        assert_eq!(json["order_id"], "order_9");
        assert_eq!(json["name"], "CareCart");
        assert_eq!(json["theme"]["color"], "#0f766e");
        assert_eq!(json["prefill"]["contact"], "9876543210");
    }
}

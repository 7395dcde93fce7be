//! # Terminal I/O
//!
//! Stdin prompts, toasts printed as lines, and a payment widget that asks
//! for the gateway's confirmation by hand.

use std::io::{self, BufRead, Write};

use carecart_client::{Notification, Notifier, PaymentOptions, PaymentWidget, Severity, WidgetOutcome};
use carecart_core::types::PaymentConfirmation;
use carecart_core::Money;
use tracing::debug;

/// Reads one trimmed line after printing `label`.
pub async fn prompt(label: &str) -> anyhow::Result<String> {
    let label = label.to_string();
    let line = tokio::task::spawn_blocking(move || -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{label}: ")?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    })
    .await??;
    Ok(line)
}

/// Prompts until the answer is non-empty.
pub async fn prompt_required(label: &str) -> anyhow::Result<String> {
    loop {
        let answer = prompt(label).await?;
        if !answer.is_empty() {
            return Ok(answer);
        }
    }
}

/// Toasts as plain lines on stdout.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let tag = match notification.severity {
            Severity::Success => "ok",
            Severity::Info => "info",
            Severity::Warning => "warn",
            Severity::Error => "error",
        };
        println!("[{tag}] {}: {}", notification.title, notification.message);
    }
}

// =============================================================================
// Payment Widget
// =============================================================================

/// Shows the order and reads back the gateway's payment id and signature.
/// A blank payment id counts as closing the widget.
pub struct TerminalPaymentWidget;

impl TerminalPaymentWidget {
    async fn collect(options: &PaymentOptions) -> anyhow::Result<WidgetOutcome> {
        println!();
        println!("{} | {}", options.name, options.description);
        println!(
            "Order {}: {} {}",
            options.order_id,
            Money::from_paise(options.amount),
            options.currency
        );
        if !options.prefill.name.is_empty() {
            println!("Paying as {} <{}>", options.prefill.name, options.prefill.email);
        }

        let payment_id = prompt("Payment id (blank to cancel)").await?;
        if payment_id.is_empty() {
            return Ok(WidgetOutcome::Dismissed);
        }
        let signature = prompt_required("Signature").await?;

        Ok(WidgetOutcome::Success(PaymentConfirmation {
            razorpay_payment_id: payment_id,
            razorpay_order_id: options.order_id.clone(),
            razorpay_signature: signature,
        }))
    }
}

impl PaymentWidget for TerminalPaymentWidget {
    async fn open(&self, options: PaymentOptions) -> WidgetOutcome {
        debug!(order_id = %options.order_id, "Opening terminal payment prompt");
        Self::collect(&options)
            .await
            .unwrap_or_else(|e| WidgetOutcome::Failed(e.to_string()))
    }
}

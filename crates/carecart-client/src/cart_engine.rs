//! # Cart Engine
//!
//! Drives the [`CartLedger`] against the backend: every change is shown
//! immediately on the working copy and reconciled when the backend answers.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  update_quantity / remove_item                                          │
//! │     │                                                                   │
//! │     ├── session.require() ──── none / expired ──► ClientError::Auth     │
//! │     ├── ledger.begin_*() ───── item busy ───────► ClientError::Busy     │
//! │     │        (working copy updated, watchers notified)                  │
//! │     ▼                                                                   │
//! │  backend call (no lock held)                                            │
//! │     ├── Ok  ──► ledger.commit()    authoritative catches up             │
//! │     └── Err ──► ledger.rollback()  working = authoritative + toast      │
//! │                                                                         │
//! │  add_item ........ backend add, then full refetch (not optimistic)      │
//! │  apply_coupon .... serialized, totals taken from the backend            │
//! │  fetch_cart ...... retried with backoff; older responses dropped        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use carecart_core::validation::{validate_cart_size, validate_coupon_code, validate_quantity};
use carecart_core::{Cart, CartLedger, Resource, Settled};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::CommerceBackend;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::notify::{NoOpNotifier, Notification, Notifier};
use crate::session::{AuthEvent, SessionContext};

/// What a cart screen renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartView {
    /// The optimistic working copy.
    pub cart: Cart,
    /// Product ids with a change in flight (spinners, disabled buttons).
    pub busy_items: Vec<String>,
    pub coupon_busy: bool,
}

impl CartView {
    fn of(ledger: &CartLedger) -> Self {
        CartView {
            cart: ledger.working().clone(),
            busy_items: ledger.busy_items(),
            coupon_busy: ledger.is_busy(&Resource::Coupon),
        }
    }
}

// =============================================================================
// Cart Engine
// =============================================================================

pub struct CartEngine<B> {
    backend: Arc<B>,
    session: SessionContext,
    notifier: Arc<dyn Notifier>,
    ledger: Mutex<CartLedger>,
    view: watch::Sender<CartView>,
    fetch_retries: u32,
    initial_backoff: Duration,
}

impl<B: CommerceBackend> CartEngine<B> {
    pub fn new(backend: Arc<B>, session: SessionContext, config: &ClientConfig) -> Self {
        let (view, _) = watch::channel(CartView::default());
        CartEngine {
            backend,
            session,
            notifier: Arc::new(NoOpNotifier),
            ledger: Mutex::new(CartLedger::default()),
            view,
            fetch_retries: config.api.fetch_retries,
            initial_backoff: Duration::from_millis(config.api.initial_backoff_ms),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Runs `f` on the ledger, checks the working copy and publishes it.
    fn update<R>(&self, f: impl FnOnce(&mut CartLedger) -> R) -> R {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut ledger);
        if let Err(e) = ledger.working().check_invariants() {
            error!(error = %e, "Cart invariant violated");
        }
        self.view.send_replace(CartView::of(&ledger));
        out
    }

    /// Toasts a failure. Auth failures are left to the caller's redirect.
    fn report(&self, err: &ClientError) {
        if !err.is_auth() {
            self.notifier.notify(Notification::from_error(err));
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current working copy plus busy flags.
    pub fn snapshot(&self) -> CartView {
        self.view.borrow().clone()
    }

    /// Receives every change to the working copy.
    pub fn subscribe(&self) -> watch::Receiver<CartView> {
        self.view.subscribe()
    }

    /// Loads the cart from the backend and replaces local state.
    ///
    /// Changes still in flight are replayed on top of the fetched cart. A
    /// response overtaken by a newer fetch is dropped.
    pub async fn fetch_cart(&self) -> ClientResult<Cart> {
        let session = self.session.require()?;
        let ticket = self.update(|l| l.begin_fetch());
        debug!(seq = ticket.seq(), "Fetching cart");

        match self.fetch_with_retry(&session.token).await {
            Ok(cart) => {
                let items = cart.line_count();
                match self.update(|l| l.commit_fetch(&ticket, cart)) {
                    Settled::Stale => warn!(seq = ticket.seq(), "Dropped stale cart response"),
                    _ => info!(items, "Cart loaded"),
                }
                Ok(self.snapshot().cart)
            }
            Err(e) => {
                warn!(error = %e, "Cart fetch failed");
                self.report(&e);
                Err(e)
            }
        }
    }

    async fn fetch_with_retry(&self, token: &str) -> ClientResult<Cart> {
        let mut backoff = ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };
        let mut attempt = 0;

        loop {
            match self.backend.fetch_cart(token).await {
                Ok(cart) => return Ok(cart),
                Err(e) if e.is_retryable() && attempt < self.fetch_retries => {
                    attempt += 1;
                    let delay = backoff.next_backoff().unwrap_or(self.initial_backoff);
                    warn!(attempt, ?delay, error = %e, "Cart fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // =========================================================================
    // Item Mutations
    // =========================================================================

    /// Adds a product, then refetches the cart.
    ///
    /// On failure the local cart is left as it was.
    pub async fn add_item(&self, product_id: &str, quantity: i64) -> ClientResult<Cart> {
        debug!(product_id, quantity, "Adding item");
        let session = self.session.require()?;

        let cart = self.snapshot().cart;
        match cart.item(product_id) {
            Some(existing) => validate_quantity(existing.quantity + quantity)?,
            None => {
                validate_quantity(quantity)?;
                validate_cart_size(cart.line_count())?;
            }
        }

        if let Err(e) = self
            .backend
            .add_to_cart(&session.token, product_id, quantity)
            .await
        {
            warn!(product_id, error = %e, "Add to cart failed");
            self.report(&e);
            return Err(e);
        }

        info!(product_id, quantity, "Item added");
        self.notifier
            .notify(Notification::success("Added to cart", "Item added to your cart"));
        self.fetch_cart().await
    }

    /// Sets a line's quantity. Below 1 clamps to 1; an unchanged quantity
    /// sends nothing.
    pub async fn update_quantity(&self, product_id: &str, quantity: i64) -> ClientResult<()> {
        debug!(product_id, quantity, "Updating quantity");
        let session = self.session.require()?;

        let Some(ticket) = self.update(|l| l.begin_update_quantity(product_id, quantity))? else {
            debug!(product_id, "Quantity unchanged");
            return Ok(());
        };
        let quantity = quantity.max(1);

        match self
            .backend
            .update_cart_item(&session.token, product_id, quantity)
            .await
        {
            Ok(()) => {
                if self.update(|l| l.commit(&ticket)) == Settled::Stale {
                    warn!(product_id, seq = ticket.seq(), "Dropped stale update response");
                }
                Ok(())
            }
            Err(e) => {
                self.update(|l| l.rollback(&ticket));
                warn!(product_id, error = %e, "Quantity update failed, cart rolled back");
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Removes a line. Emptying the cart drops the coupon.
    pub async fn remove_item(&self, product_id: &str) -> ClientResult<()> {
        debug!(product_id, "Removing item");
        let session = self.session.require()?;
        let ticket = self.update(|l| l.begin_remove(product_id))?;

        match self
            .backend
            .remove_cart_item(&session.token, product_id)
            .await
        {
            Ok(()) => {
                if self.update(|l| l.commit(&ticket)) == Settled::Stale {
                    warn!(product_id, seq = ticket.seq(), "Dropped stale removal response");
                }
                info!(product_id, "Item removed");
                Ok(())
            }
            Err(e) => {
                self.update(|l| l.rollback(&ticket));
                warn!(product_id, error = %e, "Removal failed, cart rolled back");
                self.report(&e);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Coupon
    // =========================================================================

    /// Applies a coupon code. A rejection carries the backend's message and
    /// leaves the cart alone.
    pub async fn apply_coupon(&self, code: &str) -> ClientResult<Cart> {
        let session = self.session.require()?;
        let code = validate_coupon_code(code)?;
        debug!(code = %code, "Applying coupon");
        let ticket = self.update(|l| l.begin_coupon())?;

        match self.backend.apply_coupon(&session.token, &code).await {
            Ok(applied) => {
                let (settled, exact) =
                    self.update(|l| l.commit_coupon(&ticket, applied.coupon, applied.pricing));
                if settled == Settled::Stale {
                    warn!(code = %code, "Dropped stale coupon response");
                    return Ok(self.snapshot().cart);
                }
                if !exact {
                    warn!(code = %code, "Coupon totals disagree with the cart, recomputed locally");
                }
                info!(code = %code, "Coupon applied");
                self.notifier.notify(Notification::success(
                    "Coupon applied",
                    format!("{code} applied to your cart"),
                ));
                Ok(self.snapshot().cart)
            }
            Err(e) => {
                self.update(|l| l.release(&ticket));
                warn!(code = %code, error = %e, "Coupon rejected");
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Removes the applied coupon. Nothing is sent when none is applied.
    pub async fn remove_coupon(&self) -> ClientResult<Cart> {
        let session = self.session.require()?;
        if self.snapshot().cart.applied_coupon.is_none() {
            return Ok(self.snapshot().cart);
        }
        debug!("Removing coupon");
        let ticket = self.update(|l| l.begin_coupon())?;

        match self.backend.remove_coupon(&session.token).await {
            Ok(()) => {
                if self.update(|l| l.commit_coupon_removal(&ticket)) == Settled::Stale {
                    warn!("Dropped stale coupon removal response");
                }
                info!("Coupon removed");
                Ok(self.snapshot().cart)
            }
            Err(e) => {
                self.update(|l| l.release(&ticket));
                warn!(error = %e, "Coupon removal failed");
                self.report(&e);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Session Changes
    // =========================================================================

    /// Forgets the cart (logout).
    pub fn clear_local(&self) {
        self.update(|l| l.reset());
        info!("Local cart cleared");
    }

    /// Login refetches, logout clears.
    pub async fn handle_auth_event(&self, event: &AuthEvent) -> ClientResult<()> {
        match event {
            AuthEvent::LoggedIn { user_id } => {
                debug!(user_id = %user_id, "Login seen, refetching cart");
                self.fetch_cart().await.map(|_| ())
            }
            AuthEvent::LoggedOut { reason } => {
                debug!(?reason, "Logout seen");
                self.clear_local();
                Ok(())
            }
        }
    }

    /// Follows the session's auth events until the session context is
    /// dropped.
    pub fn spawn_auth_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut events = self.session.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Err(e) = engine.handle_auth_event(&event).await {
                            warn!(error = %e, "Auth event handling failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Missed auth events, resyncing");
                        if engine.session.is_logged_in() {
                            let _ = engine.fetch_cart().await;
                        } else {
                            engine.clear_local();
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

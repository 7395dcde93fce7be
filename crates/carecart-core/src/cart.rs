//! # Cart & Cart Ledger
//!
//! The cart value type and the two-tier ledger that lets the client edit a
//! cart optimistically while the backend stays authoritative.
//!
//! ## Two-Tier State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CartLedger                                     │
//! │                                                                         │
//! │   authoritative ◄──── commit(ticket) ──── backend said OK               │
//! │        │                                                                │
//! │        │ clone on rollback (whole cart, never a partial undo)           │
//! │        ▼                                                                │
//! │   working ◄──── begin_*() ──── user tapped +/−/remove                   │
//! │                                                                         │
//! │   pending:  Item("p1") → seq 7, SetQuantity(3)      (busy flag)         │
//! │             Coupon     → seq 9                                          │
//! │   latest:   Cart → 8  (newest fetch; older fetch responses dropped)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Derived fields are never patched incrementally: every change ends in
//! [`Cart::recompute`], which rebuilds totals from the full item list.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{self, PriceBreakdown};
use crate::types::{CartItem, Coupon};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Cart
// =============================================================================

/// A user's cart with derived pricing.
///
/// ## Invariants
/// - every `quantity` ≥ 1
/// - `total_items == Σ quantity`
/// - `pricing.original_total == Σ unit_price × quantity`
/// - `pricing.discounted_total == max(0, original_total − discount_amount)`
/// - an empty cart carries no coupon and no discount
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub items: Vec<CartItem>,
    pub applied_coupon: Option<Coupon>,
    pub pricing: PriceBreakdown,
    pub total_items: i64,
}

impl Cart {
    /// Builds a cart and derives its pricing locally.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        items: Vec<CartItem>,
        applied_coupon: Option<Coupon>,
    ) -> Self {
        let mut cart = Cart {
            id: id.into(),
            user_id: user_id.into(),
            items,
            applied_coupon,
            ..Default::default()
        };
        cart.recompute();
        cart
    }

    /// Rebuilds every derived field from the item list.
    pub fn recompute(&mut self) {
        if self.items.is_empty() {
            self.applied_coupon = None;
        }
        self.total_items = self.items.iter().map(|i| i.quantity).sum();
        self.pricing = pricing::calculate(&self.items, self.applied_coupon.as_ref());
    }

    pub fn item(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Sets a line's quantity, clamping anything below 1 up to 1.
    ///
    /// An update never removes a line; only [`Cart::remove_item`] does.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        let quantity = quantity.max(1);
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::ItemNotInCart(product_id.to_string()))?;
        item.quantity = quantity;
        self.recompute();
        Ok(())
    }

    /// Removes a line. Emptying the cart drops the coupon.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(CoreError::ItemNotInCart(product_id.to_string()));
        }
        self.recompute();
        Ok(())
    }

    /// Attaches a coupon the backend accepted, taking its totals.
    ///
    /// Returns `false` when the backend's original total disagrees with
    /// the local subtotal; the pricing is then recomputed locally instead.
    pub fn apply_server_coupon(&mut self, coupon: Coupon, server: PriceBreakdown) -> bool {
        self.applied_coupon = Some(coupon);
        self.recompute();
        if server.original_total == self.pricing.original_total && server.is_consistent() {
            self.pricing = server;
            true
        } else {
            false
        }
    }

    /// Drops the coupon: `discounted_total` goes back to `original_total`.
    pub fn clear_coupon(&mut self) {
        self.applied_coupon = None;
        self.recompute();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Verifies the invariants by recomputing from scratch.
    pub fn check_invariants(&self) -> CoreResult<()> {
        if let Some(item) = self.items.iter().find(|i| i.quantity < 1) {
            return Err(CoreError::InvariantViolation(format!(
                "{} has quantity {}",
                item.product_id, item.quantity
            )));
        }

        let quantity: i64 = self.items.iter().map(|i| i.quantity).sum();
        if quantity != self.total_items {
            return Err(CoreError::InvariantViolation(format!(
                "total_items {} != Σ quantity {}",
                self.total_items, quantity
            )));
        }

        let subtotal = pricing::subtotal(&self.items);
        if subtotal != self.pricing.original_total {
            return Err(CoreError::InvariantViolation(format!(
                "original_total {} != Σ price×qty {}",
                self.pricing.original_total, subtotal
            )));
        }

        if !self.pricing.is_consistent() {
            return Err(CoreError::InvariantViolation(format!(
                "discounted_total {} != max(0, {} - {})",
                self.pricing.discounted_total,
                self.pricing.original_total,
                self.pricing.discount_amount
            )));
        }

        if self.items.is_empty()
            && (self.applied_coupon.is_some() || !self.pricing.discount_amount.is_zero())
        {
            return Err(CoreError::InvariantViolation(
                "empty cart still carries a discount".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Ledger Bookkeeping Types
// =============================================================================

/// Something a mutation is serialized on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    /// One cart line, keyed by product id.
    Item(String),
    /// The applied coupon.
    Coupon,
    /// The whole cart (fetches).
    Cart,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Item(product_id) => write!(f, "cart item {product_id}"),
            Resource::Coupon => write!(f, "coupon"),
            Resource::Cart => write!(f, "cart"),
        }
    }
}

/// An optimistic change waiting on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange {
    SetQuantity { product_id: String, quantity: i64 },
    Remove { product_id: String },
}

impl PendingChange {
    /// Applies the change; a line that has already gone is not an error.
    fn apply_to(&self, cart: &mut Cart) {
        let result = match self {
            PendingChange::SetQuantity {
                product_id,
                quantity,
            } => cart.set_quantity(product_id, *quantity),
            PendingChange::Remove { product_id } => cart.remove_item(product_id),
        };
        if result.is_err() {
            cart.recompute();
        }
    }
}

/// Proof that a mutation was started; hand it back to settle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationTicket {
    seq: u64,
    resource: Resource,
    change: Option<PendingChange>,
}

impl MutationTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }
}

/// How a settled mutation affected the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// The response was applied.
    Applied,
    /// The working copy was reset to the authoritative snapshot.
    RolledBack,
    /// A newer mutation on the same resource was dispatched; ignored.
    Stale,
}

// =============================================================================
// Cart Ledger
// =============================================================================

/// Authoritative snapshot + optimistic working copy.
#[derive(Debug, Clone, Default)]
pub struct CartLedger {
    authoritative: Cart,
    working: Cart,
    pending: HashMap<Resource, (u64, Option<PendingChange>)>,
    latest: HashMap<Resource, u64>,
    next_seq: u64,
}

impl CartLedger {
    pub fn new(cart: Cart) -> Self {
        CartLedger {
            working: cart.clone(),
            authoritative: cart,
            ..Default::default()
        }
    }

    /// What the UI shows.
    pub fn working(&self) -> &Cart {
        &self.working
    }

    /// Last state the backend confirmed.
    pub fn authoritative(&self) -> &Cart {
        &self.authoritative
    }

    /// Whether a mutation on `resource` is in flight.
    pub fn is_busy(&self, resource: &Resource) -> bool {
        self.pending.contains_key(resource)
    }

    /// Product ids with an update or removal in flight.
    pub fn busy_items(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .pending
            .keys()
            .filter_map(|r| match r {
                Resource::Item(id) => Some(id.clone()),
                _ => None,
            })
            .collect();
        ids.sort();
        ids
    }

    fn dispatch(&mut self, resource: Resource, change: Option<PendingChange>) -> MutationTicket {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.latest.insert(resource.clone(), seq);
        if resource != Resource::Cart {
            self.pending.insert(resource.clone(), (seq, change.clone()));
        }
        MutationTicket {
            seq,
            resource,
            change,
        }
    }

    fn ensure_idle(&self, resource: &Resource) -> CoreResult<()> {
        if self.is_busy(resource) {
            return Err(CoreError::ResourceBusy {
                resource: resource.to_string(),
            });
        }
        Ok(())
    }

    /// Settles bookkeeping; returns `false` if the ticket is stale.
    fn settle(&mut self, ticket: &MutationTicket) -> bool {
        if let Some((seq, _)) = self.pending.get(&ticket.resource) {
            if *seq == ticket.seq {
                self.pending.remove(&ticket.resource);
            }
        }
        self.latest.get(&ticket.resource) == Some(&ticket.seq)
    }

    /// Starts an optimistic quantity change.
    ///
    /// - `requested < 1` is clamped to 1
    /// - `requested > MAX_ITEM_QUANTITY` is a validation error
    /// - returns `Ok(None)` (nothing to send) if the quantity is unchanged
    /// - the working copy is updated before this returns
    pub fn begin_update_quantity(
        &mut self,
        product_id: &str,
        requested: i64,
    ) -> CoreResult<Option<MutationTicket>> {
        let quantity = requested.max(1);
        if quantity > MAX_ITEM_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_ITEM_QUANTITY,
            }
            .into());
        }

        let resource = Resource::Item(product_id.to_string());
        self.ensure_idle(&resource)?;

        let current = self
            .working
            .item(product_id)
            .ok_or_else(|| CoreError::ItemNotInCart(product_id.to_string()))?
            .quantity;
        if current == quantity {
            return Ok(None);
        }

        self.working.set_quantity(product_id, quantity)?;
        let change = PendingChange::SetQuantity {
            product_id: product_id.to_string(),
            quantity,
        };
        Ok(Some(self.dispatch(resource, Some(change))))
    }

    /// Starts an optimistic removal.
    pub fn begin_remove(&mut self, product_id: &str) -> CoreResult<MutationTicket> {
        let resource = Resource::Item(product_id.to_string());
        self.ensure_idle(&resource)?;
        self.working.remove_item(product_id)?;
        let change = PendingChange::Remove {
            product_id: product_id.to_string(),
        };
        Ok(self.dispatch(resource, Some(change)))
    }

    /// Reserves the coupon slot. Coupon changes are not optimistic.
    pub fn begin_coupon(&mut self) -> CoreResult<MutationTicket> {
        self.ensure_idle(&Resource::Coupon)?;
        Ok(self.dispatch(Resource::Coupon, None))
    }

    /// Registers a fetch. Fetches may overlap; only the newest one lands.
    pub fn begin_fetch(&mut self) -> MutationTicket {
        self.dispatch(Resource::Cart, None)
    }

    /// Backend confirmed an optimistic change.
    pub fn commit(&mut self, ticket: &MutationTicket) -> Settled {
        if !self.settle(ticket) {
            return Settled::Stale;
        }
        if let Some(change) = &ticket.change {
            change.apply_to(&mut self.authoritative);
            change.apply_to(&mut self.working);
        }
        Settled::Applied
    }

    /// Backend rejected an optimistic change: the whole working copy goes
    /// back to the authoritative snapshot, coupon included.
    pub fn rollback(&mut self, ticket: &MutationTicket) -> Settled {
        if !self.settle(ticket) {
            return Settled::Stale;
        }
        self.working = self.authoritative.clone();
        Settled::RolledBack
    }

    /// Releases a ticket that changed nothing (e.g. a rejected coupon).
    pub fn release(&mut self, ticket: &MutationTicket) -> Settled {
        if self.settle(ticket) {
            Settled::Applied
        } else {
            Settled::Stale
        }
    }

    /// A fetched cart replaces the authoritative snapshot. Changes still in
    /// flight are replayed on top so the UI doesn't flicker back.
    pub fn commit_fetch(&mut self, ticket: &MutationTicket, cart: Cart) -> Settled {
        if !self.settle(ticket) {
            return Settled::Stale;
        }
        self.authoritative = cart;
        self.working = self.authoritative.clone();

        let mut replay: Vec<&(u64, Option<PendingChange>)> = self.pending.values().collect();
        replay.sort_by_key(|(seq, _)| *seq);
        for (_, change) in replay {
            if let Some(change) = change {
                change.apply_to(&mut self.working);
            }
        }
        Settled::Applied
    }

    /// Backend accepted a coupon. Returns the settle outcome and whether
    /// the server totals were taken as-is (`false` = local recompute).
    pub fn commit_coupon(
        &mut self,
        ticket: &MutationTicket,
        coupon: Coupon,
        server: PriceBreakdown,
    ) -> (Settled, bool) {
        if !self.settle(ticket) {
            return (Settled::Stale, false);
        }
        let exact = self.authoritative.apply_server_coupon(coupon.clone(), server);
        self.working.apply_server_coupon(coupon, server);
        (Settled::Applied, exact)
    }

    /// Backend removed the coupon.
    pub fn commit_coupon_removal(&mut self, ticket: &MutationTicket) -> Settled {
        if !self.settle(ticket) {
            return Settled::Stale;
        }
        self.authoritative.clear_coupon();
        self.working.clear_coupon();
        Settled::Applied
    }

    /// Forgets everything (logout). The sequence counter survives so a
    /// ticket issued before the reset can never match a newer one.
    pub fn reset(&mut self) {
        let next_seq = self.next_seq;
        *self = CartLedger::default();
        self.next_seq = next_seq;
    }

    /// Payable amount of the working copy.
    pub fn payable(&self) -> Money {
        self.working.pricing.discounted_total
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Checkout Stepper
//!
//! Three-step checkout for lab tests, plus the member/address forms the
//! second step edits.
//!
//! ## Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌─────────┐  next()   ┌──────────────────┐  next()   ┌─────────┐      │
//! │   │  Items  │ ────────► │ MemberAndAddress │ ────────► │ Payment │      │
//! │   └─────────┘           └──────────────────┘           └─────────┘      │
//! │     ▲   guard: cart        guard: ≥1 member              terminal       │
//! │     │   not empty          AND an address                               │
//! │     │                                                                   │
//! │     └──── go_back(step) to any earlier step; never skip forward        │
//! │                                                                         │
//! │   Leaving Items creates the BookingDraft; returning to Items drops it.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::StepGuardError;
use crate::types::{Address, CartItem, FamilyMember, Gender};
use crate::validation::{
    validate_email, validate_name, validate_phone, validate_pincode, validate_text,
    ValidationResult,
};

// =============================================================================
// Steps & Selections
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum CheckoutStep {
    Items,
    MemberAndAddress,
    Payment,
}

impl CheckoutStep {
    pub fn index(&self) -> usize {
        match self {
            CheckoutStep::Items => 0,
            CheckoutStep::MemberAndAddress => 1,
            CheckoutStep::Payment => 2,
        }
    }
}

/// Who the tests are for and where samples are collected.
///
/// Members keep the order they were picked in; the first one is the
/// booking's primary member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSelections {
    pub member_ids: Vec<String>,
    pub address_id: Option<String>,
}

impl CheckoutSelections {
    /// Selects or deselects a member. Returns whether it is now selected.
    pub fn toggle_member(&mut self, member_id: &str) -> bool {
        if let Some(pos) = self.member_ids.iter().position(|id| id == member_id) {
            self.member_ids.remove(pos);
            false
        } else {
            self.member_ids.push(member_id.to_string());
            true
        }
    }

    pub fn is_member_selected(&self, member_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == member_id)
    }

    /// Exactly one address: selecting replaces the previous one.
    pub fn select_address(&mut self, address_id: &str) {
        self.address_id = Some(address_id.to_string());
    }

    /// Drops a member that was deleted.
    pub fn forget_member(&mut self, member_id: &str) {
        self.member_ids.retain(|id| id != member_id);
    }

    /// Drops an address that was deleted.
    pub fn forget_address(&mut self, address_id: &str) {
        if self.address_id.as_deref() == Some(address_id) {
            self.address_id = None;
        }
    }

    /// Guard for MemberAndAddress → Payment.
    pub fn check_complete(&self) -> Result<(), StepGuardError> {
        match (self.member_ids.is_empty(), self.address_id.is_none()) {
            (false, false) => Ok(()),
            (true, true) => Err(StepGuardError::MissingMemberAndAddress),
            (true, false) => Err(StepGuardError::MissingMember),
            (false, true) => Err(StepGuardError::MissingAddress),
        }
    }
}

/// Snapshot taken when the user leaves the Items step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub items: Vec<CartItem>,
    pub member_ids: Vec<String>,
    pub address_id: Option<String>,
    pub coupon_code: Option<String>,
}

impl BookingDraft {
    fn from_cart(cart: &Cart) -> Self {
        BookingDraft {
            items: cart.items.clone(),
            member_ids: Vec::new(),
            address_id: None,
            coupon_code: cart.applied_coupon.as_ref().map(|c| c.code.clone()),
        }
    }

    /// First selected member.
    pub fn primary_member(&self) -> Option<&str> {
        self.member_ids.first().map(String::as_str)
    }
}

// =============================================================================
// Stepper
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutStepper {
    step: CheckoutStep,
    selections: CheckoutSelections,
    draft: Option<BookingDraft>,
}

impl Default for CheckoutStepper {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutStepper {
    pub fn new() -> Self {
        CheckoutStepper {
            step: CheckoutStep::Items,
            selections: CheckoutSelections::default(),
            draft: None,
        }
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn selections(&self) -> &CheckoutSelections {
        &self.selections
    }

    pub fn selections_mut(&mut self) -> &mut CheckoutSelections {
        &mut self.selections
    }

    pub fn draft(&self) -> Option<&BookingDraft> {
        self.draft.as_ref()
    }

    /// Advances one step if the guard for the current step passes.
    pub fn next(&mut self, cart: &Cart) -> Result<CheckoutStep, StepGuardError> {
        match self.step {
            CheckoutStep::Items => {
                if cart.is_empty() {
                    return Err(StepGuardError::EmptyCart);
                }
                self.draft = Some(BookingDraft::from_cart(cart));
                self.step = CheckoutStep::MemberAndAddress;
            }
            CheckoutStep::MemberAndAddress => {
                if cart.is_empty() {
                    return Err(StepGuardError::EmptyCart);
                }
                self.selections.check_complete()?;

                let mut draft = BookingDraft::from_cart(cart);
                draft.member_ids = self.selections.member_ids.clone();
                draft.address_id = self.selections.address_id.clone();
                self.draft = Some(draft);
                self.step = CheckoutStep::Payment;
            }
            CheckoutStep::Payment => return Err(StepGuardError::AtFinalStep),
        }
        Ok(self.step)
    }

    /// Navigates back to an earlier step. Selections survive; the draft
    /// does not survive a return to Items.
    pub fn go_back(&mut self, to: CheckoutStep) -> Result<CheckoutStep, StepGuardError> {
        if to >= self.step {
            return Err(StepGuardError::NotAPriorStep);
        }
        self.step = to;
        if to == CheckoutStep::Items {
            self.draft = None;
        }
        Ok(self.step)
    }

    /// The draft ready to pay, if the stepper is on Payment.
    pub fn payment_draft(&self) -> Option<&BookingDraft> {
        match self.step {
            CheckoutStep::Payment => self.draft.as_ref(),
            _ => None,
        }
    }

    /// Checks that the payment draft still describes `cart`. If the lines or
    /// the coupon moved, the stepper drops back to Items (selections kept)
    /// so the new cart is reviewed before anything is charged.
    pub fn confirm_cart(&mut self, cart: &Cart) -> Result<&BookingDraft, StepGuardError> {
        let changed = match self.payment_draft() {
            Some(draft) => {
                let coupon = cart.applied_coupon.as_ref().map(|c| c.code.as_str());
                draft.items != cart.items || draft.coupon_code.as_deref() != coupon
            }
            None => return Err(StepGuardError::NotAPriorStep),
        };
        if changed {
            self.step = CheckoutStep::Items;
            self.draft = None;
            return Err(StepGuardError::CartChanged);
        }
        self.draft.as_ref().ok_or(StepGuardError::CartChanged)
    }

    /// Back to Items with nothing selected (after a successful booking).
    pub fn reset(&mut self) {
        *self = CheckoutStepper::new();
    }
}

// =============================================================================
// Member & Address Forms
// =============================================================================

/// Create/edit form for a family member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    pub name: String,
    pub relation: String,
    pub gender: Gender,
    #[ts(as = "String")]
    pub date_of_birth: NaiveDate,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl MemberDraft {
    pub fn from_member(member: &FamilyMember) -> Self {
        MemberDraft {
            name: member.name.clone(),
            relation: member.relation.clone(),
            gender: member.gender,
            date_of_birth: member.date_of_birth,
            email: member.email.clone(),
            phone: member.phone.clone(),
        }
    }

    /// Returns a trimmed copy, or the first invalid field.
    pub fn validate(&self, today: NaiveDate) -> ValidationResult<MemberDraft> {
        if self.date_of_birth > today {
            return Err(crate::error::ValidationError::invalid(
                "date of birth",
                "cannot be in the future",
            ));
        }

        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let email = optional(&self.email).map(|e| validate_email(&e)).transpose()?;
        let phone = optional(&self.phone).map(|p| validate_phone(&p)).transpose()?;

        Ok(MemberDraft {
            name: validate_name("name", &self.name)?,
            relation: validate_text("relation", &self.relation, 50)?,
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            email,
            phone,
        })
    }
}

/// Create/edit form for a collection address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AddressDraft {
    pub name: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub landmark: Option<String>,
}

impl AddressDraft {
    pub fn from_address(address: &Address) -> Self {
        AddressDraft {
            name: address.name.clone(),
            address_line: address.address_line.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            pincode: address.pincode.clone(),
            landmark: address.landmark.clone(),
        }
    }

    pub fn validate(&self) -> ValidationResult<AddressDraft> {
        Ok(AddressDraft {
            name: validate_text("name", &self.name, 100)?,
            address_line: validate_text("address", &self.address_line, 300)?,
            city: validate_text("city", &self.city, 100)?,
            state: validate_text("state", &self.state, 100)?,
            pincode: validate_pincode(&self.pincode)?,
            landmark: self
                .landmark
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{Coupon, DiscountRule, ProductSnapshot};

    fn cart_with_items(n: usize) -> Cart {
        let items = (0..n)
            .map(|i| CartItem {
                id: format!("item-{i}"),
                cart_id: "cart-1".to_string(),
                product_id: format!("p{i}"),
                quantity: 1,
                unit_price: Money::from_rupees(500),
                product: ProductSnapshot {
                    name: format!("Package {i}"),
                    report_time: None,
                },
            })
            .collect();
        let coupon = Coupon {
            code: "FIRST50".to_string(),
            rule: DiscountRule::Fixed {
                amount: Money::from_rupees(50),
            },
            minimum_amount: None,
            expires_at: None,
            usage_limit: None,
        };
        Cart::new("cart-1", "user-1", items, Some(coupon))
    }

    #[test]
    fn test_empty_cart_blocks_items_step() {
        let mut stepper = CheckoutStepper::new();
        assert_eq!(
            stepper.next(&Cart::default()),
            Err(StepGuardError::EmptyCart)
        );
        assert_eq!(stepper.step(), CheckoutStep::Items);
        assert!(stepper.draft().is_none());
    }

    #[test]
    fn test_member_and_address_guards() {
        let cart = cart_with_items(1);
        let mut stepper = CheckoutStepper::new();
        stepper.next(&cart).unwrap();
        assert!(stepper.draft().is_some());

        assert_eq!(
            stepper.next(&cart),
            Err(StepGuardError::MissingMemberAndAddress)
        );

        stepper.selections_mut().toggle_member("m1");
        assert_eq!(stepper.next(&cart), Err(StepGuardError::MissingAddress));

        stepper.selections_mut().toggle_member("m1");
        stepper.selections_mut().select_address("a1");
        assert_eq!(stepper.next(&cart), Err(StepGuardError::MissingMember));

        stepper.selections_mut().toggle_member("m2");
        stepper.selections_mut().toggle_member("m1");
        assert_eq!(stepper.next(&cart), Ok(CheckoutStep::Payment));

        let draft = stepper.payment_draft().unwrap();
        assert_eq!(draft.primary_member(), Some("m2"));
        assert_eq!(draft.member_ids, vec!["m2", "m1"]);
        assert_eq!(draft.address_id.as_deref(), Some("a1"));
        assert_eq!(draft.coupon_code.as_deref(), Some("FIRST50"));

        assert_eq!(stepper.next(&cart), Err(StepGuardError::AtFinalStep));
    }

    #[test]
    fn test_back_navigation_only() {
        let cart = cart_with_items(2);
        let mut stepper = CheckoutStepper::new();
        assert_eq!(
            stepper.go_back(CheckoutStep::Payment),
            Err(StepGuardError::NotAPriorStep)
        );

        stepper.next(&cart).unwrap();
        stepper.selections_mut().toggle_member("m1");
        stepper.selections_mut().select_address("a1");
        stepper.next(&cart).unwrap();

        assert_eq!(
            stepper.go_back(CheckoutStep::MemberAndAddress),
            Ok(CheckoutStep::MemberAndAddress)
        );
        assert!(stepper.draft().is_some());
        assert!(stepper.payment_draft().is_none());

        stepper.go_back(CheckoutStep::Items).unwrap();
        assert!(stepper.draft().is_none());
        // selections survive going back
        assert!(stepper.selections().is_member_selected("m1"));
    }

    #[test]
    fn test_cart_edited_on_payment_step_sends_back_to_items() {
        let cart = cart_with_items(2);
        let mut stepper = CheckoutStepper::new();
        stepper.next(&cart).unwrap();
        stepper.selections_mut().toggle_member("m1");
        stepper.selections_mut().select_address("a1");
        stepper.next(&cart).unwrap();

        assert_eq!(stepper.confirm_cart(&cart).unwrap().items, cart.items);

        let mut edited = cart.clone();
        edited.set_quantity("p0", 3).unwrap();
        assert_eq!(stepper.confirm_cart(&edited), Err(StepGuardError::CartChanged));
        assert_eq!(stepper.step(), CheckoutStep::Items);
        assert!(stepper.draft().is_none());
        assert!(stepper.selections().is_member_selected("m1"));

        stepper.next(&edited).unwrap();
        stepper.next(&edited).unwrap();
        let mut uncouponed = edited.clone();
        uncouponed.clear_coupon();
        assert_eq!(
            stepper.confirm_cart(&uncouponed),
            Err(StepGuardError::CartChanged)
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let cart = cart_with_items(1);
        let mut stepper = CheckoutStepper::new();
        stepper.next(&cart).unwrap();
        stepper.selections_mut().toggle_member("m1");
        stepper.selections_mut().select_address("a1");
        stepper.next(&cart).unwrap();

        stepper.reset();
        assert_eq!(stepper, CheckoutStepper::new());
    }

    #[test]
    fn test_forget_deleted_selection() {
        let mut selections = CheckoutSelections::default();
        selections.toggle_member("m1");
        selections.select_address("a1");
        selections.select_address("a2");
        selections.forget_address("a1");
        assert_eq!(selections.address_id.as_deref(), Some("a2"));
        selections.forget_address("a2");
        selections.forget_member("m1");
        assert_eq!(selections, CheckoutSelections::default());
    }

    #[test]
    fn test_member_draft_validation() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let draft = MemberDraft {
            name: " Meera ".to_string(),
            relation: "Mother".to_string(),
            gender: Gender::Female,
            date_of_birth: NaiveDate::from_ymd_opt(1960, 2, 1).unwrap(),
            email: Some("  ".to_string()),
            phone: Some("9876543210".to_string()),
        };
        let clean = draft.validate(today).unwrap();
        assert_eq!(clean.name, "Meera");
        assert_eq!(clean.email, None);

        let mut bad = draft.clone();
        bad.phone = Some("12345".to_string());
        assert_eq!(bad.validate(today).unwrap_err().field(), "phone");

        let mut future = draft;
        future.date_of_birth = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert!(future.validate(today).is_err());
    }

    #[test]
    fn test_address_draft_validation() {
        let draft = AddressDraft {
            name: "Home".to_string(),
            address_line: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
            landmark: Some("".to_string()),
        };
        assert_eq!(draft.validate().unwrap().landmark, None);

        let mut bad = draft;
        bad.pincode = "5600".to_string();
        assert_eq!(bad.validate().unwrap_err().field(), "pincode");
    }
}

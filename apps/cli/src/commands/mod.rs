//! One module per command group.

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod consult;
pub mod session;

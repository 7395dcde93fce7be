//! Checkout: pick members and an address, then pay.

use carecart_client::{CheckoutOutcome, CheckoutSession, DirectPurchase, HttpBackend};
use carecart_core::checkout::{AddressDraft, MemberDraft};
use carecart_core::types::Gender;
use carecart_core::Money;
use chrono::NaiveDate;
use clap::Args;

use crate::app::App;
use crate::commands::cart::print_cart;
use crate::terminal::{prompt, prompt_required, TerminalPaymentWidget};

type Checkout = CheckoutSession<HttpBackend, TerminalPaymentWidget>;

#[derive(Args)]
pub struct BuyArgs {
    product_id: String,
    /// Test name shown on the receipt
    #[arg(long)]
    name: String,
    /// Unit price in rupees
    #[arg(long)]
    price: i64,
    #[arg(long, default_value_t = 1)]
    quantity: i64,
}

pub async fn run(app: &App) -> anyhow::Result<()> {
    let cart = app.cart();
    print_cart(&cart.fetch_cart().await?);

    let checkout = app.checkout(cart);
    checkout.next()?;
    choose_recipients(&checkout).await?;
    checkout.next()?;

    report(checkout.pay().await?);
    Ok(())
}

pub async fn buy(app: &App, args: BuyArgs) -> anyhow::Result<()> {
    let checkout = app.checkout(app.cart());
    choose_recipients(&checkout).await?;

    let purchase = DirectPurchase {
        product_id: args.product_id,
        name: args.name,
        unit_price: Money::from_rupees(args.price),
        quantity: args.quantity,
    };
    report(checkout.buy_now(&purchase, &checkout.selections()).await?);
    Ok(())
}

fn report(outcome: CheckoutOutcome) {
    match outcome {
        CheckoutOutcome::Booked {
            order_id,
            payment_id,
        } => println!("Booked. Order {order_id}, payment {payment_id}"),
        CheckoutOutcome::Cancelled => println!("Payment cancelled, nothing was booked"),
        CheckoutOutcome::Failed { reason } => println!("Payment failed: {reason}"),
    }
}

/// Selects members and an address on the stepper, creating them when the
/// account has none.
async fn choose_recipients(checkout: &Checkout) -> anyhow::Result<()> {
    let mut members = checkout.members().await?;
    if members.is_empty() {
        println!("No family members yet, add one");
        members.push(checkout.save_member(None, &read_member().await?).await?);
    }
    for (i, m) in members.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, m.name, m.relation);
    }
    for index in read_indices("Members, comma separated", members.len()).await? {
        checkout.toggle_member(&members[index].id);
    }

    let mut addresses = checkout.addresses().await?;
    if addresses.is_empty() {
        println!("No addresses yet, add one");
        addresses.push(checkout.save_address(None, &read_address().await?).await?);
    }
    for (i, a) in addresses.iter().enumerate() {
        println!("  {}. {}, {} {}", i + 1, a.address_line, a.city, a.pincode);
    }
    if let Some(index) = read_indices("Address", addresses.len()).await?.first() {
        checkout.select_address(&addresses[*index].id);
    }
    Ok(())
}

/// Parses 1-based choices, ignoring anything out of range.
async fn read_indices(label: &str, len: usize) -> anyhow::Result<Vec<usize>> {
    let answer = prompt(label).await?;
    Ok(answer
        .split(',')
        .filter_map(|part| part.trim().parse::<usize>().ok())
        .filter(|n| (1..=len).contains(n))
        .map(|n| n - 1)
        .collect())
}

async fn read_member() -> anyhow::Result<MemberDraft> {
    let name = prompt_required("Name").await?;
    let relation = prompt_required("Relation").await?;
    let gender = match prompt("Gender (m/f/o)").await?.to_ascii_lowercase().as_str() {
        "m" | "male" => Gender::Male,
        "f" | "female" => Gender::Female,
        _ => Gender::Other,
    };
    let date_of_birth = NaiveDate::parse_from_str(
        &prompt_required("Date of birth (YYYY-MM-DD)").await?,
        "%Y-%m-%d",
    )?;
    let optional = |s: String| (!s.is_empty()).then_some(s);

    Ok(MemberDraft {
        name,
        relation,
        gender,
        date_of_birth,
        email: optional(prompt("Email (optional)").await?),
        phone: optional(prompt("Phone (optional)").await?),
    })
}

async fn read_address() -> anyhow::Result<AddressDraft> {
    let name = prompt_required("Contact name").await?;
    let address_line = prompt_required("Address").await?;
    let city = prompt_required("City").await?;
    let state = prompt_required("State").await?;
    let pincode = prompt_required("Pincode").await?;
    let landmark = prompt("Landmark (optional)").await?;

    Ok(AddressDraft {
        name,
        address_line,
        city,
        state,
        pincode,
        landmark: (!landmark.is_empty()).then_some(landmark),
    })
}

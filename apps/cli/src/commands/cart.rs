//! Cart and coupon commands.

use carecart_core::Cart;
use clap::Subcommand;

use crate::app::App;

#[derive(Subcommand)]
pub enum CartAction {
    /// Print the cart
    Show,
    /// Add a test to the cart
    Add {
        product_id: String,
        #[arg(default_value_t = 1)]
        quantity: i64,
    },
    /// Set a line's quantity (values below 1 become 1)
    Update { product_id: String, quantity: i64 },
    /// Remove a line
    Remove { product_id: String },
}

#[derive(Subcommand)]
pub enum CouponAction {
    Apply { code: String },
    Remove,
}

pub async fn run(app: &App, action: CartAction) -> anyhow::Result<()> {
    let engine = app.cart();
    let cart = engine.fetch_cart().await?;

    let cart = match action {
        CartAction::Show => cart,
        CartAction::Add {
            product_id,
            quantity,
        } => engine.add_item(&product_id, quantity).await?,
        CartAction::Update {
            product_id,
            quantity,
        } => {
            engine.update_quantity(&product_id, quantity).await?;
            engine.snapshot().cart
        }
        CartAction::Remove { product_id } => {
            engine.remove_item(&product_id).await?;
            engine.snapshot().cart
        }
    };

    print_cart(&cart);
    Ok(())
}

pub async fn coupon(app: &App, action: CouponAction) -> anyhow::Result<()> {
    let engine = app.cart();
    engine.fetch_cart().await?;

    let cart = match action {
        CouponAction::Apply { code } => engine.apply_coupon(&code).await?,
        CouponAction::Remove => engine.remove_coupon().await?,
    };

    print_cart(&cart);
    Ok(())
}

pub fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }

    for item in &cart.items {
        println!(
            "  {:<12} {:<32} x{:<3} {:>12}",
            item.product_id,
            item.product.name,
            item.quantity,
            item.line_total().to_string()
        );
    }
    println!("  {:-<64}", "");
    println!("  {:<50} {:>12}", "Subtotal", cart.pricing.original_total.to_string());
    if let Some(coupon) = &cart.applied_coupon {
        println!(
            "  {:<50} {:>12}",
            format!("Coupon {}", coupon.code),
            format!("-{}", cart.pricing.discount_amount)
        );
    }
    println!("  {:<50} {:>12}", "Total", cart.pricing.discounted_total.to_string());
}

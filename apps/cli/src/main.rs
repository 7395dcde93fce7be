//! # CareCart CLI Entry Point
//!
//! ## Application Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CareCart CLI                                   │
//! │                                                                         │
//! │  main.rs ──────► logging, config, session restore, dispatch             │
//! │                                                                         │
//! │  app.rs ───────► App: config + SessionContext + HttpBackend + toasts    │
//! │                                                                         │
//! │  commands/ ────► session, cart, checkout, consult, admin                │
//! │                                                                         │
//! │  terminal.rs ──► stdin prompts, console toasts, payment widget          │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                      carecart-client                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load configuration (file, then `CARECART_*` environment)
//! 3. Restore the persisted session
//! 4. Run the requested command

mod app;
mod commands;
mod terminal;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::commands::{admin, cart, checkout, consult, session};

#[derive(Parser)]
#[command(name = "carecart", version, about = "CareCart: lab tests and doctor consultations")]
struct Cli {
    /// Path to client.toml (defaults to the platform config directory)
    #[arg(long, global = true, env = "CARECART_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a session token from the web login
    Login(session::LoginArgs),
    /// Forget the stored session
    Logout,
    /// Show or edit the cart
    Cart {
        #[command(subcommand)]
        action: cart::CartAction,
    },
    /// Apply or remove a coupon
    Coupon {
        #[command(subcommand)]
        action: cart::CouponAction,
    },
    /// Pay for the cart: members, address, payment
    Checkout,
    /// Buy a single test without touching the cart
    Buy(checkout::BuyArgs),
    /// Book a consultation with a doctor
    Consult {
        /// Doctor id
        doctor_id: String,
    },
    /// Manage hospitals and doctors
    Admin {
        #[command(subcommand)]
        action: admin::AdminAction,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let app = App::load(cli.config)?;

    match cli.command {
        Commands::Login(args) => session::login(&app, args),
        Commands::Logout => session::logout(&app),
        Commands::Cart { action } => cart::run(&app, action).await,
        Commands::Coupon { action } => cart::coupon(&app, action).await,
        Commands::Checkout => checkout::run(&app).await,
        Commands::Buy(args) => checkout::buy(&app, args).await,
        Commands::Consult { doctor_id } => consult::run(&app, &doctor_id).await,
        Commands::Admin { action } => admin::run(&app, action).await,
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=carecart_client=trace` - Trace the client crate only
/// - Default: INFO, DEBUG for carecart crates (written to stderr)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,carecart=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

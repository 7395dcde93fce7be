//! Login and logout.
//!
//! The CLI never sees a password: the token and profile come from the web
//! login and are stored in the session file.

use carecart_client::{LogoutReason, Session};
use clap::Args;
use serde_json::json;

use crate::app::App;

#[derive(Args)]
pub struct LoginArgs {
    /// Bearer token issued by the backend
    #[arg(long, env = "CARECART_TOKEN")]
    token: String,
    #[arg(long)]
    user_id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    /// Mark the profile as an administrator
    #[arg(long)]
    admin: bool,
}

pub fn login(app: &App, args: LoginArgs) -> anyhow::Result<()> {
    let role = if args.admin { "admin" } else { "user" };
    let mut session = Session::new(args.token, args.user_id);
    session.user_data = Some(json!({
        "name": args.name,
        "email": args.email,
        "phone": args.phone,
        "role": role,
    }));
    app.session.login(session)?;

    match app.session.current().and_then(|s| s.expires_at()) {
        Some(exp) => println!("Logged in until {}", exp.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Logged in"),
    }
    Ok(())
}

pub fn logout(app: &App) -> anyhow::Result<()> {
    app.session.logout(LogoutReason::UserRequested);
    println!("Logged out");
    Ok(())
}

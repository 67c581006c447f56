//! CLI account command handlers for status and sign-out.

use tracing::warn;

use crate::context::AppContext;
use crate::error::Result;

/// Handle `lazyteams status`.
pub async fn handle_status(context: &AppContext) -> Result<()> {
    let client = context.client();
    println!("Credential store: {}", context.settings().credentials_store_provider);

    match client.active_account() {
        Some(account) => {
            let signed_in = client.check_signed_in()?;
            println!(
                "Active account: {account} ({})",
                if signed_in { "signed in" } else { "not signed in" }
            );
            if signed_in {
                match client.fetch_my_profile().await {
                    Ok(profile) => {
                        if let Some(name) = profile.display_name {
                            println!("  Name: {name}");
                        }
                        if let Some(mail) = profile.mail {
                            println!("  Mail: {mail}");
                        }
                    }
                    Err(err) => warn!(error = %err, "could not fetch the user profile"),
                }
            }
        }
        None => println!("Active account: none"),
    }

    let accounts = client.user_credentials()?;
    if accounts.is_empty() {
        println!("No stored credentials.");
        return Ok(());
    }
    println!("Stored accounts:");
    for credentials in accounts.values() {
        let mut tokens = Vec::new();
        if credentials.access_token.is_some() {
            tokens.push("access token");
        }
        if credentials.refresh_token.is_some() {
            tokens.push("refresh token");
        }
        println!(
            "  {}{}: {}",
            credentials.account,
            if credentials.is_default { " (default)" } else { "" },
            tokens.join(", ")
        );
    }
    Ok(())
}

/// Handle `lazyteams signout`.
pub fn handle_signout(context: &AppContext) -> Result<()> {
    let account = context.client().active_account();
    if context.client().sign_out()? {
        println!("Signed out {}.", account.unwrap_or_default());
    } else {
        println!("Nothing to sign out.");
    }
    Ok(())
}

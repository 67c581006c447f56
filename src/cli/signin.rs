//! Line-based presentation of the device-code sign-in.

use std::sync::Arc;

use tracing::warn;

use super::SigninArgs;
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::signin::{spawn_signin, Clipboard, NoClipboard, Osc52Clipboard, SigninState};

/// Handle `lazyteams signin`.
pub async fn handle_signin(context: &AppContext, args: &SigninArgs) -> Result<()> {
    match context.client().check_signed_in() {
        Ok(true) => {
            let account = context.client().active_account().unwrap_or_default();
            println!("Already signed in as {account}.");
            return Ok(());
        }
        Ok(false) => {}
        Err(err) => {
            warn!(error = %err, "stored credentials are unusable, signing in again");
            println!("Stored credentials are unusable ({err}); signing in again.");
        }
    }

    let clipboard: Arc<dyn Clipboard> = if args.no_clipboard {
        Arc::new(NoClipboard)
    } else {
        Arc::new(Osc52Clipboard::stdout())
    };
    let handle = spawn_signin(context.signin_machine(clipboard));
    let mut states = handle.subscribe();
    let mut shown_code: Option<String> = None;

    loop {
        let state = states.borrow_and_update().clone();
        match &state {
            SigninState::Unauthenticated => {
                if shown_code.take().is_some() {
                    println!("The code expired before sign-in completed. Requesting a new one...");
                    handle.restart();
                }
            }
            SigninState::RequestingCode => {
                if shown_code.is_none() {
                    println!("Generating an authentication link...");
                }
            }
            SigninState::AwaitingUserAction { payload, elapsed } => {
                if shown_code.as_deref() != Some(payload.device_code.as_str()) {
                    shown_code = Some(payload.device_code.clone());
                    println!();
                    println!("To sign in, open this page: {}", payload.verification_uri);
                    println!("Then enter this code: {}", payload.user_code);
                    if !args.no_clipboard {
                        println!("(The code has been copied to your clipboard.)");
                    }
                    println!(
                        "N.B: This code expires in {} seconds. Press Ctrl-C to cancel.",
                        payload.expires_in.saturating_sub(elapsed.as_secs())
                    );
                }
            }
            SigninState::Polling { .. } => {}
            SigninState::Authenticated { account } => {
                println!("You are now signed in as {account}!");
                return Ok(());
            }
            SigninState::Failed { error } => {
                return Err(Error::signin("Sign-in did not complete").with_source(error.clone()));
            }
        }

        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    return Err(Error::signin("Sign-in driver stopped unexpectedly"));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                println!("Sign-in cancelled.");
                return Ok(());
            }
        }
    }
}

//! LazyTeams core: sign-in and credential management for a terminal
//! Microsoft Teams client.
//!
//! The library covers the device authorization grant against the Microsoft
//! identity platform, per-account token storage, and the state machine that
//! sequences a sign-in attempt. The presentation only supplies a clipboard
//! and renders [`signin::SigninState`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use lazyteams::context::AppContext;
//! use lazyteams::signin::{spawn_signin, NoClipboard, SigninState};
//!
//! # async fn example() -> lazyteams::error::Result<()> {
//! let context = AppContext::from_env()?;
//! if !context.client().check_signed_in()? {
//!     let handle = spawn_signin(context.signin_machine(Arc::new(NoClipboard)));
//!     let state = handle.wait_for(SigninState::is_terminal).await;
//!     println!("{:?}", state.phase());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod signin;

#[cfg(feature = "cli")]
pub mod telemetry;

#[cfg(feature = "cli")]
pub mod cli;

/// Short product identifier; namespaces credentials and default directories.
pub const PRODUCT_CODE: &str = env!("CARGO_PKG_NAME");
/// Human-facing product name.
pub const PRODUCT_NAME: &str = "LazyTeams";

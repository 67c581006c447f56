//! Sign-in session state machine.
//!
//! [`SigninMachine`] sequences the device-code flow:
//!
//! ```text
//! Unauthenticated -> RequestingCode -> AwaitingUserAction <-> Polling -> Authenticated
//!                                  \________________ Failed _______/
//! ```
//!
//! Network calls are split in two phases so a driver can run them off the
//! state owner: `begin_*` hands out a [`SessionTicket`], `complete_*` applies
//! the result only when the ticket still names the current session. Results
//! from an abandoned session are dropped.

pub mod clipboard;
pub mod driver;

pub use clipboard::{Clipboard, NoClipboard, Osc52Clipboard};
pub use driver::{spawn_signin, SigninCommand, SigninHandle};

use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{AuthError, DeviceCodeClient, DeviceCodePayload, TokenPoll};
use crate::error::{Error, Result};

/// Fixed delay between token polls. The server-advised interval is not used.
pub const POLL_TICK: Duration = Duration::from_secs(2);

/// Observable sign-in state.
#[derive(Debug, Clone)]
pub enum SigninState {
    Unauthenticated,
    RequestingCode,
    /// Device code issued, waiting for the user to finish in a browser.
    AwaitingUserAction {
        payload: DeviceCodePayload,
        elapsed: Duration,
    },
    /// A token poll is in flight.
    Polling {
        payload: DeviceCodePayload,
        elapsed: Duration,
    },
    Authenticated {
        account: String,
    },
    Failed {
        error: Arc<Error>,
    },
}

/// Discriminant of [`SigninState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SigninPhase {
    Unauthenticated,
    RequestingCode,
    AwaitingUserAction,
    Polling,
    Authenticated,
    Failed,
}

impl SigninState {
    pub fn phase(&self) -> SigninPhase {
        match self {
            Self::Unauthenticated => SigninPhase::Unauthenticated,
            Self::RequestingCode => SigninPhase::RequestingCode,
            Self::AwaitingUserAction { .. } => SigninPhase::AwaitingUserAction,
            Self::Polling { .. } => SigninPhase::Polling,
            Self::Authenticated { .. } => SigninPhase::Authenticated,
            Self::Failed { .. } => SigninPhase::Failed,
        }
    }

    /// Device code of the current attempt, while one is live.
    pub fn payload(&self) -> Option<&DeviceCodePayload> {
        match self {
            Self::AwaitingUserAction { payload, .. } | Self::Polling { payload, .. } => {
                Some(payload)
            }
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<Error>> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authenticated { .. } | Self::Failed { .. })
    }
}

/// Identity of the session a network call was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTicket {
    session: Uuid,
}

impl SessionTicket {
    pub fn session(&self) -> Uuid {
        self.session
    }
}

/// Owner of the sign-in state for one process.
pub struct SigninMachine {
    client: DeviceCodeClient,
    clipboard: Arc<dyn Clipboard>,
    state: SigninState,
    session: Uuid,
    tick: Duration,
}

impl std::fmt::Debug for SigninMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigninMachine")
            .field("state", &self.state.phase())
            .field("session", &self.session)
            .field("tick", &self.tick)
            .finish()
    }
}

impl SigninMachine {
    pub fn new(client: DeviceCodeClient, clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            client,
            clipboard,
            state: SigninState::Unauthenticated,
            session: Uuid::new_v4(),
            tick: POLL_TICK,
        }
    }

    /// Override the poll tick. Elapsed time grows by this amount per pending poll.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn state(&self) -> &SigninState {
        &self.state
    }

    pub fn phase(&self) -> SigninPhase {
        self.state.phase()
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn client(&self) -> &DeviceCodeClient {
        &self.client
    }

    fn new_session(&mut self) -> SessionTicket {
        self.session = Uuid::new_v4();
        SessionTicket {
            session: self.session,
        }
    }

    fn transition(&mut self, next: SigninState) {
        debug!(from = %self.state.phase(), to = %next.phase(), session = %self.session, "sign-in transition");
        self.state = next;
    }

    fn is_current(&self, ticket: SessionTicket, operation: &str) -> bool {
        if ticket.session == self.session {
            return true;
        }
        debug!(
            operation,
            stale = %ticket.session,
            current = %self.session,
            "discarding result from abandoned sign-in session"
        );
        false
    }

    /// Start a new attempt from `Unauthenticated` or `Failed`.
    pub fn begin_request(&mut self) -> Option<SessionTicket> {
        match self.state {
            SigninState::Unauthenticated | SigninState::Failed { .. } => {
                let ticket = self.new_session();
                self.transition(SigninState::RequestingCode);
                Some(ticket)
            }
            _ => None,
        }
    }

    /// Abandon whatever is in progress and start over. No-op once authenticated.
    pub fn restart(&mut self) -> Option<SessionTicket> {
        if matches!(self.state, SigninState::Authenticated { .. }) {
            return None;
        }
        info!("restarting sign-in");
        let ticket = self.new_session();
        self.transition(SigninState::RequestingCode);
        Some(ticket)
    }

    /// Abandon whatever is in progress. No-op once authenticated.
    pub fn cancel(&mut self) {
        if matches!(self.state, SigninState::Authenticated { .. }) {
            return;
        }
        self.new_session();
        self.transition(SigninState::Unauthenticated);
    }

    /// Apply a device-code result. Returns whether it was applied.
    pub fn complete_request(
        &mut self,
        ticket: SessionTicket,
        result: Result<DeviceCodePayload>,
    ) -> bool {
        if !self.is_current(ticket, "request_device_code")
            || !matches!(self.state, SigninState::RequestingCode)
        {
            return false;
        }
        match result {
            Ok(payload) => {
                if let Err(err) = self.clipboard.write_text(&payload.user_code) {
                    warn!(error = %err, "could not copy the user code to the clipboard");
                }
                self.transition(SigninState::AwaitingUserAction {
                    payload,
                    elapsed: Duration::ZERO,
                });
            }
            Err(err) => self.fail("Unable to acquire a device code", err),
        }
        true
    }

    /// Move from `AwaitingUserAction` to `Polling`, returning what to poll with.
    pub fn begin_poll(&mut self) -> Option<(SessionTicket, DeviceCodePayload)> {
        let SigninState::AwaitingUserAction { payload, elapsed } = &self.state else {
            return None;
        };
        let (payload, elapsed) = (payload.clone(), *elapsed);
        self.transition(SigninState::Polling {
            payload: payload.clone(),
            elapsed,
        });
        Some((
            SessionTicket {
                session: self.session,
            },
            payload,
        ))
    }

    /// Apply a token-poll result. Returns whether it was applied.
    pub fn complete_poll(&mut self, ticket: SessionTicket, result: Result<TokenPoll>) -> bool {
        if !self.is_current(ticket, "poll_for_token") {
            return false;
        }
        let SigninState::Polling { payload, elapsed } = &self.state else {
            return false;
        };
        let (payload, elapsed) = (payload.clone(), *elapsed);
        match result {
            Ok(TokenPoll::Pending(reason)) => {
                let elapsed = elapsed + self.tick;
                if elapsed >= Duration::from_secs(payload.expires_in) {
                    info!(
                        expires_in = payload.expires_in,
                        "device code expired before sign-in completed"
                    );
                    self.new_session();
                    self.transition(SigninState::Unauthenticated);
                } else {
                    debug!(?reason, elapsed_secs = elapsed.as_secs(), "sign-in still pending");
                    self.transition(SigninState::AwaitingUserAction { payload, elapsed });
                }
            }
            Ok(TokenPoll::Authorized(_)) => match self.client.active_account() {
                Some(account) => self.transition(SigninState::Authenticated { account }),
                None => self.fail(
                    "Unable to acquire an access token",
                    AuthError::MissingPrincipal.into_authentication("No active account after sign-in"),
                ),
            },
            Err(err) => self.fail("Unable to acquire an access token", err),
        }
        true
    }

    fn fail(&mut self, message: &str, cause: Error) {
        warn!(error = %cause, "sign-in failed");
        let error = Error::signin(message).with_source(cause);
        self.transition(SigninState::Failed {
            error: Arc::new(error),
        });
    }

    /// Request a device code inline. No-op unless a new attempt may start.
    pub async fn request(&mut self) -> &SigninState {
        if let Some(ticket) = self.begin_request() {
            let result = self.client.request_device_code().await;
            self.complete_request(ticket, result);
        }
        &self.state
    }

    /// Run one poll inline. No-op unless awaiting the user.
    pub async fn poll(&mut self) -> &SigninState {
        if let Some((ticket, payload)) = self.begin_poll() {
            let result = self.client.poll_for_token(&payload).await;
            self.complete_poll(ticket, result);
        }
        &self.state
    }
}

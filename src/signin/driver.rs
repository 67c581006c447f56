//! Background task that drives a [`SigninMachine`] on a timer.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;

use super::{SessionTicket, SigninMachine, SigninPhase, SigninState};
use crate::auth::{DeviceCodePayload, TokenPoll};
use crate::error::Result;

/// Commands accepted by a running driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigninCommand {
    /// Abandon the current attempt and request a fresh device code.
    Restart,
    /// Abandon the current attempt and go back to `Unauthenticated`.
    Cancel,
}

enum Completion {
    Request(SessionTicket, Result<DeviceCodePayload>),
    Poll(SessionTicket, Result<TokenPoll>),
}

/// Handle to a running sign-in driver. Dropping it stops the driver.
#[derive(Debug)]
pub struct SigninHandle {
    state_rx: watch::Receiver<SigninState>,
    command_tx: mpsc::UnboundedSender<SigninCommand>,
    task: JoinHandle<()>,
}

impl SigninHandle {
    /// Latest published state.
    pub fn state(&self) -> SigninState {
        self.state_rx.borrow().clone()
    }

    /// Receiver notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<SigninState> {
        self.state_rx.clone()
    }

    pub fn restart(&self) -> bool {
        self.command_tx.send(SigninCommand::Restart).is_ok()
    }

    pub fn cancel(&self) -> bool {
        self.command_tx.send(SigninCommand::Cancel).is_ok()
    }

    /// Wait until a state matching `done` is published.
    ///
    /// Returns the last state seen if the driver stops first.
    pub async fn wait_for<F>(&self, mut done: F) -> SigninState
    where
        F: FnMut(&SigninState) -> bool,
    {
        let mut rx = self.state_rx.clone();
        let seen = rx
            .wait_for(|state| done(state))
            .await
            .map(|state| state.clone());
        match seen {
            Ok(state) => state,
            Err(_) => rx.borrow().clone(),
        }
    }
}

impl Drop for SigninHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start driving `machine`: request a device code, then poll every tick
/// until the session settles, expires, or is cancelled.
///
/// Each network call runs in its own task. The next tick is armed only after
/// the previous poll settled, so at most one poll per session is in flight.
pub fn spawn_signin(machine: SigninMachine) -> SigninHandle {
    let (state_tx, state_rx) = watch::channel(machine.state().clone());
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(drive(machine, state_tx, command_rx));
    SigninHandle {
        state_rx,
        command_tx,
        task,
    }
}

async fn drive(
    mut machine: SigninMachine,
    state_tx: watch::Sender<SigninState>,
    mut commands: mpsc::UnboundedReceiver<SigninCommand>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
    let mut next_poll: Option<Instant> = None;

    if let Some(ticket) = machine.begin_request() {
        spawn_request(&machine, ticket, &done_tx);
    }
    state_tx.send_replace(machine.state().clone());

    loop {
        let deadline = next_poll;
        let changed = tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("sign-in handle dropped, stopping driver");
                    return;
                };
                next_poll = None;
                match command {
                    SigninCommand::Restart => {
                        if let Some(ticket) = machine.restart() {
                            spawn_request(&machine, ticket, &done_tx);
                        }
                    }
                    SigninCommand::Cancel => machine.cancel(),
                }
                true
            }
            Some(completion) = done_rx.recv() => {
                let applied = match completion {
                    Completion::Request(ticket, result) => machine.complete_request(ticket, result),
                    Completion::Poll(ticket, result) => machine.complete_poll(ticket, result),
                };
                if applied && machine.phase() == SigninPhase::AwaitingUserAction {
                    next_poll = Some(Instant::now() + machine.tick());
                }
                applied
            }
            _ = sleep_until(deadline) => {
                next_poll = None;
                match machine.begin_poll() {
                    Some((ticket, payload)) => {
                        let client = machine.client().clone();
                        let done = done_tx.clone();
                        tokio::spawn(async move {
                            let result = client.poll_for_token(&payload).await;
                            let _ = done.send(Completion::Poll(ticket, result));
                        });
                        true
                    }
                    None => false,
                }
            }
        };
        if changed {
            state_tx.send_replace(machine.state().clone());
        }
    }
}

fn spawn_request(
    machine: &SigninMachine,
    ticket: SessionTicket,
    done_tx: &mpsc::UnboundedSender<Completion>,
) {
    let client = machine.client().clone();
    let done = done_tx.clone();
    tokio::spawn(async move {
        let result = client.request_device_code().await;
        let _ = done.send(Completion::Request(ticket, result));
    });
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

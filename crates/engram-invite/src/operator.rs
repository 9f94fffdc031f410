//! Operator invitation lifecycle
//!
//! Issues a short-lived pairing code carrying the default operator bundle.
//! Pairing itself happens out of band: the operator's CLI consumes the code,
//! so there is nothing to poll.

use crate::clipboard::Clipboard;
use crate::countdown::Countdown;
use crate::error::InviteError;
use crate::kind::InviteKind;
use crate::link;
use crate::progress::{Creating, CreatingGuard};
use engram_core::{
    ActorSource, CanisterId, CanisterResult, EngramConfig, InviteTiming, OperatorPermissions,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Observable state of an operator invite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorInviteState {
    /// Active pairing code
    pub code: Option<String>,
    /// Last creation failure
    pub error: Option<String>,
    /// Creation in progress
    pub creating: bool,
    /// Seconds until the code expires
    pub seconds_left: u64,
    epoch: u64,
}

impl OperatorInviteState {
    /// Remaining validity, `m:ss`
    #[must_use]
    pub fn countdown_text(&self) -> String {
        self.kind().countdown_format().render(self.seconds_left)
    }

    /// Always `InviteKind::Operator`
    #[inline]
    #[must_use]
    pub fn kind(&self) -> InviteKind {
        InviteKind::Operator
    }

    /// Whether a code is live
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.code.is_some()
    }
}

impl Creating for OperatorInviteState {
    fn set_creating(&mut self, creating: bool) {
        self.creating = creating;
    }
}

struct Inner {
    actor: ActorSource,
    canister_id: CanisterId,
    pair_program: String,
    ttl_secs: u64,
    clipboard: Arc<dyn Clipboard>,
    state: watch::Sender<OperatorInviteState>,
    countdown: Countdown,
}

impl Inner {
    fn update(&self, epoch: u64, f: impl FnOnce(&mut OperatorInviteState)) -> bool {
        self.state.send_if_modified(|state| {
            if state.epoch != epoch {
                return false;
            }
            f(state);
            true
        })
    }

    fn start(self: &Arc<Self>, code: String) {
        let mut epoch = 0;
        self.state.send_modify(|state| {
            state.epoch += 1;
            epoch = state.epoch;
            state.code = Some(code);
        });

        let on_tick = Arc::downgrade(self);
        let on_expire = Arc::downgrade(self);
        self.countdown.start(
            self.ttl_secs,
            move |left| {
                if let Some(inner) = on_tick.upgrade() {
                    inner.update(epoch, |state| state.seconds_left = left);
                }
            },
            move || {
                if let Some(inner) = on_expire.upgrade() {
                    if inner.update(epoch, |state| state.code = None) {
                        tracing::info!(canister = %inner.canister_id, "operator pairing code expired");
                    }
                }
            },
        );
    }
}

/// Operator invite engine for one engram
///
/// Dropping the engine cancels its countdown.
pub struct OperatorInvite {
    inner: Arc<Inner>,
}

impl OperatorInvite {
    /// Default pairing program
    pub const DEFAULT_PAIR_PROGRAM: &'static str = "npx @engramx/client";

    /// Create engine inviting operators to `canister_id`
    ///
    /// Codes live 5 minutes and count down in 1s steps.
    #[must_use]
    pub fn new(actor: ActorSource, canister_id: CanisterId, clipboard: Arc<dyn Clipboard>) -> Self {
        Self::build(
            actor,
            canister_id,
            Self::DEFAULT_PAIR_PROGRAM.to_string(),
            clipboard,
            InviteTiming::default(),
        )
    }

    /// Create engine from client configuration
    #[must_use]
    pub fn from_config(
        actor: ActorSource,
        canister_id: CanisterId,
        config: &EngramConfig,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self::build(
            actor,
            canister_id,
            config.pair_program.clone(),
            clipboard,
            config.invites,
        )
    }

    /// With custom timing
    #[must_use]
    pub fn with_timing(self, timing: InviteTiming) -> Self {
        let inner = &self.inner;
        Self::build(
            inner.actor.clone(),
            inner.canister_id.clone(),
            inner.pair_program.clone(),
            inner.clipboard.clone(),
            timing,
        )
    }

    fn build(
        actor: ActorSource,
        canister_id: CanisterId,
        pair_program: String,
        clipboard: Arc<dyn Clipboard>,
        timing: InviteTiming,
    ) -> Self {
        let (state, _) = watch::channel(OperatorInviteState::default());
        Self {
            inner: Arc::new(Inner {
                actor,
                canister_id,
                pair_program,
                ttl_secs: InviteKind::Operator.ttl_secs(&timing),
                clipboard,
                state,
                countdown: Countdown::new(timing.tick_interval()),
            }),
        }
    }

    /// Issue a new pairing code with the default operator bundle
    ///
    /// Silently does nothing while no actor is connected. `creating` is
    /// false again once this returns or is dropped.
    #[tracing::instrument(skip(self), fields(canister = %self.inner.canister_id))]
    pub async fn create_invite(&self, name: &str) {
        let inner = &self.inner;
        let current = inner.actor.borrow().clone();
        let Some(actor) = current else {
            tracing::debug!("no engram actor connected, ignoring operator invite request");
            return;
        };

        let _creating = CreatingGuard::begin(&inner.state, |state| state.error = None);

        let permissions = OperatorPermissions::default_bundle();
        match actor.create_operator_invite(name, &permissions).await {
            Ok(CanisterResult::Ok(code)) => {
                tracing::info!("operator pairing code issued");
                inner.start(code);
            }
            Ok(CanisterResult::Err(message)) => {
                tracing::warn!(%message, "operator invite rejected");
                inner.state.send_modify(|state| state.error = Some(message));
            }
            Err(error) => {
                tracing::warn!(%error, "operator invite call failed");
                inner
                    .state
                    .send_modify(|state| state.error = Some(error.to_string()));
            }
        }
    }

    /// CLI command that pairs with the active code
    #[must_use]
    pub fn pair_command(&self) -> Option<String> {
        let state = self.inner.state.borrow();
        let code = state.code.as_deref()?;
        Some(link::pair_command(
            &self.inner.pair_program,
            code,
            &self.inner.canister_id,
        ))
    }

    /// Copy the pairing command to the clipboard
    ///
    /// Returns the copied command, or `None` when no code is active.
    ///
    /// # Errors
    /// Returns `InviteError::Clipboard` if the write fails
    pub fn copy_pair_command(&self) -> Result<Option<String>, InviteError> {
        let Some(command) = self.pair_command() else {
            return Ok(None);
        };
        self.inner.clipboard.write_text(&command)?;
        Ok(Some(command))
    }

    /// Drop the active code before it expires
    pub fn dismiss(&self) {
        self.inner.countdown.cancel();
        self.inner.state.send_modify(|state| {
            state.epoch += 1;
            state.code = None;
            state.seconds_left = 0;
        });
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> OperatorInviteState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OperatorInviteState> {
        self.inner.state.subscribe()
    }

    /// Remaining validity, `m:ss`
    #[must_use]
    pub fn countdown_text(&self) -> String {
        self.inner.state.borrow().countdown_text()
    }

    /// Whether the countdown is running
    #[must_use]
    pub fn is_counting_down(&self) -> bool {
        self.inner.countdown.is_running()
    }
}

impl std::fmt::Debug for OperatorInvite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorInvite")
            .field("canister_id", &self.inner.canister_id)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Drop for OperatorInvite {
    fn drop(&mut self) {
        self.inner.countdown.cancel();
    }
}

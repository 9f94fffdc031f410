//! Guardian invitation lifecycle
//!
//! Issues a guardian invite, counts down its 24h validity and polls the
//! guardian list until the invitee shows up as a new `Pending` entry.
//!
//! # Lifecycle
//!
//! 1. `create_invite` snapshots the current guardians, then asks the engram
//!    for a code
//! 2. On success the countdown (1s) and the acceptance poll (5s) start,
//!    replacing those of any earlier invite
//! 3. The invite ends on expiry (code cleared, poll stopped) or when the
//!    engine is dropped; acceptance only stops the poll

use crate::clipboard::Clipboard;
use crate::countdown::Countdown;
use crate::error::InviteError;
use crate::kind::InviteKind;
use crate::link::GuardianInviteLink;
use crate::progress::{Creating, CreatingGuard};
use engram_core::{
    ActorSource, CanisterId, CanisterResult, EngramConfig, GuardianEntry, GuardianPermissions,
    InviteTiming, Principal, SharedActor, TaskSlot,
};
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use url::Url;

/// Observable state of a guardian invite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardianInviteState {
    /// Active invite code
    pub code: Option<String>,
    /// Last creation failure
    pub error: Option<String>,
    /// Creation in progress
    pub creating: bool,
    /// Seconds until the code expires
    pub seconds_left: u64,
    /// A new guardian redeemed the code
    pub accepted: bool,
    epoch: u64,
}

impl GuardianInviteState {
    /// Remaining validity, `1h 01m` or `m:ss`
    #[must_use]
    pub fn countdown_text(&self) -> String {
        self.kind().countdown_format().render(self.seconds_left)
    }

    /// Always `InviteKind::Guardian`
    #[inline]
    #[must_use]
    pub fn kind(&self) -> InviteKind {
        InviteKind::Guardian
    }

    /// Whether a code is live
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.code.is_some()
    }
}

impl Creating for GuardianInviteState {
    fn set_creating(&mut self, creating: bool) {
        self.creating = creating;
    }
}

/// Guardians known before an invite was issued
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardianSnapshot {
    principals: HashSet<Principal>,
}

impl GuardianSnapshot {
    /// Snapshot every listed principal, whatever its status
    #[must_use]
    pub fn from_entries(entries: &[GuardianEntry]) -> Self {
        Self {
            principals: entries.iter().map(|entry| entry.principal.clone()).collect(),
        }
    }

    /// Whether `principal` was already listed
    #[inline]
    #[must_use]
    pub fn contains(&self, principal: &Principal) -> bool {
        self.principals.contains(principal)
    }

    /// Number of known principals
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    /// Whether no principal was known
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    /// First pending entry that was not listed at snapshot time
    #[must_use]
    pub fn find_newcomer<'a>(&self, entries: &'a [GuardianEntry]) -> Option<&'a GuardianEntry> {
        entries
            .iter()
            .find(|entry| entry.is_pending() && !self.contains(&entry.principal))
    }
}

struct Inner {
    actor: ActorSource,
    canister_id: CanisterId,
    origin: Url,
    timing: InviteTiming,
    clipboard: Arc<dyn Clipboard>,
    state: watch::Sender<GuardianInviteState>,
    countdown: Countdown,
    poll: TaskSlot,
}

impl Inner {
    fn current_actor(&self) -> Option<SharedActor> {
        self.actor.borrow().clone()
    }

    /// Apply `f` only while invite `epoch` is still the current one
    fn update(&self, epoch: u64, f: impl FnOnce(&mut GuardianInviteState)) -> bool {
        self.state.send_if_modified(|state| {
            if state.epoch != epoch {
                return false;
            }
            f(state);
            true
        })
    }

    fn start(self: &Arc<Self>, code: String, snapshot: GuardianSnapshot) {
        let mut epoch = 0;
        self.state.send_modify(|state| {
            state.epoch += 1;
            epoch = state.epoch;
            state.code = Some(code);
            state.accepted = false;
        });

        let on_tick = Arc::downgrade(self);
        let on_expire = Arc::downgrade(self);
        self.countdown.start(
            InviteKind::Guardian.ttl_secs(&self.timing),
            move |left| {
                if let Some(inner) = on_tick.upgrade() {
                    inner.update(epoch, |state| state.seconds_left = left);
                }
            },
            move || {
                if let Some(inner) = on_expire.upgrade() {
                    inner.expire(epoch);
                }
            },
        );
        self.start_polling(epoch, snapshot);
    }

    fn expire(&self, epoch: u64) {
        let expired = self.update(epoch, |state| {
            state.code = None;
            state.accepted = false;
            state.seconds_left = 0;
        });
        if expired {
            self.poll.cancel();
            tracing::info!(canister = %self.canister_id, "guardian invite expired");
        }
    }

    fn start_polling(self: &Arc<Self>, epoch: u64, snapshot: GuardianSnapshot) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.timing.poll_interval();
        self.poll.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.poll_once(epoch, &snapshot).await {
                    break;
                }
            }
        });
    }

    /// One acceptance check; returns `true` when polling should stop
    async fn poll_once(&self, epoch: u64, snapshot: &GuardianSnapshot) -> bool {
        let (stale, accepted) = {
            let state = self.state.borrow();
            (state.epoch != epoch, state.accepted)
        };
        if stale || accepted {
            return true;
        }
        let Some(actor) = self.current_actor() else {
            return false;
        };

        match actor.list_guardians().await {
            Ok(entries) => match snapshot.find_newcomer(&entries) {
                Some(newcomer) => {
                    if self.update(epoch, |state| state.accepted = true) {
                        tracing::info!(
                            canister = %self.canister_id,
                            guardian = %newcomer.principal,
                            "guardian invite accepted"
                        );
                    }
                    true
                }
                None => false,
            },
            Err(error) => {
                tracing::debug!(%error, "guardian poll failed, retrying next tick");
                false
            }
        }
    }

    fn teardown(&self) {
        self.countdown.cancel();
        self.poll.cancel();
    }
}

/// Guardian invite engine for one engram
///
/// Dropping the engine cancels its countdown and poll.
pub struct GuardianInvite {
    inner: Arc<Inner>,
}

impl GuardianInvite {
    /// Create engine inviting guardians to `canister_id`
    ///
    /// Links are built on `origin`; timing defaults to a 24h validity, 1s
    /// countdown steps and a 5s acceptance poll.
    #[must_use]
    pub fn new(
        actor: ActorSource,
        canister_id: CanisterId,
        origin: Url,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self::build(actor, canister_id, origin, clipboard, InviteTiming::default())
    }

    /// Create engine from client configuration
    ///
    /// # Errors
    /// Returns `InviteError::InvalidOrigin` if `app_origin` is not a URL
    pub fn from_config(
        actor: ActorSource,
        canister_id: CanisterId,
        config: &EngramConfig,
        clipboard: Arc<dyn Clipboard>,
    ) -> Result<Self, InviteError> {
        let origin = Url::parse(&config.app_origin).map_err(|e| InviteError::InvalidOrigin {
            origin: config.app_origin.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self::build(actor, canister_id, origin, clipboard, config.invites))
    }

    /// With custom timing
    #[must_use]
    pub fn with_timing(self, timing: InviteTiming) -> Self {
        let inner = &self.inner;
        Self::build(
            inner.actor.clone(),
            inner.canister_id.clone(),
            inner.origin.clone(),
            inner.clipboard.clone(),
            timing,
        )
    }

    fn build(
        actor: ActorSource,
        canister_id: CanisterId,
        origin: Url,
        clipboard: Arc<dyn Clipboard>,
        timing: InviteTiming,
    ) -> Self {
        let (state, _) = watch::channel(GuardianInviteState::default());
        Self {
            inner: Arc::new(Inner {
                actor,
                canister_id,
                origin,
                timing,
                clipboard,
                state,
                countdown: Countdown::new(timing.tick_interval()),
                poll: TaskSlot::new(),
            }),
        }
    }

    /// Issue a new guardian invite
    ///
    /// Silently does nothing while no actor is connected. Outcomes land in
    /// the state: a code with running countdown and poll, or an error
    /// message. `creating` is false again once this returns or is dropped.
    #[tracing::instrument(skip(self, permissions), fields(canister = %self.inner.canister_id))]
    pub async fn create_invite(&self, name: &str, permissions: GuardianPermissions) {
        let inner = &self.inner;
        let Some(actor) = inner.current_actor() else {
            tracing::debug!("no engram actor connected, ignoring guardian invite request");
            return;
        };

        let _creating = CreatingGuard::begin(&inner.state, |state| {
            state.error = None;
            state.accepted = false;
        });

        let snapshot = match actor.list_guardians().await {
            Ok(entries) => GuardianSnapshot::from_entries(&entries),
            Err(error) => {
                tracing::debug!(%error, "guardian snapshot failed, using empty baseline");
                GuardianSnapshot::default()
            }
        };

        match actor.create_guardian_invite(name, &permissions).await {
            Ok(CanisterResult::Ok(code)) => {
                tracing::info!(known_guardians = snapshot.len(), "guardian invite issued");
                inner.start(code, snapshot);
            }
            Ok(CanisterResult::Err(message)) => {
                tracing::warn!(%message, "guardian invite rejected");
                inner.state.send_modify(|state| state.error = Some(message));
            }
            Err(error) => {
                tracing::warn!(%error, "guardian invite call failed");
                inner
                    .state
                    .send_modify(|state| state.error = Some(error.to_string()));
            }
        }
    }

    /// Shareable link for the active code
    #[must_use]
    pub fn invite_link(&self) -> Option<Url> {
        let code = self.inner.state.borrow().code.clone()?;
        let link = GuardianInviteLink::new(self.inner.canister_id.clone(), code);
        Some(link.to_url(&self.inner.origin))
    }

    /// Copy the invite link to the clipboard
    ///
    /// Returns the copied link, or `None` when no code is active.
    ///
    /// # Errors
    /// Returns `InviteError::Clipboard` if the write fails
    pub fn copy_invite_link(&self) -> Result<Option<String>, InviteError> {
        let Some(link) = self.invite_link() else {
            return Ok(None);
        };
        self.inner.clipboard.write_text(link.as_str())?;
        Ok(Some(link.into()))
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> GuardianInviteState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GuardianInviteState> {
        self.inner.state.subscribe()
    }

    /// Remaining validity, `1h 01m` or `m:ss`
    #[must_use]
    pub fn countdown_text(&self) -> String {
        self.inner.state.borrow().countdown_text()
    }

    /// Whether the countdown is running
    #[must_use]
    pub fn is_counting_down(&self) -> bool {
        self.inner.countdown.is_running()
    }

    /// Whether the acceptance poll is running
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.inner.poll.is_active()
    }

    /// Engram the invites target
    #[must_use]
    pub fn canister_id(&self) -> &CanisterId {
        &self.inner.canister_id
    }

    /// Cancel countdown and poll
    ///
    /// The engine stays usable; a later `create_invite` starts fresh timers.
    pub fn shutdown(&self) {
        self.inner.teardown();
    }
}

impl std::fmt::Debug for GuardianInvite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardianInvite")
            .field("canister_id", &self.inner.canister_id)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Drop for GuardianInvite {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

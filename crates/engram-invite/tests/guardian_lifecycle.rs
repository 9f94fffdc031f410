//! Guardian invite lifecycle tests
//!
//! All timing runs on paused tokio time; sleeps end half a second off the
//! tick grid so ordering against timer ticks is unambiguous.

use async_trait::async_trait;
use engram_core::{
    connected, disconnected, ActorError, CanisterResult, EngramActor, GuardianEntry,
    GuardianPermissions, InviteTiming, OperatorPermissions,
};
use engram_invite::{GuardianInvite, GuardianInviteState, MemoryClipboard};
use engram_test_utils::{active, engram_id, pending, ScriptedActor};
use mockall::{mock, Sequence};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;
use url::Url;

fn origin() -> Url {
    Url::parse("https://app.engramx.io").unwrap()
}

fn engine(actor: Arc<ScriptedActor>) -> GuardianInvite {
    GuardianInvite::new(
        connected(actor),
        engram_id(),
        origin(),
        Arc::new(MemoryClipboard::new()),
    )
}

fn short_lived(ttl_secs: u64) -> InviteTiming {
    InviteTiming {
        guardian_ttl_secs: ttl_secs,
        ..InviteTiming::default()
    }
}

fn perms() -> GuardianPermissions {
    GuardianPermissions {
        can_revoke_operators: true,
        can_freeze_payments: false,
        can_pause_writes: true,
    }
}

#[tokio::test(start_paused = true)]
async fn create_issues_code_and_starts_timers() {
    let actor = ScriptedActor::new();
    let invite = engine(actor.clone());

    invite.create_invite("alice", perms()).await;

    let state = invite.state();
    assert_eq!(state.code.as_deref(), Some("code-1"));
    assert_eq!(state.error, None);
    assert!(!state.creating);
    assert!(!state.accepted);
    assert_eq!(state.seconds_left, 86_400);
    assert_eq!(invite.countdown_text(), "24h 00m");
    assert!(invite.is_counting_down());
    assert!(invite.is_polling());
    assert_eq!(actor.guardian_requests(), vec![("alice".to_string(), perms())]);

    sleep(Duration::from_millis(3_600_500)).await;
    assert_eq!(invite.state().seconds_left, 82_800);
    assert_eq!(invite.countdown_text(), "23h 00m");
}

#[tokio::test(start_paused = true)]
async fn countdown_expiry_clears_code_and_stops_polling() {
    let actor = ScriptedActor::new();
    let invite = engine(actor.clone()).with_timing(short_lived(12));

    invite.create_invite("alice", perms()).await;
    sleep(Duration::from_millis(12_500)).await;

    let state = invite.state();
    assert_eq!(state.code, None);
    assert_eq!(state.seconds_left, 0);
    assert!(!invite.is_counting_down());
    assert!(!invite.is_polling());

    // snapshot + polls at 5s and 10s
    assert_eq!(actor.list_calls(), 3);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(actor.list_calls(), 3);
    assert_eq!(invite.state().seconds_left, 0);
}

#[tokio::test(start_paused = true)]
async fn full_day_countdown_expires() {
    let actor = ScriptedActor::new();
    let invite = engine(actor);

    invite.create_invite("alice", perms()).await;
    sleep(Duration::from_millis(86_399_500)).await;
    assert_eq!(invite.state().seconds_left, 1);
    assert_eq!(invite.countdown_text(), "0:01");

    sleep(Duration::from_secs(1)).await;
    assert_eq!(invite.state().code, None);
    assert_eq!(invite.state().seconds_left, 0);
    assert!(!invite.is_counting_down());
}

#[tokio::test(start_paused = true)]
async fn new_pending_guardian_marks_acceptance() {
    let actor = ScriptedActor::with_guardians(vec![active("aaaaa-aa"), pending("bbbbb-bb")]);
    let invite = engine(actor.clone());

    invite.create_invite("carol", perms()).await;
    sleep(Duration::from_millis(5_500)).await;
    assert!(!invite.state().accepted);
    assert!(invite.is_polling());

    actor.push_guardian(pending("ccccc-cc"));
    sleep(Duration::from_secs(5)).await;

    let state = invite.state();
    assert!(state.accepted);
    assert_eq!(state.code.as_deref(), Some("code-1"));
    assert!(!invite.is_polling());
    assert!(invite.is_counting_down());

    let calls = actor.list_calls();
    assert_eq!(calls, 3);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(actor.list_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn new_active_guardian_is_not_acceptance() {
    let actor = ScriptedActor::with_guardians(vec![active("aaaaa-aa"), pending("bbbbb-bb")]);
    let invite = engine(actor.clone());

    invite.create_invite("carol", perms()).await;
    actor.push_guardian(active("ccccc-cc"));
    sleep(Duration::from_millis(10_500)).await;

    assert!(!invite.state().accepted);
    assert!(invite.is_polling());
}

#[tokio::test(start_paused = true)]
async fn expiry_resets_acceptance() {
    let actor = ScriptedActor::new();
    let invite = engine(actor.clone()).with_timing(short_lived(12));

    invite.create_invite("carol", perms()).await;
    actor.push_guardian(pending("ccccc-cc"));
    sleep(Duration::from_millis(5_500)).await;
    assert!(invite.state().accepted);

    sleep(Duration::from_secs(7)).await;
    let state = invite.state();
    assert!(!state.accepted);
    assert_eq!(state.code, None);
}

#[tokio::test(start_paused = true)]
async fn recreating_replaces_countdown_and_poll() {
    let actor = ScriptedActor::new();
    let invite = engine(actor.clone());

    invite.create_invite("alice", perms()).await;
    sleep(Duration::from_millis(2_500)).await;
    invite.create_invite("alice", perms()).await;
    assert_eq!(invite.state().code.as_deref(), Some("code-2"));
    assert_eq!(invite.state().seconds_left, 86_400);

    sleep(Duration::from_secs(20)).await;

    // two snapshots, then the second poll only: 7.5s, 12.5s, 17.5s, 22.5s
    assert_eq!(actor.list_calls(), 6);
    assert_eq!(invite.state().seconds_left, 86_380);
}

#[tokio::test(start_paused = true)]
async fn snapshot_is_rebuilt_for_each_invite() {
    let actor = ScriptedActor::new();
    let invite = engine(actor.clone());

    invite.create_invite("alice", perms()).await;
    actor.push_guardian(pending("ccccc-cc"));
    sleep(Duration::from_millis(5_500)).await;
    assert!(invite.state().accepted);

    // ccccc-cc is part of the new baseline and must not count again
    invite.create_invite("dave", perms()).await;
    assert!(!invite.state().accepted);
    sleep(Duration::from_secs(10)).await;
    assert!(!invite.state().accepted);
    assert!(invite.is_polling());

    actor.push_guardian(pending("ddddd-dd"));
    sleep(Duration::from_secs(5)).await;
    assert!(invite.state().accepted);
}

#[tokio::test(start_paused = true)]
async fn rejected_invite_surfaces_message_without_timers() {
    let actor = ScriptedActor::new();
    actor.reply_next(Ok(CanisterResult::Err("caller is not the owner".to_string())));
    let invite = engine(actor.clone());

    invite.create_invite("alice", perms()).await;

    let state = invite.state();
    assert_eq!(state.code, None);
    assert_eq!(state.error.as_deref(), Some("caller is not the owner"));
    assert!(!state.creating);
    assert!(!invite.is_counting_down());
    assert!(!invite.is_polling());

    sleep(Duration::from_secs(30)).await;
    assert_eq!(actor.list_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_surfaces_message() {
    let actor = ScriptedActor::new();
    actor.reply_next(Err(ActorError::Transport("connection reset".to_string())));
    let invite = engine(actor);

    invite.create_invite("alice", perms()).await;

    let state = invite.state();
    assert_eq!(state.code, None);
    assert_eq!(state.error.as_deref(), Some("transport error: connection reset"));
    assert!(!state.creating);
}

#[tokio::test(start_paused = true)]
async fn next_attempt_clears_previous_error() {
    let actor = ScriptedActor::new();
    actor.reply_next(Ok(CanisterResult::Err("rate limited".to_string())));
    let invite = engine(actor);

    invite.create_invite("alice", perms()).await;
    assert!(invite.state().error.is_some());

    invite.create_invite("alice", perms()).await;
    assert_eq!(invite.state().error, None);
    assert!(invite.state().code.is_some());
}

#[tokio::test(start_paused = true)]
async fn snapshot_failure_fails_open() {
    let actor = ScriptedActor::with_guardians(vec![pending("aaaaa-aa")]);
    actor.fail_listing(true);
    let invite = engine(actor.clone());

    invite.create_invite("alice", perms()).await;
    assert!(invite.state().code.is_some());
    assert_eq!(invite.state().error, None);

    // empty baseline: the already pending entry now reads as a newcomer
    actor.fail_listing(false);
    sleep(Duration::from_millis(5_500)).await;
    assert!(invite.state().accepted);
}

#[tokio::test(start_paused = true)]
async fn poll_errors_are_swallowed() {
    let actor = ScriptedActor::new();
    let invite = engine(actor.clone());

    invite.create_invite("alice", perms()).await;
    actor.fail_listing(true);
    sleep(Duration::from_millis(10_500)).await;

    let state = invite.state();
    assert_eq!(state.error, None);
    assert!(!state.accepted);
    assert!(invite.is_polling());

    actor.fail_listing(false);
    actor.push_guardian(pending("ccccc-cc"));
    sleep(Duration::from_secs(5)).await;
    assert!(invite.state().accepted);
}

#[tokio::test(start_paused = true)]
async fn disconnected_engine_ignores_requests() {
    let invite = GuardianInvite::new(
        disconnected(),
        engram_id(),
        origin(),
        Arc::new(MemoryClipboard::new()),
    );

    invite.create_invite("alice", perms()).await;

    assert_eq!(invite.state(), GuardianInviteState::default());
    assert!(!invite.is_counting_down());
    assert!(!invite.is_polling());
}

#[tokio::test(start_paused = true)]
async fn drop_cancels_countdown_and_poll() {
    let actor = ScriptedActor::new();
    let invite = engine(actor.clone());
    let state = invite.subscribe();

    invite.create_invite("alice", perms()).await;
    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(actor.list_calls(), 2);
    assert_eq!(state.borrow().seconds_left, 86_395);

    drop(invite);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(actor.list_calls(), 2);
    assert_eq!(state.borrow().seconds_left, 86_395);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_timers_but_keeps_state() {
    let actor = ScriptedActor::new();
    let invite = engine(actor.clone());

    invite.create_invite("alice", perms()).await;
    sleep(Duration::from_millis(2_500)).await;
    invite.shutdown();
    sleep(Duration::from_secs(30)).await;

    assert_eq!(invite.state().seconds_left, 86_398);
    assert_eq!(actor.list_calls(), 1);
    assert!(!invite.is_counting_down());
    assert!(!invite.is_polling());
}

#[tokio::test(start_paused = true)]
async fn copy_invite_link_requires_code() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let invite = GuardianInvite::new(
        connected(ScriptedActor::new()),
        engram_id(),
        origin(),
        clipboard.clone(),
    );

    assert_eq!(invite.copy_invite_link().unwrap(), None);
    assert_eq!(clipboard.contents(), None);

    invite.create_invite("alice", perms()).await;
    let copied = invite.copy_invite_link().unwrap().unwrap();
    assert_eq!(
        copied,
        "https://app.engramx.io/guardian-invite?engram=rrkah-fqaaa-aaaaa-aaaaq-cai&code=code-1"
    );
    assert_eq!(clipboard.contents(), Some(copied));
}

/// Actor whose listing blocks until released
struct GatedActor {
    gate: Notify,
}

#[async_trait]
impl EngramActor for GatedActor {
    async fn list_guardians(&self) -> Result<Vec<GuardianEntry>, ActorError> {
        self.gate.notified().await;
        Ok(Vec::new())
    }

    async fn create_guardian_invite(
        &self,
        _name: &str,
        _permissions: &GuardianPermissions,
    ) -> Result<CanisterResult<String>, ActorError> {
        Ok(CanisterResult::Ok("gated".to_string()))
    }

    async fn create_operator_invite(
        &self,
        _name: &str,
        _permissions: &OperatorPermissions,
    ) -> Result<CanisterResult<String>, ActorError> {
        Ok(CanisterResult::Err("unused".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn creating_flag_spans_the_call() {
    let actor = Arc::new(GatedActor { gate: Notify::new() });
    let invite = Arc::new(GuardianInvite::new(
        connected(actor.clone()),
        engram_id(),
        origin(),
        Arc::new(MemoryClipboard::new()),
    ));

    let task = tokio::spawn({
        let invite = invite.clone();
        async move { invite.create_invite("alice", perms()).await }
    });
    tokio::task::yield_now().await;
    assert!(invite.state().creating);

    actor.gate.notify_one();
    task.await.unwrap();
    assert!(!invite.state().creating);
    assert_eq!(invite.state().code.as_deref(), Some("gated"));
}

#[tokio::test(start_paused = true)]
async fn creating_flag_cleared_when_call_is_cancelled() {
    let actor = Arc::new(GatedActor { gate: Notify::new() });
    let invite = Arc::new(GuardianInvite::new(
        connected(actor),
        engram_id(),
        origin(),
        Arc::new(MemoryClipboard::new()),
    ));

    let task = tokio::spawn({
        let invite = invite.clone();
        async move { invite.create_invite("alice", perms()).await }
    });
    tokio::task::yield_now().await;
    assert!(invite.state().creating);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert!(!invite.state().creating);
    assert_eq!(invite.state().code, None);
}

mock! {
    Engram {}

    #[async_trait]
    impl EngramActor for Engram {
        async fn list_guardians(&self) -> Result<Vec<GuardianEntry>, ActorError>;
        async fn create_guardian_invite(
            &self,
            name: &str,
            permissions: &GuardianPermissions,
        ) -> Result<CanisterResult<String>, ActorError>;
        async fn create_operator_invite(
            &self,
            name: &str,
            permissions: &OperatorPermissions,
        ) -> Result<CanisterResult<String>, ActorError>;
    }
}

#[tokio::test(start_paused = true)]
async fn snapshot_precedes_create_call() {
    let mut mock = MockEngram::new();
    let mut seq = Sequence::new();
    mock.expect_list_guardians()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(vec![active("aaaaa-aa")]));
    mock.expect_create_guardian_invite()
        .withf(|name, permissions| name == "alice" && *permissions == perms())
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(CanisterResult::Ok("GRD-1".to_string())));

    let invite = GuardianInvite::new(
        connected(Arc::new(mock)),
        engram_id(),
        origin(),
        Arc::new(MemoryClipboard::new()),
    );
    invite.create_invite("alice", perms()).await;
    assert_eq!(invite.state().code.as_deref(), Some("GRD-1"));
}

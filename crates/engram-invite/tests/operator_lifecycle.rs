//! Operator pairing code lifecycle tests

use async_trait::async_trait;
use engram_core::{
    connected, disconnected, ActorError, CanisterResult, EngramActor, EngramConfig,
    GuardianEntry, GuardianPermissions, OperatorPermissions,
};
use engram_invite::{MemoryClipboard, OperatorInvite, OperatorInviteState};
use engram_test_utils::{engram_id, ScriptedActor};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn engine(actor: Arc<ScriptedActor>) -> OperatorInvite {
    OperatorInvite::new(connected(actor), engram_id(), Arc::new(MemoryClipboard::new()))
}

#[tokio::test(start_paused = true)]
async fn create_issues_code_with_default_bundle() {
    let actor = ScriptedActor::new();
    let invite = engine(actor.clone());

    invite.create_invite("ci-bot").await;

    let state = invite.state();
    assert_eq!(state.code.as_deref(), Some("code-1"));
    assert_eq!(state.seconds_left, 300);
    assert!(!state.creating);
    assert_eq!(invite.countdown_text(), "5:00");
    assert!(invite.is_counting_down());
    assert_eq!(
        actor.operator_requests(),
        vec![("ci-bot".to_string(), OperatorPermissions::default_bundle())]
    );
    // operators are never polled for
    assert_eq!(actor.list_calls(), 0);

    sleep(Duration::from_millis(65_500)).await;
    assert_eq!(invite.countdown_text(), "3:55");
}

#[tokio::test(start_paused = true)]
async fn code_expires_after_five_minutes() {
    let invite = engine(ScriptedActor::new());

    invite.create_invite("ci-bot").await;
    sleep(Duration::from_millis(299_500)).await;
    assert_eq!(invite.state().seconds_left, 1);
    assert!(invite.state().is_active());

    sleep(Duration::from_secs(1)).await;
    let state = invite.state();
    assert_eq!(state.code, None);
    assert_eq!(state.seconds_left, 0);
    assert_eq!(invite.countdown_text(), "0:00");
    assert!(!invite.is_counting_down());
}

#[tokio::test(start_paused = true)]
async fn dismiss_stops_countdown() {
    let invite = engine(ScriptedActor::new());

    invite.create_invite("ci-bot").await;
    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(invite.state().seconds_left, 290);

    invite.dismiss();
    assert_eq!(invite.state().code, None);
    assert_eq!(invite.state().seconds_left, 0);
    assert!(!invite.is_counting_down());

    sleep(Duration::from_secs(400)).await;
    assert_eq!(invite.state().code, None);
    assert_eq!(invite.state().seconds_left, 0);
}

#[tokio::test(start_paused = true)]
async fn dismiss_without_code_is_harmless() {
    let invite = engine(ScriptedActor::new());
    invite.dismiss();
    invite.dismiss();
    assert_eq!(invite.state().code, None);
}

#[tokio::test(start_paused = true)]
async fn recreating_restarts_countdown() {
    let invite = engine(ScriptedActor::new());

    invite.create_invite("ci-bot").await;
    sleep(Duration::from_millis(100_500)).await;
    invite.create_invite("ci-bot").await;
    assert_eq!(invite.state().code.as_deref(), Some("code-2"));
    assert_eq!(invite.state().seconds_left, 300);

    // past the point where the first code would have expired
    sleep(Duration::from_secs(200)).await;
    assert_eq!(invite.state().code.as_deref(), Some("code-2"));
    assert_eq!(invite.state().seconds_left, 100);
}

#[tokio::test(start_paused = true)]
async fn rejected_invite_sets_error() {
    let actor = ScriptedActor::new();
    actor.reply_next(Ok(CanisterResult::Err("operator limit reached".to_string())));
    let invite = engine(actor);

    invite.create_invite("ci-bot").await;

    let state = invite.state();
    assert_eq!(state.code, None);
    assert_eq!(state.error.as_deref(), Some("operator limit reached"));
    assert!(!state.creating);
    assert!(!invite.is_counting_down());
}

#[tokio::test(start_paused = true)]
async fn transport_failure_sets_error_then_clears() {
    let actor = ScriptedActor::new();
    actor.reply_next(Err(ActorError::Unauthorized("delegation expired".to_string())));
    let invite = engine(actor);

    invite.create_invite("ci-bot").await;
    assert_eq!(
        invite.state().error.as_deref(),
        Some("unauthorized: delegation expired")
    );

    invite.create_invite("ci-bot").await;
    assert_eq!(invite.state().error, None);
    assert!(invite.state().is_active());
}

#[tokio::test(start_paused = true)]
async fn disconnected_engine_ignores_requests() {
    let invite = OperatorInvite::new(
        disconnected(),
        engram_id(),
        Arc::new(MemoryClipboard::new()),
    );

    invite.create_invite("ci-bot").await;
    assert_eq!(invite.state(), OperatorInviteState::default());
    assert_eq!(invite.pair_command(), None);
}

#[tokio::test(start_paused = true)]
async fn pair_command_uses_configured_program() {
    let clipboard = Arc::new(MemoryClipboard::new());
    let config = EngramConfig {
        pair_program: "engramx-cli".to_string(),
        ..EngramConfig::default()
    };
    let invite = OperatorInvite::from_config(
        connected(ScriptedActor::new()),
        engram_id(),
        &config,
        clipboard.clone(),
    );

    assert_eq!(invite.copy_pair_command().unwrap(), None);

    invite.create_invite("ci-bot").await;
    let command = invite.copy_pair_command().unwrap().unwrap();
    assert_eq!(
        command,
        "engramx-cli pair code-1 --engram rrkah-fqaaa-aaaaa-aaaaq-cai"
    );
    assert_eq!(clipboard.contents(), Some(command));
}

#[tokio::test(start_paused = true)]
async fn default_pair_program() {
    let invite = engine(ScriptedActor::new());
    invite.create_invite("ci-bot").await;
    assert_eq!(
        invite.pair_command().as_deref(),
        Some("npx @engramx/client pair code-1 --engram rrkah-fqaaa-aaaaa-aaaaq-cai")
    );
}

#[tokio::test(start_paused = true)]
async fn drop_stops_countdown() {
    let invite = engine(ScriptedActor::new());
    let state = invite.subscribe();

    invite.create_invite("ci-bot").await;
    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(state.borrow().seconds_left, 298);

    drop(invite);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(state.borrow().seconds_left, 298);
    assert!(state.borrow().code.is_some());
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
async fn sends_default_bundle_only() {
    let mut mock = MockEngram::new();
    mock.expect_create_operator_invite()
        .withf(|name, permissions| {
            name == "ci-bot"
                && permissions.can_append_memory
                && !permissions.can_transfer_funds
                && permissions.calls_per_minute == 120
                && permissions.max_session_ttl_nanos == 86_400_000_000_000
        })
        .times(1)
        .returning(|_, _| Ok(CanisterResult::Ok("OPR-000001".to_string())));
    mock.expect_list_guardians().never();

    let invite = OperatorInvite::new(
        connected(Arc::new(mock)),
        engram_id(),
        Arc::new(MemoryClipboard::new()),
    );
    invite.create_invite("ci-bot").await;
    assert_eq!(invite.state().code.as_deref(), Some("OPR-000001"));
}

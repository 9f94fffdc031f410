//! Registry client tests

use engram_core::{ActorError, CanisterResult, EngramRecord, SharedRegistry};
use engram_session::{RegistryClient, SessionError};
use engram_test_utils::{engram_id, principal, ScriptedActor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

fn record() -> EngramRecord {
    EngramRecord {
        canister_id: engram_id(),
        owner: principal("aaaaa-aa"),
        created_at_nanos: 1_700_000_000_000_000_000,
    }
}

fn bound(actor: &Arc<ScriptedActor>) -> (watch::Sender<Option<SharedRegistry>>, RegistryClient) {
    let (source, source_rx) = watch::channel(Some(actor.clone() as SharedRegistry));
    (source, RegistryClient::spawn(source_rx))
}

async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn fetches_when_registry_is_bound() {
    let actor = ScriptedActor::new();
    actor.set_engram(Some(record()));
    let (_source, client) = bound(&actor);
    settle().await;

    let state = client.state();
    assert_eq!(state.engram, Some(record()));
    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert_eq!(actor.registry_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn clears_when_registry_goes_away() {
    let actor = ScriptedActor::new();
    actor.set_engram(Some(record()));
    let (source, client) = bound(&actor);
    settle().await;
    assert!(client.engram().is_some());

    source.send_replace(None);
    settle().await;
    assert_eq!(client.engram(), None);
    assert!(!client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn disconnected_fetch_is_noop() {
    let (_source, source_rx) = watch::channel(None::<SharedRegistry>);
    let client = RegistryClient::spawn(source_rx);
    settle().await;

    client.fetch_my_engram().await;
    assert_eq!(client.state().engram, None);
    assert!(!client.state().loading);
}

#[tokio::test(start_paused = true)]
async fn disconnected_create_fails() {
    let (_source, source_rx) = watch::channel(None::<SharedRegistry>);
    let client = RegistryClient::spawn(source_rx);

    let error = client.create_engram().await.unwrap_err();
    assert!(matches!(error, SessionError::NotConnected));
}

#[tokio::test(start_paused = true)]
async fn create_refetches() {
    let actor = ScriptedActor::new();
    let (_source, client) = bound(&actor);
    settle().await;
    assert_eq!(client.engram(), None);

    actor.set_engram(Some(record()));
    let created = client.create_engram().await.unwrap();

    assert_eq!(created, engram_id());
    assert_eq!(client.engram(), Some(record()));
    assert!(!client.state().loading);
    assert_eq!(actor.registry_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn rejected_create_keeps_message() {
    let actor = ScriptedActor::new();
    actor.reply_next_create_engram(Ok(CanisterResult::Err("engram already exists".into())));
    let (_source, client) = bound(&actor);
    settle().await;

    let error = client.create_engram().await.unwrap_err();
    assert!(matches!(&error, SessionError::Rejected(m) if m == "engram already exists"));
    assert_eq!(client.state().error.as_deref(), Some("engram already exists"));
    assert!(!client.state().loading);
}

#[tokio::test(start_paused = true)]
async fn failed_create_keeps_transport_message() {
    let actor = ScriptedActor::new();
    actor.reply_next_create_engram(Err(ActorError::Transport("replica unreachable".into())));
    let (_source, client) = bound(&actor);
    settle().await;

    let error = client.create_engram().await.unwrap_err();
    assert!(matches!(error, SessionError::Actor(_)));
    assert_eq!(
        client.state().error.as_deref(),
        Some("transport error: replica unreachable")
    );

    client.fetch_my_engram().await;
    assert_eq!(client.state().error, None);
}

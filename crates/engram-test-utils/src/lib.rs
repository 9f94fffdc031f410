//! Testing utilities for the engramx workspace
//!
//! Scripted actors, auth clients and factories with call counters, plus
//! fixtures for principals and canister ids.

#![allow(missing_docs)]

use async_trait::async_trait;
use engram_core::{
    ActorError, ActorFactory, AuthClient, AuthError, CanisterId, CanisterResult, EngramActor,
    EngramRecord, GuardianEntry, GuardianPermissions, GuardianStatus, Identity, LoginOptions,
    OperatorPermissions, Principal, RegistryActor, SharedActor, SharedRegistry,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const ENGRAM_ID: &str = "rrkah-fqaaa-aaaaa-aaaaq-cai";
pub const OTHER_ENGRAM_ID: &str = "ryjl3-tyaaa-aaaaa-aaaba-cai";

pub fn principal(text: &str) -> Principal {
    Principal::parse(text).unwrap()
}

pub fn engram_id() -> CanisterId {
    CanisterId::parse(ENGRAM_ID).unwrap()
}

pub fn other_engram_id() -> CanisterId {
    CanisterId::parse(OTHER_ENGRAM_ID).unwrap()
}

pub fn identity(text: &str) -> Identity {
    Identity::new(principal(text))
}

pub fn pending(text: &str) -> GuardianEntry {
    GuardianEntry::new(principal(text), GuardianStatus::Pending)
}

pub fn active(text: &str) -> GuardianEntry {
    GuardianEntry::new(principal(text), GuardianStatus::Active)
}

/// Engram and registry actor driven by the test
///
/// Invite calls answer from a reply queue, falling back to sequential codes
/// (`code-1`, `code-2`, ...). Listing returns the current guardian list
/// unless listing failures are switched on.
#[derive(Debug, Default)]
pub struct ScriptedActor {
    guardians: Mutex<Vec<GuardianEntry>>,
    fail_listing: AtomicBool,
    replies: Mutex<VecDeque<Result<CanisterResult<String>, ActorError>>>,
    guardian_requests: Mutex<Vec<(String, GuardianPermissions)>>,
    operator_requests: Mutex<Vec<(String, OperatorPermissions)>>,
    engram: Mutex<Option<EngramRecord>>,
    create_engram_replies: Mutex<VecDeque<Result<CanisterResult<CanisterId>, ActorError>>>,
    list_calls: AtomicUsize,
    registry_calls: AtomicUsize,
    issued: AtomicUsize,
}

impl ScriptedActor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_guardians(guardians: Vec<GuardianEntry>) -> Arc<Self> {
        let actor = Self::default();
        *actor.guardians.lock() = guardians;
        Arc::new(actor)
    }

    pub fn set_guardians(&self, guardians: Vec<GuardianEntry>) {
        *self.guardians.lock() = guardians;
    }

    pub fn push_guardian(&self, entry: GuardianEntry) {
        self.guardians.lock().push(entry);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Queue the reply of the next invite call
    pub fn reply_next(&self, reply: Result<CanisterResult<String>, ActorError>) {
        self.replies.lock().push_back(reply);
    }

    pub fn set_engram(&self, record: Option<EngramRecord>) {
        *self.engram.lock() = record;
    }

    pub fn reply_next_create_engram(&self, reply: Result<CanisterResult<CanisterId>, ActorError>) {
        self.create_engram_replies.lock().push_back(reply);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn registry_calls(&self) -> usize {
        self.registry_calls.load(Ordering::SeqCst)
    }

    pub fn guardian_requests(&self) -> Vec<(String, GuardianPermissions)> {
        self.guardian_requests.lock().clone()
    }

    pub fn operator_requests(&self) -> Vec<(String, OperatorPermissions)> {
        self.operator_requests.lock().clone()
    }

    fn next_reply(&self) -> Result<CanisterResult<String>, ActorError> {
        self.replies.lock().pop_front().unwrap_or_else(|| {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(CanisterResult::Ok(format!("code-{n}")))
        })
    }
}

#[async_trait]
impl EngramActor for ScriptedActor {
    async fn list_guardians(&self) -> Result<Vec<GuardianEntry>, ActorError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ActorError::Transport("listing unavailable".to_string()));
        }
        Ok(self.guardians.lock().clone())
    }

    async fn create_guardian_invite(
        &self,
        name: &str,
        permissions: &GuardianPermissions,
    ) -> Result<CanisterResult<String>, ActorError> {
        self.guardian_requests
            .lock()
            .push((name.to_string(), *permissions));
        self.next_reply()
    }

    async fn create_operator_invite(
        &self,
        name: &str,
        permissions: &OperatorPermissions,
    ) -> Result<CanisterResult<String>, ActorError> {
        self.operator_requests
            .lock()
            .push((name.to_string(), permissions.clone()));
        self.next_reply()
    }
}

#[async_trait]
impl RegistryActor for ScriptedActor {
    async fn get_my_engram(&self) -> Result<Option<EngramRecord>, ActorError> {
        self.registry_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.engram.lock().clone())
    }

    async fn create_engram(&self) -> Result<CanisterResult<CanisterId>, ActorError> {
        let reply = self.create_engram_replies.lock().pop_front();
        match reply {
            Some(reply) => reply,
            None => Ok(CanisterResult::Ok(engram_id())),
        }
    }
}

/// Auth client with a scripted stored session and login outcome
#[derive(Debug, Default)]
pub struct ScriptedAuth {
    stored: Mutex<Option<Identity>>,
    login_result: Mutex<Option<Result<Identity, AuthError>>>,
    logins: Mutex<Vec<LoginOptions>>,
    checks: AtomicUsize,
    logouts: AtomicUsize,
}

impl ScriptedAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Client that already holds a valid delegation for `identity`
    pub fn signed_in(identity: Identity) -> Arc<Self> {
        let auth = Self::default();
        *auth.stored.lock() = Some(identity);
        Arc::new(auth)
    }

    pub fn set_login_result(&self, result: Result<Identity, AuthError>) {
        *self.login_result.lock() = Some(result);
    }

    pub fn logins(&self) -> Vec<LoginOptions> {
        self.logins.lock().clone()
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthClient for ScriptedAuth {
    async fn is_authenticated(&self) -> Result<bool, AuthError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.stored.lock().is_some())
    }

    async fn identity(&self) -> Result<Option<Identity>, AuthError> {
        Ok(self.stored.lock().clone())
    }

    async fn login(&self, options: &LoginOptions) -> Result<Identity, AuthError> {
        self.logins.lock().push(options.clone());
        let result = self
            .login_result
            .lock()
            .clone()
            .unwrap_or_else(|| Err(AuthError::LoginFailed("no login scripted".to_string())));
        if let Ok(identity) = &result {
            *self.stored.lock() = Some(identity.clone());
        }
        result
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock() = None;
        Ok(())
    }
}

/// Factory handing out one shared `ScriptedActor` and recording bindings
#[derive(Debug, Default)]
pub struct ScriptedFactory {
    actor: Arc<ScriptedActor>,
    engram_bindings: Mutex<Vec<(Principal, CanisterId)>>,
    registry_bindings: Mutex<Vec<Principal>>,
}

impl ScriptedFactory {
    pub fn new(actor: Arc<ScriptedActor>) -> Arc<Self> {
        Arc::new(Self {
            actor,
            ..Self::default()
        })
    }

    pub fn actor(&self) -> &Arc<ScriptedActor> {
        &self.actor
    }

    pub fn engram_bindings(&self) -> Vec<(Principal, CanisterId)> {
        self.engram_bindings.lock().clone()
    }

    pub fn registry_bindings(&self) -> Vec<Principal> {
        self.registry_bindings.lock().clone()
    }
}

impl ActorFactory for ScriptedFactory {
    fn engram_actor(&self, identity: &Identity, canister_id: &CanisterId) -> SharedActor {
        self.engram_bindings
            .lock()
            .push((identity.principal().clone(), canister_id.clone()));
        self.actor.clone()
    }

    fn registry_actor(&self, identity: &Identity) -> SharedRegistry {
        self.registry_bindings
            .lock()
            .push(identity.principal().clone());
        self.actor.clone()
    }
}

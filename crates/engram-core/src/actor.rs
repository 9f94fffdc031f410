//! Typed actor interfaces
//!
//! Each trait enumerates exactly the canister methods the client relies on.
//! Implementations wrap a real agent, an in-memory backend or a test double.

use crate::error::ActorError;
use crate::types::{
    CanisterId, CanisterResult, EngramRecord, GuardianEntry, GuardianPermissions, Identity,
    OperatorPermissions,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Methods of an engram canister used by the invitation engines
#[async_trait]
pub trait EngramActor: Send + Sync {
    /// List guardians with their status
    async fn list_guardians(&self) -> Result<Vec<GuardianEntry>, ActorError>;

    /// Issue a guardian invite code
    async fn create_guardian_invite(
        &self,
        name: &str,
        permissions: &GuardianPermissions,
    ) -> Result<CanisterResult<String>, ActorError>;

    /// Issue an operator pairing code
    async fn create_operator_invite(
        &self,
        name: &str,
        permissions: &OperatorPermissions,
    ) -> Result<CanisterResult<String>, ActorError>;
}

/// Methods of the registry canister
#[async_trait]
pub trait RegistryActor: Send + Sync {
    /// Engram owned by the caller, if any
    async fn get_my_engram(&self) -> Result<Option<EngramRecord>, ActorError>;

    /// Provision a new engram for the caller
    async fn create_engram(&self) -> Result<CanisterResult<CanisterId>, ActorError>;
}

/// Shared handle to an engram actor
pub type SharedActor = Arc<dyn EngramActor>;

/// Shared handle to a registry actor
pub type SharedRegistry = Arc<dyn RegistryActor>;

/// Current engram actor, `None` while identity or target is unresolved
pub type ActorSource = watch::Receiver<Option<SharedActor>>;

/// Source that stays bound to `actor`
#[must_use]
pub fn connected(actor: SharedActor) -> ActorSource {
    watch::channel(Some(actor)).1
}

/// Source with no actor bound
#[must_use]
pub fn disconnected() -> ActorSource {
    watch::channel(None).1
}

/// Builds actors bound to an identity
pub trait ActorFactory: Send + Sync {
    /// Actor for one engram canister
    fn engram_actor(&self, identity: &Identity, canister_id: &CanisterId) -> SharedActor;

    /// Actor for the registry canister
    fn registry_actor(&self, identity: &Identity) -> SharedRegistry;
}

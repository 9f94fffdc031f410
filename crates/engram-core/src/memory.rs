//! In-memory engram backend
//!
//! A process-local stand-in for the engram and registry canisters. It issues
//! invite codes, records guardians and lets a caller play the invitee side
//! (`accept_guardian_invite`) so invitation lifecycles can run end to end
//! without a replica.

use crate::actor::{EngramActor, RegistryActor};
use crate::error::ActorError;
use crate::types::{
    CanisterId, CanisterResult, EngramRecord, GuardianEntry, GuardianPermissions,
    GuardianStatus, OperatorPermissions, Principal,
};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Invite recorded by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedInvite<P> {
    pub code: String,
    pub name: String,
    pub permissions: P,
    pub redeemed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    guardians: Vec<GuardianEntry>,
    guardian_invites: Vec<IssuedInvite<GuardianPermissions>>,
    operator_invites: Vec<IssuedInvite<OperatorPermissions>>,
    engram: Option<EngramRecord>,
    next_code: u64,
    offline: bool,
}

impl Inner {
    fn next_code(&mut self, prefix: &str) -> String {
        self.next_code += 1;
        format!("{prefix}-{:06}", self.next_code)
    }

    fn reachable(&self) -> Result<(), ActorError> {
        if self.offline {
            Err(ActorError::Transport("replica unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// In-memory engram and registry canister
#[derive(Debug)]
pub struct InMemoryEngram {
    owner: Principal,
    canister_id: CanisterId,
    inner: Mutex<Inner>,
}

impl InMemoryEngram {
    /// Create backend for an engram owned by `owner`
    #[must_use]
    pub fn new(owner: Principal, canister_id: CanisterId) -> Self {
        Self {
            owner,
            canister_id,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Engram canister id
    #[inline]
    #[must_use]
    pub fn canister_id(&self) -> &CanisterId {
        &self.canister_id
    }

    /// Simulate an unreachable replica
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Redeem a guardian invite as `guardian`
    ///
    /// The guardian is listed as `Pending` until the owner activates it.
    ///
    /// # Errors
    /// Returns the rejection message for unknown or already redeemed codes.
    pub fn accept_guardian_invite(&self, code: &str, guardian: Principal) -> Result<(), String> {
        let mut inner = self.inner.lock();
        let invite = inner
            .guardian_invites
            .iter_mut()
            .find(|invite| invite.code == code)
            .ok_or_else(|| format!("unknown invite code {code}"))?;
        if invite.redeemed {
            return Err(format!("invite {code} already redeemed"));
        }
        invite.redeemed = true;
        inner
            .guardians
            .push(GuardianEntry::new(guardian, GuardianStatus::Pending));
        Ok(())
    }

    /// Confirm a pending guardian
    ///
    /// Returns `false` if no pending entry exists for `guardian`.
    pub fn activate_guardian(&self, guardian: &Principal) -> bool {
        let mut inner = self.inner.lock();
        match inner
            .guardians
            .iter_mut()
            .find(|entry| &entry.principal == guardian && entry.is_pending())
        {
            Some(entry) => {
                entry.status = GuardianStatus::Active;
                true
            }
            None => false,
        }
    }

    /// Guardian invites issued so far
    #[must_use]
    pub fn guardian_invites(&self) -> Vec<IssuedInvite<GuardianPermissions>> {
        self.inner.lock().guardian_invites.clone()
    }

    /// Operator invites issued so far
    #[must_use]
    pub fn operator_invites(&self) -> Vec<IssuedInvite<OperatorPermissions>> {
        self.inner.lock().operator_invites.clone()
    }
}

#[async_trait]
impl EngramActor for InMemoryEngram {
    async fn list_guardians(&self) -> Result<Vec<GuardianEntry>, ActorError> {
        let inner = self.inner.lock();
        inner.reachable()?;
        Ok(inner.guardians.clone())
    }

    async fn create_guardian_invite(
        &self,
        name: &str,
        permissions: &GuardianPermissions,
    ) -> Result<CanisterResult<String>, ActorError> {
        let mut inner = self.inner.lock();
        inner.reachable()?;
        if name.trim().is_empty() {
            return Ok(CanisterResult::Err("guardian name must not be empty".into()));
        }
        let code = inner.next_code("GRD");
        inner.guardian_invites.push(IssuedInvite {
            code: code.clone(),
            name: name.to_string(),
            permissions: *permissions,
            redeemed: false,
        });
        Ok(CanisterResult::Ok(code))
    }

    async fn create_operator_invite(
        &self,
        name: &str,
        permissions: &OperatorPermissions,
    ) -> Result<CanisterResult<String>, ActorError> {
        let mut inner = self.inner.lock();
        inner.reachable()?;
        if name.trim().is_empty() {
            return Ok(CanisterResult::Err("operator name must not be empty".into()));
        }
        let code = inner.next_code("OPR");
        inner.operator_invites.push(IssuedInvite {
            code: code.clone(),
            name: name.to_string(),
            permissions: permissions.clone(),
            redeemed: false,
        });
        Ok(CanisterResult::Ok(code))
    }
}

#[async_trait]
impl RegistryActor for InMemoryEngram {
    async fn get_my_engram(&self) -> Result<Option<EngramRecord>, ActorError> {
        let inner = self.inner.lock();
        inner.reachable()?;
        Ok(inner.engram.clone())
    }

    async fn create_engram(&self) -> Result<CanisterResult<CanisterId>, ActorError> {
        let mut inner = self.inner.lock();
        inner.reachable()?;
        if inner.engram.is_some() {
            return Ok(CanisterResult::Err("engram already exists".into()));
        }
        inner.engram = Some(EngramRecord {
            canister_id: self.canister_id.clone(),
            owner: self.owner.clone(),
            created_at_nanos: 0,
        });
        Ok(CanisterResult::Ok(self.canister_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> InMemoryEngram {
        InMemoryEngram::new(
            Principal::parse("aaaaa-aa").unwrap(),
            CanisterId::parse("rrkah-fqaaa-aaaaa-aaaaq-cai").unwrap(),
        )
    }

    #[tokio::test]
    async fn issued_guardian_invite_can_be_redeemed_once() {
        let engram = backend();
        let code = engram
            .create_guardian_invite("alice", &GuardianPermissions::all())
            .await
            .unwrap()
            .into_result()
            .unwrap();

        let guardian = Principal::parse("bbbbb-bb").unwrap();
        engram.accept_guardian_invite(&code, guardian.clone()).unwrap();
        assert!(engram.accept_guardian_invite(&code, guardian.clone()).is_err());

        let listed = engram.list_guardians().await.unwrap();
        assert_eq!(listed, vec![GuardianEntry::new(guardian.clone(), GuardianStatus::Pending)]);

        assert!(engram.activate_guardian(&guardian));
        assert!(!engram.activate_guardian(&guardian));
    }

    #[tokio::test]
    async fn empty_name_is_rejected_by_the_canister() {
        let engram = backend();
        let result = engram
            .create_operator_invite("  ", &OperatorPermissions::default())
            .await
            .unwrap();
        assert!(!result.is_ok());
        assert!(engram.operator_invites().is_empty());
    }

    #[tokio::test]
    async fn offline_backend_fails_transport() {
        let engram = backend();
        engram.set_offline(true);
        let err = engram.list_guardians().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn registry_creates_single_engram() {
        let engram = backend();
        assert_eq!(engram.get_my_engram().await.unwrap(), None);

        let created = engram.create_engram().await.unwrap().into_result().unwrap();
        assert_eq!(&created, engram.canister_id());
        assert!(!engram.create_engram().await.unwrap().is_ok());
        assert!(engram.get_my_engram().await.unwrap().is_some());
    }
}

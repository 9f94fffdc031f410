//! Engram registry client
//!
//! Tracks the engram owned by the signed-in user. A watcher fetches it as
//! soon as a registry actor is bound and clears it when the actor goes away.

use crate::connection::RegistrySource;
use crate::error::SessionError;
use crate::progress::{Loading, LoadingGuard};
use engram_core::{CanisterId, CanisterResult, EngramRecord, SharedRegistry, TaskSlot};
use std::sync::Arc;
use tokio::sync::watch;

/// Observable registry state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryState {
    /// Engram owned by the caller
    pub engram: Option<EngramRecord>,
    /// Registry call in flight
    pub loading: bool,
    /// Last failure
    pub error: Option<String>,
}

impl Loading for RegistryState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}

struct Inner {
    registry: RegistrySource,
    state: watch::Sender<RegistryState>,
}

impl Inner {
    fn current(&self) -> Option<SharedRegistry> {
        self.registry.borrow().clone()
    }

    async fn fetch(&self, registry: &SharedRegistry) {
        match registry.get_my_engram().await {
            Ok(engram) => {
                tracing::debug!(found = engram.is_some(), "fetched owned engram");
                self.state.send_modify(|state| state.engram = engram);
            }
            Err(error) => {
                tracing::warn!(%error, "could not fetch owned engram");
                self.state
                    .send_modify(|state| state.error = Some(error.to_string()));
            }
        }
    }

    async fn fetch_guarded(&self) {
        let Some(registry) = self.current() else {
            return;
        };
        let _loading = LoadingGuard::begin(&self.state, |state| state.error = None);
        self.fetch(&registry).await;
    }

    fn clear(&self) {
        self.state.send_if_modified(|state| {
            let changed = state.engram.is_some() || state.error.is_some();
            state.engram = None;
            state.error = None;
            changed
        });
    }
}

/// Registry client following a registry connection
pub struct RegistryClient {
    inner: Arc<Inner>,
    watcher: TaskSlot,
}

impl RegistryClient {
    /// Follow `registry`, fetching whenever an actor is bound
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(registry: RegistrySource) -> Self {
        let (state, _) = watch::channel(RegistryState::default());
        let inner = Arc::new(Inner {
            registry: registry.clone(),
            state,
        });

        let watcher = TaskSlot::new();
        let weak = Arc::downgrade(&inner);
        let mut source = registry;
        watcher.spawn(async move {
            loop {
                let bound = source.borrow_and_update().is_some();
                let Some(inner) = weak.upgrade() else { break };
                if bound {
                    inner.fetch_guarded().await;
                } else {
                    inner.clear();
                }
                drop(inner);
                if source.changed().await.is_err() {
                    break;
                }
            }
        });

        Self { inner, watcher }
    }

    /// Refresh the owned engram; no-op while disconnected
    pub async fn fetch_my_engram(&self) {
        self.inner.fetch_guarded().await;
    }

    /// Provision an engram for the caller, then refresh
    ///
    /// # Errors
    /// - `SessionError::NotConnected` without a registry actor
    /// - `SessionError::Rejected` when the registry refuses
    /// - `SessionError::Actor` when the call fails
    #[tracing::instrument(skip(self))]
    pub async fn create_engram(&self) -> Result<CanisterId, SessionError> {
        let inner = &self.inner;
        let Some(registry) = inner.current() else {
            return Err(SessionError::NotConnected);
        };
        let _loading = LoadingGuard::begin(&inner.state, |state| state.error = None);

        let outcome = match registry.create_engram().await {
            Ok(CanisterResult::Ok(canister_id)) => Ok(canister_id),
            Ok(CanisterResult::Err(message)) => Err(SessionError::Rejected(message)),
            Err(error) => Err(SessionError::Actor(error)),
        };
        match outcome {
            Ok(canister_id) => {
                tracing::info!(%canister_id, "engram created");
                inner.fetch(&registry).await;
                Ok(canister_id)
            }
            Err(error) => {
                tracing::warn!(%error, "engram creation failed");
                inner
                    .state
                    .send_modify(|state| state.error = Some(error.to_string()));
                Err(error)
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> RegistryState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RegistryState> {
        self.inner.state.subscribe()
    }

    /// Engram owned by the caller, if known
    #[must_use]
    pub fn engram(&self) -> Option<EngramRecord> {
        self.inner.state.borrow().engram.clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.registry.borrow().is_some()
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Drop for RegistryClient {
    fn drop(&mut self) {
        self.watcher.cancel();
    }
}

//! Actor connections
//!
//! Rebinds typed actors whenever the signed-in identity (and, for engram
//! actors, the target canister) changes. Each connection runs one watcher
//! task and publishes the current actor through a `watch` channel; `None`
//! means identity or target is unresolved.

use crate::auth::AuthState;
use engram_core::{
    ActorFactory, ActorSource, CanisterId, Identity, SharedActor, SharedRegistry, TaskSlot,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Current registry actor, `None` while signed out
pub type RegistrySource = watch::Receiver<Option<SharedRegistry>>;

/// Engram actor bound to the session identity and a target canister
pub struct EngramConnection {
    actor: Arc<watch::Sender<Option<SharedActor>>>,
    watcher: TaskSlot,
}

impl EngramConnection {
    /// Start watching `auth` and `target`
    ///
    /// Must be called from within a tokio runtime. The watcher stops once
    /// both inputs are closed or the connection is dropped.
    #[must_use]
    pub fn spawn(
        factory: Arc<dyn ActorFactory>,
        mut auth: watch::Receiver<AuthState>,
        mut target: watch::Receiver<Option<CanisterId>>,
    ) -> Self {
        let (actor, _) = watch::channel(None);
        let actor = Arc::new(actor);
        let watcher = TaskSlot::new();

        let publish = actor.clone();
        watcher.spawn(async move {
            let mut bound: Option<(Identity, CanisterId)> = None;
            let (mut auth_open, mut target_open) = (true, true);
            loop {
                let identity = auth.borrow_and_update().identity.clone();
                let canister = target.borrow_and_update().clone();
                let binding = identity.zip(canister);

                if binding != bound {
                    let next = binding.as_ref().map(|(identity, canister)| {
                        tracing::debug!(
                            principal = %identity.principal(),
                            %canister,
                            "binding engram actor"
                        );
                        factory.engram_actor(identity, canister)
                    });
                    publish.send_replace(next);
                    bound = binding;
                }

                tokio::select! {
                    changed = auth.changed(), if auth_open => auth_open = changed.is_ok(),
                    changed = target.changed(), if target_open => target_open = changed.is_ok(),
                    else => break,
                }
            }
        });

        Self { actor, watcher }
    }

    /// Receiver of the current actor, for the invite engines
    #[must_use]
    pub fn actors(&self) -> ActorSource {
        self.actor.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Option<SharedActor> {
        self.actor.borrow().clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.actor.borrow().is_some()
    }
}

impl std::fmt::Debug for EngramConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngramConnection")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Drop for EngramConnection {
    fn drop(&mut self) {
        self.watcher.cancel();
        self.actor.send_replace(None);
    }
}

/// Registry actor bound to the session identity
pub struct RegistryConnection {
    actor: Arc<watch::Sender<Option<SharedRegistry>>>,
    watcher: TaskSlot,
}

impl RegistryConnection {
    /// Start watching `auth`
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(factory: Arc<dyn ActorFactory>, mut auth: watch::Receiver<AuthState>) -> Self {
        let (actor, _) = watch::channel(None);
        let actor = Arc::new(actor);
        let watcher = TaskSlot::new();

        let publish = actor.clone();
        watcher.spawn(async move {
            let mut bound: Option<Identity> = None;
            loop {
                let identity = auth.borrow_and_update().identity.clone();
                if identity != bound {
                    let next = identity.as_ref().map(|identity| {
                        tracing::debug!(principal = %identity.principal(), "binding registry actor");
                        factory.registry_actor(identity)
                    });
                    publish.send_replace(next);
                    bound = identity;
                }
                if auth.changed().await.is_err() {
                    break;
                }
            }
        });

        Self { actor, watcher }
    }

    /// Receiver of the current registry actor
    #[must_use]
    pub fn actors(&self) -> RegistrySource {
        self.actor.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Option<SharedRegistry> {
        self.actor.borrow().clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.actor.borrow().is_some()
    }
}

impl std::fmt::Debug for RegistryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConnection")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Drop for RegistryConnection {
    fn drop(&mut self) {
        self.watcher.cancel();
        self.actor.send_replace(None);
    }
}

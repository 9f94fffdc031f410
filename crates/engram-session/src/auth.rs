//! Authenticated session
//!
//! Wraps an `AuthClient` and publishes the resolved identity through a
//! `watch` channel. Construct one session per application and hand clones of
//! its receiver to whatever needs the identity.

use crate::error::SessionError;
use crate::progress::{Loading, LoadingGuard};
use engram_core::{AuthClient, AuthError, EngramConfig, Identity, LoginOptions, Principal};
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};

/// Observable auth state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    /// Identity of the signed-in user
    pub identity: Option<Identity>,
    /// Restore or login in flight
    pub loading: bool,
}

impl AuthState {
    /// Signed out, nothing in flight
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            identity: None,
            loading: false,
        }
    }

    #[must_use]
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            loading: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.identity.as_ref().map(Identity::principal)
    }
}

/// Sessions start out loading until the stored delegation was checked
impl Default for AuthState {
    fn default() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }
}

impl Loading for AuthState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}

/// Identity session over an auth client
pub struct AuthSession {
    client: Arc<dyn AuthClient>,
    options: LoginOptions,
    state: watch::Sender<AuthState>,
    restored: OnceCell<()>,
}

impl AuthSession {
    /// Default login lifetime (4h)
    pub const DEFAULT_TTL_NANOS: u64 = 4 * 60 * 60 * 1_000_000_000;

    #[must_use]
    pub fn new(client: Arc<dyn AuthClient>, options: LoginOptions) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            client,
            options,
            state,
            restored: OnceCell::new(),
        }
    }

    /// Session logging in against the configured provider
    #[must_use]
    pub fn from_config(client: Arc<dyn AuthClient>, config: &EngramConfig) -> Self {
        Self::new(
            client,
            LoginOptions {
                identity_provider: config.identity_provider.clone(),
                max_time_to_live_nanos: config.session_ttl_nanos(),
            },
        )
    }

    /// Restore a stored delegation
    ///
    /// Runs once per session; later calls wait for the first to finish.
    /// `loading` is false afterwards whatever the outcome.
    pub async fn initialize(&self) {
        self.restored.get_or_init(|| self.restore()).await;
    }

    async fn stored_identity(&self) -> Result<Option<Identity>, AuthError> {
        if !self.client.is_authenticated().await? {
            return Ok(None);
        }
        self.client.identity().await
    }

    async fn restore(&self) {
        match self.stored_identity().await {
            Ok(identity) => {
                if let Some(identity) = &identity {
                    tracing::info!(principal = %identity.principal(), "session restored");
                }
                self.state.send_modify(|state| {
                    state.identity = identity;
                    state.loading = false;
                });
            }
            Err(error) => {
                tracing::warn!(%error, "could not restore session");
                self.state.send_modify(|state| state.loading = false);
            }
        }
    }

    /// Run the interactive login flow
    ///
    /// # Errors
    /// Returns `SessionError::Auth` when the provider fails; the previous
    /// identity is kept in that case.
    #[tracing::instrument(skip(self), fields(provider = %self.options.identity_provider))]
    pub async fn login(&self) -> Result<Identity, SessionError> {
        let _loading = LoadingGuard::begin(&self.state, |_| {});
        let identity = self.client.login(&self.options).await.map_err(|error| {
            tracing::warn!(%error, "login failed");
            error
        })?;
        tracing::info!(principal = %identity.principal(), "logged in");
        self.state
            .send_modify(|state| state.identity = Some(identity.clone()));
        Ok(identity)
    }

    /// Discard the delegation and clear the identity
    ///
    /// # Errors
    /// Returns `SessionError::Auth` when the client fails; the identity is
    /// kept in that case.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.client.logout().await?;
        self.state.send_modify(|state| state.identity = None);
        tracing::info!("logged out");
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every auth change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        self.state.borrow().principal().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn login_options(&self) -> &LoginOptions {
        &self.options
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("options", &self.options)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

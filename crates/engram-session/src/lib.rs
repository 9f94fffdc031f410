//! engram session - everything between the identity provider and the
//! invitation engines
//!
//! Provides:
//! - `AuthSession`: restores or runs the login flow and publishes the identity
//! - `EngramConnection` / `RegistryConnection`: rebind typed actors whenever
//!   identity or target canister changes
//! - `RegistryClient`: the engram owned by the signed-in user
//! - `GuardianSessionStore`: engrams the user guards, in local storage
//! - `routes`: page table, legacy redirects and auth gating
//!
//! # Example
//!
//! ```rust,ignore
//! use engram_session::{AuthSession, EngramConnection};
//! use engram_invite::{GuardianInvite, MemoryClipboard};
//!
//! # async fn example(client: std::sync::Arc<dyn engram_core::AuthClient>,
//! #                  factory: std::sync::Arc<dyn engram_core::ActorFactory>,
//! #                  config: engram_core::EngramConfig,
//! #                  canister: engram_core::CanisterId) -> anyhow::Result<()> {
//! let session = AuthSession::from_config(client, &config);
//! session.initialize().await;
//!
//! let (_target, target_rx) = tokio::sync::watch::channel(Some(canister.clone()));
//! let connection = EngramConnection::spawn(factory, session.subscribe(), target_rx);
//! let invite = GuardianInvite::from_config(
//!     connection.actors(),
//!     canister,
//!     &config,
//!     std::sync::Arc::new(MemoryClipboard::new()),
//! )?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod auth;
pub mod connection;
pub mod error;
pub mod guardian_store;
mod progress;
pub mod registry;
pub mod routes;

pub use auth::{AuthSession, AuthState};
pub use connection::{EngramConnection, RegistryConnection, RegistrySource};
pub use error::{SessionError, StoreError};
pub use guardian_store::{
    FileStore, GuardianEngram, GuardianSessionStore, KeyValueStore, MemoryStore,
    GUARDIAN_ENGRAMS_KEY,
};
pub use registry::{RegistryClient, RegistryState};
pub use routes::{resolve, Navigation, Route};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for session plumbing
    pub use crate::{
        AuthSession, AuthState, EngramConnection, GuardianSessionStore, Navigation,
        RegistryClient, RegistryConnection, Route, SessionError,
    };
}

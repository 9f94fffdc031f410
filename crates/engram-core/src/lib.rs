//! engram core - shared vocabulary of the engram client
//!
//! Provides:
//! - Domain types (principals, canister ids, permissions, guardian listings)
//! - Typed actor interfaces for the engram and registry canisters
//! - The identity provider interface
//! - The error taxonomy of canister calls
//! - Configuration and tracing setup
//! - `TaskSlot`, the one-task-per-slot primitive behind every timer
//! - An in-memory backend for simulation
//!
//! # Example
//!
//! ```rust,ignore
//! use engram_core::prelude::*;
//! use engram_core::memory::InMemoryEngram;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engram = InMemoryEngram::new(Principal::parse("aaaaa-aa")?, CanisterId::parse("rrkah-fqaaa-aaaaa-aaaaq-cai")?);
//! let code = engram
//!     .create_guardian_invite("alice", &GuardianPermissions::all())
//!     .await?
//!     .into_result()?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod actor;
pub mod auth;
pub mod config;
pub mod error;
pub mod memory;
pub mod task;
pub mod telemetry;
pub mod types;

pub use actor::{
    connected, disconnected, ActorFactory, ActorSource, EngramActor, RegistryActor, SharedActor,
    SharedRegistry,
};
pub use auth::{AuthClient, AuthError, LoginOptions};
pub use config::{EngramConfig, InviteTiming, LogConfig};
pub use error::{ActorError, ConfigError};
pub use task::TaskSlot;
pub use types::{
    CanisterId, CanisterResult, EngramRecord, GuardianEntry, GuardianPermissions,
    GuardianStatus, Identity, InvalidId, OperatorPermissions, Principal,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with engram clients
    pub use crate::{
        ActorError, ActorSource, CanisterId, CanisterResult, EngramActor, EngramConfig,
        GuardianEntry, GuardianPermissions, GuardianStatus, Identity, OperatorPermissions,
        Principal, RegistryActor, SharedActor,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

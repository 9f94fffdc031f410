//! Identity provider interface

use crate::types::Identity;
use async_trait::async_trait;

/// Login flow failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The provider reported an error or the user aborted
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// Provider could not be reached
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Parameters of one login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    /// Provider URL
    pub identity_provider: String,
    /// Maximum delegation lifetime in nanoseconds
    pub max_time_to_live_nanos: u64,
}

/// Third-party login client
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Whether a stored delegation is still valid
    async fn is_authenticated(&self) -> Result<bool, AuthError>;

    /// Identity of the stored delegation, if valid
    async fn identity(&self) -> Result<Option<Identity>, AuthError>;

    /// Run the interactive login flow
    async fn login(&self, options: &LoginOptions) -> Result<Identity, AuthError>;

    /// Discard the stored delegation
    async fn logout(&self) -> Result<(), AuthError>;
}

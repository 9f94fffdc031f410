//! Error types for sessions and local storage

use engram_core::{ActorError, AuthError};
use std::path::PathBuf;

/// Local key-value storage failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("storage I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored value could not be encoded or decoded
    #[error("storage encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failures of session-level operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Actor(#[from] ActorError),

    /// The canister refused the request; message is verbatim
    #[error("{0}")]
    Rejected(String),

    #[error("not connected")]
    NotConnected,

    #[error(transparent)]
    Store(#[from] StoreError),
}
